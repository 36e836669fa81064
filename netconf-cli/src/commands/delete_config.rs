use crate::commands::builtin::{datastore_arg, datastore_of, help_template, send};
use crate::config::Config;
use clap::Command;
use netconf_codec::operation::Operation;

pub fn cli() -> Command {
    Command::new("delete-config")
        .about("Build delete-config rpc")
        .help_template(help_template())
        .args([datastore_arg("target", "Datastore to delete", 't', Some("startup"))])
}

pub fn exec(cfg: &Config) -> anyhow::Result<()> {
    let target = datastore_of("target", &cfg.args)?;
    send(cfg, Operation::DeleteConfig { target })
}
