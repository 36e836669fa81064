use crate::commands::builtin::{datastore_arg, datastore_of, help_template, send};
use crate::config::Config;
use clap::Command;
use netconf_codec::operation::Operation;

pub fn cli(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .help_template(help_template())
        .args([datastore_arg("target", "Datastore to lock", 't', Some("candidate"))])
}

pub fn exec_lock(cfg: &Config) -> anyhow::Result<()> {
    let target = datastore_of("target", &cfg.args)?;
    send(cfg, Operation::Lock { target })
}

pub fn exec_unlock(cfg: &Config) -> anyhow::Result<()> {
    let target = datastore_of("target", &cfg.args)?;
    send(cfg, Operation::Unlock { target })
}
