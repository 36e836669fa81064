use crate::commands::builtin::{
    datastore_arg, datastore_of, file_arg, help_template, read_text, send, value_of_if_exists,
};
use crate::config::Config;
use clap::Command;
use netconf_codec::filter::Filter;
use netconf_codec::operation::Operation;

pub fn cli() -> Command {
    Command::new("get-config")
        .about("Build get-config rpc")
        .help_template(help_template())
        .args([
            datastore_arg("source", "Datastore to get config", 's', Some("running")),
            file_arg("filter", "File containing subtree filter", false, 'f'),
        ])
}

pub fn exec(cfg: &Config) -> anyhow::Result<()> {
    let source = datastore_of("source", &cfg.args)?;
    let filter = match value_of_if_exists::<String>("filter", &cfg.args) {
        Some(path) => Some(Filter::subtree(&read_text(path)?)?),
        None => None,
    };
    send(cfg, Operation::GetConfig { source, filter })
}
