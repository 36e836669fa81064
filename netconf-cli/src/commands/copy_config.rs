use crate::commands::builtin::{
    arg, datastore_arg, datastore_of, file_arg, help_template, read_fragment, send,
    value_of_if_exists,
};
use crate::config::Config;
use clap::Command;
use netconf_codec::operation::{Datastore, Operation};
use std::str::FromStr;

pub fn cli() -> Command {
    Command::new("copy-config")
        .about("Build copy-config rpc")
        .help_template(help_template())
        .args([
            arg(
                "source",
                "Datastore to copy from",
                false,
                Some('s'),
                None,
                None,
                ["running", "startup", "candidate"],
            )
            .conflicts_with("config"),
            datastore_arg("target", "Datastore to replace", 't', Some("startup")),
            file_arg("config", "File containing configuration used as source", false, 'c'),
        ])
}

pub fn exec(cfg: &Config) -> anyhow::Result<()> {
    let source = match value_of_if_exists::<String>("source", &cfg.args) {
        Some(source) => Datastore::from_str(source)?,
        None => Datastore::None,
    };
    let data = match value_of_if_exists::<String>("config", &cfg.args) {
        Some(path) => Some(read_fragment(path)?),
        None => None,
    };
    let operation = Operation::CopyConfig {
        source,
        target: datastore_of("target", &cfg.args)?,
        data,
    };
    send(cfg, operation)
}
