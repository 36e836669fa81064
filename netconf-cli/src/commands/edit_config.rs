use crate::commands::builtin::{
    arg, datastore_arg, datastore_of, file_arg, help_template, read_fragment, send,
    value_of_if_exists,
};
use crate::config::Config;
use clap::Command;
use netconf_codec::operation::{DefaultOperation, EditConfig, ErrorOption, Operation};
use std::str::FromStr;

pub fn cli() -> Command {
    Command::new("edit-config")
        .about("Build edit-config rpc")
        .help_template(help_template())
        .args([
            datastore_arg("target", "Datastore to edit", 't', Some("candidate")),
            file_arg("config", "File containing configuration", true, 'c'),
            arg(
                "default-operation",
                "Default operation",
                false,
                None,
                None,
                None,
                ["merge", "replace", "none"],
            ),
            arg(
                "error-option",
                "Error option",
                false,
                None,
                None,
                None,
                ["stop-on-error", "continue-on-error", "rollback-on-error"],
            ),
        ])
}

pub fn exec(cfg: &Config) -> anyhow::Result<()> {
    let default_operation = value_of_if_exists::<String>("default-operation", &cfg.args)
        .map(|value| DefaultOperation::from_str(value))
        .transpose()?;
    let error_option = value_of_if_exists::<String>("error-option", &cfg.args)
        .map(|value| ErrorOption::from_str(value))
        .transpose()?;
    let config = match value_of_if_exists::<String>("config", &cfg.args) {
        Some(path) => read_fragment(path)?,
        None => Default::default(),
    };
    let edit = EditConfig {
        target: datastore_of("target", &cfg.args)?,
        default_operation,
        error_option,
        config,
    };
    send(cfg, Operation::EditConfig(edit))
}
