use crate::commands::builtin::{file_arg, help_template, read_text, send, value_of_if_exists};
use crate::config::Config;
use clap::Command;
use netconf_codec::filter::Filter;
use netconf_codec::operation::Operation;

pub fn cli() -> Command {
    Command::new("get")
        .about("Build get rpc")
        .help_template(help_template())
        .args([file_arg("filter", "File containing subtree filter", false, 'f')])
}

pub fn exec(cfg: &Config) -> anyhow::Result<()> {
    let filter = match value_of_if_exists::<String>("filter", &cfg.args) {
        Some(path) => Some(Filter::subtree(&read_text(path)?)?),
        None => None,
    };
    send(cfg, Operation::Get { filter })
}
