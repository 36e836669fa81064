use crate::commands::builtin::{arg, help_template, send, value_of};
use crate::config::Config;
use clap::Command;
use netconf_codec::operation::Operation;

pub fn kill_cli() -> Command {
    Command::new("kill-session")
        .about("Build kill-session rpc")
        .help_template(help_template())
        .args([arg(
            "id",
            "Session id to kill",
            true,
            Some('i'),
            None,
            None,
            None,
        )])
}

pub fn close_cli() -> Command {
    Command::new("close-session")
        .about("Build close-session rpc")
        .help_template(help_template())
}

pub fn exec_kill(cfg: &Config) -> anyhow::Result<()> {
    let session_id = value_of::<String>("id", &cfg.args)?.clone();
    send(cfg, Operation::KillSession { session_id })
}

pub fn exec_close(cfg: &Config) -> anyhow::Result<()> {
    send(cfg, Operation::CloseSession)
}
