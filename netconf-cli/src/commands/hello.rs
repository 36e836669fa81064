use crate::commands::builtin::help_template;
use crate::config::Config;
use clap::{Arg, ArgAction, Command};
use netconf_codec::message::{hello, Message};

pub fn cli() -> Command {
    Command::new("hello")
        .about("Build hello message")
        .help_template(help_template())
        .args([Arg::new("server")
            .help("Build the server hello, carrying the session id")
            .long("server")
            .action(ArgAction::SetTrue)])
}

pub fn exec(cfg: &Config) -> anyhow::Result<()> {
    let session_id = if cfg.args.get_flag("server") {
        Some(cfg.session.id().as_str())
    } else {
        None
    };
    let hello = hello(cfg.capabilities(), session_id)?;
    println!("{}", Message::Hello(hello).serialize()?);
    Ok(())
}
