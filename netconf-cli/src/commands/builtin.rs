use crate::commands::*;
use crate::config::Config;
use anyhow::{anyhow, Context};
use clap::builder::{IntoResettable, ValueParser};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::debug;
use netconf_codec::document::Fragment;
use netconf_codec::message::{Message, Rpc};
use netconf_codec::operation::{Datastore, Operation};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const DATASTORES: [&str; 3] = ["running", "startup", "candidate"];

pub fn builtin() -> Vec<Command> {
    vec![
        hello::cli(),
        get::cli(),
        get_config::cli(),
        edit_config::cli(),
        copy_config::cli(),
        delete_config::cli(),
        lock::cli("lock", "Build lock rpc"),
        lock::cli("unlock", "Build unlock rpc"),
        session::kill_cli(),
        session::close_cli(),
        parse::cli(),
        serve::cli(),
    ]
}

pub async fn builtin_exec(cmd: &str, cfg: &Config) -> Option<anyhow::Result<()>> {
    let f = match cmd {
        "hello" => hello::exec(cfg),
        "get" => get::exec(cfg),
        "get-config" => get_config::exec(cfg),
        "edit-config" => edit_config::exec(cfg),
        "copy-config" => copy_config::exec(cfg),
        "delete-config" => delete_config::exec(cfg),
        "lock" => lock::exec_lock(cfg),
        "unlock" => lock::exec_unlock(cfg),
        "kill-session" => session::exec_kill(cfg),
        "close-session" => session::exec_close(cfg),
        "parse" => parse::exec(cfg),
        "serve" => serve::exec(cfg).await,
        _ => return None,
    };
    Some(f)
}

/// Checks the operation against the peer capabilities, wraps it with a
/// fresh message id and prints the document.
pub(crate) fn send(cfg: &Config, operation: Operation) -> anyhow::Result<()> {
    cfg.capabilities().check(&operation)?;
    let rpc = Rpc::new(Uuid::new_v4().to_string(), operation)?;
    debug!("Built rpc with message-id {}", rpc.message_id());
    println!("{}", Message::Rpc(rpc).serialize()?);
    Ok(())
}

pub(crate) fn read_text(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(Path::new(path)).with_context(|| format!("Failed to read '{}'", path))
}

pub(crate) fn read_fragment(path: &str) -> anyhow::Result<Fragment> {
    Ok(Fragment::parse(&read_text(path)?)?)
}

pub(crate) fn datastore_of(name: &str, args: &ArgMatches) -> anyhow::Result<Datastore> {
    Ok(Datastore::from_str(value_of::<String>(name, args)?)?)
}

pub(crate) fn datastore_arg(
    name: &'static str,
    help: &'static str,
    short: char,
    default: Option<&'static str>,
) -> Arg {
    arg(
        name,
        help,
        default.is_none(),
        Some(short),
        default,
        None,
        DATASTORES,
    )
}

pub(crate) fn file_arg(name: &'static str, help: &'static str, required: bool, short: char) -> Arg {
    arg(
        name,
        help,
        required,
        Some(short),
        None,
        Some(ValueHint::FilePath),
        None,
    )
}

pub(crate) fn value_of<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> anyhow::Result<&'a T> {
    args.get_one::<T>(name)
        .ok_or_else(|| anyhow!("Missing value for '{}'", name))
}

pub(crate) fn value_of_if_exists<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> Option<&'a T> {
    if args.contains_id(name) {
        args.get_one::<T>(name)
    } else {
        None
    }
}

pub(crate) fn values_of<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> Vec<&'a T> {
    args.get_many::<T>(name).unwrap_or_default().collect()
}

pub(super) fn arg(
    name: &'static str,
    help: &'static str,
    required: bool,
    short: Option<char>,
    default: Option<&'static str>,
    hint: Option<ValueHint>,
    parser: impl IntoResettable<ValueParser>,
) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .required(required)
        .default_value(default)
        .value_hint(hint)
        .value_parser(parser)
}

pub(super) fn help_template() -> &'static str {
    color_print::cstr!(
        "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}\n",
    )
}
