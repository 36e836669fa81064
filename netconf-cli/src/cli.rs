use crate::commands::builtin::{builtin, builtin_exec};
use crate::config::CliConfig;
use anyhow::anyhow;
use clap::{
    arg, crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, Command,
};
use log::debug;
use std::time::Instant;

pub async fn exec(cmd: &str, cfg: CliConfig) -> anyhow::Result<()> {
    let start_time = Instant::now();
    match builtin_exec(cmd, &cfg.inner).await {
        Some(result) => result?,
        None => return Err(anyhow!("Unknown command '{}'", cmd)),
    }
    debug!(
        "Command {} took: {:.3}s",
        cmd,
        start_time.elapsed().as_secs_f32()
    );
    Ok(())
}

pub fn cli() -> Command {
    Command::new(crate_name!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .version(crate_version!())
        .long_version(crate_version!())
        .arg_required_else_help(true)
        .allow_external_subcommands(false)
        .bin_name("netconf")
        .display_name("netconf")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Author:</> {author}

<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}

<green,bold>Commands:</>
    <cyan,bold>hello</>             Build hello message
    <cyan,bold>get</>               Build get rpc
    <cyan,bold>get-config</>        Build get-config rpc
    <cyan,bold>edit-config</>       Build edit-config rpc
    <cyan,bold>copy-config</>       Build copy-config rpc
    <cyan,bold>delete-config</>     Build delete-config rpc
    <cyan,bold>lock</>              Build lock rpc
    <cyan,bold>unlock</>            Build unlock rpc
    <cyan,bold>kill-session</>      Build kill-session rpc
    <cyan,bold>close-session</>     Build close-session rpc
    <cyan,bold>parse</>             Parse and classify a message
    <cyan,bold>serve</>             Answer rpc messages from an in-memory datastore

See '<cyan,bold>netconf help</> <cyan><<command>></>' for more information on a specific command.\n",
        ))
        .args([
            arg!(-v --verbose ... "Use verbose output (-vv to log codec messages, -vvv to trace documents)")
                .global(true),
            arg!(-q --quiet "Disable logging completely")
                .global(true),
            global_opt("capability", "Capability advertised by the peer (default: base, candidate, startup)")
                .env("NETCONF_CAPABILITIES")
                .action(ArgAction::Append)
                .value_delimiter(','),
            global_opt("session-id", "Session id used for hello and served rpcs")
                .env("NETCONF_SESSION_ID")
                .default_value("1"),
        ])
        .subcommands(builtin())
}

fn global_opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).help(help).long(name).global(true)
}

#[test]
fn verify_cli() {
    cli().debug_assert();
}
