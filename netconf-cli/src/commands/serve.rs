use crate::commands::builtin::{
    file_arg, help_template, read_fragment, read_text, value_of_if_exists, values_of,
};
use crate::config::Config;
use anyhow::anyhow;
use clap::{Arg, ArgAction, Command, ValueHint};
use log::{info, warn};
use netconf_codec::datastore::{LockGateway, MemoryBackend};
use netconf_codec::message::{Message, RpcReply};
use netconf_codec::operation::Datastore;
use netconf_codec::rpc_error::{ErrorTag, NcError};
use netconf_codec::session::{Session, SessionId};

pub fn cli() -> Command {
    Command::new("serve")
        .about("Answer rpc messages from an in-memory datastore")
        .help_template(help_template())
        .args([
            file_arg("running", "File with the initial running configuration", false, 'r'),
            Arg::new("files")
                .help("Rpc documents, each answered in turn; prefix with '<session-id>=' to send on behalf of another session")
                .required(true)
                .action(ArgAction::Append)
                .value_hint(ValueHint::FilePath),
        ])
}

pub async fn exec(cfg: &Config) -> anyhow::Result<()> {
    let running = match value_of_if_exists::<String>("running", &cfg.args) {
        Some(path) => read_fragment(path)?,
        None => Default::default(),
    };
    let backend = MemoryBackend::new("memory")
        .with_datastore(Datastore::Running, running)
        .with_datastore(Datastore::Candidate, Default::default())
        .with_datastore(Datastore::Startup, Default::default());

    let gateway = LockGateway::new();
    let backend_id = gateway
        .register(backend)
        .await
        .map_err(|err| anyhow!("Failed to register backend: {}", err))?;

    let mut sessions: Vec<SessionId> = Vec::new();
    for value in values_of::<String>("files", &cfg.args) {
        let (session, path) = session_for(cfg, value);
        if !sessions.contains(session.id()) {
            sessions.push(session.id().clone());
        }
        let reply = match Message::parse(&read_text(path)?) {
            Ok(Message::Rpc(rpc)) => gateway.handle_rpc(backend_id, &session, rpc).await,
            Ok(other) => {
                warn!("Skipping {}, not an rpc: {:?}", path, other);
                continue;
            }
            Err(err) => {
                warn!("Failed to parse {}: {}", path, err);
                RpcReply::error("", NcError::new(ErrorTag::MalformedMessage))
            }
        };
        println!("{}", Message::Reply(reply).serialize()?);
    }

    for session in &sessions {
        gateway.release_session(session).await;
    }
    gateway.shutdown().await;
    info!("Served {} session(s)", sessions.len());
    Ok(())
}

/// Splits an optional `<session-id>=` prefix off a file argument.
fn session_for<'a>(cfg: &Config, value: &'a str) -> (Session, &'a str) {
    match value.split_once('=') {
        Some((id, path)) if !id.is_empty() => {
            (Session::new(id, cfg.capabilities().clone()), path)
        }
        _ => (cfg.session.clone(), value),
    }
}
