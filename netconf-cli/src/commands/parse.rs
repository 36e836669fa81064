use crate::commands::builtin::{help_template, read_text, value_of};
use crate::config::Config;
use clap::{Arg, Command, ValueHint};
use netconf_codec::message::{Message, Outcome};

pub fn cli() -> Command {
    Command::new("parse")
        .about("Parse and classify a message")
        .help_template(help_template())
        .args([Arg::new("file")
            .help("File containing one complete message")
            .required(true)
            .value_hint(ValueHint::FilePath)])
}

pub fn exec(cfg: &Config) -> anyhow::Result<()> {
    let text = read_text(value_of::<String>("file", &cfg.args)?)?;
    let message = Message::parse(&text)?;
    println!("{}", describe(&message)?);
    Ok(())
}

/// Human readable summary of a parsed message.
fn describe(message: &Message) -> anyhow::Result<String> {
    let summary = match message {
        Message::Hello(hello) => {
            let mut lines = vec![format!(
                "hello, session-id: {}",
                hello.session_id().unwrap_or("-")
            )];
            lines.extend(
                hello
                    .capabilities()
                    .iter()
                    .map(|capability| format!("  {}", capability)),
            );
            lines.join("\n")
        }
        Message::Rpc(rpc) => format!(
            "rpc {}, message-id: {}, class: {:?}\n{}",
            rpc.operation().name(),
            rpc.message_id(),
            rpc.operation().class(),
            rpc.operation_text()?
        ),
        Message::Reply(reply) => {
            let outcome = match reply.outcome() {
                Outcome::Ok => "ok".to_string(),
                Outcome::Data(data) => format!("data\n{}", data.to_text()?),
                Outcome::Error(errors) => {
                    let mut lines = vec![format!("{} error(s)", errors.len())];
                    lines.extend(errors.iter().map(|err| format!("  {}", err)));
                    lines.join("\n")
                }
                Outcome::Unknown(content) => format!("unknown\n{}", content.to_text()?),
            };
            format!("rpc-reply, message-id: {}, {}", reply.message_id(), outcome)
        }
    };
    Ok(summary)
}
