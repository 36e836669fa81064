//! Parsing and classification of received messages.
//!
//! Classification inspects children in document order without any schema
//! validation. Where an operation carries the same child element more than
//! once, the first occurrence is used and the duplicate is logged.
use crate::document::Element;
use crate::error::{CodecError, CodecResult};
use crate::filter::Filter;
use crate::message::{Hello, Message, Outcome, Rpc, RpcReply};
use crate::operation::{Datastore, DefaultOperation, EditConfig, ErrorOption, Operation};
use crate::rpc_error::NcError;
use core::str::FromStr;
use log::{debug, warn};

/// Parses one complete message.
///
/// Fails with [`CodecError::MalformedDocument`] when `text` is not
/// well-formed, has no root element or the root is not a NETCONF message.
pub fn parse(text: &str) -> CodecResult<Message> {
    let root = Element::parse(text)?;
    let message = match root.local_name() {
        "hello" => Message::Hello(parse_hello(text)?),
        "rpc" => Message::Rpc(parse_rpc(&root)?),
        "rpc-reply" => Message::Reply(parse_reply(&root)?),
        other => {
            return Err(CodecError::malformed(format!(
                "unexpected root element <{}>",
                other
            )))
        }
    };
    Ok(message)
}

fn parse_hello(text: &str) -> CodecResult<Hello> {
    quick_xml::de::from_str(text).map_err(|err| CodecError::malformed(err.to_string()))
}

fn parse_rpc(root: &Element) -> CodecResult<Rpc> {
    let message_id = message_id(root);
    let element = root
        .first_element()
        .ok_or_else(|| CodecError::malformed("<rpc> carries no operation"))?;
    if root.elements().nth(1).is_some() {
        warn!(
            "<rpc> message-id {} carries more than one operation, using <{}>",
            message_id,
            element.name()
        );
    }
    let operation = parse_operation(element)?;
    debug!("Parsed <{}> rpc, message-id {}", operation.name(), message_id);
    Ok(Rpc::received(message_id, operation))
}

fn parse_operation(element: &Element) -> CodecResult<Operation> {
    let operation = match element.local_name() {
        "get" => Operation::Get {
            filter: filter(element)?,
        },
        "get-config" => Operation::GetConfig {
            source: datastore(element, "source"),
            filter: filter(element)?,
        },
        "edit-config" => Operation::EditConfig(EditConfig {
            target: datastore(element, "target"),
            default_operation: enum_text::<DefaultOperation>(element, "default-operation"),
            error_option: enum_text::<ErrorOption>(element, "error-option"),
            config: first_named(element, "config")
                .map(Element::content)
                .unwrap_or_default(),
        }),
        "copy-config" => {
            let (source, data) = match first_named(element, "source") {
                Some(source) => match first_named(source, "config") {
                    Some(config) => (Datastore::None, Some(config.content())),
                    None => (datastore(element, "source"), None),
                },
                None => (Datastore::None, None),
            };
            Operation::CopyConfig {
                source,
                target: datastore(element, "target"),
                data,
            }
        }
        "delete-config" => Operation::DeleteConfig {
            target: datastore(element, "target"),
        },
        "lock" => Operation::Lock {
            target: datastore(element, "target"),
        },
        "unlock" => Operation::Unlock {
            target: datastore(element, "target"),
        },
        "kill-session" => Operation::KillSession {
            session_id: first_named(element, "session-id")
                .map(Element::token)
                .unwrap_or_default(),
        },
        "close-session" => Operation::CloseSession,
        _ => Operation::Unknown(element.clone()),
    };
    Ok(operation)
}

fn parse_reply(root: &Element) -> CodecResult<RpcReply> {
    let message_id = message_id(root);
    let outcome = match root.first_element() {
        Some(first) if first.local_name() == "ok" => Outcome::Ok,
        Some(first) if first.local_name() == "rpc-error" => Outcome::Error(
            root.children_named("rpc-error")
                .map(NcError::from_element)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Some(first) if first.local_name() == "data" => Outcome::Data(first.content()),
        _ => Outcome::Unknown(root.content()),
    };
    Ok(RpcReply::new(message_id, outcome))
}

fn message_id(root: &Element) -> String {
    match root.attribute("message-id") {
        Some(id) => id.to_string(),
        None => {
            warn!("<{}> without message-id attribute", root.name());
            String::new()
        }
    }
}

/// First child with `name`; later duplicates are ignored with a warning.
fn first_named<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    let mut matches = parent.children_named(name);
    let first = matches.next();
    if matches.next().is_some() {
        warn!(
            "Duplicate <{}> in <{}>, using the first occurrence",
            name,
            parent.name()
        );
    }
    first
}

fn datastore(operation: &Element, wrapper: &str) -> Datastore {
    first_named(operation, wrapper)
        .and_then(Element::first_element)
        .map(|datastore| Datastore::from_element_name(datastore.local_name()))
        .unwrap_or(Datastore::None)
}

fn filter(operation: &Element) -> CodecResult<Option<Filter>> {
    first_named(operation, "filter")
        .map(Filter::from_element)
        .transpose()
}

/// Unrecognized values fall back to the implicit default (absent).
fn enum_text<T: FromStr>(operation: &Element, name: &str) -> Option<T> {
    let text = first_named(operation, name)?.token();
    match text.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unknown <{}> value '{}'", name, text);
            None
        }
    }
}
