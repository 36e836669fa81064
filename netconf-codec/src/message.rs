use crate::capability::CapabilitySet;
use crate::document::{Element, Fragment};
use crate::error::{CodecError, CodecResult};
use crate::operation::Operation;
use crate::rpc_error::NcError;
use crate::NETCONF_URN;
use log::debug;
use quick_xml::se::Serializer;
use serde_derive::{Deserialize, Serialize};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Hello(Hello),
    Rpc(Rpc),
    Reply(RpcReply),
}

impl Message {
    pub fn parse(text: &str) -> CodecResult<Message> {
        crate::parser::parse(text)
    }

    pub fn serialize(&self) -> CodecResult<String> {
        serialize(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename = "hello")]
pub struct Hello {
    #[serde(rename = "@xmlns", default)]
    xmlns: String,
    capabilities: Capabilities,
    #[serde(rename = "session-id", skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

impl Hello {
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
            .capability
            .iter()
            .map(|capability| capability.trim())
            .collect()
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities().has_capability(capability)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn to_document(&self) -> CodecResult<String> {
        use serde::Serialize;
        let mut buffer = String::with_capacity(256);
        buffer.push_str(XML_DECLARATION);
        buffer.push('\n');
        let mut ser = Serializer::new(&mut buffer);
        ser.indent(' ', 2);
        self.serialize(ser)?;
        Ok(buffer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Capabilities {
    #[serde(default)]
    capability: Vec<String>,
}

/// Builds a `<hello>`.
///
/// Clients pass no `session_id`; a server must pass a non-empty one.
pub fn hello(capabilities: &CapabilitySet, session_id: Option<&str>) -> CodecResult<Hello> {
    if capabilities.is_empty() {
        return Err(CodecError::invalid("no capability specified"));
    }
    if let Some(session_id) = session_id {
        if session_id.trim().is_empty() {
            return Err(CodecError::invalid("session id is empty"));
        }
    }
    Ok(Hello {
        xmlns: NETCONF_URN.to_string(),
        capabilities: Capabilities {
            capability: capabilities.iter().map(str::to_string).collect(),
        },
        session_id: session_id.map(str::to_string),
    })
}

/// Wraps an operation element in `<rpc>`. The message id is copied verbatim.
pub fn wrap_rpc(operation: Element, message_id: &str) -> Element {
    Element::new("rpc")
        .with_attribute("message-id", message_id)
        .with_attribute("xmlns", NETCONF_URN)
        .with_child(operation)
}

/// Wraps reply content (`<ok/>`, `<data>` or `<rpc-error>`s) in `<rpc-reply>`.
pub fn wrap_reply(outcome: Fragment, message_id: &str) -> Element {
    Element::new("rpc-reply")
        .with_attribute("message-id", message_id)
        .with_attribute("xmlns", NETCONF_URN)
        .with_content(outcome)
}

/// Pretty-formatted UTF-8 document text for `message`.
pub fn serialize(message: &Message) -> CodecResult<String> {
    match message {
        Message::Hello(hello) => hello.to_document(),
        Message::Rpc(rpc) => rpc.to_element()?.to_document(),
        Message::Reply(reply) => reply.to_element()?.to_document(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpc {
    message_id: String,
    operation: Operation,
}

impl Rpc {
    /// Fails with [`CodecError::InvalidParameter`] when the operation breaks a
    /// structural rule; no request is produced in that case.
    pub fn new(message_id: impl Into<String>, operation: Operation) -> CodecResult<Rpc> {
        operation.encode()?;
        let rpc = Rpc {
            message_id: message_id.into(),
            operation,
        };
        debug!(
            "Built <{}> rpc, message-id {}",
            rpc.operation.name(),
            rpc.message_id
        );
        Ok(rpc)
    }

    /// Rpc read off the wire; structural rules are not re-checked.
    pub(crate) fn received(message_id: String, operation: Operation) -> Rpc {
        Rpc {
            message_id,
            operation,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn into_operation(self) -> Operation {
        self.operation
    }

    pub fn to_element(&self) -> CodecResult<Element> {
        Ok(wrap_rpc(self.operation.encode()?, &self.message_id))
    }

    /// The operation subtree as text.
    pub fn operation_text(&self) -> CodecResult<String> {
        Fragment::from(self.operation.encode()?).to_text()
    }
}

/// Content of an `<rpc-reply>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// Children of `<data>`; empty when nothing matched.
    Data(Fragment),
    /// Every `<rpc-error>` of the reply, in document order.
    Error(Vec<NcError>),
    /// Reply content that is none of the above, kept as received.
    Unknown(Fragment),
}

impl Outcome {
    pub fn to_fragment(&self) -> Fragment {
        match self {
            Outcome::Ok => Fragment::from(Element::new("ok")),
            Outcome::Data(data) => Fragment::from(Element::new("data").with_content(data.clone())),
            Outcome::Error(errors) => Fragment::from_elements(errors.iter().map(NcError::to_element)),
            Outcome::Unknown(content) => content.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    pub fn errors(&self) -> &[NcError] {
        match self {
            Outcome::Error(errors) => errors,
            _ => &[],
        }
    }

    /// Data content as text, `""` for empty data. `None` for other outcomes.
    pub fn data_text(&self) -> Option<CodecResult<String>> {
        match self {
            Outcome::Data(data) => Some(data.to_text()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReply {
    message_id: String,
    outcome: Outcome,
}

impl RpcReply {
    pub fn new(message_id: impl Into<String>, outcome: Outcome) -> RpcReply {
        RpcReply {
            message_id: message_id.into(),
            outcome,
        }
    }

    pub fn ok(message_id: impl Into<String>) -> RpcReply {
        RpcReply::new(message_id, Outcome::Ok)
    }

    pub fn data(message_id: impl Into<String>, data: Fragment) -> RpcReply {
        RpcReply::new(message_id, Outcome::Data(data))
    }

    pub fn error(message_id: impl Into<String>, error: NcError) -> RpcReply {
        RpcReply::new(message_id, Outcome::Error(vec![error]))
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn has_errors(&self) -> bool {
        !self.outcome.errors().is_empty()
    }

    pub fn to_element(&self) -> CodecResult<Element> {
        if let Outcome::Error(errors) = &self.outcome {
            if errors.is_empty() {
                return Err(CodecError::invalid("error reply without <rpc-error>"));
            }
        }
        Ok(wrap_reply(self.outcome.to_fragment(), &self.message_id))
    }
}
