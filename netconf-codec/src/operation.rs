//! Protocol operations and their encoders, see [RFC6241 7](https://www.rfc-editor.org/rfc/rfc6241.html#section-7).
//!
//! Every builder validates the structural rules of its operation and emits
//! children in a fixed order, so equal inputs always give equal trees.
use crate::document::{Element, Fragment};
use crate::error::{CodecError, CodecResult};
use crate::filter::Filter;
use core::fmt;
use core::fmt::Display;
use core::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datastore {
    Running,
    Startup,
    Candidate,
    /// Configuration supplied inline instead of a named datastore.
    None,
}

impl Datastore {
    fn element_name(&self) -> Option<&'static str> {
        match self {
            Datastore::Running => Some("running"),
            Datastore::Startup => Some("startup"),
            Datastore::Candidate => Some("candidate"),
            Datastore::None => None,
        }
    }

    pub(crate) fn from_element_name(name: &str) -> Datastore {
        match name {
            "running" => Datastore::Running,
            "startup" => Datastore::Startup,
            "candidate" => Datastore::Candidate,
            _ => Datastore::None,
        }
    }
}

impl Display for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element_name().unwrap_or("none"))
    }
}

impl FromStr for Datastore {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let datastore = s.to_lowercase();
        match datastore.as_str() {
            "running" => Ok(Datastore::Running),
            "candidate" => Ok(Datastore::Candidate),
            "startup" => Ok(Datastore::Startup),
            _ => Err(CodecError::UnknownDatastore {
                expected: vec![
                    "running".to_string(),
                    "candidate".to_string(),
                    "startup".to_string(),
                ],
                unknown: datastore,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOperation {
    Merge,
    Replace,
    None,
}

impl DefaultOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultOperation::Merge => "merge",
            DefaultOperation::Replace => "replace",
            DefaultOperation::None => "none",
        }
    }
}

impl FromStr for DefaultOperation {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(DefaultOperation::Merge),
            "replace" => Ok(DefaultOperation::Replace),
            "none" => Ok(DefaultOperation::None),
            _ => Err(CodecError::invalid(format!(
                "unknown default-operation value: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOption {
    StopOnError,
    ContinueOnError,
    RollbackOnError,
}

impl ErrorOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorOption::StopOnError => "stop-on-error",
            ErrorOption::ContinueOnError => "continue-on-error",
            ErrorOption::RollbackOnError => "rollback-on-error",
        }
    }
}

impl FromStr for ErrorOption {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stop-on-error" => Ok(ErrorOption::StopOnError),
            "continue-on-error" => Ok(ErrorOption::ContinueOnError),
            "rollback-on-error" => Ok(ErrorOption::RollbackOnError),
            _ => Err(CodecError::invalid(format!(
                "unknown error-option value: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditConfig {
    pub target: Datastore,
    pub default_operation: Option<DefaultOperation>,
    pub error_option: Option<ErrorOption>,
    pub config: Fragment,
}

impl EditConfig {
    /// `merge` when the request does not say otherwise.
    pub fn effective_default_operation(&self) -> DefaultOperation {
        self.default_operation.unwrap_or(DefaultOperation::Merge)
    }

    /// `stop-on-error` when the request does not say otherwise.
    pub fn effective_error_option(&self) -> ErrorOption {
        self.error_option.unwrap_or(ErrorOption::StopOnError)
    }
}

/// Broad class of an operation, as used for dispatch decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcClass {
    DatastoreRead,
    DatastoreWrite,
    Session,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Get {
        filter: Option<Filter>,
    },
    GetConfig {
        source: Datastore,
        filter: Option<Filter>,
    },
    EditConfig(EditConfig),
    CopyConfig {
        source: Datastore,
        target: Datastore,
        /// Inline configuration, used when `source` is [`Datastore::None`].
        data: Option<Fragment>,
    },
    DeleteConfig {
        target: Datastore,
    },
    Lock {
        target: Datastore,
    },
    Unlock {
        target: Datastore,
    },
    KillSession {
        session_id: String,
    },
    CloseSession,
    /// Operation outside the base set, kept as received.
    Unknown(Element),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::Get { .. } => "get",
            Operation::GetConfig { .. } => "get-config",
            Operation::EditConfig(_) => "edit-config",
            Operation::CopyConfig { .. } => "copy-config",
            Operation::DeleteConfig { .. } => "delete-config",
            Operation::Lock { .. } => "lock",
            Operation::Unlock { .. } => "unlock",
            Operation::KillSession { .. } => "kill-session",
            Operation::CloseSession => "close-session",
            Operation::Unknown(element) => element.local_name(),
        }
    }

    pub fn class(&self) -> RpcClass {
        match self {
            Operation::Get { .. } | Operation::GetConfig { .. } => RpcClass::DatastoreRead,
            Operation::EditConfig(_)
            | Operation::CopyConfig { .. }
            | Operation::DeleteConfig { .. }
            | Operation::Lock { .. }
            | Operation::Unlock { .. } => RpcClass::DatastoreWrite,
            Operation::KillSession { .. } | Operation::CloseSession => RpcClass::Session,
            Operation::Unknown(_) => RpcClass::Unknown,
        }
    }

    /// Datastores named by the operation, sources first.
    pub fn datastores(&self) -> Vec<Datastore> {
        match self {
            Operation::GetConfig { source, .. } => vec![*source],
            Operation::EditConfig(edit) => vec![edit.target],
            Operation::CopyConfig { source, target, .. } => vec![*source, *target],
            Operation::DeleteConfig { target }
            | Operation::Lock { target }
            | Operation::Unlock { target } => vec![*target],
            Operation::Get { .. }
            | Operation::KillSession { .. }
            | Operation::CloseSession
            | Operation::Unknown(_) => Vec::new(),
        }
    }

    /// Builds the operation element, rejecting structurally invalid requests.
    pub fn encode(&self) -> CodecResult<Element> {
        match self {
            Operation::Get { filter } => Ok(get(filter.as_ref())),
            Operation::GetConfig { source, filter } => get_config(*source, filter.as_ref()),
            Operation::EditConfig(edit) => edit_config(edit),
            Operation::CopyConfig {
                source,
                target,
                data,
            } => copy_config(*source, *target, data.as_ref()),
            Operation::DeleteConfig { target } => delete_config(*target),
            Operation::Lock { target } => lock(*target),
            Operation::Unlock { target } => unlock(*target),
            Operation::KillSession { session_id } => kill_session(session_id),
            Operation::CloseSession => Ok(close_session()),
            Operation::Unknown(element) => Ok(element.clone()),
        }
    }
}

pub fn get(filter: Option<&Filter>) -> Element {
    Element::new("get").with_optional_child(filter.map(Filter::build))
}

pub fn get_config(source: Datastore, filter: Option<&Filter>) -> CodecResult<Element> {
    Ok(Element::new("get-config")
        .with_child(datastore_element("source", source, "get-config")?)
        .with_optional_child(filter.map(Filter::build)))
}

pub fn edit_config(edit: &EditConfig) -> CodecResult<Element> {
    if edit.config.is_empty() {
        return Err(CodecError::invalid(
            "invalid configuration data for <edit-config>",
        ));
    }
    let target = datastore_element("target", edit.target, "edit-config")?;
    Ok(Element::new("edit-config")
        .with_child(target)
        .with_optional_child(
            edit.default_operation
                .map(|op| Element::new("default-operation").with_text(op.as_str())),
        )
        .with_optional_child(
            edit.error_option
                .map(|opt| Element::new("error-option").with_text(opt.as_str())),
        )
        .with_child(Element::new("config").with_content(edit.config.clone())))
}

pub fn copy_config(
    source: Datastore,
    target: Datastore,
    data: Option<&Fragment>,
) -> CodecResult<Element> {
    if source == target {
        return Err(CodecError::invalid(
            "<copy-config>'s source and target parameters identify the same datastore",
        ));
    }
    let target = datastore_element("target", target, "copy-config")?;
    let source = match (source, data) {
        (Datastore::None, Some(data)) if !data.is_empty() => Element::new("source")
            .with_child(Element::new("config").with_content(data.clone())),
        (Datastore::None, _) => {
            return Err(CodecError::invalid(
                "missing source configuration data for <copy-config>",
            ))
        }
        (source, None) => datastore_element("source", source, "copy-config")?,
        (_, Some(_)) => {
            return Err(CodecError::invalid(
                "inline configuration data given together with a source datastore for <copy-config>",
            ))
        }
    };
    Ok(Element::new("copy-config")
        .with_child(source)
        .with_child(target))
}

pub fn delete_config(target: Datastore) -> CodecResult<Element> {
    if target == Datastore::Running {
        return Err(CodecError::invalid("running datastore cannot be deleted"));
    }
    Ok(Element::new("delete-config").with_child(datastore_element(
        "target",
        target,
        "delete-config",
    )?))
}

pub fn lock(target: Datastore) -> CodecResult<Element> {
    Ok(Element::new("lock").with_child(datastore_element("target", target, "lock")?))
}

pub fn unlock(target: Datastore) -> CodecResult<Element> {
    Ok(Element::new("unlock").with_child(datastore_element("target", target, "unlock")?))
}

pub fn kill_session(session_id: &str) -> CodecResult<Element> {
    if session_id.trim().is_empty() {
        return Err(CodecError::invalid(
            "invalid session id for <kill-session> rpc message specified",
        ));
    }
    Ok(Element::new("kill-session").with_child(Element::new("session-id").with_text(session_id)))
}

pub fn close_session() -> Element {
    Element::new("close-session")
}

/// `<source>`/`<target>` wrapper around a named datastore.
fn datastore_element(wrapper: &str, datastore: Datastore, operation: &str) -> CodecResult<Element> {
    match datastore.element_name() {
        Some(name) => Ok(Element::new(wrapper).with_child(Element::new(name))),
        None => Err(CodecError::invalid(format!(
            "unknown {} datastore for <{}>",
            wrapper, operation
        ))),
    }
}
