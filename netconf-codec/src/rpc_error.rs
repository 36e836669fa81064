//! `<rpc-error>` content, see [RFC6241 4.3](https://www.rfc-editor.org/rfc/rfc6241.html#section-4.3).
use crate::document::Element;
use crate::error::{CodecError, CodecResult};
use crate::session::SessionId;
use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }
}

impl FromStr for ErrorType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transport" => Ok(ErrorType::Transport),
            "rpc" => Ok(ErrorType::Rpc),
            "protocol" => Ok(ErrorType::Protocol),
            "application" => Ok(ErrorType::Application),
            _ => Err(CodecError::MalformedError(format!(
                "unknown error-type '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorSeverity {
    #[default]
    Error,
    Warning,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Error => "error",
            ErrorSeverity::Warning => "warning",
        }
    }
}

impl FromStr for ErrorSeverity {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(ErrorSeverity::Error),
            "warning" => Ok(ErrorSeverity::Warning),
            _ => Err(CodecError::MalformedError(format!(
                "unknown error-severity '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    InUse,
    InvalidValue,
    TooBig,
    MissingAttribute,
    BadAttribute,
    UnknownAttribute,
    MissingElement,
    BadElement,
    UnknownElement,
    UnknownNamespace,
    AccessDenied,
    LockDenied,
    ResourceDenied,
    RollbackFailed,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
    PartialOperation,
    MalformedMessage,
}

const ERROR_TAGS: [ErrorTag; 20] = [
    ErrorTag::InUse,
    ErrorTag::InvalidValue,
    ErrorTag::TooBig,
    ErrorTag::MissingAttribute,
    ErrorTag::BadAttribute,
    ErrorTag::UnknownAttribute,
    ErrorTag::MissingElement,
    ErrorTag::BadElement,
    ErrorTag::UnknownElement,
    ErrorTag::UnknownNamespace,
    ErrorTag::AccessDenied,
    ErrorTag::LockDenied,
    ErrorTag::ResourceDenied,
    ErrorTag::RollbackFailed,
    ErrorTag::DataExists,
    ErrorTag::DataMissing,
    ErrorTag::OperationNotSupported,
    ErrorTag::OperationFailed,
    ErrorTag::PartialOperation,
    ErrorTag::MalformedMessage,
];

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::InUse => "in-use",
            ErrorTag::InvalidValue => "invalid-value",
            ErrorTag::TooBig => "too-big",
            ErrorTag::MissingAttribute => "missing-attribute",
            ErrorTag::BadAttribute => "bad-attribute",
            ErrorTag::UnknownAttribute => "unknown-attribute",
            ErrorTag::MissingElement => "missing-element",
            ErrorTag::BadElement => "bad-element",
            ErrorTag::UnknownElement => "unknown-element",
            ErrorTag::UnknownNamespace => "unknown-namespace",
            ErrorTag::AccessDenied => "access-denied",
            ErrorTag::LockDenied => "lock-denied",
            ErrorTag::ResourceDenied => "resource-denied",
            ErrorTag::RollbackFailed => "rollback-failed",
            ErrorTag::DataExists => "data-exists",
            ErrorTag::DataMissing => "data-missing",
            ErrorTag::OperationNotSupported => "operation-not-supported",
            ErrorTag::OperationFailed => "operation-failed",
            ErrorTag::PartialOperation => "partial-operation",
            ErrorTag::MalformedMessage => "malformed-message",
        }
    }

    fn default_type(&self) -> ErrorType {
        match self {
            ErrorTag::MissingAttribute
            | ErrorTag::BadAttribute
            | ErrorTag::UnknownAttribute
            | ErrorTag::MalformedMessage => ErrorType::Rpc,
            ErrorTag::TooBig
            | ErrorTag::DataExists
            | ErrorTag::DataMissing
            | ErrorTag::OperationFailed
            | ErrorTag::PartialOperation => ErrorType::Application,
            _ => ErrorType::Protocol,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            ErrorTag::InUse => "The request requires a resource that already is in use.",
            ErrorTag::InvalidValue => {
                "The request specifies an unacceptable value for one or more parameters."
            }
            ErrorTag::TooBig => {
                "The request or response (that would be generated) is too large for the implementation to handle."
            }
            ErrorTag::MissingAttribute => "An expected attribute is missing.",
            ErrorTag::BadAttribute => "An attribute value is not correct.",
            ErrorTag::UnknownAttribute => "An unexpected attribute is present.",
            ErrorTag::MissingElement => "An expected element is missing.",
            ErrorTag::BadElement => "An element value is not correct.",
            ErrorTag::UnknownElement => "An unexpected element is present.",
            ErrorTag::UnknownNamespace => "An unexpected namespace is present.",
            ErrorTag::AccessDenied => {
                "Access to the requested protocol operation or data model is denied because authorization failed."
            }
            ErrorTag::LockDenied => {
                "Access to the requested lock is denied because the lock is currently held by another entity."
            }
            ErrorTag::ResourceDenied => {
                "Request could not be completed because of insufficient resources."
            }
            ErrorTag::RollbackFailed => {
                "Request to roll back some configuration change was not completed."
            }
            ErrorTag::DataExists => {
                "Request could not be completed because the relevant data model content already exists."
            }
            ErrorTag::DataMissing => {
                "Request could not be completed because the relevant data model content does not exist."
            }
            ErrorTag::OperationNotSupported => {
                "Request could not be completed because the requested operation is not supported by this implementation."
            }
            ErrorTag::OperationFailed => {
                "Request could not be completed because the requested operation failed for some reason not covered by any other error condition."
            }
            ErrorTag::PartialOperation => "Some part of the requested operation failed or was not attempted.",
            ErrorTag::MalformedMessage => {
                "A message could not be handled because it failed to be parsed correctly."
            }
        }
    }
}

impl FromStr for ErrorTag {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ERROR_TAGS
            .iter()
            .find(|tag| tag.as_str() == s)
            .copied()
            .ok_or_else(|| CodecError::MalformedError(format!("unknown error-tag '{}'", s)))
    }
}

/// Optional `<error-info>` items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    pub bad_attribute: Option<String>,
    pub bad_element: Option<String>,
    pub bad_namespace: Option<String>,
    pub session_id: Option<String>,
}

impl ErrorInfo {
    pub fn is_empty(&self) -> bool {
        self.bad_attribute.is_none()
            && self.bad_element.is_none()
            && self.bad_namespace.is_none()
            && self.session_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcError {
    pub error_type: ErrorType,
    pub tag: ErrorTag,
    pub severity: ErrorSeverity,
    pub app_tag: Option<String>,
    pub path: Option<String>,
    pub message: String,
    pub info: ErrorInfo,
}

impl NcError {
    /// Error with the default type, severity and message for `tag`.
    pub fn new(tag: ErrorTag) -> NcError {
        NcError {
            error_type: tag.default_type(),
            tag,
            severity: ErrorSeverity::Error,
            app_tag: None,
            path: None,
            message: tag.default_message().to_string(),
            info: ErrorInfo::default(),
        }
    }

    pub fn with_type(mut self, error_type: ErrorType) -> NcError {
        self.error_type = error_type;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> NcError {
        self.message = message.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> NcError {
        self.path = Some(path.into());
        self
    }

    pub fn with_app_tag(mut self, app_tag: impl Into<String>) -> NcError {
        self.app_tag = Some(app_tag.into());
        self
    }

    pub fn lock_denied(holder: &SessionId) -> NcError {
        let mut err = NcError::new(ErrorTag::LockDenied);
        err.info.session_id = Some(holder.to_string());
        err
    }

    pub fn operation_failed(detail: impl Into<String>) -> NcError {
        NcError::new(ErrorTag::OperationFailed).with_message(detail)
    }

    pub fn operation_not_supported() -> NcError {
        NcError::new(ErrorTag::OperationNotSupported)
    }

    pub fn invalid_value(message: impl Into<String>) -> NcError {
        NcError::new(ErrorTag::InvalidValue).with_message(message)
    }

    pub fn missing_element(element: &str) -> NcError {
        let mut err = NcError::new(ErrorTag::MissingElement);
        err.info.bad_element = Some(element.to_string());
        err
    }

    /// Emits the `<rpc-error>` element; children always come in the order
    /// type, tag, severity, app-tag, path, message, info.
    pub fn to_element(&self) -> Element {
        Element::new("rpc-error")
            .with_child(Element::new("error-type").with_text(self.error_type.as_str()))
            .with_child(Element::new("error-tag").with_text(self.tag.as_str()))
            .with_child(Element::new("error-severity").with_text(self.severity.as_str()))
            .with_optional_child(optional_text("error-app-tag", &self.app_tag))
            .with_optional_child(optional_text("error-path", &self.path))
            .with_optional_child(
                (!self.message.is_empty())
                    .then(|| Element::new("error-message").with_text(self.message.as_str())),
            )
            .with_optional_child(self.info_element())
    }

    fn info_element(&self) -> Option<Element> {
        if self.info.is_empty() {
            return None;
        }
        Some(
            Element::new("error-info")
                .with_optional_child(optional_text("bad-attribute", &self.info.bad_attribute))
                .with_optional_child(optional_text("bad-element", &self.info.bad_element))
                .with_optional_child(optional_text("bad-namespace", &self.info.bad_namespace))
                .with_optional_child(optional_text("session-id", &self.info.session_id)),
        )
    }

    /// Reads an `<rpc-error>` element. `error-type` and `error-tag` are mandatory.
    pub fn from_element(element: &Element) -> CodecResult<NcError> {
        let error_type = required_text(element, "error-type")?.parse::<ErrorType>()?;
        let tag = required_text(element, "error-tag")?.parse::<ErrorTag>()?;
        let severity = match element.child("error-severity") {
            Some(severity) => severity.token().parse::<ErrorSeverity>()?,
            None => ErrorSeverity::Error,
        };
        let info = match element.child("error-info") {
            Some(info) => ErrorInfo {
                bad_attribute: info.child("bad-attribute").map(Element::token),
                bad_element: info.child("bad-element").map(Element::token),
                bad_namespace: info.child("bad-namespace").map(Element::token),
                session_id: info.child("session-id").map(Element::token),
            },
            None => ErrorInfo::default(),
        };
        if info.is_empty() && element.child("error-info").is_some() {
            warn!("Ignoring unrecognized <error-info> content");
        }
        Ok(NcError {
            error_type,
            tag,
            severity,
            app_tag: element.child("error-app-tag").map(Element::token),
            path: element.child("error-path").map(Element::text),
            message: element
                .child("error-message")
                .map(Element::text)
                .unwrap_or_default(),
            info,
        })
    }
}

impl Display for NcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}): {}",
            self.error_type.as_str(),
            self.tag.as_str(),
            self.severity.as_str(),
            self.message
        )?;
        if let Some(session_id) = &self.info.session_id {
            write!(f, " [session-id {}]", session_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for NcError {}

fn optional_text(name: &str, value: &Option<String>) -> Option<Element> {
    value
        .as_ref()
        .map(|value| Element::new(name).with_text(value.as_str()))
}

fn required_text(element: &Element, name: &str) -> CodecResult<String> {
    element
        .child(name)
        .map(Element::token)
        .ok_or_else(|| CodecError::MalformedError(format!("missing <{}>", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fragment;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixed_child_order() {
        let mut err = NcError::new(ErrorTag::BadElement)
            .with_message("Element is not valid in the specified context.")
            .with_path("/rpc/edit-config/target")
            .with_app_tag("too-many");
        err.info.bad_element = Some("startu".to_string());
        err.info.session_id = Some("4".to_string());

        let expected = r#"
<rpc-error>
  <error-type>protocol</error-type>
  <error-tag>bad-element</error-tag>
  <error-severity>error</error-severity>
  <error-app-tag>too-many</error-app-tag>
  <error-path>/rpc/edit-config/target</error-path>
  <error-message>Element is not valid in the specified context.</error-message>
  <error-info>
    <bad-element>startu</bad-element>
    <session-id>4</session-id>
  </error-info>
</rpc-error>
"#;
        let text = Fragment::from(err.to_element()).to_text().unwrap();
        assert_eq!(text, expected.trim());
    }

    #[test]
    fn test_element_roundtrip() {
        let err = NcError::lock_denied(&SessionId::from("17"))
            .with_type(ErrorType::Application)
            .with_message("datastore is locked");
        assert_eq!(NcError::from_element(&err.to_element()).unwrap(), err);
    }

    #[test]
    fn test_no_error_info_when_empty() {
        let element = NcError::operation_failed("disk full").to_element();
        assert!(element.child("error-info").is_none());
        assert_eq!(element.child("error-message").unwrap().text(), "disk full");
    }

    #[test]
    fn test_missing_mandatory_elements() {
        let no_tag = Element::new("rpc-error")
            .with_child(Element::new("error-type").with_text("rpc"));
        assert!(matches!(
            NcError::from_element(&no_tag),
            Err(CodecError::MalformedError(_))
        ));

        let no_type = Element::new("rpc-error")
            .with_child(Element::new("error-tag").with_text("in-use"));
        assert!(matches!(
            NcError::from_element(&no_type),
            Err(CodecError::MalformedError(_))
        ));
    }

    #[test]
    fn test_unknown_tag_is_malformed() {
        let element = Element::new("rpc-error")
            .with_child(Element::new("error-type").with_text("rpc"))
            .with_child(Element::new("error-tag").with_text("no-such-tag"));
        assert!(matches!(
            NcError::from_element(&element),
            Err(CodecError::MalformedError(_))
        ));
    }

    #[test]
    fn test_severity_defaults_to_error() {
        let element = Element::new("rpc-error")
            .with_child(Element::new("error-type").with_text("protocol"))
            .with_child(Element::new("error-tag").with_text("in-use"))
            .with_child(Element::new("error-severity").with_text("warning"));
        assert_eq!(
            NcError::from_element(&element).unwrap().severity,
            ErrorSeverity::Warning
        );

        let element = Element::new("rpc-error")
            .with_child(Element::new("error-type").with_text("protocol"))
            .with_child(Element::new("error-tag").with_text("in-use"));
        let err = NcError::from_element(&element).unwrap();
        assert_eq!(err.severity, ErrorSeverity::Error);
        assert_eq!(err.message, "");
    }

    #[test]
    fn test_tag_strings() {
        for tag in ERROR_TAGS {
            assert_eq!(tag.as_str().parse::<ErrorTag>().unwrap(), tag);
        }
    }
}
