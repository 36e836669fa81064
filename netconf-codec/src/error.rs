use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("malformed filter: {0}")]
    MalformedFilter(String),
    #[error("malformed rpc-error: {0}")]
    MalformedError(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("capability {} is not supported by the peer", capability)]
    UnsupportedCapability { capability: String },
    #[error("unknown datastore {}, (expected {:?})", unknown, expected)]
    UnknownDatastore {
        expected: Vec<String>,
        unknown: String,
    },
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    SerializingFailure(#[from] quick_xml::DeError),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl CodecError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CodecError::InvalidParameter(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        CodecError::MalformedDocument(msg.into())
    }
}
