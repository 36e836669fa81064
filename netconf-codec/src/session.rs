use crate::capability::CapabilitySet;
use core::fmt;
use core::fmt::Display;

/// Session identity as carried in `<session-id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> SessionId {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        SessionId(id.to_string())
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        SessionId(id.to_string())
    }
}

/// Per-session context handed to every call that acts on behalf of a peer.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    capabilities: CapabilitySet,
}

impl Session {
    pub fn new(id: impl Into<SessionId>, capabilities: CapabilitySet) -> Session {
        Session {
            id: id.into(),
            capabilities,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Capabilities negotiated with the peer.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }
}
