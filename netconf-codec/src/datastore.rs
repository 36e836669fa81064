//! Datastore backends and the lock gateway in front of them.
use crate::document::Fragment;
use crate::filter::Filter;
use crate::operation::Datastore;
use crate::rpc_error::NcError;
use crate::session::SessionId;
use async_trait::async_trait;
use core::fmt;
use core::fmt::Display;
use std::path::Path;
use thiserror::Error;

mod gateway;
mod memory;

pub use gateway::{GatewayError, GatewayResult, LockGateway};
pub use memory::MemoryBackend;

/// Process-unique identity of a registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(u64);

impl BackendId {
    pub(crate) fn new(id: u64) -> BackendId {
        BackendId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{kind} backend failed to initialize: {reason}")]
    Initialize { kind: String, reason: String },
}

impl From<BackendError> for NcError {
    fn from(err: BackendError) -> Self {
        NcError::operation_failed(err.to_string())
    }
}

/// Storage collaborator owning one kind of datastore.
///
/// Implementations keep their own state behind `&self`; the gateway shares
/// one instance between every session.
#[async_trait]
pub trait DatastoreBackend: Send + Sync {
    /// Name of the datastore kind, unique within a gateway.
    fn kind(&self) -> &str;

    /// Data model the backend was built from, if any.
    fn model_path(&self) -> Option<&Path> {
        None
    }

    async fn initialize(&self) -> Result<(), BackendError>;
    async fn shutdown(&self);
    async fn lock(&self, session_id: &SessionId, target: Datastore) -> Result<(), NcError>;
    async fn unlock(&self, session_id: &SessionId, target: Datastore) -> Result<(), NcError>;
    async fn get_config(
        &self,
        session_id: &SessionId,
        source: Datastore,
        filter: Option<&Filter>,
    ) -> Result<Fragment, NcError>;
}
