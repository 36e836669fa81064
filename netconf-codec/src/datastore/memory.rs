use super::{BackendError, DatastoreBackend};
use crate::document::Fragment;
use crate::filter::Filter;
use crate::operation::Datastore;
use crate::rpc_error::NcError;
use crate::session::SessionId;
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Datastores held in memory.
///
/// The running datastore always exists; startup and candidate exist only
/// when seeded with [`MemoryBackend::with_datastore`].
pub struct MemoryBackend {
    kind: String,
    model_path: Option<PathBuf>,
    datastores: Mutex<HashMap<Datastore, Fragment>>,
    locks: Mutex<HashMap<Datastore, SessionId>>,
    initialized: AtomicBool,
}

impl MemoryBackend {
    pub fn new(kind: impl Into<String>) -> MemoryBackend {
        let mut datastores = HashMap::new();
        datastores.insert(Datastore::Running, Fragment::new());
        MemoryBackend {
            kind: kind.into(),
            model_path: None,
            datastores: Mutex::new(datastores),
            locks: Mutex::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// The model file must exist when the backend is initialized.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> MemoryBackend {
        self.model_path = Some(path.into());
        self
    }

    pub fn with_datastore(self, datastore: Datastore, content: Fragment) -> MemoryBackend {
        self.set_config(datastore, content);
        self
    }

    /// Replaces the whole content of `datastore`.
    pub fn set_config(&self, datastore: Datastore, content: Fragment) {
        if datastore == Datastore::None {
            return;
        }
        self.datastores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(datastore, content);
    }

    fn ensure_ready(&self, datastore: Datastore) -> Result<(), NcError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(NcError::operation_failed(format!(
                "{} backend is not initialized",
                self.kind
            )));
        }
        let datastores = self
            .datastores
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !datastores.contains_key(&datastore) {
            return Err(NcError::invalid_value(format!(
                "{} datastore is not available",
                datastore
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DatastoreBackend for MemoryBackend {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        if let Some(path) = &self.model_path {
            if !path.exists() {
                return Err(BackendError::Initialize {
                    kind: self.kind.clone(),
                    reason: format!("model {} does not exist", path.display()),
                });
            }
        }
        self.initialized.store(true, Ordering::Release);
        info!("{} backend initialized", self.kind);
        Ok(())
    }

    async fn shutdown(&self) {
        self.initialized.store(false, Ordering::Release);
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!("{} backend shut down", self.kind);
    }

    async fn lock(&self, session_id: &SessionId, target: Datastore) -> Result<(), NcError> {
        self.ensure_ready(target)?;
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        match locks.get(&target) {
            Some(holder) if holder != session_id => Err(NcError::lock_denied(holder)),
            Some(_) => Ok(()),
            None => {
                debug!("{}: session {} locked {}", self.kind, session_id, target);
                locks.insert(target, session_id.clone());
                Ok(())
            }
        }
    }

    async fn unlock(&self, session_id: &SessionId, target: Datastore) -> Result<(), NcError> {
        self.ensure_ready(target)?;
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        match locks.get(&target) {
            None => Err(NcError::operation_failed(format!(
                "{} datastore is not locked",
                target
            ))),
            Some(holder) if holder != session_id => Err(NcError::lock_denied(holder)),
            Some(_) => {
                debug!("{}: session {} unlocked {}", self.kind, session_id, target);
                locks.remove(&target);
                Ok(())
            }
        }
    }

    async fn get_config(
        &self,
        _session_id: &SessionId,
        source: Datastore,
        filter: Option<&Filter>,
    ) -> Result<Fragment, NcError> {
        self.ensure_ready(source)?;
        let datastores = self
            .datastores
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let content = datastores.get(&source).cloned().unwrap_or_default();
        Ok(match filter {
            None => content,
            Some(filter) => select(&content, filter),
        })
    }
}

/// Keeps the top-level elements whose name appears at the top of the filter.
fn select(content: &Fragment, filter: &Filter) -> Fragment {
    let wanted: Vec<&str> = filter.content().elements().map(|e| e.local_name()).collect();
    Fragment::from_elements(
        content
            .elements()
            .filter(|element| wanted.contains(&element.local_name()))
            .cloned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc_error::ErrorTag;
    use pretty_assertions::assert_eq;

    fn running() -> Fragment {
        Fragment::parse("<users><user>fred</user></users><interfaces/><system/>").unwrap()
    }

    async fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new("memory").with_datastore(Datastore::Running, running());
        backend.initialize().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_get_config_without_filter() {
        let backend = backend().await;
        let data = backend
            .get_config(&SessionId::from("1"), Datastore::Running, None)
            .await
            .unwrap();
        assert_eq!(data, running());
    }

    #[tokio::test]
    async fn test_get_config_with_filter() {
        let backend = backend().await;
        let filter = Filter::subtree("<system/><users/>").unwrap();
        let data = backend
            .get_config(&SessionId::from("1"), Datastore::Running, Some(&filter))
            .await
            .unwrap();
        assert_eq!(
            data,
            Fragment::parse("<users><user>fred</user></users><system/>").unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_config_filter_matches_nothing() {
        let backend = backend().await;
        let filter = Filter::subtree("<routing/>").unwrap();
        let data = backend
            .get_config(&SessionId::from("1"), Datastore::Running, Some(&filter))
            .await
            .unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_missing_datastore() {
        let backend = backend().await;
        let err = backend
            .lock(&SessionId::from("1"), Datastore::Candidate)
            .await
            .unwrap_err();
        assert_eq!(err.tag, ErrorTag::InvalidValue);
    }

    #[tokio::test]
    async fn test_not_initialized() {
        let backend = MemoryBackend::new("memory");
        let err = backend
            .lock(&SessionId::from("1"), Datastore::Running)
            .await
            .unwrap_err();
        assert_eq!(err.tag, ErrorTag::OperationFailed);
    }

    #[tokio::test]
    async fn test_lock_bookkeeping() {
        let backend = backend().await;
        let a = SessionId::from("1");
        let b = SessionId::from("2");
        backend.lock(&a, Datastore::Running).await.unwrap();
        let err = backend.lock(&b, Datastore::Running).await.unwrap_err();
        assert_eq!(err.tag, ErrorTag::LockDenied);
        assert_eq!(err.info.session_id.as_deref(), Some("1"));
        backend.unlock(&a, Datastore::Running).await.unwrap();
        let err = backend.unlock(&a, Datastore::Running).await.unwrap_err();
        assert_eq!(err.tag, ErrorTag::OperationFailed);
    }

    #[tokio::test]
    async fn test_initialize_requires_model() {
        let backend = MemoryBackend::new("memory").with_model_path("/nonexistent/model.yang");
        assert_eq!(
            backend.model_path(),
            Some(Path::new("/nonexistent/model.yang"))
        );
        let err = backend.initialize().await.unwrap_err();
        assert!(matches!(err, BackendError::Initialize { .. }));
        let err = NcError::from(err);
        assert_eq!(err.tag, ErrorTag::OperationFailed);
        assert!(err.message.contains("/nonexistent/model.yang"));
    }
}
