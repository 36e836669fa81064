use super::{BackendError, BackendId, DatastoreBackend};
use crate::document::Fragment;
use crate::filter::Filter;
use crate::message::{Outcome, Rpc, RpcReply};
use crate::operation::{Datastore, Operation};
use crate::rpc_error::{ErrorTag, NcError};
use crate::session::{Session, SessionId};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

static NEXT_BACKEND_ID: AtomicU64 = AtomicU64::new(1);

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no backend registered with id {0}")]
    UnknownBackend(BackendId),
    #[error("a {kind} backend is already registered")]
    DuplicateBackend { kind: String },
    #[error("{operation} needs a named target datastore")]
    InvalidTarget { operation: &'static str },
    #[error("lock is already held by session {holder}")]
    AlreadyLocked { holder: SessionId },
    #[error("datastore is not locked")]
    NotLocked,
    #[error("lock is owned by session {holder}")]
    LockOwnedByOther { holder: SessionId },
    #[error("a lock request of session {0} is still pending")]
    LockPending(SessionId),
    #[error("session {0} was released while its lock was pending")]
    SessionReleased(SessionId),
    #[error("backend failed to initialize: {0}")]
    Initialize(#[from] BackendError),
    #[error("backend error: {0}")]
    Backend(NcError),
}

impl From<GatewayError> for NcError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::AlreadyLocked { holder } => NcError::lock_denied(&holder),
            GatewayError::LockOwnedByOther { holder } => NcError::lock_denied(&holder)
                .with_message(format!("Unlock failed, lock is held by session {}", holder)),
            GatewayError::LockPending(session) => NcError::new(ErrorTag::InUse).with_message(
                format!("Lock failed, a lock request of session {} is pending", session),
            ),
            GatewayError::NotLocked => {
                NcError::operation_failed("Unlock failed, datastore is not locked")
            }
            GatewayError::InvalidTarget { .. } => NcError::missing_element("target"),
            GatewayError::Initialize(err) => NcError::from(err),
            GatewayError::Backend(err) => err,
            other => NcError::operation_failed(other.to_string()),
        }
    }
}

type LockKey = (BackendId, Datastore);

/// State of one lock record. `Reserved` and `Releasing` mark a backend call
/// in flight; the table lock is not held while it runs. `Abandoned` is a
/// reservation whose session terminated before the backend answered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Reserved(SessionId),
    Held(SessionId),
    Releasing(SessionId),
    Abandoned(SessionId),
}

impl Slot {
    fn session(&self) -> &SessionId {
        match self {
            Slot::Reserved(session)
            | Slot::Held(session)
            | Slot::Releasing(session)
            | Slot::Abandoned(session) => session,
        }
    }
}

type LockTable = Mutex<HashMap<LockKey, Slot>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Acquire,
    Release,
}

/// Pending slot change. Dropping it without [`Reservation::commit`] rolls the
/// slot back, which covers backend failures as well as a caller dropping the
/// future (e.g. on timeout).
struct Reservation<'a> {
    table: &'a LockTable,
    key: LockKey,
    session: SessionId,
    transition: Transition,
    settled: bool,
}

impl<'a> Reservation<'a> {
    /// Makes the change permanent. An acquisition abandoned by
    /// [`LockGateway::release_session`] is handed back unsettled; dropping it
    /// clears the slot.
    fn commit(mut self) -> Result<(), Reservation<'a>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        match self.transition {
            Transition::Acquire => match table.get(&self.key) {
                Some(Slot::Reserved(session)) if *session == self.session => {
                    table.insert(self.key, Slot::Held(self.session.clone()));
                }
                Some(Slot::Abandoned(session)) if *session == self.session => {
                    drop(table);
                    return Err(self);
                }
                _ => {}
            },
            Transition::Release => {
                if table.get(&self.key) == Some(&Slot::Releasing(self.session.clone())) {
                    table.remove(&self.key);
                }
            }
        }
        self.settled = true;
        Ok(())
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        match self.transition {
            Transition::Acquire => match table.get(&self.key) {
                Some(Slot::Reserved(session)) | Some(Slot::Abandoned(session))
                    if *session == self.session =>
                {
                    table.remove(&self.key);
                }
                _ => {}
            },
            Transition::Release => {
                if table.get(&self.key) == Some(&Slot::Releasing(self.session.clone())) {
                    table.insert(self.key, Slot::Held(self.session.clone()));
                }
            }
        }
        debug!(
            "Rolled back {:?} of {} on backend {} for session {}",
            self.transition, self.key.1, self.key.0, self.session
        );
    }
}

/// Mediates datastore locks between sessions and registered backends.
///
/// A lock record is only written once the backend accepted the request, so
/// the table and the backends never disagree about who holds a datastore.
#[derive(Default)]
pub struct LockGateway {
    backends: RwLock<HashMap<BackendId, Arc<dyn DatastoreBackend>>>,
    locks: LockTable,
}

impl LockGateway {
    pub fn new() -> LockGateway {
        LockGateway::default()
    }

    /// Initializes `backend` and makes it reachable under a fresh id.
    pub async fn register<B>(&self, backend: B) -> GatewayResult<BackendId>
    where
        B: DatastoreBackend + 'static,
    {
        let backend: Arc<dyn DatastoreBackend> = Arc::new(backend);
        self.ensure_unique_kind(backend.kind())?;
        backend.initialize().await?;

        let id = BackendId::new(NEXT_BACKEND_ID.fetch_add(1, Ordering::Relaxed));
        let duplicate = {
            let mut backends = self
                .backends
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if backends.values().any(|other| other.kind() == backend.kind()) {
                true
            } else {
                backends.insert(id, backend.clone());
                false
            }
        };
        if duplicate {
            backend.shutdown().await;
            return Err(GatewayError::DuplicateBackend {
                kind: backend.kind().to_string(),
            });
        }
        info!("Registered {} backend with id {}", backend.kind(), id);
        Ok(id)
    }

    /// Removes the backend, drops its lock records and shuts it down.
    pub async fn unregister(&self, backend_id: BackendId) -> GatewayResult<()> {
        let backend = self
            .backends
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&backend_id)
            .ok_or(GatewayError::UnknownBackend(backend_id))?;
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _), _| *id != backend_id);
        backend.shutdown().await;
        info!("Unregistered {} backend {}", backend.kind(), backend_id);
        Ok(())
    }

    /// Shuts every backend down and forgets every lock.
    pub async fn shutdown(&self) {
        let backends: Vec<_> = self
            .backends
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, backend)| backend)
            .collect();
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        for backend in backends {
            backend.shutdown().await;
        }
    }

    pub async fn lock(
        &self,
        backend_id: BackendId,
        session_id: &SessionId,
        target: Datastore,
    ) -> GatewayResult<()> {
        let backend = self.backend(backend_id)?;
        if target == Datastore::None {
            return Err(GatewayError::InvalidTarget { operation: "lock" });
        }
        let key = (backend_id, target);
        let reservation = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            match table.get(&key) {
                Some(Slot::Held(holder)) if holder == session_id => {
                    debug!("Session {} already holds {}", session_id, target);
                    return Ok(());
                }
                Some(slot) if slot.session() == session_id => {
                    return Err(GatewayError::LockPending(session_id.clone()))
                }
                Some(slot) => {
                    return Err(GatewayError::AlreadyLocked {
                        holder: slot.session().clone(),
                    })
                }
                None => {
                    table.insert(key, Slot::Reserved(session_id.clone()));
                    Reservation {
                        table: &self.locks,
                        key,
                        session: session_id.clone(),
                        transition: Transition::Acquire,
                        settled: false,
                    }
                }
            }
        };

        backend
            .lock(session_id, target)
            .await
            .map_err(GatewayError::Backend)?;
        if let Err(abandoned) = reservation.commit() {
            if let Err(err) = backend.unlock(session_id, target).await {
                warn!(
                    "Backend {} refused to release {} for released session {}: {}",
                    backend_id, target, session_id, err
                );
            }
            drop(abandoned);
            return Err(GatewayError::SessionReleased(session_id.clone()));
        }
        debug!(
            "Session {} locked {} on backend {}",
            session_id, target, backend_id
        );
        Ok(())
    }

    pub async fn unlock(
        &self,
        backend_id: BackendId,
        session_id: &SessionId,
        target: Datastore,
    ) -> GatewayResult<()> {
        let backend = self.backend(backend_id)?;
        if target == Datastore::None {
            return Err(GatewayError::InvalidTarget {
                operation: "unlock",
            });
        }
        let key = (backend_id, target);
        let reservation = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            match table.get(&key) {
                None => return Err(GatewayError::NotLocked),
                Some(Slot::Held(holder)) if holder == session_id => {
                    table.insert(key, Slot::Releasing(session_id.clone()));
                    Reservation {
                        table: &self.locks,
                        key,
                        session: session_id.clone(),
                        transition: Transition::Release,
                        settled: false,
                    }
                }
                // the session's own lock or unlock is still in flight
                Some(slot) if slot.session() == session_id => {
                    return Err(GatewayError::NotLocked)
                }
                Some(slot) => {
                    return Err(GatewayError::LockOwnedByOther {
                        holder: slot.session().clone(),
                    })
                }
            }
        };

        backend
            .unlock(session_id, target)
            .await
            .map_err(GatewayError::Backend)?;
        reservation
            .commit()
            .map_err(|_| GatewayError::SessionReleased(session_id.clone()))?;
        debug!(
            "Session {} unlocked {} on backend {}",
            session_id, target, backend_id
        );
        Ok(())
    }

    /// Reads need no lock; the request goes straight to the backend.
    pub async fn get_config(
        &self,
        backend_id: BackendId,
        session_id: &SessionId,
        source: Datastore,
        filter: Option<&Filter>,
    ) -> GatewayResult<Fragment> {
        let backend = self.backend(backend_id)?;
        if source == Datastore::None {
            return Err(GatewayError::InvalidTarget {
                operation: "get-config",
            });
        }
        backend
            .get_config(session_id, source, filter)
            .await
            .map_err(GatewayError::Backend)
    }

    /// Releases every lock held by a terminated session and returns how many
    /// were released. Records are dropped even when the backend refuses the
    /// unlock, the session being gone either way. Locks still in flight are
    /// marked abandoned and counted; the pending request undoes them once the
    /// backend answers.
    pub async fn release_session(&self, session_id: &SessionId) -> usize {
        let mut abandoned = 0;
        let held: Vec<LockKey> = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            for slot in table.values_mut() {
                if *slot == Slot::Reserved(session_id.clone()) {
                    *slot = Slot::Abandoned(session_id.clone());
                    abandoned += 1;
                }
            }
            let keys: Vec<LockKey> = table
                .iter()
                .filter(|(_, slot)| **slot == Slot::Held(session_id.clone()))
                .map(|(key, _)| *key)
                .collect();
            for key in &keys {
                table.insert(*key, Slot::Releasing(session_id.clone()));
            }
            keys
        };

        for (backend_id, target) in &held {
            let backend = self
                .backends
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(backend_id)
                .cloned();
            if let Some(backend) = backend {
                if let Err(err) = backend.unlock(session_id, *target).await {
                    warn!(
                        "Backend {} refused to release {} for session {}: {}",
                        backend_id, target, session_id, err
                    );
                }
            }
        }

        let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for key in &held {
            if table.get(key) == Some(&Slot::Releasing(session_id.clone())) {
                table.remove(key);
            }
        }
        let released = held.len() + abandoned;
        if released > 0 {
            info!("Released {} lock(s) of session {}", released, session_id);
        }
        released
    }

    /// Session currently holding `target` on the backend.
    pub fn holder(&self, backend_id: BackendId, target: Datastore) -> Option<SessionId> {
        match self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(backend_id, target))
        {
            Some(Slot::Held(holder)) | Some(Slot::Releasing(holder)) => Some(holder.clone()),
            _ => None,
        }
    }

    /// Answers one rpc on behalf of `session`. Only lock, unlock and
    /// get-config are served; any other operation is refused.
    pub async fn handle_rpc(&self, backend_id: BackendId, session: &Session, rpc: Rpc) -> RpcReply {
        let message_id = rpc.message_id().to_string();
        let operation = rpc.into_operation();
        if let Err(err) = session.capabilities().check(&operation) {
            return RpcReply::error(
                message_id,
                NcError::operation_not_supported().with_message(err.to_string()),
            );
        }
        let result = match operation {
            Operation::Lock { target } => self
                .lock(backend_id, session.id(), target)
                .await
                .map(|_| Outcome::Ok),
            Operation::Unlock { target } => self
                .unlock(backend_id, session.id(), target)
                .await
                .map(|_| Outcome::Ok),
            Operation::GetConfig { source, filter } => self
                .get_config(backend_id, session.id(), source, filter.as_ref())
                .await
                .map(Outcome::Data),
            other => {
                debug!("Refusing <{}> from session {}", other.name(), session.id());
                return RpcReply::error(message_id, NcError::operation_not_supported());
            }
        };
        match result {
            Ok(outcome) => RpcReply::new(message_id, outcome),
            Err(err) => RpcReply::error(message_id, NcError::from(err)),
        }
    }

    fn backend(&self, backend_id: BackendId) -> GatewayResult<Arc<dyn DatastoreBackend>> {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&backend_id)
            .cloned()
            .ok_or(GatewayError::UnknownBackend(backend_id))
    }

    fn ensure_unique_kind(&self, kind: &str) -> GatewayResult<()> {
        let backends = self.backends.read().unwrap_or_else(PoisonError::into_inner);
        if backends.values().any(|backend| backend.kind() == kind) {
            return Err(GatewayError::DuplicateBackend {
                kind: kind.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySet;
    use crate::datastore::MemoryBackend;
    use crate::rpc_error::{ErrorTag, ErrorType};
    use crate::NETCONF_CANDIDATE_CAP;
    use async_trait::async_trait;
    use core::time::Duration;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn memory() -> MemoryBackend {
        MemoryBackend::new("memory")
            .with_datastore(
                Datastore::Running,
                Fragment::parse("<users/><system/>").unwrap(),
            )
            .with_datastore(Datastore::Candidate, Fragment::new())
    }

    async fn gateway() -> (LockGateway, BackendId) {
        let gateway = LockGateway::new();
        let id = gateway.register(memory()).await.unwrap();
        (gateway, id)
    }

    /// Fails every lock request.
    struct FailingBackend;

    #[async_trait]
    impl DatastoreBackend for FailingBackend {
        fn kind(&self) -> &str {
            "failing"
        }

        async fn initialize(&self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn shutdown(&self) {}

        async fn lock(&self, _: &SessionId, _: Datastore) -> Result<(), NcError> {
            Err(NcError::operation_failed("disk full"))
        }

        async fn unlock(&self, _: &SessionId, _: Datastore) -> Result<(), NcError> {
            Ok(())
        }

        async fn get_config(
            &self,
            _: &SessionId,
            _: Datastore,
            _: Option<&Filter>,
        ) -> Result<Fragment, NcError> {
            Err(NcError::operation_failed("disk full"))
        }
    }

    /// Lock requests wait until released through `proceed`.
    #[derive(Default)]
    struct BlockingBackend {
        entered: Notify,
        proceed: Notify,
        locks: AtomicUsize,
        unlocks: AtomicUsize,
    }

    #[async_trait]
    impl DatastoreBackend for Arc<BlockingBackend> {
        fn kind(&self) -> &str {
            "blocking"
        }

        async fn initialize(&self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn shutdown(&self) {}

        async fn lock(&self, _: &SessionId, _: Datastore) -> Result<(), NcError> {
            self.entered.notify_one();
            self.proceed.notified().await;
            self.locks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn unlock(&self, _: &SessionId, _: Datastore) -> Result<(), NcError> {
            self.unlocks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_config(
            &self,
            _: &SessionId,
            _: Datastore,
            _: Option<&Filter>,
        ) -> Result<Fragment, NcError> {
            Ok(Fragment::new())
        }
    }

    #[tokio::test]
    async fn test_lock_exclusivity() {
        let (gateway, id) = gateway().await;
        let a = SessionId::from("1");
        let b = SessionId::from("2");

        gateway.lock(id, &a, Datastore::Candidate).await.unwrap();
        match gateway.lock(id, &b, Datastore::Candidate).await {
            Err(GatewayError::AlreadyLocked { holder }) => assert_eq!(holder, a),
            other => panic!("expected AlreadyLocked, got {:?}", other),
        }
        gateway.unlock(id, &a, Datastore::Candidate).await.unwrap();
        gateway.lock(id, &b, Datastore::Candidate).await.unwrap();
        assert_eq!(gateway.holder(id, Datastore::Candidate), Some(b));
    }

    #[tokio::test]
    async fn test_lock_is_per_datastore() {
        let (gateway, id) = gateway().await;
        gateway
            .lock(id, &SessionId::from("1"), Datastore::Candidate)
            .await
            .unwrap();
        gateway
            .lock(id, &SessionId::from("2"), Datastore::Running)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_relock_is_idempotent() {
        let (gateway, id) = gateway().await;
        let a = SessionId::from("1");
        gateway.lock(id, &a, Datastore::Running).await.unwrap();
        gateway.lock(id, &a, Datastore::Running).await.unwrap();
        assert_eq!(gateway.holder(id, Datastore::Running), Some(a));
    }

    #[tokio::test]
    async fn test_unlock_errors() {
        let (gateway, id) = gateway().await;
        let a = SessionId::from("1");
        let b = SessionId::from("2");

        assert!(matches!(
            gateway.unlock(id, &a, Datastore::Running).await,
            Err(GatewayError::NotLocked)
        ));
        gateway.lock(id, &a, Datastore::Running).await.unwrap();
        match gateway.unlock(id, &b, Datastore::Running).await {
            Err(GatewayError::LockOwnedByOther { holder }) => assert_eq!(holder, a),
            other => panic!("expected LockOwnedByOther, got {:?}", other),
        }
        assert_eq!(gateway.holder(id, Datastore::Running), Some(a));
    }

    #[tokio::test]
    async fn test_unknown_backend_and_target() {
        let (gateway, id) = gateway().await;
        let a = SessionId::from("1");
        let unknown = BackendId::new(u64::MAX);
        assert!(matches!(
            gateway.lock(unknown, &a, Datastore::Running).await,
            Err(GatewayError::UnknownBackend(_))
        ));
        assert!(matches!(
            gateway.lock(id, &a, Datastore::None).await,
            Err(GatewayError::InvalidTarget { .. })
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_rolls_back() {
        let gateway = LockGateway::new();
        let id = gateway.register(FailingBackend).await.unwrap();
        let a = SessionId::from("1");

        match gateway.lock(id, &a, Datastore::Running).await {
            Err(GatewayError::Backend(err)) => assert_eq!(err.message, "disk full"),
            other => panic!("expected backend error, got {:?}", other),
        }
        assert_eq!(gateway.holder(id, Datastore::Running), None);
        assert!(matches!(
            gateway.unlock(id, &a, Datastore::Running).await,
            Err(GatewayError::NotLocked)
        ));
    }

    #[tokio::test]
    async fn test_backend_error_becomes_operation_failed() {
        let gateway = LockGateway::new();
        let id = gateway.register(FailingBackend).await.unwrap();
        let err = gateway
            .get_config(id, &SessionId::from("1"), Datastore::Running, None)
            .await
            .unwrap_err();
        let err = NcError::from(err);
        assert_eq!(err.tag, ErrorTag::OperationFailed);
        assert_eq!(err.message, "disk full");
    }

    #[tokio::test]
    async fn test_timeout_rolls_back() {
        let gateway = LockGateway::new();
        let backend = Arc::new(BlockingBackend::default());
        let id = gateway.register(backend.clone()).await.unwrap();
        let a = SessionId::from("1");
        let b = SessionId::from("2");

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            gateway.lock(id, &a, Datastore::Running),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(gateway.holder(id, Datastore::Running), None);

        backend.proceed.notify_one();
        gateway.lock(id, &b, Datastore::Running).await.unwrap();
        assert_eq!(gateway.holder(id, Datastore::Running), Some(b));
    }

    #[tokio::test]
    async fn test_reservation_blocks_other_sessions() {
        let gateway = Arc::new(LockGateway::new());
        let backend = Arc::new(BlockingBackend::default());
        let id = gateway.register(backend.clone()).await.unwrap();

        let pending = {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway
                    .lock(id, &SessionId::from("1"), Datastore::Running)
                    .await
            })
        };
        backend.entered.notified().await;

        // not yet held, but no other session may take it
        assert_eq!(gateway.holder(id, Datastore::Running), None);
        match gateway
            .lock(id, &SessionId::from("2"), Datastore::Running)
            .await
        {
            Err(GatewayError::AlreadyLocked { holder }) => assert_eq!(holder.as_str(), "1"),
            other => panic!("expected AlreadyLocked, got {:?}", other),
        }

        backend.proceed.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(
            gateway.holder(id, Datastore::Running),
            Some(SessionId::from("1"))
        );
        assert_eq!(backend.locks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relock_while_pending() {
        let gateway = Arc::new(LockGateway::new());
        let backend = Arc::new(BlockingBackend::default());
        let id = gateway.register(backend.clone()).await.unwrap();
        let a = SessionId::from("1");

        let pending = {
            let gateway = gateway.clone();
            let a = a.clone();
            tokio::spawn(async move { gateway.lock(id, &a, Datastore::Running).await })
        };
        backend.entered.notified().await;

        let err = gateway
            .lock(id, &a, Datastore::Running)
            .await
            .unwrap_err();
        assert!(matches!(&err, GatewayError::LockPending(session) if *session == a));
        assert_eq!(NcError::from(err).tag, ErrorTag::InUse);

        backend.proceed.notify_one();
        pending.await.unwrap().unwrap();
        // settled now, a second request is a no-op
        gateway.lock(id, &a, Datastore::Running).await.unwrap();
        assert_eq!(backend.locks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_session_during_pending_lock() {
        let gateway = Arc::new(LockGateway::new());
        let backend = Arc::new(BlockingBackend::default());
        let id = gateway.register(backend.clone()).await.unwrap();
        let a = SessionId::from("1");
        let b = SessionId::from("2");

        let pending = {
            let gateway = gateway.clone();
            let a = a.clone();
            tokio::spawn(async move { gateway.lock(id, &a, Datastore::Running).await })
        };
        backend.entered.notified().await;

        assert_eq!(gateway.release_session(&a).await, 1);

        backend.proceed.notify_one();
        match pending.await.unwrap() {
            Err(GatewayError::SessionReleased(session)) => assert_eq!(session, a),
            other => panic!("expected SessionReleased, got {:?}", other),
        }
        assert_eq!(gateway.holder(id, Datastore::Running), None);
        assert_eq!(backend.unlocks.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.release_session(&a).await, 0);

        backend.proceed.notify_one();
        gateway.lock(id, &b, Datastore::Running).await.unwrap();
        assert_eq!(gateway.holder(id, Datastore::Running), Some(b));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lock_single_winner() {
        let gateway = Arc::new(LockGateway::new());
        let id = gateway.register(memory()).await.unwrap();

        let tasks: Vec<_> = (0..16u64)
            .map(|session| {
                let gateway = gateway.clone();
                tokio::spawn(async move {
                    gateway
                        .lock(id, &SessionId::from(session), Datastore::Candidate)
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => winners += 1,
                Err(GatewayError::AlreadyLocked { .. }) => {}
                Err(GatewayError::Backend(err)) => assert_eq!(err.tag, ErrorTag::LockDenied),
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(winners, 1);
        assert!(gateway.holder(id, Datastore::Candidate).is_some());
    }

    #[tokio::test]
    async fn test_release_session() {
        let (gateway, id) = gateway().await;
        let a = SessionId::from("1");
        let b = SessionId::from("2");
        gateway.lock(id, &a, Datastore::Running).await.unwrap();
        gateway.lock(id, &a, Datastore::Candidate).await.unwrap();

        assert_eq!(gateway.release_session(&b).await, 0);
        assert_eq!(gateway.release_session(&a).await, 2);
        assert_eq!(gateway.holder(id, Datastore::Running), None);

        // the backend released its own lock too
        gateway.lock(id, &b, Datastore::Running).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_kind_rejected() {
        let (gateway, _) = gateway().await;
        assert!(matches!(
            gateway.register(MemoryBackend::new("memory")).await,
            Err(GatewayError::DuplicateBackend { .. })
        ));
    }

    #[tokio::test]
    async fn test_backend_ids_are_unique() {
        let first = LockGateway::new();
        let second = LockGateway::new();
        let a = first.register(memory()).await.unwrap();
        let b = second.register(memory()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_register_initialization_failure() {
        let gateway = LockGateway::new();
        let backend = MemoryBackend::new("memory").with_model_path("/nonexistent/model.yang");
        let err = gateway.register(backend).await.unwrap_err();
        assert!(matches!(err, GatewayError::Initialize(_)));
        assert_eq!(NcError::from(err).tag, ErrorTag::OperationFailed);
    }

    #[tokio::test]
    async fn test_unregister_drops_locks() {
        let (gateway, id) = gateway().await;
        gateway
            .lock(id, &SessionId::from("1"), Datastore::Running)
            .await
            .unwrap();
        gateway.unregister(id).await.unwrap();
        assert_eq!(gateway.holder(id, Datastore::Running), None);
        assert!(matches!(
            gateway.unregister(id).await,
            Err(GatewayError::UnknownBackend(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (gateway, id) = gateway().await;
        gateway
            .lock(id, &SessionId::from("1"), Datastore::Running)
            .await
            .unwrap();
        gateway.shutdown().await;
        assert_eq!(gateway.holder(id, Datastore::Running), None);
        assert!(matches!(
            gateway
                .get_config(id, &SessionId::from("1"), Datastore::Running, None)
                .await,
            Err(GatewayError::UnknownBackend(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_rpc() {
        let (gateway, id) = gateway().await;
        let mut capabilities = CapabilitySet::base();
        capabilities.insert(NETCONF_CANDIDATE_CAP);
        let a = Session::new("1", capabilities.clone());
        let b = Session::new("2", capabilities);

        let lock = |message_id: &str| {
            Rpc::new(
                message_id,
                Operation::Lock {
                    target: Datastore::Candidate,
                },
            )
            .unwrap()
        };

        let reply = gateway.handle_rpc(id, &a, lock("1")).await;
        assert_eq!(reply, RpcReply::ok("1"));

        let reply = gateway.handle_rpc(id, &b, lock("2")).await;
        assert_eq!(reply.message_id(), "2");
        let errors = reply.outcome().errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].tag, ErrorTag::LockDenied);
        assert_eq!(errors[0].error_type, ErrorType::Protocol);
        assert_eq!(errors[0].info.session_id.as_deref(), Some("1"));

        let get_config = Rpc::new(
            "3",
            Operation::GetConfig {
                source: Datastore::Running,
                filter: Some(Filter::subtree("<system/>").unwrap()),
            },
        )
        .unwrap();
        let reply = gateway.handle_rpc(id, &b, get_config).await;
        assert_eq!(
            reply.outcome(),
            &Outcome::Data(Fragment::parse("<system/>").unwrap())
        );

        let reply = gateway
            .handle_rpc(id, &b, Rpc::new("4", Operation::CloseSession).unwrap())
            .await;
        assert_eq!(
            reply.outcome().errors()[0].tag,
            ErrorTag::OperationNotSupported
        );
    }

    #[tokio::test]
    async fn test_handle_rpc_checks_capabilities() {
        let (gateway, id) = gateway().await;
        let session = Session::new("1", CapabilitySet::base());
        let rpc = Rpc::new(
            "1",
            Operation::Lock {
                target: Datastore::Candidate,
            },
        )
        .unwrap();
        let reply = gateway.handle_rpc(id, &session, rpc).await;
        assert_eq!(
            reply.outcome().errors()[0].tag,
            ErrorTag::OperationNotSupported
        );
        assert_eq!(gateway.holder(id, Datastore::Candidate), None);
    }
}
