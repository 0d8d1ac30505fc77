use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::users::{Principal, PrincipalLookup, StoreError};

use super::handle::{ConnectionHandle, ConnectionId};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Principal {0} not found")]
    PrincipalNotFound(String),

    #[error("Principal {0} is not active")]
    Inactive(String),

    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("Principal lookup failed: {0}")]
    Lookup(#[source] StoreError),
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SessionError::PrincipalNotFound(_) | SessionError::ConnectionNotFound(_)
        )
    }
}

/// One live connection and the principal that owns it.
#[derive(Clone)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub principal: Arc<Principal>,
    pub handle: Arc<dyn ConnectionHandle>,
    pub connected_at: DateTime<Utc>,
}

impl std::fmt::Debug for ConnectionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRecord")
            .field("id", &self.id)
            .field("principal", &self.principal.id)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

/// Result of a successful [`SessionRegistry::register`].
#[derive(Debug)]
pub struct Registration {
    pub principal: Arc<Principal>,
    /// Connection that previously belonged to the same principal
    pub evicted: Option<ConnectionId>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionStats {
    pub total_connections: usize,
    pub unique_principals: usize,
}

#[derive(Default)]
struct Sessions {
    /// connection_id -> ConnectionRecord
    connections: HashMap<ConnectionId, ConnectionRecord>,
    /// principal_id -> connection_id (at most one per principal)
    principal_index: HashMap<String, ConnectionId>,
}

impl Sessions {
    /// Insert `record`, returning the record it displaced for the same
    /// principal, if any.
    fn insert(&mut self, record: ConnectionRecord) -> Option<ConnectionRecord> {
        // a reused connection id replaces its previous record
        if let Some(previous) = self.connections.remove(&record.id) {
            self.unindex(&previous);
        }

        let evicted = self
            .principal_index
            .insert(record.principal.id.clone(), record.id.clone())
            .and_then(|old_id| self.connections.remove(&old_id));

        self.connections.insert(record.id.clone(), record);
        evicted
    }

    fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionRecord> {
        let record = self.connections.remove(connection_id)?;
        self.unindex(&record);
        Some(record)
    }

    /// Drop the index entry only if it still points at this record.
    fn unindex(&mut self, record: &ConnectionRecord) {
        if self.principal_index.get(&record.principal.id) == Some(&record.id) {
            self.principal_index.remove(&record.principal.id);
        }
    }
}

/// Tracks live connections and enforces one connection per principal.
///
/// All state sits behind a single lock and every public operation is one
/// critical section, so the scan/evict/insert sequence of `register` is
/// atomic with respect to every other operation. Principal lookup happens
/// before the lock is taken and the evicted handle is disconnected after it
/// is released.
pub struct SessionRegistry {
    principals: Arc<dyn PrincipalLookup>,
    sessions: Mutex<Sessions>,
}

impl SessionRegistry {
    pub fn new(principals: Arc<dyn PrincipalLookup>) -> Self {
        Self {
            principals,
            sessions: Mutex::new(Sessions::default()),
        }
    }

    /// Register a connection for `principal_id`.
    ///
    /// Fails without touching the registry if the principal does not
    /// resolve or is inactive. Any existing connection of the same principal
    /// is removed and told to disconnect.
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        handle: Arc<dyn ConnectionHandle>,
        principal_id: &str,
    ) -> Result<Registration, SessionError> {
        let principal = self
            .principals
            .find_by_id(principal_id)
            .await
            .map_err(SessionError::Lookup)?
            .ok_or_else(|| SessionError::PrincipalNotFound(principal_id.to_string()))?;

        if !principal.is_active {
            return Err(SessionError::Inactive(principal.id));
        }

        let principal = Arc::new(principal);
        let record = ConnectionRecord {
            id: connection_id.clone(),
            principal: principal.clone(),
            handle,
            connected_at: Utc::now(),
        };

        let evicted = self.sessions.lock().insert(record);

        if let Some(ref old) = evicted {
            old.handle.disconnect();
            tracing::info!(
                connection_id = %old.id,
                replaced_by = %connection_id,
                principal_id = %principal.id,
                "Evicted previous connection"
            );
        }

        tracing::info!(
            connection_id = %connection_id,
            principal_id = %principal.id,
            "Connection registered"
        );

        Ok(Registration {
            principal,
            evicted: evicted.map(|record| record.id),
        })
    }

    /// Remove a connection. Unknown ids are ignored.
    ///
    /// Returns true if a record was removed.
    pub fn remove(&self, connection_id: &ConnectionId) -> bool {
        let removed = self.sessions.lock().remove(connection_id);

        match removed {
            Some(record) => {
                tracing::info!(
                    connection_id = %connection_id,
                    principal_id = %record.principal.id,
                    "Connection removed"
                );
                true
            }
            None => false,
        }
    }

    /// Snapshot of live connection ids, in no particular order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.sessions.lock().connections.keys().cloned().collect()
    }

    /// Display name of the principal owning `connection_id`.
    pub fn display_name(&self, connection_id: &ConnectionId) -> Result<String, SessionError> {
        self.sessions
            .lock()
            .connections
            .get(connection_id)
            .map(|record| record.principal.display_name().to_string())
            .ok_or_else(|| SessionError::ConnectionNotFound(connection_id.clone()))
    }

    pub fn principal(&self, connection_id: &ConnectionId) -> Option<Arc<Principal>> {
        self.sessions
            .lock()
            .connections
            .get(connection_id)
            .map(|record| record.principal.clone())
    }

    /// Connection currently held by `principal_id`, if any.
    pub fn connection_for(&self, principal_id: &str) -> Option<ConnectionId> {
        self.sessions.lock().principal_index.get(principal_id).cloned()
    }

    /// Snapshot of handles for broadcasting.
    pub fn handles(&self) -> Vec<(ConnectionId, Arc<dyn ConnectionHandle>)> {
        self.sessions
            .lock()
            .connections
            .values()
            .map(|record| (record.id.clone(), record.handle.clone()))
            .collect()
    }

    /// Snapshot of all records.
    pub fn records(&self) -> Vec<ConnectionRecord> {
        self.sessions.lock().connections.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SessionStats {
        let sessions = self.sessions.lock();
        SessionStats {
            total_connections: sessions.connections.len(),
            unique_principals: sessions.principal_index.len(),
        }
    }

    /// Ask every live connection to close. Records are removed as the
    /// transport reports each close.
    pub fn disconnect_all(&self) -> usize {
        let handles = self.handles();
        for (_, handle) in &handles {
            handle.disconnect();
        }
        handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::RoleSet;
    use crate::session::SendError;
    use crate::websocket::ServerMessage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandle {
        disconnects: AtomicUsize,
    }

    impl CountingHandle {
        fn disconnects(&self) -> usize {
            self.disconnects.load(Ordering::SeqCst)
        }
    }

    impl ConnectionHandle for CountingHandle {
        fn send(&self, _message: ServerMessage) -> Result<(), SendError> {
            Ok(())
        }

        fn disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FixedLookup(HashMap<String, Principal>);

    #[async_trait]
    impl PrincipalLookup for FixedLookup {
        async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError> {
            Ok(self.0.get(id).cloned())
        }
    }

    fn principal(id: &str, name: &str, active: bool) -> Principal {
        Principal {
            id: id.to_string(),
            email: format!("{id}@shop.test"),
            full_name: name.to_string(),
            roles: ["user"].into_iter().collect::<RoleSet>(),
            is_active: active,
        }
    }

    fn registry() -> SessionRegistry {
        let lookup = FixedLookup(
            [
                principal("u1", "Ursula One", true),
                principal("u2", "Ulrich Two", true),
                principal("off", "Inactive Person", false),
            ]
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect(),
        );
        SessionRegistry::new(Arc::new(lookup))
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = registry();
        let handle = Arc::new(CountingHandle::default());

        let registration = registry
            .register("c1".into(), handle.clone(), "u1")
            .await
            .unwrap();

        assert!(registration.evicted.is_none());
        assert_eq!(registry.connection_ids(), vec![ConnectionId::from("c1")]);
        assert_eq!(registry.display_name(&"c1".into()).unwrap(), "Ursula One");
        assert_eq!(registry.connection_for("u1"), Some("c1".into()));
        assert_eq!(handle.disconnects(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_evicts_previous() {
        let registry = registry();
        let h1 = Arc::new(CountingHandle::default());
        let h2 = Arc::new(CountingHandle::default());

        registry.register("c1".into(), h1.clone(), "u1").await.unwrap();
        let registration = registry.register("c2".into(), h2.clone(), "u1").await.unwrap();

        assert_eq!(registration.evicted, Some("c1".into()));
        assert_eq!(registry.connection_ids(), vec![ConnectionId::from("c2")]);
        assert_eq!(h1.disconnects(), 1);
        assert_eq!(h2.disconnects(), 0);
    }

    #[tokio::test]
    async fn test_late_remove_of_evicted_connection() {
        let registry = registry();
        let h1 = Arc::new(CountingHandle::default());
        let h2 = Arc::new(CountingHandle::default());

        registry.register("c1".into(), h1, "u1").await.unwrap();
        registry.register("c2".into(), h2, "u1").await.unwrap();

        // transport reports the evicted socket closing afterwards
        assert!(!registry.remove(&"c1".into()));
        assert_eq!(registry.connection_for("u1"), Some("c2".into()));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_principals_coexist() {
        let registry = registry();

        registry
            .register("c1".into(), Arc::new(CountingHandle::default()), "u1")
            .await
            .unwrap();
        registry
            .register("c2".into(), Arc::new(CountingHandle::default()), "u2")
            .await
            .unwrap();

        let mut ids = registry.connection_ids();
        ids.sort();
        assert_eq!(ids, vec![ConnectionId::from("c1"), ConnectionId::from("c2")]);

        let stats = registry.stats();
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.unique_principals, 2);
    }

    #[tokio::test]
    async fn test_unknown_principal_leaves_registry_unchanged() {
        let registry = registry();
        registry
            .register("c1".into(), Arc::new(CountingHandle::default()), "u1")
            .await
            .unwrap();

        let err = registry
            .register("c2".into(), Arc::new(CountingHandle::default()), "ghost")
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::PrincipalNotFound(_)));
        assert!(err.is_not_found());
        assert_eq!(registry.connection_ids(), vec![ConnectionId::from("c1")]);
    }

    #[tokio::test]
    async fn test_inactive_principal_rejected() {
        let registry = registry();
        let handle = Arc::new(CountingHandle::default());

        let err = registry
            .register("c1".into(), handle.clone(), "off")
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Inactive(_)));
        assert!(registry.is_empty());
        assert_eq!(handle.disconnects(), 0);
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let registry = registry();
        registry
            .register("c1".into(), Arc::new(CountingHandle::default()), "u1")
            .await
            .unwrap();

        assert!(!registry.remove(&"nope".into()));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&"c1".into()));
        assert!(registry.is_empty());
        assert!(registry.connection_for("u1").is_none());
    }

    #[tokio::test]
    async fn test_display_name_unknown_connection() {
        let registry = registry();
        let err = registry.display_name(&"missing".into()).unwrap_err();
        assert!(matches!(err, SessionError::ConnectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_reused_connection_id_rebinds() {
        let registry = registry();

        registry
            .register("c1".into(), Arc::new(CountingHandle::default()), "u1")
            .await
            .unwrap();
        registry
            .register("c1".into(), Arc::new(CountingHandle::default()), "u2")
            .await
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.connection_for("u1").is_none());
        assert_eq!(registry.connection_for("u2"), Some("c1".into()));
    }

    #[tokio::test]
    async fn test_disconnect_all() {
        let registry = registry();
        let h1 = Arc::new(CountingHandle::default());
        let h2 = Arc::new(CountingHandle::default());

        registry.register("c1".into(), h1.clone(), "u1").await.unwrap();
        registry.register("c2".into(), h2.clone(), "u2").await.unwrap();

        assert_eq!(registry.disconnect_all(), 2);
        assert_eq!(h1.disconnects(), 1);
        assert_eq!(h2.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_debug_output() {
        let registry = registry();
        let registration = registry
            .register("c1".into(), Arc::new(CountingHandle::default()), "u1")
            .await
            .unwrap();

        assert!(format!("{registration:?}").contains("Ursula One"));

        let record = format!("{:?}", registry.records()[0]);
        assert!(record.contains("c1"));
        assert!(record.contains("u1"));
    }
}
