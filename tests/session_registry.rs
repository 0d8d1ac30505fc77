//! Session registry integration tests
//!
//! Drives the registry through the real in-memory user directory and checks
//! the one-connection-per-principal invariant under arbitrary operation
//! sequences and under concurrent reconnects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use shopfront_service::session::{
    ConnectionHandle, ConnectionId, SendError, SessionError, SessionRegistry,
};
use shopfront_service::users::{MemoryUserStore, NewUser};
use shopfront_service::websocket::ServerMessage;

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

struct Fixture {
    sessions: Arc<SessionRegistry>,
    store: Arc<MemoryUserStore>,
    principals: Vec<String>,
}

fn fixture(count: usize) -> Fixture {
    let store = Arc::new(MemoryUserStore::new());
    let principals = (0..count)
        .map(|i| {
            let user = NewUser::with_default_roles(
                format!("user{i}@shop.test"),
                format!("User {i}"),
                "hash",
            )
            .into_user();
            let id = user.id.to_string();
            store.insert(user).unwrap();
            id
        })
        .collect();

    Fixture {
        sessions: Arc::new(SessionRegistry::new(store.clone())),
        store,
        principals,
    }
}

fn sorted(mut ids: Vec<ConnectionId>) -> Vec<ConnectionId> {
    ids.sort();
    ids
}

#[tokio::test]
async fn test_reconnect_replaces_connection() {
    let fx = fixture(1);
    let u1 = &fx.principals[0];
    let h1 = Arc::new(CountingHandle::default());
    let h2 = Arc::new(CountingHandle::default());

    fx.sessions.register("c1".into(), h1.clone(), u1).await.unwrap();
    fx.sessions.register("c2".into(), h2.clone(), u1).await.unwrap();

    assert_eq!(fx.sessions.connection_ids(), vec![ConnectionId::from("c2")]);
    assert_eq!(h1.disconnects(), 1);
    assert_eq!(h2.disconnects(), 0);
    assert_eq!(fx.sessions.display_name(&"c2".into()).unwrap(), "User 0");
}

#[tokio::test]
async fn test_unknown_and_inactive_principals() {
    let fx = fixture(2);
    let live = Arc::new(CountingHandle::default());
    fx.sessions
        .register("c1".into(), live.clone(), &fx.principals[0])
        .await
        .unwrap();

    let err = fx
        .sessions
        .register(
            "c2".into(),
            Arc::new(CountingHandle::default()),
            "00000000-0000-0000-0000-000000000000",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::PrincipalNotFound(_)));

    let inactive_id = fx.principals[1].parse().unwrap();
    assert!(fx.store.set_active(inactive_id, false));

    let err = fx
        .sessions
        .register("c3".into(), Arc::new(CountingHandle::default()), &fx.principals[1])
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Inactive(_)));

    assert_eq!(fx.sessions.connection_ids(), vec![ConnectionId::from("c1")]);
    assert_eq!(live.disconnects(), 0);
}

#[tokio::test]
async fn test_inactive_reconnect_keeps_existing_connection() {
    let fx = fixture(1);
    let h1 = Arc::new(CountingHandle::default());
    fx.sessions
        .register("c1".into(), h1.clone(), &fx.principals[0])
        .await
        .unwrap();

    assert!(fx.store.set_active(fx.principals[0].parse().unwrap(), false));

    let result = fx
        .sessions
        .register("c2".into(), Arc::new(CountingHandle::default()), &fx.principals[0])
        .await;

    assert!(result.is_err());
    assert_eq!(fx.sessions.connection_ids(), vec![ConnectionId::from("c1")]);
    assert_eq!(h1.disconnects(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reconnects_leave_one_connection() {
    let fx = fixture(1);
    let principal = fx.principals[0].clone();
    let handles: Vec<Arc<CountingHandle>> =
        (0..32).map(|_| Arc::new(CountingHandle::default())).collect();

    let tasks: Vec<_> = handles
        .iter()
        .enumerate()
        .map(|(i, handle)| {
            let sessions = fx.sessions.clone();
            let handle = handle.clone();
            let principal = principal.clone();
            tokio::spawn(async move {
                sessions
                    .register(format!("c{i}").into(), handle, &principal)
                    .await
                    .unwrap();
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let ids = fx.sessions.connection_ids();
    assert_eq!(ids.len(), 1);

    // every displaced connection was told to go exactly once; the survivor never
    let total: usize = handles.iter().map(|h| h.disconnects()).sum();
    assert_eq!(total, handles.len() - 1);
    assert!(handles.iter().all(|h| h.disconnects() <= 1));

    let survivor: usize = ids[0].as_str()[1..].parse().unwrap();
    assert_eq!(handles[survivor].disconnects(), 0);
}

#[derive(Debug, Clone)]
enum Op {
    Register { conn: u8, principal: usize },
    Remove { conn: u8 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..8, 0usize..4).prop_map(|(conn, principal)| Op::Register { conn, principal }),
        1 => (0u8..8).prop_map(|conn| Op::Remove { conn }),
    ]
}

/// Reference model: connection -> principal and principal -> connection.
#[derive(Default)]
struct Model {
    by_conn: HashMap<u8, usize>,
    by_principal: HashMap<usize, u8>,
}

impl Model {
    fn detach(&mut self, conn: u8) {
        if let Some(principal) = self.by_conn.remove(&conn) {
            if self.by_principal.get(&principal) == Some(&conn) {
                self.by_principal.remove(&principal);
            }
        }
    }

    fn register(&mut self, conn: u8, principal: usize) {
        self.detach(conn);
        if let Some(old) = self.by_principal.insert(principal, conn) {
            self.by_conn.remove(&old);
        }
        self.by_conn.insert(conn, principal);
    }

    fn ids(&self) -> Vec<ConnectionId> {
        sorted(self.by_conn.keys().map(|c| conn_id(*c)).collect())
    }
}

fn conn_id(conn: u8) -> ConnectionId {
    ConnectionId::new(format!("c{conn}"))
}

proptest! {
    /// Property: at most one connection per principal after any sequence
    /// of registers and removes, and the registry agrees with the model.
    #[test]
    fn proptest_single_session_per_principal(ops in prop::collection::vec(arb_op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let fx = fixture(4);
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Register { conn, principal } => {
                    runtime
                        .block_on(fx.sessions.register(
                            conn_id(conn),
                            Arc::new(CountingHandle::default()),
                            &fx.principals[principal],
                        ))
                        .unwrap();
                    model.register(conn, principal);
                }
                Op::Remove { conn } => {
                    fx.sessions.remove(&conn_id(conn));
                    model.detach(conn);
                }
            }

            let records = fx.sessions.records();
            let mut per_principal: HashMap<&str, usize> = HashMap::new();
            for record in &records {
                *per_principal.entry(record.principal.id.as_str()).or_default() += 1;
            }
            prop_assert!(per_principal.values().all(|count| *count == 1));

            prop_assert_eq!(sorted(fx.sessions.connection_ids()), model.ids());

            let stats = fx.sessions.stats();
            prop_assert_eq!(stats.total_connections, stats.unique_principals);

            for (principal, conn) in &model.by_principal {
                prop_assert_eq!(
                    fx.sessions.connection_for(&fx.principals[*principal]),
                    Some(conn_id(*conn))
                );
            }
        }
    }

    /// Property: removing unknown ids never changes the registry.
    #[test]
    fn proptest_remove_unknown_is_noop(unknown in "[a-z]{1,12}") {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let fx = fixture(1);
        runtime
            .block_on(fx.sessions.register(
                "known-0".into(),
                Arc::new(CountingHandle::default()),
                &fx.principals[0],
            ))
            .unwrap();

        prop_assert!(!fx.sessions.remove(&ConnectionId::new(unknown)));
        prop_assert_eq!(fx.sessions.connection_ids(), vec![ConnectionId::from("known-0")]);
    }
}
