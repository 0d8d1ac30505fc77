//! Graceful shutdown handling for the presence service.
//!
//! The shutdown sequence:
//! 1. Notifies all connected clients about the impending shutdown
//! 2. Signals background tasks to stop
//! 3. Asks every live connection to close
//! 4. Waits (bounded) for the session registry to drain

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::session::SessionRegistry;
use crate::websocket::{broadcast, ServerMessage};

/// Configuration for graceful shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Time to wait for connections to close (default: 10 seconds)
    pub drain_timeout: Duration,
    /// Suggested reconnect delay to send to clients (default: 5 seconds)
    pub reconnect_after_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(10),
            reconnect_after_seconds: 5,
        }
    }
}

/// Handles graceful shutdown of the websocket sessions
pub struct GracefulShutdown {
    sessions: Arc<SessionRegistry>,
    shutdown_tx: broadcast::Sender<()>,
    config: ShutdownConfig,
}

impl GracefulShutdown {
    pub fn new(sessions: Arc<SessionRegistry>, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self::with_config(sessions, shutdown_tx, ShutdownConfig::default())
    }

    pub fn with_config(
        sessions: Arc<SessionRegistry>,
        shutdown_tx: broadcast::Sender<()>,
        config: ShutdownConfig,
    ) -> Self {
        Self {
            sessions,
            shutdown_tx,
            config,
        }
    }

    /// Execute graceful shutdown sequence
    #[tracing::instrument(
        name = "graceful_shutdown",
        skip(self),
        fields(total_connections = self.sessions.len())
    )]
    pub async fn execute(&self, reason: &str) -> ShutdownResult {
        let start = std::time::Instant::now();
        let mut result = ShutdownResult::default();

        tracing::info!(reason = %reason, "Starting graceful shutdown - Phase 1: Notifying clients");
        let message = ServerMessage::shutdown(reason, Some(self.config.reconnect_after_seconds));
        result.clients_notified = broadcast(&self.sessions, &message).delivered;

        tracing::info!("Phase 2: Signaling background tasks to stop");
        let _ = self.shutdown_tx.send(());

        tracing::info!("Phase 3: Disconnecting sessions");
        let initial = self.sessions.disconnect_all();

        tracing::info!("Phase 4: Waiting for connections to close");
        let remaining = self.wait_for_drain().await;
        result.connections_closed = initial.saturating_sub(remaining);
        result.remaining_connections = remaining;

        result.duration = start.elapsed();
        result.success = remaining == 0;

        tracing::info!(
            clients_notified = result.clients_notified,
            connections_closed = result.connections_closed,
            remaining = result.remaining_connections,
            duration_ms = result.duration.as_millis(),
            "Graceful shutdown completed"
        );

        result
    }

    /// Poll the registry until it is empty or the drain timeout passes.
    /// Returns the number of sessions still registered.
    async fn wait_for_drain(&self) -> usize {
        let wait_future = async {
            while !self.sessions.is_empty() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };

        let _ = timeout(self.config.drain_timeout, wait_future).await;

        let remaining = self.sessions.len();
        if remaining > 0 {
            tracing::warn!(
                remaining_connections = remaining,
                "Some connections did not close gracefully"
            );
        }
        remaining
    }
}

/// Result of a graceful shutdown operation
#[derive(Debug, Default)]
pub struct ShutdownResult {
    /// True when every session closed before the timeout
    pub success: bool,
    pub clients_notified: usize,
    pub connections_closed: usize,
    pub remaining_connections: usize,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ConnectionId;
    use crate::users::{MemoryUserStore, NewUser};
    use crate::websocket::WsConnection;

    #[tokio::test]
    async fn test_shutdown_no_connections() {
        let sessions = Arc::new(SessionRegistry::new(Arc::new(MemoryUserStore::new())));
        let (tx, _) = broadcast::channel(1);

        let result = GracefulShutdown::new(sessions, tx).execute("test shutdown").await;

        assert!(result.success);
        assert_eq!(result.clients_notified, 0);
        assert_eq!(result.connections_closed, 0);
    }

    #[tokio::test]
    async fn test_shutdown_notifies_and_drains() {
        let store = Arc::new(MemoryUserStore::new());
        let user = NewUser::with_default_roles("ann@shop.test", "Ann", "hash").into_user();
        let user_id = user.id.to_string();
        store.insert(user).unwrap();

        let sessions = Arc::new(SessionRegistry::new(store));
        let (conn, mut outbound) = WsConnection::new(8);
        let connection_id = ConnectionId::from("c1");
        sessions
            .register(connection_id.clone(), conn, &user_id)
            .await
            .unwrap();

        // stand-in for the socket task: close on request and deregister
        let transport_sessions = sessions.clone();
        let transport = tokio::spawn(async move {
            let first = outbound.messages.recv().await;
            outbound.close.changed().await.unwrap();
            transport_sessions.remove(&connection_id);
            first
        });

        let (tx, mut rx) = broadcast::channel(1);
        let config = ShutdownConfig {
            drain_timeout: Duration::from_secs(2),
            reconnect_after_seconds: 7,
        };
        let result = GracefulShutdown::with_config(sessions.clone(), tx, config)
            .execute("maintenance")
            .await;

        assert!(result.success);
        assert_eq!(result.clients_notified, 1);
        assert_eq!(result.connections_closed, 1);
        assert!(rx.try_recv().is_ok());
        assert!(sessions.is_empty());

        let first = transport.await.unwrap();
        assert_eq!(
            first,
            Some(ServerMessage::shutdown("maintenance", Some(7)))
        );
    }

    #[test]
    fn test_shutdown_config_defaults() {
        let config = ShutdownConfig::default();
        assert_eq!(config.drain_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect_after_seconds, 5);
    }
}
