use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::config::WebSocketConfig;
use crate::metrics::{HeartbeatMetrics, MemoryMetrics, SessionMetrics};
use crate::session::{SendError, SessionRegistry};
use crate::websocket::{broadcast_clients_updated, ServerMessage};

/// Counts from one heartbeat round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatRound {
    pub sent: usize,
    /// Connections whose outbound buffer was full
    pub skipped: usize,
    /// Connections removed because their socket is gone
    pub reaped: usize,
}

/// Background task for heartbeat and dead-session cleanup
pub struct HeartbeatTask {
    config: WebSocketConfig,
    sessions: Arc<SessionRegistry>,
    shutdown: broadcast::Receiver<()>,
}

impl HeartbeatTask {
    pub fn new(
        config: WebSocketConfig,
        sessions: Arc<SessionRegistry>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            sessions,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let heartbeat_interval = Duration::from_secs(self.config.heartbeat_interval.max(1));
        let mut heartbeat_timer = tokio::time::interval(heartbeat_interval);

        // Skip immediate first tick
        heartbeat_timer.tick().await;

        tracing::info!(
            heartbeat_interval_secs = self.config.heartbeat_interval,
            "Heartbeat task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = heartbeat_timer.tick() => {
                    self.beat();
                }
            }
        }

        tracing::info!("Heartbeat task stopped");
    }

    /// Send one heartbeat to every session and drop sessions whose socket
    /// has gone away.
    pub fn beat(&self) -> HeartbeatRound {
        let start = Instant::now();
        let mut round = HeartbeatRound::default();

        for (connection_id, handle) in self.sessions.handles() {
            match handle.send(ServerMessage::Heartbeat) {
                Ok(()) => round.sent += 1,
                Err(SendError::Full) => {
                    round.skipped += 1;
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Outbound buffer full, heartbeat skipped"
                    );
                }
                Err(SendError::Closed) => {
                    if self.sessions.remove(&connection_id) {
                        round.reaped += 1;
                    }
                }
            }
        }

        if round.reaped > 0 {
            HeartbeatMetrics::record_reaped(round.reaped as u64);
            tracing::info!(reaped = round.reaped, "Reaped dead sessions");
            broadcast_clients_updated(&self.sessions);
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        HeartbeatMetrics::record_duration_ms(elapsed_ms);
        SessionMetrics::set_from_stats(&self.sessions.stats());
        MemoryMetrics::update_process_memory();

        tracing::debug!(
            sent = round.sent,
            skipped = round.skipped,
            reaped = round.reaped,
            elapsed_ms = elapsed_ms,
            "Heartbeat round completed"
        );

        round
    }
}
