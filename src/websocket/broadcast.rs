use crate::metrics::BroadcastMetrics;
use crate::session::{SendError, SessionRegistry};

use super::message::ServerMessage;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    pub delivered: usize,
    pub failed: usize,
}

/// Queue `message` on every live connection. Never waits on a socket.
pub fn broadcast(sessions: &SessionRegistry, message: &ServerMessage) -> BroadcastResult {
    let mut result = BroadcastResult::default();

    for (connection_id, handle) in sessions.handles() {
        match handle.send(message.clone()) {
            Ok(()) => result.delivered += 1,
            Err(e) => {
                result.failed += 1;
                match e {
                    SendError::Full => tracing::warn!(
                        connection_id = %connection_id,
                        message_type = message.kind(),
                        "Outbound buffer full, message dropped"
                    ),
                    SendError::Closed => tracing::debug!(
                        connection_id = %connection_id,
                        "Connection closed before broadcast"
                    ),
                }
            }
        }
    }

    BroadcastMetrics::record(
        message.kind(),
        result.delivered as u64,
        result.failed as u64,
    );

    result
}

/// Tell every client the current set of connection ids.
pub fn broadcast_clients_updated(sessions: &SessionRegistry) -> BroadcastResult {
    let message = ServerMessage::clients_updated(sessions.connection_ids());
    broadcast(sessions, &message)
}
