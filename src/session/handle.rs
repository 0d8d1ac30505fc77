//! Connection identifiers and the handle capability the registry needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::websocket::ServerMessage;

/// Transport-assigned identifier of one live connection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier, as assigned by the websocket transport.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("outbound buffer full")]
    Full,
}

/// What the registry and broadcasters may do with a live connection.
///
/// Both methods must return without waiting on the network: they are
/// called while iterating registry snapshots and right after eviction.
pub trait ConnectionHandle: Send + Sync {
    /// Queue a message for delivery.
    fn send(&self, message: ServerMessage) -> Result<(), SendError>;

    /// Ask the transport to close the connection. Idempotent.
    fn disconnect(&self);
}
