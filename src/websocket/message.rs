use serde::{Deserialize, Serialize};

use crate::session::ConnectionId;

/// Placeholder relayed when a client sends an empty chat message.
pub const EMPTY_MESSAGE: &str = "no-message!!";

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    MessageFromClient {
        #[serde(default)]
        message: Option<String>,
    },
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Ids of every live connection
    ClientsUpdated(Vec<ConnectionId>),
    MessageFromServer {
        full_name: String,
        message: String,
    },
    Pong,
    Heartbeat,
    Error {
        code: String,
        message: String,
    },
    Shutdown {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reconnect_after_seconds: Option<u64>,
    },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn clients_updated(mut ids: Vec<ConnectionId>) -> Self {
        ids.sort();
        Self::ClientsUpdated(ids)
    }

    /// Chat relay; a missing or blank message becomes [`EMPTY_MESSAGE`].
    pub fn chat(full_name: impl Into<String>, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| EMPTY_MESSAGE.to_string());

        Self::MessageFromServer {
            full_name: full_name.into(),
            message,
        }
    }

    pub fn shutdown(reason: impl Into<String>, reconnect_after_seconds: Option<u64>) -> Self {
        Self::Shutdown {
            reason: reason.into(),
            reconnect_after_seconds,
        }
    }

    /// Wire name of the message type, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClientsUpdated(_) => "clients-updated",
            Self::MessageFromServer { .. } => "message-from-server",
            Self::Pong => "pong",
            Self::Heartbeat => "heartbeat",
            Self::Error { .. } => "error",
            Self::Shutdown { .. } => "shutdown",
        }
    }
}
