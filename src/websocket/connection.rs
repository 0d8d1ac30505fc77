use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::session::{ConnectionHandle, SendError};

use super::message::ServerMessage;

/// Registry-facing side of one websocket.
///
/// Outbound frames go through a bounded channel drained by the socket's send
/// task; `disconnect` flips a watch flag the send task selects on.
pub struct WsConnection {
    sender: mpsc::Sender<ServerMessage>,
    close: watch::Sender<bool>,
}

/// Socket-facing side: the outbound queue and the close signal.
pub struct WsOutbound {
    pub messages: mpsc::Receiver<ServerMessage>,
    pub close: watch::Receiver<bool>,
}

impl WsConnection {
    pub fn new(buffer: usize) -> (Arc<Self>, WsOutbound) {
        let (sender, messages) = mpsc::channel(buffer.max(1));
        let (close, close_rx) = watch::channel(false);

        (
            Arc::new(Self { sender, close }),
            WsOutbound {
                messages,
                close: close_rx,
            },
        )
    }

    pub fn is_disconnect_requested(&self) -> bool {
        *self.close.borrow()
    }
}

impl ConnectionHandle for WsConnection {
    fn send(&self, message: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    fn disconnect(&self) {
        self.close.send_replace(true);
    }
}
