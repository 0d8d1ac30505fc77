//! WebSocket presence gateway.

mod broadcast;
mod connection;
mod handler;
mod message;

pub use broadcast::{broadcast, broadcast_clients_updated, BroadcastResult};
pub use connection::{WsConnection, WsOutbound};
pub use handler::{ws_handler, WsQuery};
pub use message::{ClientMessage, ServerMessage, EMPTY_MESSAGE};
