//! Connected-client registry for the websocket presence service.
//!
//! This module provides:
//! - Connection identifiers and the handle capability (send / disconnect)
//! - The session registry enforcing one live connection per principal
//! - Session statistics

mod handle;
mod registry;

pub use handle::{ConnectionHandle, ConnectionId, SendError};
pub use registry::{ConnectionRecord, Registration, SessionError, SessionRegistry, SessionStats};
