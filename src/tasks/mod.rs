mod heartbeat;

pub use heartbeat::{HeartbeatRound, HeartbeatTask};
