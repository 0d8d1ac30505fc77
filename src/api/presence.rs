//! Live session listing.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::AppState;
use crate::session::ConnectionId;

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub total: usize,
    pub connections: Vec<PresenceEntry>,
}

#[derive(Debug, Serialize)]
pub struct PresenceEntry {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub full_name: String,
    pub connected_at: DateTime<Utc>,
}

/// GET /api/v1/presence - admin or super-user
pub async fn list_presence(State(state): State<AppState>) -> Json<PresenceResponse> {
    let mut connections: Vec<PresenceEntry> = state
        .sessions
        .records()
        .into_iter()
        .map(|record| PresenceEntry {
            connection_id: record.id,
            user_id: record.principal.id.clone(),
            full_name: record.principal.full_name.clone(),
            connected_at: record.connected_at,
        })
        .collect();

    connections.sort_by(|a, b| a.connected_at.cmp(&b.connected_at));

    Json(PresenceResponse {
        total: connections.len(),
        connections,
    })
}
