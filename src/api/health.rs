//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub users: UserStoreHealthResponse,
    pub catalog_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
    pub sessions: SessionHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct UserStoreHealthResponse {
    pub backend: String,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub pool_size: u32,
    pub idle_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct SessionHealthResponse {
    pub total: usize,
    pub unique_principals: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub registered_users: Option<u64>,
    pub sessions: SessionHealthResponse,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = state.start_time.elapsed().as_secs();
    let session_stats = state.sessions.stats();

    let reachable = match state.directory.users.count().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "User store health check failed");
            false
        }
    };

    let postgres = state.postgres_pool.as_ref().map(|pool| {
        let inner_pool = pool.pool();
        PostgresHealthResponse {
            pool_size: inner_pool.size(),
            idle_connections: inner_pool.num_idle() as u32,
        }
    });

    let status = if reachable { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        users: UserStoreHealthResponse {
            backend: state.directory.users.backend_name().to_string(),
            reachable,
        },
        catalog_backend: state.products.backend_name().to_string(),
        postgres,
        sessions: SessionHealthResponse {
            total: session_stats.total_connections,
            unique_principals: session_stats.unique_principals,
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let session_stats = state.sessions.stats();
    let registered_users = state.directory.users.count().await.ok();

    Json(StatsResponse {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        registered_users,
        sessions: SessionHealthResponse {
            total: session_stats.total_connections,
            unique_principals: session_stats.unique_principals,
        },
    })
}
