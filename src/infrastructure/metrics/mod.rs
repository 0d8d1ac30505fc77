//! Prometheus metrics for the shopfront service.
//!
//! - Session metrics (live connections, registrations, evictions, rejections)
//! - WebSocket metrics (opened/closed, duration, inbound frames, broadcasts)
//! - Access metrics (role guard outcomes, login/register attempts)
//! - Catalog metrics (product writes, image uploads)
//! - Heartbeat and process metrics

mod helpers;

pub use helpers::{
    encode_metrics, AccessMetrics, AuthMetrics, BroadcastMetrics, CatalogMetrics,
    HeartbeatMetrics, MemoryMetrics, SessionMetrics, WsMessageMetrics,
};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "shopfront";

lazy_static! {
    // ============================================================================
    // Session Metrics
    // ============================================================================

    /// Live registry entries
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_sessions_active", METRIC_PREFIX),
        "Number of live websocket sessions"
    ).unwrap();

    /// Principals with a live session
    pub static ref PRINCIPALS_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_principals_connected", METRIC_PREFIX),
        "Number of principals holding a live session"
    ).unwrap();

    pub static ref SESSIONS_REGISTERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_registered_total", METRIC_PREFIX),
        "Total sessions registered"
    ).unwrap();

    /// Sessions displaced by a newer connection of the same principal
    pub static ref SESSIONS_EVICTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_evicted_total", METRIC_PREFIX),
        "Total sessions evicted by a reconnect"
    ).unwrap();

    pub static ref SESSIONS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sessions_rejected_total", METRIC_PREFIX),
        "Total session registrations rejected",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // WebSocket Metrics
    // ============================================================================

    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total websocket connections opened"
    ).unwrap();

    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total websocket connections closed"
    ).unwrap();

    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "Websocket connection duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0]
    ).unwrap();

    /// Inbound frames by type
    pub static ref WS_MESSAGES_RECEIVED: IntCounterVec = register_int_counter_vec!(
        format!("{}_ws_messages_received_total", METRIC_PREFIX),
        "Total websocket messages received from clients",
        &["type"]
    ).unwrap();

    pub static ref BROADCASTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_broadcasts_total", METRIC_PREFIX),
        "Total broadcasts by message type",
        &["type"]
    ).unwrap();

    pub static ref MESSAGES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_delivered_total", METRIC_PREFIX),
        "Total messages queued to connections"
    ).unwrap();

    pub static ref MESSAGES_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_failed_total", METRIC_PREFIX),
        "Total messages that could not be queued"
    ).unwrap();

    // ============================================================================
    // Access Metrics
    // ============================================================================

    /// Role guard outcomes (allowed, forbidden, missing_principal)
    pub static ref ACCESS_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_access_decisions_total", METRIC_PREFIX),
        "Total role guard decisions",
        &["outcome"]
    ).unwrap();

    pub static ref AUTH_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_auth_attempts_total", METRIC_PREFIX),
        "Total register and login attempts",
        &["operation", "outcome"]
    ).unwrap();

    // ============================================================================
    // Catalog Metrics
    // ============================================================================

    /// Product writes by operation (create, update, delete) and outcome
    pub static ref PRODUCT_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_product_writes_total", METRIC_PREFIX),
        "Total product write operations",
        &["operation", "outcome"]
    ).unwrap();

    pub static ref IMAGE_UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_image_uploads_total", METRIC_PREFIX),
        "Total product image uploads",
        &["outcome"]
    ).unwrap();

    // ============================================================================
    // Heartbeat & Process Metrics
    // ============================================================================

    pub static ref HEARTBEAT_DURATION_MS: Histogram = register_histogram!(
        format!("{}_heartbeat_duration_ms", METRIC_PREFIX),
        "Heartbeat round duration in milliseconds",
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]
    ).unwrap();

    /// Sessions removed because their outbound channel was closed
    pub static ref HEARTBEAT_REAPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_heartbeat_reaped_total", METRIC_PREFIX),
        "Total dead sessions reaped by the heartbeat task"
    ).unwrap();

    pub static ref PROCESS_MEMORY_BYTES: IntGauge = register_int_gauge!(
        format!("{}_process_memory_bytes", METRIC_PREFIX),
        "Resident memory of the process in bytes"
    ).unwrap();
}
