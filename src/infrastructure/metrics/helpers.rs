//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use crate::session::SessionStats;

use super::{
    ACCESS_DECISIONS_TOTAL, AUTH_ATTEMPTS_TOTAL, BROADCASTS_TOTAL, HEARTBEAT_DURATION_MS,
    HEARTBEAT_REAPED_TOTAL, IMAGE_UPLOADS_TOTAL, MESSAGES_DELIVERED_TOTAL, MESSAGES_FAILED_TOTAL,
    PRINCIPALS_CONNECTED, PROCESS_MEMORY_BYTES, PRODUCT_WRITES_TOTAL, SESSIONS_ACTIVE,
    SESSIONS_EVICTED_TOTAL, SESSIONS_REGISTERED_TOTAL, SESSIONS_REJECTED_TOTAL,
    WS_MESSAGES_RECEIVED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for session registry metrics
pub struct SessionMetrics;

impl SessionMetrics {
    pub fn record_registered() {
        SESSIONS_REGISTERED_TOTAL.inc();
    }

    pub fn record_evicted() {
        SESSIONS_EVICTED_TOTAL.inc();
    }

    /// `reason` is one of not_found, inactive, lookup
    pub fn record_rejected(reason: &str) {
        SESSIONS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn set_from_stats(stats: &SessionStats) {
        SESSIONS_ACTIVE.set(stats.total_connections as i64);
        PRINCIPALS_CONNECTED.set(stats.unique_principals as i64);
    }
}

/// Helper struct for recording WebSocket message metrics
pub struct WsMessageMetrics;

impl WsMessageMetrics {
    pub fn record_chat() {
        WS_MESSAGES_RECEIVED
            .with_label_values(&["message-from-client"])
            .inc();
    }

    pub fn record_ping() {
        WS_MESSAGES_RECEIVED.with_label_values(&["ping"]).inc();
    }

    /// Unparseable or unsupported frame
    pub fn record_invalid() {
        WS_MESSAGES_RECEIVED.with_label_values(&["invalid"]).inc();
    }
}

/// Helper struct for broadcast fan-out metrics
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    pub fn record(message_type: &str, delivered: u64, failed: u64) {
        BROADCASTS_TOTAL.with_label_values(&[message_type]).inc();
        MESSAGES_DELIVERED_TOTAL.inc_by(delivered);
        if failed > 0 {
            MESSAGES_FAILED_TOTAL.inc_by(failed);
        }
    }
}

/// Helper struct for role guard outcomes
pub struct AccessMetrics;

impl AccessMetrics {
    pub fn record_allowed() {
        ACCESS_DECISIONS_TOTAL.with_label_values(&["allowed"]).inc();
    }

    pub fn record_forbidden() {
        ACCESS_DECISIONS_TOTAL.with_label_values(&["forbidden"]).inc();
    }

    pub fn record_missing_principal() {
        ACCESS_DECISIONS_TOTAL
            .with_label_values(&["missing_principal"])
            .inc();
    }
}

/// Helper struct for register/login attempts
pub struct AuthMetrics;

impl AuthMetrics {
    pub fn record_register(success: bool) {
        AUTH_ATTEMPTS_TOTAL
            .with_label_values(&["register", outcome(success)])
            .inc();
    }

    pub fn record_login(success: bool) {
        AUTH_ATTEMPTS_TOTAL
            .with_label_values(&["login", outcome(success)])
            .inc();
    }
}

pub struct CatalogMetrics;

impl CatalogMetrics {
    pub fn record_product_write(operation: &str, success: bool) {
        PRODUCT_WRITES_TOTAL
            .with_label_values(&[operation, outcome(success)])
            .inc();
    }

    pub fn record_upload(success: bool) {
        IMAGE_UPLOADS_TOTAL
            .with_label_values(&[outcome(success)])
            .inc();
    }
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Helper struct for heartbeat metrics
pub struct HeartbeatMetrics;

impl HeartbeatMetrics {
    /// Record heartbeat round duration
    pub fn record_duration_ms(duration_ms: u64) {
        HEARTBEAT_DURATION_MS.observe(duration_ms as f64);
    }

    pub fn record_reaped(count: u64) {
        HEARTBEAT_REAPED_TOTAL.inc_by(count);
    }
}

/// Helper struct for memory metrics
pub struct MemoryMetrics;

impl MemoryMetrics {
    /// Update process memory metric (call periodically)
    pub fn update_process_memory() {
        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
                let rss_kb = status
                    .lines()
                    .find(|line| line.starts_with("VmRSS:"))
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<i64>().ok());

                if let Some(kb) = rss_kb {
                    PROCESS_MEMORY_BYTES.set(kb * 1024);
                }
            }
        }
    }
}
