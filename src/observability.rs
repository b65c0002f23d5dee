use std::net::SocketAddr;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservation inserts/updates attempted. Labels: status.
pub const RESERVATIONS_TOTAL: &str = "slotguard_reservations_total";

/// Histogram: ledger operation latency in seconds. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "slotguard_operation_duration_seconds";

/// Counter: reservations evicted by priority resolution.
pub const EVICTIONS_TOTAL: &str = "slotguard_evictions_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: reservations currently stored.
pub const RESERVATIONS_ACTIVE: &str = "slotguard_reservations_active";

/// Gauge: registered resources.
pub const RESOURCES_ACTIVE: &str = "slotguard_resources_active";

/// Gauge: overlapping pairs found by the last full conflict scan.
pub const CONFLICTS_DETECTED: &str = "slotguard_conflicts_detected";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::error!("failed to install Prometheus exporter: {e}"),
    }
}

/// Map an operation outcome to a short status label.
pub fn status_label<T>(result: &Result<T, EngineError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(EngineError::UnknownResource(_)) => "unknown_resource",
        Err(EngineError::AlreadyExists(_)) => "already_exists",
        Err(EngineError::Conflict { .. }) => "conflict",
        Err(EngineError::NotFound(_)) => "not_found",
        Err(EngineError::InvalidRange { .. }) => "invalid_range",
        Err(EngineError::InvalidPriority(_)) => "invalid_priority",
        Err(EngineError::NoAlternative(_)) => "no_alternative",
        Err(EngineError::LimitExceeded(_)) => "limit_exceeded",
    }
}
