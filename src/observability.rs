use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: booking-engine operations. Labels: op, outcome.
pub const DECISIONS_TOTAL: &str = "innkeep_decisions_total";

/// Histogram: validate-and-commit latency in seconds. Labels: op.
pub const DECISION_DURATION_SECONDS: &str = "innkeep_decision_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: listings currently registered with the engine.
pub const LISTINGS_ACTIVE: &str = "innkeep_listings_active";

/// Histogram: journal group-commit flush duration in seconds.
pub const JOURNAL_FLUSH_DURATION_SECONDS: &str = "innkeep_journal_flush_duration_seconds";

/// Histogram: journal group-commit batch size (events per flush).
pub const JOURNAL_FLUSH_BATCH_SIZE: &str = "innkeep_journal_flush_batch_size";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
