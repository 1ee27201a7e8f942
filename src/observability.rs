use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::BuildError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: engine operations executed. Labels: op, status.
pub const OPERATIONS_TOTAL: &str = "roombook_operations_total";

/// Histogram: engine operation latency in seconds. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "roombook_operation_duration_seconds";

/// Counter: bulk loads attempted. Labels: status.
pub const BULK_LOADS_TOTAL: &str = "roombook_bulk_loads_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: bookings currently stored.
pub const BOOKINGS_ACTIVE: &str = "roombook_bookings_active";

/// Gauge: overlapping pairs found by the most recent overlap report.
pub const OVERLAPS_REPORTED: &str = "roombook_overlaps_reported";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "roombook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "roombook_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

pub fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "ok" } else { "error" }
}

/// Count one operation and record how long it took.
pub fn record_operation<T, E>(op: &'static str, started: Instant, result: &Result<T, E>) {
    metrics::counter!(OPERATIONS_TOTAL, "op" => op, "status" => status_label(result)).increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}
