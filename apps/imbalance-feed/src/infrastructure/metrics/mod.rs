//! Prometheus Metrics Module
//!
//! Exposes pipeline metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Input**: Lines read and records aggregated per log
//! - **Sessions**: Live sessions completed and discarded by latest-wins
//! - **Pump**: Updates sent, terminal failures, iteration duration
//! - **Chart**: Historical series length, updates applied
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Calling this again returns the handle installed by the first call.
///
/// # Errors
///
/// Returns `BuildError` if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Input
    describe_counter!(
        "imbalance_feed_lines_read_total",
        "Complete lines read from each log"
    );
    describe_counter!(
        "imbalance_feed_records_total",
        "Records aggregated into chart rows, by log"
    );

    // Sessions
    describe_counter!(
        "imbalance_feed_sessions_completed_total",
        "Live sessions completed"
    );
    describe_counter!(
        "imbalance_feed_sessions_discarded_total",
        "Completed live sessions superseded within one iteration"
    );

    // Pump
    describe_counter!(
        "imbalance_feed_updates_sent_total",
        "Update messages handed to the dispatcher"
    );
    describe_counter!(
        "imbalance_feed_pump_failures_total",
        "Update pump terminal failures"
    );
    describe_histogram!(
        "imbalance_feed_iteration_seconds",
        "Duration of one pump iteration, excluding the cadence sleep"
    );

    // Chart
    describe_gauge!(
        "imbalance_feed_historical_rows",
        "Rows in the historical series"
    );
    describe_counter!(
        "imbalance_feed_updates_applied_total",
        "Update messages applied to the sinks"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric label for the log a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// The historical log.
    Historical,
    /// The live log.
    Live,
}

impl LogKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Live => "live",
        }
    }
}

/// Record complete lines read from a log.
pub fn record_lines(log: LogKind, count: usize) {
    counter!("imbalance_feed_lines_read_total", "log" => log.as_str()).increment(count as u64);
}

/// Record records aggregated from a log.
pub fn record_records(log: LogKind, count: usize) {
    counter!("imbalance_feed_records_total", "log" => log.as_str()).increment(count as u64);
}

/// Record completed live sessions.
pub fn record_sessions_completed(count: u64) {
    counter!("imbalance_feed_sessions_completed_total").increment(count);
}

/// Record a live session superseded by a later one in the same iteration.
pub fn record_session_discarded() {
    counter!("imbalance_feed_sessions_discarded_total").increment(1);
}

/// Record an update handed to the dispatcher.
pub fn record_update_sent() {
    counter!("imbalance_feed_updates_sent_total").increment(1);
}

/// Record a terminal pump failure.
pub fn record_pump_failure() {
    counter!("imbalance_feed_pump_failures_total").increment(1);
}

/// Record the duration of one pump iteration.
pub fn record_iteration_duration(duration: Duration) {
    histogram!("imbalance_feed_iteration_seconds").record(duration.as_secs_f64());
}

/// Update the historical series length.
#[allow(clippy::cast_precision_loss)]
pub fn set_historical_rows(count: usize) {
    gauge!("imbalance_feed_historical_rows").set(count as f64);
}

/// Record an update applied by the dispatcher.
pub fn record_update_applied() {
    counter!("imbalance_feed_updates_applied_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================
