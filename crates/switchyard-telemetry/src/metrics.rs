//! Dispatch and shutdown metrics.
//!
//! Recording goes through the `metrics` facade, so every function here is a
//! cheap no-op until a recorder is installed. [`init_metrics`] installs the
//! Prometheus exporter; applications with their own recorder skip it.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `switchyard_requests_total` | Counter | `outcome`, `status` | Dispatched requests |
//! | `switchyard_request_duration_seconds` | Histogram | `outcome` | Dispatch latency |
//! | `switchyard_in_flight_requests` | Gauge | - | Requests currently running |
//! | `switchyard_shutdowns_total` | Counter | `result` | Graceful shutdown runs |

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of dispatched requests.
pub const REQUESTS_TOTAL: &str = "switchyard_requests_total";
/// Histogram of dispatch latency.
pub const REQUEST_DURATION_SECONDS: &str = "switchyard_request_duration_seconds";
/// Gauge of requests currently running.
pub const IN_FLIGHT_REQUESTS: &str = "switchyard_in_flight_requests";
/// Counter of graceful shutdown runs.
pub const SHUTDOWNS_TOTAL: &str = "switchyard_shutdowns_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// How a dispatched request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A route matched and its chain ran.
    Matched,
    /// No route matched the path.
    NotFound,
    /// The path matched, but not for the request method.
    MethodNotAllowed,
}

impl DispatchOutcome {
    /// Returns the label value used in metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }
}

/// Metrics configuration (`[telemetry.metrics]`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder.
    pub enabled: bool,

    /// Route that serves [`render_metrics`], e.g. `"/metrics"`.
    pub path: String,

    /// Histogram buckets for dispatch duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/metrics".to_string(),
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// Does nothing when `config.enabled` is false. The recorder does not open
/// a listener of its own; mount [`render_metrics`] on a route instead.
///
/// # Errors
///
/// Returns [`TelemetryError::Recorder`] if the buckets are empty or another
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::Recorder(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::Recorder(e.to_string()))?;

    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("metrics recorder initialized twice; keeping the first handle");
    }
    describe_metrics();
    tracing::debug!(path = %config.path, "metrics recorder installed");
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if [`init_metrics`] has not installed the exporter.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of dispatched requests");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "Time from dispatch to response, in seconds"
    );
    describe_gauge!(IN_FLIGHT_REQUESTS, "Requests currently running");
    describe_counter!(SHUTDOWNS_TOTAL, "Graceful shutdown runs by result");
}

/// Records one dispatched request.
pub fn record_dispatch(outcome: DispatchOutcome, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "outcome" => outcome.as_str(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "outcome" => outcome.as_str())
        .record(duration.as_secs_f64());
}

/// Records one finished shutdown sequence.
///
/// `result` is `"complete"` or `"error"`.
pub fn record_shutdown(result: &'static str) {
    counter!(SHUTDOWNS_TOTAL, "result" => result).increment(1);
}

/// Guard that holds the in-flight gauge up while alive.
///
/// Decrements on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.path, "/metrics");
        assert_eq!(config.duration_buckets.len(), 12);
    }

    #[test]
    fn test_disabled_init_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let config = MetricsConfig {
            enabled: true,
            duration_buckets: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::Recorder(_))
        ));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(DispatchOutcome::Matched.as_str(), "matched");
        assert_eq!(DispatchOutcome::NotFound.as_str(), "not_found");
        assert_eq!(
            DispatchOutcome::MethodNotAllowed.as_str(),
            "method_not_allowed"
        );
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_dispatch(DispatchOutcome::Matched, 200, Duration::from_millis(3));
        record_dispatch(DispatchOutcome::NotFound, 404, Duration::ZERO);
        record_shutdown("complete");
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
