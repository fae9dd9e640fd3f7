//! Logging and metrics setup for Switchyard applications.
//!
//! The router and the application shell always emit `tracing` events and
//! `metrics` samples. Nothing reaches an output until this crate installs a
//! subscriber ([`init_logging`]) or a Prometheus recorder ([`init_metrics`]).
//!
//! ```rust,ignore
//! use switchyard_telemetry::{init_telemetry, LogConfig, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig {
//!     logging: LogConfig::development(),
//!     ..TelemetryConfig::default()
//! })?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

use serde::Deserialize;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, DispatchOutcome, InFlightGuard, MetricsConfig};

/// Shorthand for results in this crate.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// The `[telemetry]` table.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `[telemetry.logging]`
    pub logging: LogConfig,
    /// `[telemetry.metrics]`
    pub metrics: MetricsConfig,
}

/// Installs the log subscriber, then the metrics recorder.
///
/// Either step is skipped when its section is disabled.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)
}
