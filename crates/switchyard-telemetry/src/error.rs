//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Directive as configured
        filter: String,
        /// Parser message
        message: String,
    },

    /// A global subscriber was already installed, or installing failed.
    #[error("cannot install log subscriber: {0}")]
    Subscriber(String),

    /// The Prometheus recorder could not be built or installed.
    #[error("cannot install metrics recorder: {0}")]
    Recorder(String),
}
