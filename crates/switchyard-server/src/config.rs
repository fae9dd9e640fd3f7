//! Application configuration.
//!
//! [`AppConfig`] groups the adapter, router, shutdown and telemetry
//! settings. It deserializes from TOML with every field optional; missing
//! fields take the defaults below.
//!
//! | Key | Default |
//! |-----|---------|
//! | `server.http_addr` | `"0.0.0.0:8080"` |
//! | `server.connection_close_timeout` | `"5s"` |
//! | `router.trie_enabled` | `true` |
//! | `shutdown.timeout` | `"30s"` |
//! | `shutdown.poll_interval` | `"100ms"` |
//! | `shutdown.drain` | `true` |
//! | `shutdown.signals` | `false` |
//! | `shutdown.signal_buffer` | `1` |
//!
//! # Example
//!
//! ```rust
//! use switchyard_server::AppConfig;
//! use std::time::Duration;
//!
//! let config = AppConfig::from_toml_str(r#"
//!     [server]
//!     http_addr = "127.0.0.1:3000"
//!
//!     [shutdown]
//!     timeout = "10s"
//!     signals = true
//! "#).unwrap();
//!
//! assert_eq!(config.server.http_addr, "127.0.0.1:3000");
//! assert_eq!(config.shutdown.timeout, Duration::from_secs(10));
//! assert_eq!(config.shutdown.poll_interval, Duration::from_millis(100));
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchyard_telemetry::TelemetryConfig;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default graceful shutdown window.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default drain poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default time the adapter waits for open connections after it stops accepting.
pub const DEFAULT_CONNECTION_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The TOML was malformed or had unknown keys.
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP adapter settings.
    pub server: ServerConfig,
    /// Router settings.
    pub router: RouterConfig,
    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,
    /// Logging and metrics settings.
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks values that deserialize but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        self.shutdown.validate()
    }
}

/// HTTP adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub http_addr: String,

    /// How long the adapter waits for open connections to finish after it
    /// stops accepting.
    #[serde(with = "duration_str")]
    pub connection_close_timeout: Duration,
}

impl ServerConfig {
    /// Parses `http_addr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http_addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("http_addr '{}': {e}", self.http_addr)))
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the connection close timeout.
    #[must_use]
    pub fn with_connection_close_timeout(mut self, timeout: Duration) -> Self {
        self.connection_close_timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            connection_close_timeout: DEFAULT_CONNECTION_CLOSE_TIMEOUT,
        }
    }
}

/// Router settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Resolve through the trie. When false, routes are scanned linearly in
    /// registration order.
    pub trie_enabled: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { trie_enabled: true }
    }
}

/// Graceful shutdown settings.
///
/// ```rust
/// use switchyard_server::ShutdownConfig;
/// use std::time::Duration;
///
/// let config = ShutdownConfig::default()
///     .with_timeout(Duration::from_secs(2))
///     .with_poll_interval(Duration::from_millis(10));
/// assert!(config.drain);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    /// Upper bound on the drain phase.
    #[serde(with = "duration_str")]
    pub timeout: Duration,

    /// How often the drain loop re-reads the connection count.
    #[serde(with = "duration_str")]
    pub poll_interval: Duration,

    /// Wait for tracked requests before closing the adapter.
    pub drain: bool,

    /// Trigger shutdown on SIGTERM/SIGINT.
    pub signals: bool,

    /// Capacity of the signal channel.
    pub signal_buffer: usize,
}

impl ShutdownConfig {
    /// Sets the drain timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the drain poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enables or disables draining.
    #[must_use]
    pub fn with_drain(mut self, drain: bool) -> Self {
        self.drain = drain;
        self
    }

    /// Enables or disables OS signal handling.
    #[must_use]
    pub fn with_signals(mut self, signals: bool) -> Self {
        self.signals = signals;
        self
    }

    /// Sets the signal channel capacity.
    #[must_use]
    pub fn with_signal_buffer(mut self, buffer: usize) -> Self {
        self.signal_buffer = buffer;
        self
    }

    /// Rejects a zero poll interval or signal buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "shutdown.poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.signal_buffer == 0 {
            return Err(ConfigError::Invalid(
                "shutdown.signal_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drain: true,
            signals: false,
            signal_buffer: 1,
        }
    }
}

/// Durations as strings: `"250ms"`, `"30s"`, `"5m"`, `"1h"`, or bare seconds.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let (number, scale): (&str, fn(u64) -> Option<Duration>) =
            if let Some(n) = s.strip_suffix("ms") {
                (n, |n| Some(Duration::from_millis(n)))
            } else if let Some(n) = s.strip_suffix('s') {
                (n, |n| Some(Duration::from_secs(n)))
            } else if let Some(n) = s.strip_suffix('m') {
                (n, |n| n.checked_mul(60).map(Duration::from_secs))
            } else if let Some(n) = s.strip_suffix('h') {
                (n, |n| n.checked_mul(3600).map(Duration::from_secs))
            } else {
                (s, |n| Some(Duration::from_secs(n)))
            };

        let n: u64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration '{s}'"))?;
        scale(n).ok_or_else(|| format!("duration '{s}' overflows"))
    }
}
