//! The application shell: one router, one adapter, graceful shutdown.
//!
//! # Shutdown sequence
//!
//! ```text
//! Running ─▶ ShutdownRequested ─▶ Draining ─▶ Shutdown
//! ```
//!
//! 1. `on_shutdown_start` runs.
//! 2. If draining is enabled, the tracked-request count is polled every
//!    `poll_interval` until it reaches zero or `timeout` elapses.
//! 3. [`Adapter::shutdown`] is called, whether or not the drain finished.
//! 4. Exactly one of `on_shutdown_complete` or `on_shutdown_error` runs,
//!    depending on the adapter's result.
//!
//! Only the first call to [`App::shutdown`] runs the sequence.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchyard_server::{App, AppConfig, Router};
//!
//! let config = AppConfig::from_file("switchyard.toml")?;
//! let router = Router::with_config(config.router);
//! let app = Arc::new(
//!     App::bind(&config, router)
//!         .await?
//!         .on_shutdown_complete(|report| tracing::info!(?report, "bye")),
//! );
//! app.run().await?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use switchyard_core::{Request, Response};
use switchyard_telemetry::metrics::record_shutdown;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::adapter::{Adapter, AdapterError, HttpHandler};
use crate::config::{AppConfig, ConfigError, ShutdownConfig};
use crate::router::Router;
use crate::server::HyperAdapter;
use crate::shutdown::{wait_for_os_signal, ConnectionTracker};

/// Lifecycle state of an [`App`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Serving normally.
    Running,
    /// Shutdown was triggered; callbacks are starting.
    ShutdownRequested,
    /// Waiting for tracked requests to finish.
    Draining,
    /// The adapter has been closed.
    Shutdown,
}

/// Errors from the shutdown sequence.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The adapter failed to close.
    #[error("adapter shutdown failed: {0}")]
    Adapter(#[from] AdapterError),
}

/// Outcome of a completed shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// True if the count reached zero before the timeout (or draining was off).
    pub drained: bool,
    /// Tracked requests still running when the adapter was closed.
    pub remaining: usize,
    /// Time from trigger to adapter closed.
    pub elapsed: Duration,
}

type StartCallback = Arc<dyn Fn() + Send + Sync>;
type CompleteCallback = Arc<dyn Fn(&ShutdownReport) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&ShutdownError) + Send + Sync>;

#[derive(Default, Clone)]
struct Callbacks {
    on_start: Option<StartCallback>,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

struct Lifecycle {
    state: AppState,
    config: ShutdownConfig,
    report: Option<ShutdownReport>,
}

/// Owns a router and an adapter and coordinates graceful shutdown.
///
/// Methods take `&self`; share the app with `Arc` to call
/// [`shutdown`](Self::shutdown) while [`run`](Self::run) is pending.
pub struct App {
    router: Router,
    adapter: Arc<dyn Adapter>,
    tracker: ConnectionTracker,
    lifecycle: Mutex<Lifecycle>,
    callbacks: Callbacks,
}

impl App {
    /// Creates an app with default shutdown settings.
    pub fn new(router: Router, adapter: Arc<dyn Adapter>) -> Self {
        Self {
            router,
            adapter,
            tracker: ConnectionTracker::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: AppState::Running,
                config: ShutdownConfig::default(),
                report: None,
            }),
            callbacks: Callbacks::default(),
        }
    }

    /// Binds a [`HyperAdapter`] from `config.server` and applies
    /// `config.shutdown`.
    ///
    /// The whole config is validated before the listener is bound.
    pub async fn bind(config: &AppConfig, router: Router) -> Result<Self, AdapterError> {
        config.validate()?;
        let adapter = HyperAdapter::bind(config.server.clone()).await?;
        let app = Self::new(router, Arc::new(adapter)).with_shutdown_config(config.shutdown.clone())?;
        Ok(app)
    }

    /// Replaces the shutdown settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero `poll_interval` or
    /// `signal_buffer`; the app keeps its previous settings.
    pub fn with_shutdown_config(self, config: ShutdownConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.lifecycle.lock().config = config;
        Ok(self)
    }

    /// Sets the callback run when shutdown starts.
    #[must_use]
    pub fn on_shutdown_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_start = Some(Arc::new(f));
        self
    }

    /// Sets the callback run when the adapter closed cleanly.
    #[must_use]
    pub fn on_shutdown_complete(
        mut self,
        f: impl Fn(&ShutdownReport) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_complete = Some(Arc::new(f));
        self
    }

    /// Sets the callback run when the adapter failed to close.
    #[must_use]
    pub fn on_shutdown_error(mut self, f: impl Fn(&ShutdownError) + Send + Sync + 'static) -> Self {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AppState {
        self.lifecycle.lock().state
    }

    /// Returns a copy of the shutdown settings.
    #[must_use]
    pub fn shutdown_config(&self) -> ShutdownConfig {
        self.lifecycle.lock().config.clone()
    }

    /// Returns the report of the finished shutdown, if any.
    #[must_use]
    pub fn shutdown_report(&self) -> Option<ShutdownReport> {
        self.lifecycle.lock().report.clone()
    }

    /// Returns the number of tracked requests in flight.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.tracker.active_connections()
    }

    /// Returns the tracker behind [`active_connections`](Self::active_connections).
    ///
    /// Holding a token from [`ConnectionTracker::acquire`] counts as one
    /// tracked request until the token is dropped.
    #[must_use]
    pub fn connections(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Runs `f` as one tracked request.
    ///
    /// The count is held for the duration of `f`, and released even if `f`
    /// panics.
    pub fn track<R>(&self, f: impl FnOnce() -> R) -> R {
        let _token = self.tracker.acquire();
        f()
    }

    /// Returns the handler installed into the adapter.
    ///
    /// With draining enabled every request is tracked; otherwise the router
    /// is used directly.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn HttpHandler> {
        if self.lifecycle.lock().config.drain {
            Arc::new(TrackedRouter {
                router: self.router.clone(),
                tracker: self.tracker.clone(),
            })
        } else {
            Arc::new(self.router.clone())
        }
    }

    /// Installs the handler and serves until the adapter stops.
    ///
    /// With signals enabled, SIGTERM/SIGINT (Ctrl-C elsewhere) trigger
    /// [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> Result<(), AdapterError> {
        self.adapter.set_handler(self.handler());

        let config = self.shutdown_config();
        let mut signals = if config.signals {
            let (tx, rx) = mpsc::channel(config.signal_buffer);
            tokio::spawn(async move {
                if let Some(name) = wait_for_os_signal().await {
                    let _ = tx.send(name).await;
                }
            });
            Some(rx)
        } else {
            None
        };

        tracing::info!(
            drain = config.drain,
            signals = config.signals,
            timeout_ms = config.timeout.as_millis() as u64,
            "application running"
        );

        let serve = self.adapter.serve();
        tokio::pin!(serve);

        tokio::select! {
            result = serve.as_mut() => result,
            Some(name) = recv_signal(&mut signals) => {
                tracing::info!(signal = name, "received signal, starting graceful shutdown");
                // Keep accepting while draining; the adapter closes at the end
                let (result, shutdown) = tokio::join!(serve.as_mut(), self.shutdown());
                if let Err(e) = shutdown {
                    tracing::error!(error = %e, "graceful shutdown failed");
                }
                result
            }
        }
    }

    /// Runs the shutdown sequence once; later calls return `Ok(())`.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let config = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != AppState::Running {
                tracing::debug!(state = ?lifecycle.state, "shutdown already requested");
                return Ok(());
            }
            lifecycle.state = AppState::ShutdownRequested;
            lifecycle.config.clone()
        };

        let started = Instant::now();
        tracing::info!(
            active_connections = self.tracker.active_connections(),
            "shutdown requested"
        );
        if let Some(on_start) = &self.callbacks.on_start {
            on_start();
        }

        self.set_state(AppState::Draining);
        let deadline = started + config.timeout;
        let drained = if config.drain {
            self.drain(deadline, config.poll_interval).await
        } else {
            true
        };
        let remaining = self.tracker.active_connections();
        if drained {
            tracing::info!("drain complete");
        } else {
            tracing::warn!(
                active_connections = remaining,
                "drain timed out; closing adapter anyway"
            );
        }

        let result = self.adapter.shutdown().await;
        let report = ShutdownReport {
            drained,
            remaining,
            elapsed: started.elapsed(),
        };
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.state = AppState::Shutdown;
            lifecycle.report = Some(report.clone());
        }

        match result {
            Ok(()) => {
                tracing::info!(
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    drained = report.drained,
                    "shutdown complete"
                );
                record_shutdown("complete");
                if let Some(on_complete) = &self.callbacks.on_complete {
                    on_complete(&report);
                }
                Ok(())
            }
            Err(e) => {
                let error = ShutdownError::from(e);
                tracing::error!(error = %error, "shutdown failed");
                record_shutdown("error");
                if let Some(on_error) = &self.callbacks.on_error {
                    on_error(&error);
                }
                Err(error)
            }
        }
    }

    fn set_state(&self, state: AppState) {
        self.lifecycle.lock().state = state;
    }

    /// Polls the tracker until it is idle or `deadline` passes.
    async fn drain(&self, deadline: Instant, poll_interval: Duration) -> bool {
        loop {
            let active = self.tracker.active_connections();
            if active == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tracing::debug!(active_connections = active, "draining");
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("state", &self.state())
            .field("active_connections", &self.active_connections())
            .finish_non_exhaustive()
    }
}

async fn recv_signal(signals: &mut Option<mpsc::Receiver<&'static str>>) -> Option<&'static str> {
    match signals {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Dispatches through the router while holding a connection token.
struct TrackedRouter {
    router: Router,
    tracker: ConnectionTracker,
}

impl HttpHandler for TrackedRouter {
    fn serve(&self, request: Request) -> Response {
        let _token = self.tracker.acquire();
        self.router.dispatch(request)
    }
}
