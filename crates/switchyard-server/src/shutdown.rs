//! Shutdown signalling and in-flight accounting.
//!
//! [`ShutdownSignal`] is a one-shot latch that any number of tasks can wait
//! on. [`ConnectionTracker`] is the atomic in-flight counter the drain loop
//! polls; it only changes through RAII [`ConnectionToken`]s, so the count
//! can never go negative and a panicking handler still releases its unit.
//!
//! ```rust
//! use switchyard_server::shutdown::{ConnectionTracker, ShutdownSignal};
//!
//! let tracker = ConnectionTracker::new();
//! let token = tracker.acquire();
//! assert_eq!(tracker.active_connections(), 1);
//! drop(token);
//! assert_eq!(tracker.active_connections(), 0);
//!
//! let signal = ShutdownSignal::new();
//! signal.trigger();
//! assert!(signal.is_shutdown());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};

/// A latch that flips from "running" to "stopping" exactly once.
///
/// Clones share the latch.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    latch: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates an open latch.
    #[must_use]
    pub fn new() -> Self {
        let (latch, _) = watch::channel(false);
        Self {
            latch: Arc::new(latch),
        }
    }

    /// Closes the latch and wakes every waiter. Later calls do nothing.
    pub fn trigger(&self) {
        self.latch.send_if_modified(|stopping| !std::mem::replace(stopping, true));
    }

    /// Returns `true` once [`trigger`](Self::trigger) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.latch.borrow()
    }

    /// Completes when the latch is closed, immediately if it already is.
    pub async fn recv(&self) {
        let mut rx = self.latch.subscribe();
        // The sender lives in `self`, so this cannot fail while we wait
        let _ = rx.wait_for(|stopping| *stopping).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for an OS termination signal.
///
/// SIGTERM or SIGINT on Unix, Ctrl-C elsewhere. Returns the signal's name,
/// or `None` (after logging) if the handler could not be installed.
pub async fn wait_for_os_signal() -> Option<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut term, mut int) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "cannot listen for termination signals");
                return None;
            }
        };

        tokio::select! {
            _ = term.recv() => Some("SIGTERM"),
            _ = int.recv() => Some("SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            return None;
        }
        Some("ctrl-c")
    }
}

/// Atomic count of in-flight connections or requests.
///
/// Clones share the count.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    in_flight: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one unit of work until the returned token is dropped.
    #[must_use = "the count is released as soon as the token is dropped"]
    pub fn acquire(&self) -> ConnectionToken {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        ConnectionToken {
            tracker: self.clone(),
        }
    }

    /// Returns the current count.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Completes once the count is zero.
    pub async fn wait_idle(&self) {
        loop {
            // Register before reading so a release in between is not lost
            let drained = self.drained.notified();
            if self.active_connections() == 0 {
                return;
            }
            drained.await;
        }
    }

    /// [`wait_idle`](Self::wait_idle) bounded by `timeout`; `true` if idle in time.
    pub async fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }

    fn release(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// One unit of a [`ConnectionTracker`]'s count, released on drop
/// (including during unwinding).
#[derive(Debug)]
pub struct ConnectionToken {
    tracker: ConnectionTracker,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        self.tracker.release();
    }
}
