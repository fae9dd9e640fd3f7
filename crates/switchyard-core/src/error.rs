//! Errors recorded on a request context.
//!
//! Handlers report failures through [`Context::abort_with_error`], which
//! stores a [`ContextError`] and stops the chain. Later middleware (an error
//! renderer, a logger) reads them back through [`Context::errors`].
//!
//! [`Context::abort_with_error`]: crate::Context::abort_with_error
//! [`Context::errors`]: crate::Context::errors

use http::StatusCode;
use thiserror::Error;

/// Boxed error type accepted by the error hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error recorded while running a handler chain.
#[derive(Debug, Error)]
#[error("{status}: {source}")]
pub struct ContextError {
    status: StatusCode,
    source: BoxError,
}

impl ContextError {
    /// Creates a new error record.
    pub fn new(status: StatusCode, source: impl Into<BoxError>) -> Self {
        Self {
            status,
            source: source.into(),
        }
    }

    /// Returns the status the error mapped to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the underlying error.
    #[must_use]
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}
