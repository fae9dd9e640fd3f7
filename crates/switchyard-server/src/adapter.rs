//! The boundary between the router and a network server.
//!
//! An [`Adapter`] owns the listening socket and wire protocol. It hands each
//! request to an [`HttpHandler`], which is the router (optionally wrapped
//! for connection tracking). The application shell drives the adapter
//! through `serve` and `shutdown`.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use switchyard_core::{Request, Response};
use thiserror::Error;

use crate::config::ConfigError;

/// A boxed future, as returned by [`Adapter`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// `serve` was called before `set_handler`.
    #[error("no handler installed")]
    NoHandler,

    /// `serve` was called twice.
    #[error("adapter is already serving")]
    AlreadyServing,

    /// TLS serving is not implemented by this adapter.
    #[error("TLS is not supported by this adapter")]
    TlsUnsupported,

    /// Connections were still open when the close timeout expired.
    #[error("{active} connection(s) still open after close timeout")]
    CloseTimeout {
        /// Connections left open
        active: usize,
    },

    /// I/O failure while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was rejected before binding.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Handles one fully-buffered request.
///
/// Implementations are called concurrently from the adapter's workers.
pub trait HttpHandler: Send + Sync + 'static {
    /// Produces the response for `request`.
    fn serve(&self, request: Request) -> Response;
}

impl<F> HttpHandler for F
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    fn serve(&self, request: Request) -> Response {
        self(request)
    }
}

/// A network server that feeds requests to an [`HttpHandler`].
pub trait Adapter: Send + Sync + 'static {
    /// Installs the handler every request is passed to.
    fn set_handler(&self, handler: Arc<dyn HttpHandler>);

    /// Accepts connections until [`shutdown`](Adapter::shutdown) is called.
    fn serve(&self) -> BoxFuture<'_, Result<(), AdapterError>>;

    /// Like [`serve`](Adapter::serve), over TLS.
    fn serve_tls<'a>(
        &'a self,
        cert: &'a Path,
        key: &'a Path,
    ) -> BoxFuture<'a, Result<(), AdapterError>> {
        let _ = (cert, key);
        Box::pin(async { Err(AdapterError::TlsUnsupported) })
    }

    /// Stops accepting and closes the server.
    fn shutdown(&self) -> BoxFuture<'_, Result<(), AdapterError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        handler: Mutex<Option<Arc<dyn HttpHandler>>>,
    }

    impl Adapter for Recorder {
        fn set_handler(&self, handler: Arc<dyn HttpHandler>) {
            *self.handler.lock() = Some(handler);
        }

        fn serve(&self) -> BoxFuture<'_, Result<(), AdapterError>> {
            Box::pin(async { Ok(()) })
        }

        fn shutdown(&self) -> BoxFuture<'_, Result<(), AdapterError>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_serve_tls_defaults_to_unsupported() {
        let adapter = Recorder::default();
        let result = adapter
            .serve_tls(Path::new("cert.pem"), Path::new("key.pem"))
            .await;
        assert!(matches!(result, Err(AdapterError::TlsUnsupported)));
    }

    #[test]
    fn test_closure_is_handler() {
        let adapter = Recorder::default();
        adapter.set_handler(Arc::new(|_req: Request| {
            let mut response = Response::new(Full::new(Bytes::from_static(b"pong")));
            *response.status_mut() = StatusCode::ACCEPTED;
            response
        }));

        let handler = adapter.handler.lock().clone().unwrap();
        let response = handler.serve(Request::new(Bytes::new()));
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AdapterError::CloseTimeout { active: 2 }.to_string(),
            "2 connection(s) still open after close timeout"
        );
        assert_eq!(AdapterError::NoHandler.to_string(), "no handler installed");
    }
}
