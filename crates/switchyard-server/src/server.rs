//! HTTP/1.1 adapter built on Hyper and Tokio.
//!
//! [`HyperAdapter`] binds a TCP listener, serves each connection on its own
//! task, buffers the request body and runs the installed [`HttpHandler`] on
//! the blocking pool, since handlers are synchronous.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchyard_server::{Adapter, HyperAdapter, Router, ServerConfig};
//!
//! let adapter = HyperAdapter::bind(ServerConfig::default()).await?;
//! adapter.set_handler(Arc::new(Router::new()));
//! adapter.serve().await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::{Mutex, RwLock};
use switchyard_core::{json_error, Request, Response};
use tokio::net::{TcpListener, TcpStream};

use crate::adapter::{Adapter, AdapterError, BoxFuture, HttpHandler};
use crate::config::ServerConfig;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Serves HTTP/1.1 over plain TCP.
pub struct HyperAdapter {
    config: ServerConfig,
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    handler: RwLock<Option<Arc<dyn HttpHandler>>>,
    shutdown: ShutdownSignal,
    connections: ConnectionTracker,
}

impl HyperAdapter {
    /// Binds the listener described by `config`.
    ///
    /// Binding happens here rather than in `serve` so the bound address
    /// (e.g. for port 0) is known up front.
    pub async fn bind(config: ServerConfig) -> Result<Self, AdapterError> {
        let addr = config.socket_addr().map_err(|e| AdapterError::Bind {
            addr: config.http_addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AdapterError::Bind {
                addr: config.http_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(addr = %local_addr, "listener bound");

        Ok(Self {
            config,
            local_addr,
            listener: Mutex::new(Some(listener)),
            handler: RwLock::new(None),
            shutdown: ShutdownSignal::new(),
            connections: ConnectionTracker::new(),
        })
    }

    /// Returns the bound address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.connections.active_connections()
    }

    async fn accept_loop(&self) -> Result<(), AdapterError> {
        let handler = self.handler.read().clone().ok_or(AdapterError::NoHandler)?;
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or(AdapterError::AlreadyServing)?;

        tracing::info!(addr = %self.local_addr, "serving");

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote)) => {
                        let token = self.connections.acquire();
                        let handler = Arc::clone(&handler);
                        let shutdown = self.shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, handler, shutdown).await {
                                tracing::debug!(remote = %remote, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                    }
                },

                () = self.shutdown.recv() => {
                    tracing::info!(
                        active_connections = self.connections.active_connections(),
                        "stopped accepting connections"
                    );
                    break;
                }
            }
        }

        Ok(())
    }
}

impl Adapter for HyperAdapter {
    fn set_handler(&self, handler: Arc<dyn HttpHandler>) {
        *self.handler.write() = Some(handler);
    }

    fn serve(&self) -> BoxFuture<'_, Result<(), AdapterError>> {
        Box::pin(self.accept_loop())
    }

    fn shutdown(&self) -> BoxFuture<'_, Result<(), AdapterError>> {
        Box::pin(async move {
            self.shutdown.trigger();
            drop(self.listener.lock().take());

            let timeout = self.config.connection_close_timeout;
            if self.connections.wait_idle_timeout(timeout).await {
                tracing::info!("all connections closed");
                Ok(())
            } else {
                let active = self.connections.active_connections();
                tracing::warn!(active_connections = active, "connections still open after close timeout");
                Err(AdapterError::CloseTimeout { active })
            }
        })
    }
}

async fn serve_connection(
    stream: TcpStream,
    handler: Arc<dyn HttpHandler>,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: http::Request<Incoming>| {
        let handler = Arc::clone(&handler);
        async move { Ok::<_, Infallible>(handle_request(handler, req).await) }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => return result,
        () = shutdown.recv() => {}
    }

    // Finish the in-flight exchange, then close instead of keeping alive
    conn.as_mut().graceful_shutdown();
    conn.await
}

async fn handle_request(handler: Arc<dyn HttpHandler>, req: http::Request<Incoming>) -> Response {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return json_error(
                StatusCode::BAD_REQUEST,
                "BODY_READ_ERROR",
                &format!("failed to read request body: {e}"),
            );
        }
    };

    let request = Request::from_parts(parts, body);
    match tokio::task::spawn_blocking(move || handler.serve(request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "handler panicked");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "request handler failed",
            )
        }
    }
}
