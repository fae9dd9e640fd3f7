//! # Switchyard Server
//!
//! Routing, dispatch and lifecycle for Switchyard applications.
//!
//! This crate puts the pieces together:
//!
//! - [`Router`]: route registration, groups, middleware, static files and
//!   404/405 handling on top of `switchyard-router`
//! - [`Adapter`]: the contract a network server implements, with
//!   [`HyperAdapter`] as the bundled HTTP/1.1 implementation
//! - [`App`]: connection tracking and graceful shutdown
//! - [`AppConfig`]: TOML configuration for all of the above
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use http::StatusCode;
//! use switchyard_core::{handler, Context};
//! use switchyard_server::{App, AppConfig, Router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_file("switchyard.toml")?;
//!
//!     let router = Router::with_config(config.router);
//!     let api = router.group("/api/v1");
//!     api.get("/health", [handler(|ctx: &mut Context| {
//!         ctx.text(StatusCode::OK, "ok");
//!     })])?;
//!
//!     let app = Arc::new(App::bind(&config, router).await?);
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod app;
pub mod config;
pub mod router;
pub mod server;
pub mod shutdown;
pub mod static_files;

pub use adapter::{Adapter, AdapterError, BoxFuture, HttpHandler};
pub use app::{App, AppState, ShutdownError, ShutdownReport};
pub use config::{AppConfig, ConfigError, RouterConfig, ServerConfig, ShutdownConfig};
pub use router::{RouteError, RouteInfo, RouteLookup, Router, ANY_METHODS, STATIC_CAPTURE};
pub use server::HyperAdapter;
pub use shutdown::{wait_for_os_signal, ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use static_files::{StaticFile, StaticFileError, StaticFiles};
