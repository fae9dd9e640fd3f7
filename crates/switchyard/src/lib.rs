//! # Switchyard
//!
//! **Trie routing, middleware chains and graceful shutdown for HTTP services**
//!
//! Switchyard provides:
//!
//! - **Segment trie routing** with named, optional, regex-constrained and
//!   wildcard parameters, plus 405 detection
//! - **Handler chains** where middleware and endpoints share one signature
//!   and control flow through `next` and `abort`
//! - **Route groups** with prefixes and inherited middleware
//! - **Static files** with traversal protection
//! - **Graceful shutdown** that drains tracked requests before closing the
//!   server
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchyard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_file("switchyard.toml")?;
//!     init_telemetry(&config.telemetry)?;
//!
//!     let router = Router::with_config(config.router);
//!     router.get("/users/:id", [handler(|ctx: &mut Context| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.text(StatusCode::OK, id);
//!     })])?;
//!
//!     let app = Arc::new(App::bind(&config, router).await?);
//!     app.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Adapter ──▶ App (tracking) ──▶ Router::dispatch ──▶ find ──▶ Context::run
//!                                                      │
//!                                        404 / 405 ◀───┘
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export the context and handler protocol
pub use switchyard_core as core;

// Re-export the pattern trie
pub use switchyard_router as router;

// Re-export the router, adapters and application shell
pub use switchyard_server as server;

// Re-export logging and metrics setup
pub use switchyard_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use switchyard::prelude::*;
///
/// let router = Router::new();
/// router.get("/", [handler(|ctx: &mut Context| ctx.text(StatusCode::OK, "hi"))]).unwrap();
/// assert_eq!(router.route_count(), 1);
/// ```
pub mod prelude {
    pub use switchyard_core::{
        chain, handler, json_error, Context, Handler, HandlerChain, Params, Request, RequestId,
        Response,
    };

    pub use switchyard_router::{Pattern, PatternError};

    pub use switchyard_server::{
        Adapter, AdapterError, App, AppConfig, HttpHandler, HyperAdapter, RouteError, Router,
        RouterConfig, ServerConfig, ShutdownConfig, ShutdownReport,
    };

    pub use switchyard_telemetry::{init_telemetry, TelemetryConfig};

    pub use http::{Method, StatusCode};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_prelude_round_trip() {
        let router = Router::new();
        let api = router.group("/api");
        api.get(
            "/greet/:name",
            [handler(|ctx: &mut Context| {
                let name = ctx.param("name").unwrap_or("stranger").to_string();
                ctx.text(StatusCode::OK, format!("hello {name}"));
            })],
        )
        .unwrap();

        let request = http::Request::get("/api/greet/ada")
            .body(bytes::Bytes::new())
            .unwrap();
        let response = router.dispatch(request);
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello ada");
    }
}
