//! # Switchyard Core
//!
//! The per-request [`Context`] and the handler chain protocol that every
//! route and middleware in Switchyard runs on.
//!
//! - [`Context`] - Request accessors, key/value store, `next`/`abort`, response writer
//! - [`Handler`] / [`HandlerChain`] - The single callable signature and its ordered list
//! - [`RequestId`] - UUID v7 request identifier
//! - [`ContextError`] - Errors recorded by the chain's error hook
//!
//! Handlers are synchronous. A panic inside a handler is not caught here;
//! install a recovery middleware first in the chain if one is wanted.

#![doc(html_root_url = "https://docs.rs/switchyard-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
mod response;

pub use context::{ChainState, Context, RequestId};
pub use error::{BoxError, ContextError};
pub use handler::{chain, handler, Handler, HandlerChain};
pub use response::{json_error, Request, Response, ResponseWriter};
pub use switchyard_router::Params;
