//! Handler and chain types.
//!
//! A handler is any `Fn(&mut Context)`. It reports everything through the
//! context: status, headers, body, abort. Middleware and terminal handlers
//! share the one signature; the difference is only whether they call
//! [`Context::next`].

use std::sync::Arc;

use crate::Context;

/// A shareable unit of request processing.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync + 'static>;

/// An ordered, immutable sequence of handlers run for one route.
pub type HandlerChain = Arc<[Handler]>;

/// Wraps a closure or function as a [`Handler`].
///
/// # Example
///
/// ```
/// use switchyard_core::{handler, Context};
///
/// let hello = handler(|ctx: &mut Context| ctx.text(http::StatusCode::OK, "hello"));
/// # let _ = hello;
/// ```
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Concatenates handler lists into one chain, preserving order.
///
/// ```
/// use switchyard_core::{chain, handler, Context};
///
/// let auth = handler(|ctx: &mut Context| ctx.next());
/// let show = handler(|ctx: &mut Context| ctx.text(http::StatusCode::OK, "ok"));
///
/// let composed = chain([&[auth][..], &[show][..]]);
/// assert_eq!(composed.len(), 2);
/// ```
pub fn chain<'a, I>(parts: I) -> HandlerChain
where
    I: IntoIterator<Item = &'a [Handler]>,
{
    parts
        .into_iter()
        .flat_map(|part| part.iter().cloned())
        .collect::<Vec<_>>()
        .into()
}
