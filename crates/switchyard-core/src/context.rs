//! Per-request context and the handler chain protocol.
//!
//! A [`Context`] is created for every dispatched request and owned by the
//! chain that runs on it. Handlers drive the chain explicitly:
//!
//! - [`Context::next`] runs the following handler, synchronously, and
//!   returns when it returns.
//! - A handler that returns without calling `next` ends the chain there.
//! - [`Context::abort`] guarantees that no later handler runs, even if the
//!   current one calls `next` afterwards.
//!
//! ```
//! use std::sync::Arc;
//! use http::StatusCode;
//! use switchyard_core::{handler, Context, Handler, Request};
//!
//! let auth = handler(|ctx: &mut Context| {
//!     if ctx.header("authorization").is_none() {
//!         ctx.abort_with_status(StatusCode::UNAUTHORIZED);
//!         return;
//!     }
//!     ctx.next();
//! });
//! let show = handler(|ctx: &mut Context| ctx.text(StatusCode::OK, "secret"));
//!
//! let chain: Arc<[Handler]> = Arc::from(vec![auth, show]);
//! let mut ctx = Context::new(Request::new(Default::default())).with_handlers(chain);
//! ctx.run();
//!
//! assert!(ctx.is_aborted());
//! assert_eq!(ctx.into_response().status(), StatusCode::UNAUTHORIZED);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use switchyard_router::Params;
use uuid::Uuid;

use crate::error::{BoxError, ContextError};
use crate::handler::HandlerChain;
use crate::response::{Request, Response, ResponseWriter};

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use switchyard_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    ///
    /// This is useful when honoring a request ID supplied by a client or an
    /// upstream proxy.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Progress of a handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// No handler has run yet.
    Pending,
    /// A handler is executing.
    Running,
    /// [`Context::abort`] was called; nothing further runs.
    Aborted,
    /// Every handler in the chain was entered.
    Completed,
    /// A handler returned without calling [`Context::next`].
    Halted,
}

/// Per-request state passed through a handler chain.
pub struct Context {
    request_id: RequestId,
    request: Request,
    params: Params,
    full_path: Option<String>,
    store: HashMap<String, Box<dyn Any + Send + Sync>>,
    handlers: HandlerChain,
    /// Index of the next handler to enter.
    index: usize,
    aborted: bool,
    finished: bool,
    response: ResponseWriter,
    errors: Vec<ContextError>,
    started_at: Instant,
}

impl Context {
    /// Creates a context for `request` with an empty chain.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request_id: RequestId::new(),
            request,
            params: Params::new(),
            full_path: None,
            store: HashMap::new(),
            handlers: HandlerChain::from(Vec::new()),
            index: 0,
            aborted: false,
            finished: false,
            response: ResponseWriter::new(),
            errors: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Sets the chain to run.
    #[must_use]
    pub fn with_handlers(mut self, handlers: HandlerChain) -> Self {
        self.handlers = handlers;
        self
    }

    /// Sets the captured path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the pattern of the route that matched.
    #[must_use]
    pub fn with_full_path(mut self, pattern: impl Into<String>) -> Self {
        self.full_path = Some(pattern.into());
        self
    }

    /// Overrides the generated request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    // ---------------------------------------------------------------------
    // Request
    // ---------------------------------------------------------------------

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns the request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Returns a request header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)?.to_str().ok()
    }

    /// Returns the buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Returns the first value of a query parameter, percent-decoded.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Returns every query pair, percent-decoded, in order.
    ///
    /// A malformed query string yields no pairs.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.request
            .uri()
            .query()
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default()
    }

    /// Returns a captured path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns all captured path parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the pattern of the matched route, if a route matched.
    #[must_use]
    pub fn full_path(&self) -> Option<&str> {
        self.full_path.as_deref()
    }

    /// Returns the time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    // ---------------------------------------------------------------------
    // Key/value store
    // ---------------------------------------------------------------------

    /// Stores a request-scoped value, replacing any previous one.
    pub fn set<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.store.insert(key.into(), Box::new(value));
    }

    /// Returns a stored value if it exists and has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.store.get(key)?.downcast_ref()
    }

    /// Returns a stored value mutably if it exists and has type `T`.
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.store.get_mut(key)?.downcast_mut()
    }

    /// Removes a stored value, returning it if it had type `T`.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let value = self.store.remove(key)?;
        value.downcast().ok().map(|boxed| *boxed)
    }

    /// Returns true if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    // ---------------------------------------------------------------------
    // Chain control
    // ---------------------------------------------------------------------

    /// Runs the chain from its first handler.
    ///
    /// Returns when the first handler returns. Calling it again has no
    /// effect beyond what [`Context::next`] would do.
    pub fn run(&mut self) {
        self.next();
        self.finished = true;
    }

    /// Enters the next handler in the chain.
    ///
    /// No-op once aborted or past the end of the chain.
    pub fn next(&mut self) {
        if self.aborted {
            return;
        }
        let Some(handler) = self.handlers.get(self.index).cloned() else {
            return;
        };
        self.index += 1;
        handler(self);
    }

    /// Stops the chain after the current handler.
    ///
    /// The current handler keeps running; later calls to [`Context::next`]
    /// do nothing.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Returns true if [`Context::abort`] was called.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Commits `status` and aborts.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.response.write_header(status);
        self.abort();
    }

    /// Records `error`, commits `status` and aborts.
    pub fn abort_with_error(&mut self, status: StatusCode, error: impl Into<BoxError>) {
        let error = ContextError::new(status, error);
        tracing::debug!(
            request_id = %self.request_id,
            status = status.as_u16(),
            error = %error.inner(),
            "handler chain aborted with error"
        );
        self.errors.push(error);
        self.abort_with_status(status);
    }

    /// Returns the errors recorded through [`Context::abort_with_error`].
    #[must_use]
    pub fn errors(&self) -> &[ContextError] {
        &self.errors
    }

    /// Returns the chain's progress.
    #[must_use]
    pub fn state(&self) -> ChainState {
        if self.aborted {
            ChainState::Aborted
        } else if self.finished {
            if self.index >= self.handlers.len() {
                ChainState::Completed
            } else {
                ChainState::Halted
            }
        } else if self.index == 0 {
            ChainState::Pending
        } else {
            ChainState::Running
        }
    }

    /// Returns the number of handlers entered so far.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the length of the chain.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    // ---------------------------------------------------------------------
    // Response
    // ---------------------------------------------------------------------

    /// Sets the response status without committing it.
    pub fn status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    /// Sets a response header.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.insert_header(name, value);
    }

    /// Appends raw bytes to the response body.
    pub fn write(&mut self, data: &[u8]) {
        self.response.write(data);
    }

    /// Replaces the response with a plain-text body.
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) {
        self.response.send(
            status,
            "text/plain; charset=utf-8",
            Bytes::from(body.into()),
        );
    }

    /// Replaces the response with a JSON body.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.response
            .send(status, "application/json", Bytes::from(body));
        Ok(())
    }

    /// Replaces the response with raw bytes under `content_type`.
    pub fn bytes(&mut self, status: StatusCode, content_type: &'static str, body: Bytes) {
        self.response.send(status, content_type, body);
    }

    /// Returns true once a status was committed or body bytes were written.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        self.response.is_written()
    }

    /// Returns the buffered response.
    #[must_use]
    pub const fn response(&self) -> &ResponseWriter {
        &self.response
    }

    /// Returns the buffered response for modification.
    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    /// Consumes the context and builds the response.
    ///
    /// A chain that wrote nothing yields its current status (200 unless a
    /// handler set another) with an empty body.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response.into_response()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", self.request.method())
            .field("path", &self.path())
            .field("params", &self.params)
            .field("index", &self.index)
            .field("handlers", &self.handlers.len())
            .field("aborted", &self.aborted)
            .field("status", &self.response.status())
            .finish_non_exhaustive()
    }
}
