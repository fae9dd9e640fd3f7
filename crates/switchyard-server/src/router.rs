//! Route registration, groups and dispatch.
//!
//! A [`Router`] owns a pattern trie, the ordered list of its routes, its
//! middleware and its child groups. Cloning a router is cheap and yields a
//! handle to the same routes, so a group returned by [`Router::group`] can
//! be configured after the parent has been handed to a server.
//!
//! # Chains
//!
//! A route's chain is fixed when it is registered:
//!
//! ```text
//! inherited middleware ++ own middleware (so far) ++ route handlers
//! ```
//!
//! where a group inherits its parent's inherited and own middleware as of
//! the moment the group was created. Middleware added later applies only to
//! routes registered later.
//!
//! # Resolution
//!
//! Dispatch searches the router's own trie first, then each group in
//! creation order. The first hit wins. If nothing matches for the request
//! method but some pattern matched the path, the response is 405 with an
//! `Allow` header listing every method seen. Otherwise it is 404. Both
//! fallbacks run after the root router's middleware and can be replaced
//! with [`Router::no_route`] and [`Router::no_method`].
//!
//! # Example
//!
//! ```rust
//! use switchyard_core::{handler, Context};
//! use switchyard_server::Router;
//! use http::StatusCode;
//!
//! let router = Router::new();
//! router.get("/users/:id", [handler(|ctx: &mut Context| {
//!     let id = ctx.param("id").unwrap_or_default().to_string();
//!     ctx.text(StatusCode::OK, id);
//! })]).unwrap();
//!
//! let request = http::Request::get("/users/42").body(bytes::Bytes::new()).unwrap();
//! let response = router.dispatch(request);
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_LENGTH};
use http::{HeaderValue, Method, StatusCode};
use parking_lot::RwLock;
use switchyard_core::{chain, handler, Context, Handler, HandlerChain, Params, Request, Response};
use switchyard_router::{Lookup, Pattern, PatternError, Trie};
use switchyard_telemetry::metrics::{record_dispatch, render_metrics, DispatchOutcome, InFlightGuard};
use thiserror::Error;

use crate::adapter::HttpHandler;
use crate::config::RouterConfig;
use crate::static_files::StaticFiles;

/// Methods registered by [`Router::any`].
pub const ANY_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Name of the wildcard capture used by [`Router::static_files`].
pub const STATIC_CAPTURE: &str = "filepath";

/// Errors raised while registering routes.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The pattern failed to parse or conflicts with an existing route.
    #[error("invalid route {method} {pattern}: {source}")]
    Pattern {
        /// Method being registered
        method: Method,
        /// Full pattern being registered
        pattern: String,
        /// Parse or conflict error
        #[source]
        source: PatternError,
    },

    /// A route was registered without handlers.
    #[error("route {method} {pattern} has no handlers")]
    EmptyChain {
        /// Method being registered
        method: Method,
        /// Full pattern being registered
        pattern: String,
    },

    /// The static root could not be opened.
    #[error("static root '{}' is not accessible: {source}", .root.display())]
    StaticRoot {
        /// Root directory as given
        root: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// One entry of [`Router::routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Registered method
    pub method: Method,
    /// Normalized full pattern, including group prefixes
    pub pattern: String,
}

/// Result of [`Router::find`].
#[derive(Clone)]
pub enum RouteLookup {
    /// A route matched.
    Found {
        /// The composed chain to run
        chain: HandlerChain,
        /// Extracted path parameters
        params: Params,
        /// The matched pattern
        pattern: Arc<str>,
    },
    /// The path matched, but only for these methods.
    MethodNotAllowed(Vec<Method>),
    /// No pattern matches the path.
    NotFound,
}

impl RouteLookup {
    /// Returns true for [`RouteLookup::Found`].
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

impl fmt::Debug for RouteLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found {
                chain,
                params,
                pattern,
            } => f
                .debug_struct("Found")
                .field("pattern", pattern)
                .field("params", params)
                .field("handlers", &chain.len())
                .finish(),
            Self::MethodNotAllowed(allowed) => {
                f.debug_tuple("MethodNotAllowed").field(allowed).finish()
            }
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// What the trie stores per `(method, pattern)`.
#[derive(Clone)]
struct Binding {
    pattern: Arc<str>,
    chain: HandlerChain,
}

struct Route {
    method: Method,
    pattern: Pattern,
    binding: Binding,
}

struct State {
    middleware: Vec<Handler>,
    trie: Trie<Binding>,
    routes: Vec<Route>,
    groups: Vec<Router>,
    no_route: Vec<Handler>,
    no_method: Vec<Handler>,
}

struct Inner {
    prefix: String,
    inherited: Vec<Handler>,
    trie_enabled: bool,
    state: RwLock<State>,
}

/// A route table with middleware and nested groups.
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates an empty root router using the trie.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Creates an empty root router.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self::build(String::new(), Vec::new(), config.trie_enabled)
    }

    fn build(prefix: String, inherited: Vec<Handler>, trie_enabled: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                prefix,
                inherited,
                trie_enabled,
                state: RwLock::new(State {
                    middleware: Vec::new(),
                    trie: Trie::new(),
                    routes: Vec::new(),
                    groups: Vec::new(),
                    no_route: vec![handler(default_not_found)],
                    no_method: vec![handler(default_method_not_allowed)],
                }),
            }),
        }
    }

    /// Returns this router's full prefix (empty for the root).
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    // Registration
    // ---------------------------------------------------------------------

    /// Registers `handlers` for `method` at `path`.
    ///
    /// Re-registering the same method and pattern replaces the previous
    /// chain.
    pub fn handle<I>(&self, method: Method, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let handlers: Vec<Handler> = handlers.into_iter().collect();
        let full = Pattern::join(&self.inner.prefix, path);

        if handlers.is_empty() {
            return Err(RouteError::EmptyChain {
                method,
                pattern: full,
            });
        }

        let pattern = Pattern::parse(&full).map_err(|source| RouteError::Pattern {
            method: method.clone(),
            pattern: full.clone(),
            source,
        })?;

        let mut state = self.inner.state.write();
        let binding = Binding {
            pattern: Arc::from(pattern.as_str()),
            chain: chain([
                &self.inner.inherited[..],
                &state.middleware[..],
                &handlers[..],
            ]),
        };

        state
            .trie
            .insert(method.clone(), &pattern, binding.clone())
            .map_err(|source| RouteError::Pattern {
                method: method.clone(),
                pattern: full.clone(),
                source,
            })?;

        let existing = state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.pattern.as_str() == pattern.as_str());
        match existing {
            Some(route) => {
                tracing::warn!(
                    http.method = %method,
                    http.route = %pattern,
                    "route registered twice; replacing previous handlers"
                );
                route.binding = binding;
            }
            None => {
                tracing::debug!(http.method = %method, http.route = %pattern, "route registered");
                state.routes.push(Route {
                    method,
                    pattern,
                    binding,
                });
            }
        }
        Ok(())
    }

    /// Registers a GET route.
    pub fn get<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.handle(Method::GET, path, handlers)
    }

    /// Registers a POST route.
    pub fn post<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.handle(Method::POST, path, handlers)
    }

    /// Registers a PUT route.
    pub fn put<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.handle(Method::PUT, path, handlers)
    }

    /// Registers a DELETE route.
    pub fn delete<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.handle(Method::DELETE, path, handlers)
    }

    /// Registers a PATCH route.
    pub fn patch<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.handle(Method::PATCH, path, handlers)
    }

    /// Registers a HEAD route.
    pub fn head<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.handle(Method::HEAD, path, handlers)
    }

    /// Registers an OPTIONS route.
    pub fn options<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.handle(Method::OPTIONS, path, handlers)
    }

    /// Registers the same handlers for every standard method.
    pub fn any<I>(&self, path: &str, handlers: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let handlers: Vec<Handler> = handlers.into_iter().collect();
        for method in ANY_METHODS {
            self.handle(method, path, handlers.iter().cloned())?;
        }
        Ok(())
    }

    /// Appends middleware for routes registered after this call.
    pub fn use_middleware<I>(&self, handlers: I)
    where
        I: IntoIterator<Item = Handler>,
    {
        self.inner.state.write().middleware.extend(handlers);
    }

    /// Creates a child router under `prefix`.
    ///
    /// The child's routes are prefixed, and its chains start with this
    /// router's middleware as it stands now.
    pub fn group(&self, prefix: &str) -> Router {
        let mut state = self.inner.state.write();
        let inherited = [&self.inner.inherited[..], &state.middleware[..]].concat();
        let child = Self::build(
            Pattern::join(&self.inner.prefix, prefix),
            inherited,
            self.inner.trie_enabled,
        );
        state.groups.push(child.clone());
        child
    }

    /// Drops the group at `prefix` (relative to this router), and all its
    /// routes and subgroups.
    ///
    /// Nested groups are found too: on a root with a group `/api` that has
    /// a subgroup `/v1`, `remove_group("/api/v1")` removes the subgroup.
    /// Direct children are searched before descending, in creation order.
    ///
    /// Returns false if no such group exists. Handles to the removed group
    /// stay usable but are no longer reachable from this router.
    pub fn remove_group(&self, prefix: &str) -> bool {
        self.remove_group_at(&Pattern::join(&self.inner.prefix, prefix))
    }

    fn remove_group_at(&self, full: &str) -> bool {
        let groups = {
            let mut state = self.inner.state.write();
            let before = state.groups.len();
            state.groups.retain(|g| g.inner.prefix != full);
            if before != state.groups.len() {
                return true;
            }
            state.groups.clone()
        };

        groups
            .iter()
            .filter(|g| is_prefix_of(&g.inner.prefix, full))
            .any(|g| g.remove_group_at(full))
    }

    /// Serves files under `root` at `prefix/*filepath` for GET and HEAD.
    ///
    /// See [`StaticFiles`] for the path rules.
    pub fn static_files(&self, prefix: &str, root: impl AsRef<Path>) -> Result<(), RouteError> {
        let root = root.as_ref();
        let files = StaticFiles::new(root).map_err(|source| RouteError::StaticRoot {
            root: root.to_path_buf(),
            source,
        })?;

        let serve = handler(move |ctx: &mut Context| {
            let capture = ctx.param(STATIC_CAPTURE).unwrap_or_default().to_string();
            match files.serve(ctx.method(), &capture) {
                Ok(file) => {
                    ctx.bytes(StatusCode::OK, file.content_type, file.body);
                    ctx.set_header(CONTENT_LENGTH, HeaderValue::from(file.len));
                }
                Err(err) => {
                    tracing::debug!(path = %capture, error = %err, "static file rejected");
                    write_json_error(ctx, err.status_code(), err.code(), &err.to_string());
                }
            }
        });

        let path = Pattern::join(prefix, &format!("*{STATIC_CAPTURE}"));
        self.handle(Method::GET, &path, [serve.clone()])?;
        self.handle(Method::HEAD, &path, [serve])
    }

    /// Serves the Prometheus text rendering at `path` for GET.
    ///
    /// Responds 503 until `init_metrics` has installed the recorder.
    pub fn metrics_endpoint(&self, path: &str) -> Result<(), RouteError> {
        let scrape = handler(|ctx: &mut Context| match render_metrics() {
            Some(text) => ctx.bytes(
                StatusCode::OK,
                "text/plain; version=0.0.4; charset=utf-8",
                Bytes::from(text),
            ),
            None => write_json_error(
                ctx,
                StatusCode::SERVICE_UNAVAILABLE,
                "METRICS_DISABLED",
                "metrics recorder is not installed",
            ),
        });
        self.handle(Method::GET, path, [scrape])
    }

    /// Replaces the not-found chain.
    pub fn no_route<I>(&self, handlers: I)
    where
        I: IntoIterator<Item = Handler>,
    {
        self.inner.state.write().no_route = handlers.into_iter().collect();
    }

    /// Replaces the method-not-allowed chain.
    ///
    /// The `Allow` header is set before the chain runs.
    pub fn no_method<I>(&self, handlers: I)
    where
        I: IntoIterator<Item = Handler>,
    {
        self.inner.state.write().no_method = handlers.into_iter().collect();
    }

    /// Removes every route, middleware and group.
    ///
    /// Fallback chains are kept.
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        state.middleware.clear();
        state.trie.clear();
        state.routes.clear();
        state.groups.clear();
    }

    // Introspection
    // ---------------------------------------------------------------------

    /// Lists routes in registration order, own routes before groups.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut out = Vec::new();
        self.collect_routes(&mut out);
        out
    }

    fn collect_routes(&self, out: &mut Vec<RouteInfo>) {
        let state = self.inner.state.read();
        out.extend(state.routes.iter().map(|r| RouteInfo {
            method: r.method.clone(),
            pattern: r.pattern.as_str().to_string(),
        }));
        for group in &state.groups {
            group.collect_routes(out);
        }
    }

    /// Returns the number of routes, including groups.
    #[must_use]
    pub fn route_count(&self) -> usize {
        let state = self.inner.state.read();
        state.routes.len() + state.groups.iter().map(Router::route_count).sum::<usize>()
    }

    /// Resolves `method` and `path` without running anything.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> RouteLookup {
        let mut allowed = Vec::new();
        match self.search(method, path, &mut allowed) {
            Some((binding, params)) => RouteLookup::Found {
                chain: binding.chain,
                params,
                pattern: binding.pattern,
            },
            None if !allowed.is_empty() => RouteLookup::MethodNotAllowed(allowed),
            None => RouteLookup::NotFound,
        }
    }

    fn search(
        &self,
        method: &Method,
        path: &str,
        allowed: &mut Vec<Method>,
    ) -> Option<(Binding, Params)> {
        let groups = {
            let state = self.inner.state.read();
            let hit = if self.inner.trie_enabled {
                match state.trie.find(method, path) {
                    Lookup::Found(m) => Some((m.value.clone(), m.params)),
                    Lookup::MethodNotAllowed(methods) => {
                        merge(allowed, methods);
                        None
                    }
                    Lookup::NotFound => None,
                }
            } else {
                scan(&state.routes, method, path, allowed)
            };
            if hit.is_some() {
                return hit;
            }
            state.groups.clone()
        };

        groups
            .iter()
            .find_map(|group| group.search(method, path, allowed))
    }

    // Dispatch
    // ---------------------------------------------------------------------

    /// Runs the matching chain for `request` and returns its response.
    pub fn dispatch(&self, request: Request) -> Response {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();

        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut ctx = Context::new(request);
        let outcome = match self.find(&method, &path) {
            RouteLookup::Found {
                chain,
                params,
                pattern,
            } => {
                ctx = ctx
                    .with_handlers(chain)
                    .with_params(params)
                    .with_full_path(&*pattern);
                DispatchOutcome::Matched
            }
            RouteLookup::MethodNotAllowed(allowed) => {
                ctx = ctx.with_handlers(self.fallback_chain(true));
                if let Some(value) = allow_header(&allowed) {
                    ctx.set_header(ALLOW, value);
                }
                DispatchOutcome::MethodNotAllowed
            }
            RouteLookup::NotFound => {
                ctx = ctx.with_handlers(self.fallback_chain(false));
                DispatchOutcome::NotFound
            }
        };

        ctx.run();

        let request_id = ctx.request_id();
        let route = ctx.full_path().map(str::to_string);
        let response = ctx.into_response();
        let status = response.status();
        let elapsed = started.elapsed();

        tracing::debug!(
            request_id = %request_id,
            http.method = %method,
            http.path = %path,
            http.route = route.as_deref().unwrap_or(""),
            http.status_code = status.as_u16(),
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            outcome = outcome.as_str(),
            "request dispatched"
        );
        record_dispatch(outcome, status.as_u16(), elapsed);

        response
    }

    fn fallback_chain(&self, method_mismatch: bool) -> HandlerChain {
        let state = self.inner.state.read();
        let fallback = if method_mismatch {
            &state.no_method
        } else {
            &state.no_route
        };
        chain([&self.inner.inherited[..], &state.middleware[..], &fallback[..]])
    }
}

impl HttpHandler for Router {
    fn serve(&self, request: Request) -> Response {
        self.dispatch(request)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Router")
            .field("prefix", &self.inner.prefix)
            .field("trie_enabled", &self.inner.trie_enabled)
            .field("routes", &state.routes.len())
            .field("middleware", &state.middleware.len())
            .field("groups", &state.groups.len())
            .finish()
    }
}

/// Linear resolution in registration order.
fn scan(
    routes: &[Route],
    method: &Method,
    path: &str,
    allowed: &mut Vec<Method>,
) -> Option<(Binding, Params)> {
    for route in routes {
        if let Some(params) = route.pattern.matches(path) {
            if route.method == *method {
                return Some((route.binding.clone(), params));
            }
            merge(allowed, [route.method.clone()]);
        }
    }
    None
}

/// True if `prefix` is `full` or one of its leading segment runs.
fn is_prefix_of(prefix: &str, full: &str) -> bool {
    prefix == "/"
        || full
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn merge(allowed: &mut Vec<Method>, methods: impl IntoIterator<Item = Method>) {
    for m in methods {
        if !allowed.contains(&m) {
            allowed.push(m);
        }
    }
}

fn allow_header(allowed: &[Method]) -> Option<HeaderValue> {
    let joined = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&joined).ok()
}

fn write_json_error(ctx: &mut Context, status: StatusCode, code: &str, message: &str) {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    });
    ctx.bytes(status, "application/json", Bytes::from(body.to_string()));
}

fn default_not_found(ctx: &mut Context) {
    let message = format!("no route for {} {}", ctx.method(), ctx.path());
    write_json_error(ctx, StatusCode::NOT_FOUND, "NOT_FOUND", &message);
}

fn default_method_not_allowed(ctx: &mut Context) {
    let message = format!("method {} not allowed for {}", ctx.method(), ctx.path());
    write_json_error(
        ctx,
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        &message,
    );
}
