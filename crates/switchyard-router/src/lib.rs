//! Segment trie router for Switchyard.
//!
//! This crate resolves a concrete `(method, path)` pair to a registered value
//! plus the parameters captured from the path. Lookup walks one trie node per
//! path segment, so it costs O(k) in the segment count regardless of how many
//! routes are registered.
//!
//! # Features
//!
//! - **Static segments**: `/users/list`
//! - **Named parameters**: `/users/:id`
//! - **Optional parameters**: `/archive/:year?` matches `/archive` too
//! - **Regex constraints**: `/posts/:id(\d+)`, anchored to the whole segment
//! - **Wildcards**: `/files/*path` captures the remainder including `/`
//! - **405 detection**: lookups report when a path exists for other methods
//!
//! # Example
//!
//! ```rust
//! use switchyard_router::{Lookup, Pattern, Trie};
//! use http::Method;
//!
//! let mut trie = Trie::new();
//! trie.insert(Method::GET, &Pattern::parse("/users").unwrap(), "listUsers").unwrap();
//! trie.insert(Method::GET, &Pattern::parse("/users/:id").unwrap(), "getUser").unwrap();
//! trie.insert(Method::GET, &Pattern::parse("/files/*path").unwrap(), "serveFile").unwrap();
//!
//! let Lookup::Found(m) = trie.find(&Method::GET, "/files/a/b.txt") else {
//!     panic!("no match");
//! };
//! assert_eq!(*m.value, "serveFile");
//! assert_eq!(m.params.get("path"), Some("a/b.txt"));
//!
//! assert!(matches!(trie.find(&Method::GET, "/posts"), Lookup::NotFound));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "files"
//!              │               │
//!        ┌─────┴─────┐      "*path"
//!        │           │      [GET]
//!      [GET]       ":id"
//!                    │
//!                  [GET]
//! ```
//!
//! Each node keeps static children sorted for binary search, plus at most
//! one parameter child and at most one wildcard child.

mod error;
mod method_map;
mod node;
mod params;
mod pattern;
mod trie;

pub use error::PatternError;
pub use method_map::MethodMap;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use pattern::{Constraint, Pattern, Segment};
pub use trie::Trie;

use http::Method;

/// A matched route with its bound value and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value bound to the matched `(method, pattern)`
    pub value: &'a T,
    /// Extracted path parameters, in capture order
    pub params: Params,
}

/// Result of a trie lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a, T> {
    /// A route matched for the requested method.
    Found(RouteMatch<'a, T>),
    /// The path matched, but only for these methods.
    MethodNotAllowed(Vec<Method>),
    /// No pattern matches the path.
    NotFound,
}

impl<'a, T> Lookup<'a, T> {
    /// Returns the match, if any.
    #[must_use]
    pub fn found(self) -> Option<RouteMatch<'a, T>> {
        match self {
            Self::Found(m) => Some(m),
            _ => None,
        }
    }
}
