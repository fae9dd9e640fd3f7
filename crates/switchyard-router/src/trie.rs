//! Pattern trie.
//!
//! This module provides [`Trie`], which owns the root [`Node`] and exposes
//! pattern insertion and `(method, path)` lookup.

use http::Method;

use crate::error::PatternError;
use crate::node::{self, Node};
use crate::pattern::Pattern;
use crate::{Lookup, RouteMatch};

/// A segment trie mapping `(method, pattern)` to values.
///
/// Lookup is O(k) in the number of path segments and independent of the
/// number of registered routes.
///
/// # Example
///
/// ```rust
/// use switchyard_router::{Lookup, Pattern, Trie};
/// use http::Method;
///
/// let mut trie = Trie::new();
/// trie.insert(Method::GET, &Pattern::parse("/users/:id").unwrap(), "getUser").unwrap();
///
/// match trie.find(&Method::GET, "/users/123") {
///     Lookup::Found(m) => {
///         assert_eq!(*m.value, "getUser");
///         assert_eq!(m.params.get("id"), Some("123"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
///
/// assert!(matches!(
///     trie.find(&Method::POST, "/users/123"),
///     Lookup::MethodNotAllowed(_)
/// ));
/// ```
///
/// # Route Priority
///
/// When multiple routes could match, the trie uses the following priority:
///
/// 1. **Static segments** (e.g., `/users/me`)
/// 2. **Parameter segments** (e.g., `/users/:id`), constraint permitting
/// 3. **Wildcard segments** (e.g., `/files/*path`)
///
/// A branch that dead-ends is abandoned and the next alternative tried.
#[derive(Debug, Clone)]
pub struct Trie<T> {
    root: Node<T>,
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self { root: Node::root() }
    }
}

impl<T: Clone> Trie<T> {
    /// Creates a new empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `method` at `pattern`.
    ///
    /// Optional parameters expand into one binding per variant. Binding an
    /// existing `(method, path)` overwrites the previous value.
    ///
    /// Returns true if the full pattern replaced an existing binding.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::ParamConflict`] or
    /// [`PatternError::WildcardConflict`] if a differently named or
    /// constrained capture already exists at the same depth, either in the
    /// trie or in another variant of `pattern` (`/a/:x?/:y` puts `:x` and
    /// `:y` at the same depth). The trie is left unchanged on error.
    pub fn insert(&mut self, method: Method, pattern: &Pattern, value: T) -> Result<bool, PatternError> {
        let variants = pattern.variants();
        // Variants are checked against each other as well as the trie
        let mut siblings: Node<()> = Node::root();
        for variant in &variants {
            self.root.check(variant, pattern.as_str())?;
            siblings.check(variant, pattern.as_str())?;
            siblings.insert(variant, method.clone(), ());
        }

        let mut replaced = false;
        for (i, variant) in variants.iter().enumerate() {
            let previous = self.root.insert(variant, method.clone(), value.clone());
            if i == 0 {
                replaced = previous.is_some();
            }
        }
        Ok(replaced)
    }

    /// Resolves `path` for `method`.
    ///
    /// Distinguishes a path that matches no pattern from one whose pattern
    /// exists only for other methods.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        match node::lookup(&self.root, method, path) {
            (Some((value, params)), _) => Lookup::Found(RouteMatch { value, params }),
            (None, allowed) if !allowed.is_empty() => Lookup::MethodNotAllowed(allowed),
            (None, _) => Lookup::NotFound,
        }
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> &Node<T> {
        &self.root
    }

    /// Returns the number of `(method, concrete pattern)` bindings.
    ///
    /// A pattern with optional parameters counts once per variant.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.binding_count()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Drops every binding.
    pub fn clear(&mut self) {
        self.root = Node::root();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(routes: &[(Method, &str, &'static str)]) -> Trie<&'static str> {
        let mut trie = Trie::new();
        for (method, pattern, value) in routes {
            trie.insert(method.clone(), &Pattern::parse(pattern).unwrap(), *value)
                .unwrap();
        }
        trie
    }

    fn found<'a>(lookup: Lookup<'a, &'static str>) -> RouteMatch<'a, &'static str> {
        match lookup {
            Lookup::Found(m) => m,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_trie_new() {
        let trie: Trie<()> = Trie::new();
        assert!(trie.is_empty());
        assert_eq!(trie.len(), 0);
    }

    #[test]
    fn test_trie_match_static() {
        let trie = trie(&[(Method::GET, "/users", "listUsers")]);
        let m = found(trie.find(&Method::GET, "/users"));
        assert_eq!(*m.value, "listUsers");
        assert!(m.params.is_empty());

        // trailing slash and duplicate slashes normalize away
        assert!(matches!(trie.find(&Method::GET, "/users/"), Lookup::Found(_)));
        assert!(matches!(trie.find(&Method::GET, "//users"), Lookup::Found(_)));
    }

    #[test]
    fn test_trie_root_route() {
        let trie = trie(&[(Method::GET, "/", "index")]);
        assert_eq!(*found(trie.find(&Method::GET, "/")).value, "index");
        assert_eq!(*found(trie.find(&Method::GET, "")).value, "index");
    }

    #[test]
    fn test_static_beats_param() {
        let trie = trie(&[
            (Method::GET, "/users/:id", "getUser"),
            (Method::GET, "/users/me", "getMe"),
        ]);

        assert_eq!(*found(trie.find(&Method::GET, "/users/me")).value, "getMe");
        let m = found(trie.find(&Method::GET, "/users/42"));
        assert_eq!(*m.value, "getUser");
        assert_eq!(m.params.get("id"), Some("42"));
    }

    #[test]
    fn test_param_beats_wildcard() {
        let trie = trie(&[
            (Method::GET, "/files/*path", "wild"),
            (Method::GET, "/files/:name", "one"),
        ]);

        assert_eq!(*found(trie.find(&Method::GET, "/files/a")).value, "one");
        let m = found(trie.find(&Method::GET, "/files/a/b/c.txt"));
        assert_eq!(*m.value, "wild");
        assert_eq!(m.params.get("path"), Some("a/b/c.txt"));
    }

    #[test]
    fn test_regex_constraint_falls_through() {
        let trie = trie(&[
            (Method::GET, "/posts/:id(\\d+)", "byId"),
            (Method::GET, "/posts/*rest", "fallback"),
        ]);

        let m = found(trie.find(&Method::GET, "/posts/17"));
        assert_eq!(*m.value, "byId");
        assert_eq!(m.params.get("id"), Some("17"));

        let m = found(trie.find(&Method::GET, "/posts/latest"));
        assert_eq!(*m.value, "fallback");
        assert_eq!(m.params.get("id"), None);
    }

    #[test]
    fn test_regex_constraint_rejects() {
        let trie = trie(&[(Method::GET, "/posts/:id(\\d+)", "byId")]);
        assert!(matches!(
            trie.find(&Method::GET, "/posts/abc"),
            Lookup::NotFound
        ));
        // anchored: a partial match does not count
        assert!(matches!(
            trie.find(&Method::GET, "/posts/12a"),
            Lookup::NotFound
        ));
    }

    #[test]
    fn test_optional_param() {
        let trie = trie(&[(Method::GET, "/archive/:year?", "archive")]);

        let m = found(trie.find(&Method::GET, "/archive"));
        assert!(m.params.is_empty());
        let m = found(trie.find(&Method::GET, "/archive/2024"));
        assert_eq!(m.params.get("year"), Some("2024"));
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn test_optional_before_param_is_rejected() {
        let mut trie = Trie::new();
        for raw in ["/a/:x?/:y", "/b/:x(\\d+)?/:y"] {
            let pattern = Pattern::parse(raw).unwrap();
            assert!(matches!(
                trie.insert(Method::GET, &pattern, "ambiguous"),
                Err(PatternError::ParamConflict { .. })
            ));
        }
        assert!(trie.is_empty());
        assert!(matches!(trie.find(&Method::GET, "/a/5"), Lookup::NotFound));
    }

    #[test]
    fn test_optional_before_static_segment() {
        let trie = trie(&[
            (Method::GET, "/a/:x?/edit", "edit"),
            (Method::GET, "/a/:x/view", "view"),
        ]);

        let m = found(trie.find(&Method::GET, "/a/5/edit"));
        assert_eq!(m.params.get("x"), Some("5"));
        assert!(found(trie.find(&Method::GET, "/a/edit")).params.is_empty());
        assert_eq!(found(trie.find(&Method::GET, "/a/5/view")).params.get("x"), Some("5"));

        // two optionals in a row put the second at the first one's depth
        let pattern = Pattern::parse("/v/:major?/:minor?").unwrap();
        assert!(Trie::new().insert(Method::GET, &pattern, "v").is_err());
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let trie = trie(&[
            (Method::GET, "/users/:id", "get"),
            (Method::DELETE, "/users/:id", "delete"),
        ]);

        match trie.find(&Method::POST, "/users/1") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::GET, Method::DELETE]);
            }
            other => panic!("expected 405, got {other:?}"),
        }
        assert!(matches!(
            trie.find(&Method::POST, "/accounts/1"),
            Lookup::NotFound
        ));
    }

    #[test]
    fn test_method_not_allowed_unions_branches() {
        let trie = trie(&[
            (Method::GET, "/items/new", "form"),
            (Method::PUT, "/items/:id", "update"),
        ]);

        match trie.find(&Method::POST, "/items/new") {
            Lookup::MethodNotAllowed(allowed) => {
                assert!(allowed.contains(&Method::GET));
                assert!(allowed.contains(&Method::PUT));
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_method_miss_continues_search() {
        let trie = trie(&[
            (Method::GET, "/items/new", "form"),
            (Method::POST, "/items/:id", "create"),
        ]);

        let m = found(trie.find(&Method::POST, "/items/new"));
        assert_eq!(*m.value, "create");
        assert_eq!(m.params.get("id"), Some("new"));
    }

    #[test]
    fn test_last_write_wins() {
        let mut trie = Trie::new();
        let pattern = Pattern::parse("/users").unwrap();
        assert!(!trie.insert(Method::GET, &pattern, "first").unwrap());
        assert!(trie.insert(Method::GET, &pattern, "second").unwrap());

        assert_eq!(*found(trie.find(&Method::GET, "/users")).value, "second");
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_conflict_leaves_trie_unchanged() {
        let mut trie = trie(&[(Method::GET, "/users/:id", "get")]);
        let before = trie.len();

        let result = trie.insert(
            Method::GET,
            &Pattern::parse("/users/:name/posts").unwrap(),
            "posts",
        );
        assert!(matches!(result, Err(PatternError::ParamConflict { .. })));
        assert_eq!(trie.len(), before);
        assert!(matches!(
            trie.find(&Method::GET, "/users/1/posts"),
            Lookup::NotFound
        ));
    }

    #[test]
    fn test_clear() {
        let mut trie = trie(&[
            (Method::GET, "/a", "a"),
            (Method::GET, "/b/:c", "b"),
        ]);
        trie.clear();
        assert!(trie.is_empty());
        assert!(matches!(trie.find(&Method::GET, "/a"), Lookup::NotFound));
    }
}
