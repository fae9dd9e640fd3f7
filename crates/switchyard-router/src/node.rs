//! Segment trie node implementation.
//!
//! Each node owns one path segment. Children are split by kind so lookup can
//! apply the fixed precedence: static, then parameter, then wildcard.

use http::Method;

use crate::error::PatternError;
use crate::method_map::MethodMap;
use crate::params::Params;
use crate::pattern::{Constraint, Segment};

/// Kind of path segment a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "users", "api")
    Static,
    /// Named parameter (e.g., ":id")
    Param,
    /// Parameter the route may omit (e.g., ":id?")
    ///
    /// Optionality belongs to a route, so only [`Segment::kind`] reports
    /// it. Trie nodes are shared between routes and report [`Param`].
    ///
    /// [`Param`]: SegmentKind::Param
    OptionalParam,
    /// Catch-all wildcard (e.g., "*path")
    Wildcard,
}

/// A node in the segment trie.
///
/// Nodes with at least one bound method are terminal: a path that ends on
/// them resolves to a route.
#[derive(Debug, Clone)]
pub struct Node<T> {
    segment: String,
    kind: SegmentKind,
    param_name: Option<String>,
    constraint: Option<Constraint>,
    methods: MethodMap<T>,
    /// Sorted by segment for binary search
    static_children: Vec<Node<T>>,
    /// At most one per node
    param_child: Option<Box<Node<T>>>,
    /// At most one per node, always a leaf
    wildcard_child: Option<Box<Node<T>>>,
}

/// Outcome of a successful descent.
pub(crate) type Hit<'a, T> = (&'a T, Params);

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind, param_name: Option<String>) -> Self {
        Self {
            segment,
            kind,
            param_name,
            constraint: None,
            methods: MethodMap::new(),
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a root node for the trie.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static, None)
    }

    /// Returns the segment text this node was created from.
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Returns the capture name for parameter and wildcard nodes.
    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        self.param_name.as_deref()
    }

    /// Returns true if any method is bound to this node.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Returns the per-method bindings of this node.
    #[must_use]
    pub fn methods(&self) -> &MethodMap<T> {
        &self.methods
    }

    /// Returns true if this node has no children and no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
            && self.static_children.is_empty()
            && self.param_child.is_none()
            && self.wildcard_child.is_none()
    }

    /// Verifies that `segments` can be inserted below this node without
    /// creating an ambiguous parameter or wildcard position.
    ///
    /// Walks existing nodes only; nothing is mutated.
    pub(crate) fn check(&self, segments: &[&Segment], pattern: &str) -> Result<(), PatternError> {
        let Some((segment, rest)) = segments.split_first() else {
            return Ok(());
        };

        match segment {
            Segment::Static(literal) => match self.find_static_child(literal) {
                Some(child) => child.check(rest, pattern),
                None => Ok(()),
            },
            Segment::Param {
                name, constraint, ..
            } => match &self.param_child {
                Some(child) => {
                    let same_name = child.param_name.as_deref() == Some(name.as_str());
                    if !same_name || child.constraint != *constraint {
                        return Err(PatternError::ParamConflict {
                            existing: child.describe(),
                            new: segment.to_string(),
                            pattern: pattern.to_string(),
                        });
                    }
                    child.check(rest, pattern)
                }
                None => Ok(()),
            },
            Segment::Wildcard(name) => match &self.wildcard_child {
                Some(child) if child.param_name.as_deref() != Some(name.as_str()) => {
                    Err(PatternError::WildcardConflict {
                        existing: child.segment.clone(),
                        new: segment.to_string(),
                        pattern: pattern.to_string(),
                    })
                }
                _ => Ok(()),
            },
        }
    }

    fn describe(&self) -> String {
        let name = self.param_name.as_deref().unwrap_or_default();
        match &self.constraint {
            Some(c) => format!(":{name}({})", c.as_str()),
            None => format!(":{name}"),
        }
    }

    /// Inserts one concrete segment list, binding `value` to `method` at
    /// the final node. Returns the value it replaced, if any.
    ///
    /// Callers must run [`Node::check`] first.
    pub(crate) fn insert(&mut self, segments: &[&Segment], method: Method, value: T) -> Option<T> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.methods.insert(method, value);
        };

        match segment {
            Segment::Static(literal) => {
                let idx = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(literal))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        let child = Node::with_kind(literal.clone(), SegmentKind::Static, None);
                        self.static_children.insert(idx, child);
                        idx
                    }
                };
                self.static_children[idx].insert(rest, method, value)
            }
            Segment::Param {
                name, constraint, ..
            } => {
                let child = self.param_child.get_or_insert_with(|| {
                    let mut node = Node::with_kind(String::new(), SegmentKind::Param, Some(name.clone()));
                    node.constraint = constraint.clone();
                    // without the `?`, which belongs to the route
                    node.segment = node.describe();
                    Box::new(node)
                });
                child.insert(rest, method, value)
            }
            Segment::Wildcard(name) => {
                let child = self.wildcard_child.get_or_insert_with(|| {
                    Box::new(Node::with_kind(
                        segment.to_string(),
                        SegmentKind::Wildcard,
                        Some(name.clone()),
                    ))
                });
                child.methods.insert(method, value)
            }
        }
    }

    /// Resolves `segments` for `method`.
    ///
    /// Every terminal node reached whose bindings lack `method` contributes
    /// its methods to `allowed`, so a miss can be reported as
    /// method-not-allowed instead of not-found.
    pub(crate) fn search<'a>(
        &'a self,
        method: &Method,
        segments: &[&str],
        params: &mut Params,
        allowed: &mut Vec<Method>,
    ) -> Option<&'a T> {
        let Some((segment, rest)) = segments.split_first() else {
            if let Some(value) = self.methods.get(method) {
                return Some(value);
            }
            merge_allowed(allowed, &self.methods);
            // A wildcard also matches an empty remainder.
            return self.wildcard_child.as_ref().and_then(|child| {
                child.capture_rest(method, segments, params, allowed)
            });
        };

        if let Some(child) = self.find_static_child(segment) {
            if let Some(value) = child.search(method, rest, params, allowed) {
                return Some(value);
            }
        }

        if let Some(child) = &self.param_child {
            if child.accepts(segment) {
                let mark = params.len();
                params.push(child.param_name.as_deref().unwrap_or_default(), *segment);
                if let Some(value) = child.search(method, rest, params, allowed) {
                    return Some(value);
                }
                params.truncate(mark);
            }
        }

        self.wildcard_child
            .as_ref()
            .and_then(|child| child.capture_rest(method, segments, params, allowed))
    }

    fn capture_rest<'a>(
        &'a self,
        method: &Method,
        segments: &[&str],
        params: &mut Params,
        allowed: &mut Vec<Method>,
    ) -> Option<&'a T> {
        match self.methods.get(method) {
            Some(value) => {
                params.push(
                    self.param_name.as_deref().unwrap_or_default(),
                    segments.join("/"),
                );
                Some(value)
            }
            None => {
                merge_allowed(allowed, &self.methods);
                None
            }
        }
    }

    fn accepts(&self, segment: &str) -> bool {
        self.constraint
            .as_ref()
            .map_or(true, |c| c.is_match(segment))
    }

    fn find_static_child(&self, segment: &str) -> Option<&Node<T>> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }

    /// Counts terminal bindings in this subtree.
    pub(crate) fn binding_count(&self) -> usize {
        self.methods.len()
            + self
                .static_children
                .iter()
                .map(Node::binding_count)
                .sum::<usize>()
            + self.param_child.as_ref().map_or(0, |c| c.binding_count())
            + self.wildcard_child.as_ref().map_or(0, |c| c.binding_count())
    }
}

fn merge_allowed<T>(allowed: &mut Vec<Method>, methods: &MethodMap<T>) {
    for m in methods.allowed_methods() {
        if !allowed.contains(&m) {
            allowed.push(m);
        }
    }
}

/// Convenience used by the trie to run a fresh search.
pub(crate) fn lookup<'a, T>(
    root: &'a Node<T>,
    method: &Method,
    path: &str,
) -> (Option<Hit<'a, T>>, Vec<Method>) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut params = Params::new();
    let mut allowed = Vec::new();
    let hit = root
        .search(method, &segments, &mut params, &mut allowed)
        .map(|value| (value, params));
    (hit, allowed)
}
