//! Values captured from a matched path.

use std::fmt;

use smallvec::SmallVec;

/// Captures kept inline before spilling to the heap.
const INLINE_CAPTURES: usize = 4;

/// One `name = value` capture.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Capture {
    name: String,
    value: String,
}

/// Path parameters in capture order (left to right through the path).
///
/// Wildcard captures hold the remainder of the path without its leading
/// slash, and may be empty.
///
/// ```rust
/// use switchyard_router::Params;
///
/// let mut params = Params::new();
/// params.push("org", "acme");
/// params.push("path", "docs/readme.md");
///
/// assert_eq!(params.get("path"), Some("docs/readme.md"));
/// assert_eq!(params.to_string(), "org=acme, path=docs/readme.md");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    captures: SmallVec<[Capture; INLINE_CAPTURES]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.captures.push(Capture {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Returns the value captured as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Returns true if a capture named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.captures.iter().any(|c| c.name == name)
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// Iterates `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.captures
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
    }

    /// Keeps only the first `len` captures.
    ///
    /// The matcher records `len()` before descending into a parameter
    /// branch and truncates back to it when that branch fails.
    pub fn truncate(&mut self, len: usize) {
        self.captures.truncate(len);
    }

    /// Removes every capture.
    pub fn clear(&mut self) {
        self.captures.clear();
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.captures.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", c.name, c.value)?;
        }
        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        let params: Params = [("org", "acme"), ("repo", "switchyard")].into_iter().collect();

        assert_eq!(params.get("repo"), Some("switchyard"));
        assert!(params.contains("org"));
        assert!(!params.contains("branch"));
        assert_eq!(params.get("branch"), None);
    }

    #[test]
    fn test_empty_wildcard_capture_is_present() {
        let mut params = Params::new();
        params.push("path", "");

        assert!(!params.is_empty());
        assert_eq!(params.get("path"), Some(""));
    }

    #[test]
    fn test_backtracking_truncates_to_mark() {
        let mut params = Params::new();
        params.push("org", "acme");
        let mark = params.len();
        params.push("id", "me");
        params.push("rest", "x/y");

        params.truncate(mark);
        assert_eq!(params.iter().collect::<Vec<_>>(), [("org", "acme")]);
    }

    #[test]
    fn test_many_captures_and_display() {
        let mut params: Params = (0..6).map(|i| (format!("p{i}"), i.to_string())).collect();
        assert_eq!(params.len(), 6);
        assert_eq!(params.get("p5"), Some("5"));
        assert!(params.to_string().starts_with("p0=0, p1=1"));

        params.clear();
        assert!(params.is_empty());
        assert_eq!(params.to_string(), "");
    }
}
