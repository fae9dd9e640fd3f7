//! Per-method value storage for a single trie node.
//!
//! [`MethodMap`] keeps one value per HTTP method. The nine standard methods
//! live in fixed slots; extension methods (e.g. `PROPFIND`) go to a small
//! side list. Inserting an existing method overwrites it.

use http::Method;

const STANDARD: [Method; 9] = [
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

fn slot(method: &Method) -> Option<usize> {
    STANDARD.iter().position(|m| m == method)
}

/// Maps HTTP methods to values for one route endpoint.
///
/// # Example
///
/// ```rust
/// use switchyard_router::MethodMap;
/// use http::Method;
///
/// let mut map = MethodMap::new();
/// map.insert(Method::GET, "listUsers");
/// map.insert(Method::POST, "createUser");
///
/// assert_eq!(map.get(&Method::GET), Some(&"listUsers"));
/// assert_eq!(map.get(&Method::DELETE), None);
/// assert_eq!(map.allowed_methods(), vec![Method::GET, Method::POST]);
/// ```
#[derive(Debug, Clone)]
pub struct MethodMap<T> {
    standard: [Option<T>; 9],
    extension: Vec<(Method, T)>,
}

impl<T> Default for MethodMap<T> {
    fn default() -> Self {
        Self {
            standard: Default::default(),
            extension: Vec::new(),
        }
    }
}

impl<T> MethodMap<T> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `method`, returning the value it replaced.
    pub fn insert(&mut self, method: Method, value: T) -> Option<T> {
        if let Some(i) = slot(&method) {
            return self.standard[i].replace(value);
        }
        if let Some(entry) = self.extension.iter_mut().find(|(m, _)| *m == method) {
            return Some(std::mem::replace(&mut entry.1, value));
        }
        self.extension.push((method, value));
        None
    }

    /// Returns the value bound to `method`.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&T> {
        match slot(method) {
            Some(i) => self.standard[i].as_ref(),
            None => self
                .extension
                .iter()
                .find(|(m, _)| m == method)
                .map(|(_, v)| v),
        }
    }

    /// Returns true if no method is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.standard.iter().all(Option::is_none) && self.extension.is_empty()
    }

    /// Returns the number of bound methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.standard.iter().filter(|v| v.is_some()).count() + self.extension.len()
    }

    /// Returns the bound methods, standard methods first in canonical order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = STANDARD
            .iter()
            .zip(self.standard.iter())
            .filter(|(_, v)| v.is_some())
            .map(|(m, _)| m.clone())
            .collect();
        methods.extend(self.extension.iter().map(|(m, _)| m.clone()));
        methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_map_empty() {
        let map: MethodMap<&str> = MethodMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert!(map.allowed_methods().is_empty());
    }

    #[test]
    fn test_method_map_insert_and_get() {
        let mut map = MethodMap::new();
        map.insert(Method::GET, "get");
        map.insert(Method::DELETE, "delete");

        assert_eq!(map.get(&Method::GET), Some(&"get"));
        assert_eq!(map.get(&Method::DELETE), Some(&"delete"));
        assert_eq!(map.get(&Method::PUT), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_method_map_last_write_wins() {
        let mut map = MethodMap::new();
        assert_eq!(map.insert(Method::GET, "first"), None);
        assert_eq!(map.insert(Method::GET, "second"), Some("first"));
        assert_eq!(map.get(&Method::GET), Some(&"second"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_method_map_extension_methods() {
        let propfind = Method::from_bytes(b"PROPFIND").unwrap();
        let mut map = MethodMap::new();
        map.insert(propfind.clone(), "dav");
        map.insert(Method::GET, "get");

        assert_eq!(map.get(&propfind), Some(&"dav"));
        assert_eq!(map.insert(propfind.clone(), "dav2"), Some("dav"));
        assert_eq!(map.allowed_methods(), vec![Method::GET, propfind]);
    }

    #[test]
    fn test_allowed_methods_canonical_order() {
        let mut map = MethodMap::new();
        map.insert(Method::OPTIONS, 1);
        map.insert(Method::POST, 2);
        map.insert(Method::GET, 3);

        assert_eq!(
            map.allowed_methods(),
            vec![Method::GET, Method::POST, Method::OPTIONS]
        );
    }
}
