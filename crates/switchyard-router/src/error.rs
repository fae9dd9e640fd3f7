//! Pattern registration errors.

use thiserror::Error;

/// Errors raised while parsing or registering a route pattern.
///
/// All of these are configuration-time errors: they surface when a route is
/// registered, never while a request is being matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A wildcard segment was followed by further segments.
    #[error("wildcard must be the last segment in pattern '{0}'")]
    WildcardNotLast(String),

    /// A parameter or wildcard segment has no name.
    #[error("empty parameter name in pattern '{0}'")]
    EmptyParamName(String),

    /// The same parameter name appears twice in one pattern.
    #[error("duplicate parameter '{name}' in pattern '{pattern}'")]
    DuplicateParam {
        /// Parameter name
        name: String,
        /// Offending pattern
        pattern: String,
    },

    /// A segment could not be parsed (e.g. unbalanced constraint parentheses).
    #[error("malformed segment '{segment}' in pattern '{pattern}'")]
    MalformedSegment {
        /// Offending segment
        segment: String,
        /// Offending pattern
        pattern: String,
    },

    /// A regex constraint failed to compile.
    #[error("invalid constraint for parameter '{name}': {message}")]
    InvalidRegex {
        /// Parameter name
        name: String,
        /// Compiler message
        message: String,
    },

    /// A different parameter is already registered at the same depth.
    #[error("parameter '{new}' conflicts with existing parameter '{existing}' in pattern '{pattern}'")]
    ParamConflict {
        /// Parameter already present in the trie (with its constraint, if any)
        existing: String,
        /// Parameter being registered
        new: String,
        /// Pattern being registered
        pattern: String,
    },

    /// A different wildcard is already registered at the same depth.
    #[error("wildcard '{new}' conflicts with existing wildcard '{existing}' in pattern '{pattern}'")]
    WildcardConflict {
        /// Wildcard already present in the trie
        existing: String,
        /// Wildcard being registered
        new: String,
        /// Pattern being registered
        pattern: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PatternError::WildcardNotLast("/files/*path/x".to_string());
        assert_eq!(
            err.to_string(),
            "wildcard must be the last segment in pattern '/files/*path/x'"
        );

        let err = PatternError::ParamConflict {
            existing: ":id".to_string(),
            new: ":name".to_string(),
            pattern: "/users/:name".to_string(),
        };
        assert!(err.to_string().contains(":id"));
        assert!(err.to_string().contains(":name"));
    }
}
