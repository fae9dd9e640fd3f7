//! Route pattern parsing.
//!
//! A pattern is a `/`-separated list of segments:
//!
//! | Segment      | Meaning                                             |
//! |--------------|-----------------------------------------------------|
//! | `users`      | literal                                             |
//! | `:id`        | named parameter, matches one segment                |
//! | `:id?`       | optional parameter, the route matches without it    |
//! | `:id(\d+)`   | parameter constrained by a regex (whole segment)    |
//! | `:id(\d+)?`  | optional constrained parameter                      |
//! | `*path`      | wildcard, captures the remainder including `/`      |
//!
//! Empty segments are ignored, so `/users/` and `/users` are the same
//! pattern. Constraints cannot contain `/`.

use std::fmt;

use regex::Regex;

use crate::error::PatternError;
use crate::node::SegmentKind;
use crate::params::Params;

/// A compiled regex constraint on a parameter segment.
///
/// The expression is anchored on both ends, so it must match the entire
/// segment.
#[derive(Debug, Clone)]
pub struct Constraint {
    source: String,
    regex: Regex,
}

impl Constraint {
    fn compile(name: &str, source: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            PatternError::InvalidRegex {
                name: name.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Returns the expression as written in the pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if `segment` satisfies the constraint.
    #[must_use]
    pub fn is_match(&self, segment: &str) -> bool {
        self.regex.is_match(segment)
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Constraint {}

/// One parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text
    Static(String),
    /// Named parameter
    Param {
        /// Capture name
        name: String,
        /// Optional regex constraint
        constraint: Option<Constraint>,
        /// Whether the route also matches without this segment
        optional: bool,
    },
    /// Catch-all remainder
    Wildcard(String),
}

impl Segment {
    /// Returns the kind of this segment, including whether a parameter
    /// is optional in this pattern.
    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Static(_) => SegmentKind::Static,
            Self::Param { optional: false, .. } => SegmentKind::Param,
            Self::Param { optional: true, .. } => SegmentKind::OptionalParam,
            Self::Wildcard(_) => SegmentKind::Wildcard,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => f.write_str(s),
            Self::Param {
                name,
                constraint,
                optional,
            } => {
                write!(f, ":{name}")?;
                if let Some(c) = constraint {
                    write!(f, "({})", c.as_str())?;
                }
                if *optional {
                    f.write_str("?")?;
                }
                Ok(())
            }
            Self::Wildcard(name) if name == "*" => f.write_str("*"),
            Self::Wildcard(name) => write!(f, "*{name}"),
        }
    }
}

/// A parsed, normalized route pattern.
///
/// # Example
///
/// ```rust
/// use switchyard_router::Pattern;
///
/// let pattern = Pattern::parse("/users/:id(\\d+)/").unwrap();
/// assert_eq!(pattern.as_str(), "/users/:id(\\d+)");
///
/// let params = pattern.matches("/users/42").unwrap();
/// assert_eq!(params.get("id"), Some("42"));
/// assert!(pattern.matches("/users/alice").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses a pattern string.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if a wildcard is not last, a parameter has
    /// no name or appears twice, a constraint is malformed, or a constraint
    /// regex fails to compile.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = parse_segment(part, pattern)?;
            if matches!(segment, Segment::Wildcard(_)) && i + 1 != parts.len() {
                return Err(PatternError::WildcardNotLast(pattern.to_string()));
            }
            if let Some(name) = capture_name(&segment) {
                if segments
                    .iter()
                    .any(|s: &Segment| capture_name(s) == Some(name))
                {
                    return Err(PatternError::DuplicateParam {
                        name: name.to_string(),
                        pattern: pattern.to_string(),
                    });
                }
            }
            segments.push(segment);
        }

        let raw = render(&segments);
        Ok(Self { raw, segments })
    }

    /// Joins a group prefix and a relative pattern into one normalized string.
    ///
    /// ```rust
    /// use switchyard_router::Pattern;
    ///
    /// assert_eq!(Pattern::join("/api/", "/users/:id"), "/api/users/:id");
    /// assert_eq!(Pattern::join("", "/"), "/");
    /// assert_eq!(Pattern::join("/api", ""), "/api");
    /// ```
    #[must_use]
    pub fn join(prefix: &str, path: &str) -> String {
        let joined: Vec<&str> = prefix
            .split('/')
            .chain(path.split('/'))
            .filter(|s| !s.is_empty())
            .collect();
        format!("/{}", joined.join("/"))
    }

    /// Returns the normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if any segment is an optional parameter.
    #[must_use]
    pub fn has_optional(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param { optional: true, .. }))
    }

    /// Expands optional parameters into every concrete segment list.
    ///
    /// The first variant always contains every segment; later variants
    /// drop optional segments. A pattern with `n` optional parameters
    /// yields `2^n` variants.
    #[must_use]
    pub fn variants(&self) -> Vec<Vec<&Segment>> {
        let mut variants: Vec<Vec<&Segment>> = vec![Vec::new()];
        for segment in &self.segments {
            let optional = matches!(segment, Segment::Param { optional: true, .. });
            if optional {
                let without = variants.clone();
                for v in &mut variants {
                    v.push(segment);
                }
                variants.extend(without);
            } else {
                for v in &mut variants {
                    v.push(segment);
                }
            }
        }
        variants
    }

    /// Matches a concrete path against this pattern without a trie.
    ///
    /// Applies the same rules as the trie: constraints must match the whole
    /// segment, optional parameters may be skipped, and wildcards capture
    /// the remainder.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        match_from(&self.segments, &parts, &mut params).then_some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn capture_name(segment: &Segment) -> Option<&str> {
    match segment {
        Segment::Static(_) => None,
        Segment::Param { name, .. } | Segment::Wildcard(name) => Some(name),
    }
}

fn render(segments: &[Segment]) -> String {
    let parts: Vec<String> = segments.iter().map(ToString::to_string).collect();
    format!("/{}", parts.join("/"))
}

fn parse_segment(part: &str, pattern: &str) -> Result<Segment, PatternError> {
    if let Some(name) = part.strip_prefix('*') {
        let name = if name.is_empty() { "*" } else { name };
        return Ok(Segment::Wildcard(name.to_string()));
    }

    let Some(body) = part.strip_prefix(':') else {
        return Ok(Segment::Static(part.to_string()));
    };

    let malformed = || PatternError::MalformedSegment {
        segment: part.to_string(),
        pattern: pattern.to_string(),
    };

    let (body, optional) = match body.strip_suffix('?') {
        Some(rest) if !rest.ends_with('(') => (rest, true),
        _ => (body, false),
    };

    let (name, constraint) = match body.find('(') {
        Some(open) => {
            let expr = body[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
            (&body[..open], Some(expr))
        }
        None if body.contains(')') => return Err(malformed()),
        None => (body, None),
    };

    if name.is_empty() {
        return Err(PatternError::EmptyParamName(pattern.to_string()));
    }

    let constraint = constraint
        .map(|expr| Constraint::compile(name, expr))
        .transpose()?;

    Ok(Segment::Param {
        name: name.to_string(),
        constraint,
        optional,
    })
}

fn match_from(segments: &[Segment], parts: &[&str], params: &mut Params) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return parts.is_empty();
    };

    match segment {
        Segment::Static(literal) => match parts.split_first() {
            Some((part, tail)) if part == literal => match_from(rest, tail, params),
            _ => false,
        },
        Segment::Param {
            name,
            constraint,
            optional,
        } => {
            if let Some((part, tail)) = parts.split_first() {
                if constraint.as_ref().map_or(true, |c| c.is_match(part)) {
                    let mark = params.len();
                    params.push(name.as_str(), *part);
                    if match_from(rest, tail, params) {
                        return true;
                    }
                    params.truncate(mark);
                }
            }
            *optional && match_from(rest, parts, params)
        }
        Segment::Wildcard(name) => {
            params.push(name.as_str(), parts.join("/"));
            true
        }
    }
}
