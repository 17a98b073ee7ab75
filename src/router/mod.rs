//! Route pattern compilation. Turns pattern strings into path matchers.
//!
//! A [`PathPattern`] is compiled once, when the dispatcher is built, and then asked
//! [`matches`](PathPattern::matches) for every request. Four syntax elements are supported:
//!
//! | Pattern              | Example match              | Captured params                    |
//! |----------------------|----------------------------|------------------------------------|
//! | `/users`             | `/users`                   | *(none)*                           |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                        |
//! | `/files/*path`       | `/files/docs/readme.txt`   | `path → ["docs", "readme.txt"]`    |
//! | `/users{/:id}`       | `/users`, `/users/42`      | `id → "42"` when present           |
//!
//! A catch-all matches zero or more trailing segments, so `{/*any}` and `/*any` both
//! match every path including `/`. Trailing slashes on incoming paths are ignored unless
//! [`MatchOptions::trailing`] is turned off.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub mod params;

pub use params::{MatchResult, ParamValue, Params};

/// Upper bound on `{...}` groups per pattern. Each group doubles the number of
/// segment sequences tried at match time.
const MAX_GROUPS: usize = 8;

/// Errors raised while compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("route pattern is empty")]
    Empty,

    #[error("route pattern `{pattern}` must start with `/` or `{{`")]
    MissingLeadingSlash { pattern: String },

    #[error("unexpected `{ch}` at index {index} in route pattern `{pattern}`")]
    UnexpectedChar {
        pattern: String,
        index: usize,
        ch: char,
    },

    #[error("invalid parameter name `{name}` in route pattern `{pattern}`")]
    InvalidParameterName { pattern: String, name: String },

    #[error("catch-all `*{name}` must be the last segment of route pattern `{pattern}`")]
    CatchAllNotTrailing { pattern: String, name: String },

    #[error("parameter `{name}` appears more than once in route pattern `{pattern}`")]
    DuplicateParameter { pattern: String, name: String },

    #[error("unbalanced group at index {index} in route pattern `{pattern}`")]
    UnbalancedGroup { pattern: String, index: usize },

    #[error("nested group at index {index} in route pattern `{pattern}`")]
    NestedGroup { pattern: String, index: usize },

    #[error("empty group at index {index} in route pattern `{pattern}`")]
    EmptyGroup { pattern: String, index: usize },

    #[error("route pattern `{pattern}` has more than 8 optional groups")]
    TooManyGroups { pattern: String },

    #[error("route pattern `{pattern}` ends with `/` but trailing slashes are disabled")]
    TrailingSlash { pattern: String },
}

/// Matching behaviour shared by every pattern of a dispatcher.
///
/// Deserializable so hosts can keep it in their own configuration; missing fields
/// take their defaults.
///
/// ```
/// use pathchain::router::MatchOptions;
///
/// let options: MatchOptions = serde_json::from_str(r#"{ "sensitive": false }"#).unwrap();
/// assert!(!options.sensitive);
/// assert!(options.trailing && options.decode);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Compare static segments case-sensitively.
    pub sensitive: bool,
    /// Accept a trailing `/` on the incoming path.
    pub trailing: bool,
    /// Percent-decode captured parameter values.
    pub decode: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            sensitive: true,
            trailing: true,
            decode: true,
        }
    }
}

// A single path segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Parameter(String),
    CatchAll(String),
}

// A top-level element of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Fixed(Segment),
    Optional(Vec<Segment>),
}

/// A compiled route pattern.
///
/// # Examples
///
/// ```
/// use pathchain::router::PathPattern;
///
/// let pattern = PathPattern::compile("/users/:id/*rest").unwrap();
/// let matched = pattern.matches("/users/42/posts/7").unwrap();
/// assert_eq!(matched.params().get_str("id"), Some("42"));
/// assert_eq!(matched.params().get_all("rest").unwrap(), ["posts", "7"]);
///
/// assert!(pattern.matches("/teams/42").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    // Every way the optional groups can be resolved, most segments first.
    alternatives: Vec<Vec<Segment>>,
    options: MatchOptions,
}

impl PathPattern {
    /// Compile `pattern` with the default [`MatchOptions`].
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] describing the first problem found in `pattern`.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        Self::compile_with(pattern, MatchOptions::default())
    }

    /// Compile `pattern` with explicit [`MatchOptions`].
    ///
    /// With `trailing` off, a pattern ending in `/` could never match and is rejected.
    pub fn compile_with(pattern: &str, options: MatchOptions) -> Result<Self, PatternError> {
        let parts = parse(pattern)?;
        if !options.trailing && pattern.len() > 1 && pattern.ends_with('/') {
            return Err(PatternError::TrailingSlash {
                pattern: pattern.to_owned(),
            });
        }
        validate(pattern, &parts)?;

        Ok(Self {
            source: pattern.to_owned(),
            alternatives: expand(&parts),
            options,
        })
    }

    /// The pattern string this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Try to match `path`, returning the captured parameters on success.
    ///
    /// `None` means no match. A match that captured nothing is `Some` with empty params.
    pub fn matches(&self, path: &str) -> Option<MatchResult> {
        if !self.options.trailing && path.len() > 1 && path.ends_with('/') {
            return None;
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        self.alternatives
            .iter()
            .find_map(|alternative| self.match_segments(alternative, &segments))
            .map(|params| MatchResult::new(path, params))
    }

    fn match_segments(&self, pattern: &[Segment], path: &[&str]) -> Option<Params> {
        let mut params = Params::new();
        let mut remaining = path;

        for segment in pattern {
            match segment {
                Segment::Static(expected) => {
                    let (first, rest) = remaining.split_first()?;
                    let equal = if self.options.sensitive {
                        expected == first
                    } else {
                        expected.eq_ignore_ascii_case(first)
                    };
                    if !equal {
                        return None;
                    }
                    remaining = rest;
                }
                Segment::Parameter(name) => {
                    let (first, rest) = remaining.split_first()?;
                    params.insert(name.clone(), ParamValue::Single(self.decode(first)));
                    remaining = rest;
                }
                Segment::CatchAll(name) => {
                    let captured = remaining.iter().map(|s| self.decode(s)).collect();
                    params.insert(name.clone(), ParamValue::Multiple(captured));
                    remaining = &[];
                }
            }
        }

        remaining.is_empty().then_some(params)
    }

    // Values that are not valid percent-encoded UTF-8 are kept verbatim.
    fn decode(&self, raw: &str) -> String {
        if !self.options.decode {
            return raw.to_owned();
        }
        urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw.to_owned())
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// Split a pattern string into fixed segments and optional groups.
fn parse(pattern: &str) -> Result<Vec<Part>, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }
    if !pattern.starts_with(['/', '{']) {
        return Err(PatternError::MissingLeadingSlash {
            pattern: pattern.to_owned(),
        });
    }

    let mut parts = Vec::new();
    let mut group: Option<(usize, Vec<Segment>)> = None;
    let mut chars = pattern.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '/' => {
                let start = index + 1;
                let mut end = pattern.len();
                while let Some(&(i, c)) = chars.peek() {
                    if matches!(c, '/' | '{' | '}') {
                        end = i;
                        break;
                    }
                    chars.next();
                }

                let raw = &pattern[start..end];
                if raw.is_empty() {
                    continue;
                }

                let segment = classify(pattern, start, raw)?;
                match group.as_mut() {
                    Some((_, segments)) => segments.push(segment),
                    None => parts.push(Part::Fixed(segment)),
                }
            }
            '{' => {
                if group.is_some() {
                    return Err(PatternError::NestedGroup {
                        pattern: pattern.to_owned(),
                        index,
                    });
                }
                match chars.peek() {
                    Some(&(_, '/')) => {}
                    Some(&(i, c)) => {
                        return Err(PatternError::UnexpectedChar {
                            pattern: pattern.to_owned(),
                            index: i,
                            ch: c,
                        });
                    }
                    None => {
                        return Err(PatternError::UnbalancedGroup {
                            pattern: pattern.to_owned(),
                            index,
                        });
                    }
                }
                group = Some((index, Vec::new()));
            }
            '}' => {
                let (open, segments) = group.take().ok_or_else(|| PatternError::UnbalancedGroup {
                    pattern: pattern.to_owned(),
                    index,
                })?;
                if segments.is_empty() {
                    return Err(PatternError::EmptyGroup {
                        pattern: pattern.to_owned(),
                        index: open,
                    });
                }
                parts.push(Part::Optional(segments));
            }
            other => {
                return Err(PatternError::UnexpectedChar {
                    pattern: pattern.to_owned(),
                    index,
                    ch: other,
                });
            }
        }
    }

    if let Some((open, _)) = group {
        return Err(PatternError::UnbalancedGroup {
            pattern: pattern.to_owned(),
            index: open,
        });
    }

    Ok(parts)
}

// Turn the text between two slashes into a segment. `start` is its byte offset in `pattern`.
fn classify(pattern: &str, start: usize, raw: &str) -> Result<Segment, PatternError> {
    if let Some(name) = raw.strip_prefix(':') {
        return parameter_name(pattern, name).map(Segment::Parameter);
    }
    if let Some(name) = raw.strip_prefix('*') {
        return parameter_name(pattern, name).map(Segment::CatchAll);
    }
    if let Some(offset) = raw.find([':', '*']) {
        return Err(PatternError::UnexpectedChar {
            pattern: pattern.to_owned(),
            index: start + offset,
            ch: char::from(raw.as_bytes()[offset]),
        });
    }
    Ok(Segment::Static(raw.to_owned()))
}

fn parameter_name(pattern: &str, name: &str) -> Result<String, PatternError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name.to_owned())
    } else {
        Err(PatternError::InvalidParameterName {
            pattern: pattern.to_owned(),
            name: name.to_owned(),
        })
    }
}

// Reject duplicate names, misplaced catch-alls and excessive grouping.
fn validate(pattern: &str, parts: &[Part]) -> Result<(), PatternError> {
    let mut seen: Vec<&str> = Vec::new();
    let mut groups = 0;

    for (i, part) in parts.iter().enumerate() {
        let segments = match part {
            Part::Fixed(segment) => std::slice::from_ref(segment),
            Part::Optional(segments) => {
                groups += 1;
                segments.as_slice()
            }
        };

        for (j, segment) in segments.iter().enumerate() {
            let name = match segment {
                Segment::Static(_) => continue,
                Segment::Parameter(name) | Segment::CatchAll(name) => name.as_str(),
            };

            if seen.contains(&name) {
                return Err(PatternError::DuplicateParameter {
                    pattern: pattern.to_owned(),
                    name: name.to_owned(),
                });
            }
            seen.push(name);

            let trailing = i + 1 == parts.len() && j + 1 == segments.len();
            if matches!(segment, Segment::CatchAll(_)) && !trailing {
                return Err(PatternError::CatchAllNotTrailing {
                    pattern: pattern.to_owned(),
                    name: name.to_owned(),
                });
            }
        }
    }

    if groups > MAX_GROUPS {
        return Err(PatternError::TooManyGroups {
            pattern: pattern.to_owned(),
        });
    }

    Ok(())
}

// Resolve optional groups into plain segment sequences, "present" before "absent".
fn expand(parts: &[Part]) -> Vec<Vec<Segment>> {
    let mut alternatives = vec![Vec::new()];

    for part in parts {
        match part {
            Part::Fixed(segment) => {
                for alternative in &mut alternatives {
                    alternative.push(segment.clone());
                }
            }
            Part::Optional(segments) => {
                alternatives = alternatives
                    .into_iter()
                    .flat_map(|without| {
                        let mut with = without.clone();
                        with.extend(segments.iter().cloned());
                        [with, without]
                    })
                    .collect();
            }
        }
    }

    alternatives
}
