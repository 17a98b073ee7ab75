//! Parameters captured by a successful pattern match.

use std::collections::HashMap;

use serde::Serialize;

/// A captured value: one segment for `:name`, the remaining segments for `*name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ParamValue {
    /// The value of a named parameter; `None` for a catch-all.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(s) => Some(s),
            Self::Multiple(_) => None,
        }
    }

    /// The segments of a catch-all; `None` for a named parameter.
    pub fn as_slice(&self) -> Option<&[String]> {
        match self {
            Self::Single(_) => None,
            Self::Multiple(v) => Some(v),
        }
    }
}

/// Path parameters extracted from the matched route
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params {
    map: HashMap<String, ParamValue>,
}

impl Params {
    /// Create a new empty parameters map
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: String, value: ParamValue) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.map.get(key)
    }

    /// Value of the named parameter `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    /// Segments captured by the catch-all `key`.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(ParamValue::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The outcome of a pattern that matched a path.
///
/// A match with no captured parameters is still `Some(MatchResult)`; absence of a
/// match is expressed as `None` by [`PathPattern::matches`](super::PathPattern::matches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    path: String,
    params: Params,
}

impl MatchResult {
    pub(crate) fn new(path: impl Into<String>, params: Params) -> Self {
        Self {
            path: path.into(),
            params,
        }
    }

    /// The path that was matched.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_and_multiple_accessors() {
        let mut params = Params::new();
        params.insert("id".into(), ParamValue::Single("42".into()));
        params.insert(
            "rest".into(),
            ParamValue::Multiple(vec!["a".into(), "b".into()]),
        );

        assert_eq!(params.get_str("id"), Some("42"));
        assert_eq!(params.get_all("id"), None);
        assert_eq!(params.get_all("rest"), Some(&["a".to_owned(), "b".to_owned()][..]));
        assert_eq!(params.get_str("rest"), None);
        assert_eq!(params.len(), 2);
        assert!(params.contains("rest"));
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut params = Params::new();
        params.insert("rest".into(), ParamValue::Multiple(vec!["x".into()]));
        let result = MatchResult::new("/x", params);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, serde_json::json!({ "path": "/x", "params": { "rest": ["x"] } }));
    }
}
