//
//  bkt-cli
//  api/common/path.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Path and query helpers shared by both bindings.
//!
//! Binding operations never hand-format user input into URLs: every path
//! segment goes through [`encode_segment`] and every query string is built
//! with [`Query`], which percent-encodes spaces as `%20`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::ApiError;

/// Characters left verbatim in a path segment or query component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a single path segment (`/` is encoded too).
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT).to_string()
}

/// Percent-encodes a query key or value.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Returns the trimmed value, or a `<field> is required` error.
pub fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::required(field))
    } else {
        Ok(trimmed)
    }
}

/// Rejects zero identifiers (Bitbucket ids are 1-based).
pub fn require_id(field: &str, id: u64) -> Result<u64, ApiError> {
    if id == 0 {
        Err(ApiError::Validation(format!("{field} must be a positive number")))
    } else {
        Ok(id)
    }
}

/// Ordered query-string builder.
///
/// ```rust
/// use bkt::api::common::Query;
///
/// let q = Query::new()
///     .push("pagelen", 20)
///     .push_opt("q", Some("state = \"open\""))
///     .push_opt("sort", None::<&str>);
/// assert_eq!(q.to_string(), "?pagelen=20&q=state%20%3D%20%22open%22");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key/value pair.
    pub fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Appends the pair when `value` is present and not blank.
    pub fn push_opt<V: AsRef<str>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) if !v.as_ref().trim().is_empty() => self.push(key, v.as_ref()),
            _ => self,
        }
    }

    /// `true` when no pairs were added.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Appends this query to `path`, respecting any query already present.
    pub fn apply(&self, path: &str) -> String {
        if self.pairs.is_empty() {
            return path.to_string();
        }
        let sep = if path.contains('?') { '&' } else { '?' };
        format!("{path}{sep}{}", self.encoded())
    }

    fn encoded(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pairs.is_empty() {
            Ok(())
        } else {
            write!(f, "?{}", self.encoded())
        }
    }
}

/// Replaces (or adds) query parameters on a relative path.
///
/// Existing parameters with other names keep their order; the replaced ones
/// are appended at the end.
pub fn set_query_params(path: &str, params: &[(&str, String)]) -> String {
    let (base, existing) = path.split_once('?').unwrap_or((path, ""));

    let mut query = Query::new();
    for (key, value) in url::form_urlencoded::parse(existing.as_bytes()) {
        if !params.iter().any(|(name, _)| *name == key) {
            query = query.push(&key, value);
        }
    }
    for (key, value) in params {
        query = query.push(key, value);
    }

    format!("{base}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("my repo"), "my%20repo");
        assert_eq!(encode_segment("feature/login"), "feature%2Flogin");
        assert_eq!(encode_segment("plain-slug_1.0"), "plain-slug_1.0");
    }

    #[test]
    fn test_require() {
        assert_eq!(require("slug", " repo ").unwrap(), "repo");
        assert_eq!(
            require("slug", "   ").unwrap_err().to_string(),
            "slug is required"
        );
        assert!(require_id("pull request id", 0).is_err());
        assert_eq!(require_id("pull request id", 7).unwrap(), 7);
    }

    #[test]
    fn test_query_apply() {
        let q = Query::new().push("limit", 25);
        assert_eq!(q.apply("/repos"), "/repos?limit=25");
        assert_eq!(q.apply("/repos?state=OPEN"), "/repos?state=OPEN&limit=25");
        assert_eq!(Query::new().apply("/repos"), "/repos");
    }

    #[test]
    fn test_push_opt_skips_blank() {
        let q = Query::new()
            .push_opt("a", Some(""))
            .push_opt("b", Some("  "))
            .push_opt("c", None::<String>);
        assert!(q.is_empty());
    }

    #[test]
    fn test_set_query_params_replaces() {
        let path = "/rest/api/1.0/projects?name=a%20b&start=0&limit=25";
        let next = set_query_params(
            path,
            &[("start", "25".to_string()), ("limit", "25".to_string())],
        );
        assert_eq!(next, "/rest/api/1.0/projects?name=a%20b&start=25&limit=25");
    }
}
