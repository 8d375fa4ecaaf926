//
//  bkt-cli
//  api/common/pagination.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Pagination Types for Bitbucket API Responses
//!
//! This module provides the page shapes both Bitbucket dialects return and
//! the decoders the page walker ([`Transport::walk_pages`]) uses to flatten
//! them into a single record list.
//!
//! # Overview
//!
//! | Type | Platform | Strategy |
//! |------|----------|----------|
//! | [`PaginatedResponse`] | Cloud | URL-based (`next` link) |
//! | [`ServerPaginatedResponse`] | Data Center | Offset-based (`start`, `nextPageStart`) |
//! | [`CloudCursor`] | Cloud | [`PageDecoder`] following `next` |
//! | [`ServerOffset`] | Data Center | [`PageDecoder`] advancing `start` |
//!
//! # Cloud vs Data Center Pagination
//!
//! **Bitbucket Cloud** returns an absolute `next` URL. The walker follows it
//! only when its host matches the transport's base URL; the base path prefix
//! is stripped so the request goes through the usual path builder.
//!
//! **Bitbucket Data Center** takes `start` and `limit` query parameters and
//! reports `isLastPage` / `nextPageStart`. An empty page also stops the walk.
//!
//! # Notes
//!
//! - Every field except `values` is optional on the wire; defaults are lenient
//! - Callers never see pages, only the flattened `Vec<T>` with their limit applied
//!
//! [`Transport::walk_pages`]: crate::api::Transport::walk_pages

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{set_query_params, ApiError};

/// Largest `pagelen` Bitbucket Cloud accepts.
pub const CLOUD_MAX_PAGE_LEN: usize = 50;

/// Largest `limit` Bitbucket Data Center accepts.
pub const SERVER_MAX_PAGE_SIZE: usize = 100;

/// Paginated response from Bitbucket Cloud API.
///
/// # Example
///
/// ```rust
/// use bkt::api::common::PaginatedResponse;
///
/// let json = r#"{
///     "values": [{"slug": "repo1"}],
///     "pagelen": 10,
///     "next": "https://api.bitbucket.org/2.0/repositories/ws?page=2"
/// }"#;
///
/// let page: PaginatedResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
/// assert!(page.has_next());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Items in the current page.
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,

    /// Current page number (1-indexed), when the endpoint reports it.
    #[serde(default)]
    pub page: Option<u32>,

    /// Requested page size.
    #[serde(default)]
    pub pagelen: Option<u32>,

    /// Total number of items, when the endpoint bothers to count.
    #[serde(default)]
    pub size: Option<u64>,

    /// Absolute URL of the next page.
    #[serde(default)]
    pub next: Option<String>,

    /// Absolute URL of the previous page.
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> PaginatedResponse<T> {
    /// `true` when a non-empty `next` link is present.
    pub fn has_next(&self) -> bool {
        self.next_url().is_some()
    }

    /// The `next` link, ignoring blank values.
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Paginated response from Bitbucket Data Center API.
///
/// ```rust
/// use bkt::api::common::ServerPaginatedResponse;
///
/// let json = r#"{
///     "values": [{"key": "PROJ"}],
///     "size": 1,
///     "limit": 25,
///     "isLastPage": false,
///     "nextPageStart": 25,
///     "start": 0
/// }"#;
///
/// let page: ServerPaginatedResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
/// assert_eq!(page.next_start(), Some(25));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPaginatedResponse<T> {
    /// Items in the current page.
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,

    /// Number of items in the current page.
    #[serde(default)]
    pub size: u64,

    /// Page size the server applied.
    #[serde(default)]
    pub limit: u64,

    /// Whether this is the final page.
    ///
    /// Servers that omit the flag are treated as having more pages only if
    /// they also report `nextPageStart`.
    #[serde(default, rename = "isLastPage")]
    pub is_last_page: Option<bool>,

    /// Start index for the next page.
    #[serde(default, rename = "nextPageStart")]
    pub next_page_start: Option<u64>,

    /// Start index of the current page (0-indexed).
    #[serde(default)]
    pub start: u64,
}

impl<T> ServerPaginatedResponse<T> {
    /// `true` when another page may be requested.
    pub fn has_next(&self) -> bool {
        match self.is_last_page {
            Some(last) => !last && !self.values.is_empty(),
            None => self.next_page_start.is_some() && !self.values.is_empty(),
        }
    }

    /// `start` for the next request.
    ///
    /// Falls back to `start + size` when the server says there is more but
    /// does not say where it begins.
    pub fn next_start(&self) -> Option<u64> {
        if !self.has_next() {
            return None;
        }
        Some(
            self.next_page_start
                .unwrap_or(self.start + self.values.len() as u64),
        )
    }
}

/// One decoded page: its records and the path of the page after it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Records in this page.
    pub records: Vec<T>,
    /// Relative path (with query) of the next page, if any.
    pub next: Option<String>,
}

/// Dialect-specific page decoding used by the page walker.
pub trait PageDecoder<T> {
    /// Rewrites the caller's path into the first page request.
    fn first_path(&self, path: &str) -> String {
        path.to_string()
    }

    /// Decodes one page body fetched from `current`.
    fn decode(&self, base: &Url, current: &str, body: &[u8]) -> Result<Page<T>, ApiError>;
}

/// Cloud cursor adapter: follows `next` links on the same host.
#[derive(Debug, Clone, Copy)]
pub struct CloudCursor {
    page_len: usize,
}

impl CloudCursor {
    /// Requests pages of `page_len` items, clamped to `1..=50`.
    pub fn new(page_len: usize) -> Self {
        Self {
            page_len: page_len.clamp(1, CLOUD_MAX_PAGE_LEN),
        }
    }

    /// Page length sized for `limit`, or `default` when there is no limit.
    pub fn for_limit(limit: usize, default: usize) -> Self {
        Self::new(if limit == 0 { default } else { limit })
    }

    /// Effective page length.
    pub fn page_len(&self) -> usize {
        self.page_len
    }
}

impl<T: DeserializeOwned> PageDecoder<T> for CloudCursor {
    fn first_path(&self, path: &str) -> String {
        set_query_params(path, &[("pagelen", self.page_len.to_string())])
    }

    fn decode(&self, base: &Url, current: &str, body: &[u8]) -> Result<Page<T>, ApiError> {
        let page: PaginatedResponse<T> = serde_json::from_slice(body)?;
        let next = match page.next_url() {
            Some(link) => {
                let path = relative_path(base, link)?;
                // A server echoing the current page would loop forever.
                (path != current).then_some(path)
            }
            None => None,
        };
        Ok(Page {
            records: page.values,
            next,
        })
    }
}

/// Data Center offset adapter: advances `start` until the last page.
#[derive(Debug, Clone, Copy)]
pub struct ServerOffset {
    page_size: usize,
}

impl ServerOffset {
    /// Requests pages of `page_size` items, clamped to `1..=100`.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.clamp(1, SERVER_MAX_PAGE_SIZE),
        }
    }

    /// Page size sized for `limit`, or `default` when there is no limit.
    pub fn for_limit(limit: usize, default: usize) -> Self {
        Self::new(if limit == 0 { default } else { limit })
    }

    /// Effective page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl<T: DeserializeOwned> PageDecoder<T> for ServerOffset {
    fn first_path(&self, path: &str) -> String {
        set_query_params(
            path,
            &[
                ("limit", self.page_size.to_string()),
                ("start", "0".to_string()),
            ],
        )
    }

    fn decode(&self, _base: &Url, current: &str, body: &[u8]) -> Result<Page<T>, ApiError> {
        let page: ServerPaginatedResponse<T> = serde_json::from_slice(body)?;
        let next = page.next_start().map(|start| {
            set_query_params(
                current,
                &[
                    ("limit", self.page_size.to_string()),
                    ("start", start.to_string()),
                ],
            )
        });
        Ok(Page {
            records: page.values,
            next,
        })
    }
}

/// Turns an absolute link returned by the server into a path relative to `base`.
///
/// The link's scheme, host and port must match `base`; anything else is an
/// [`ApiError::InvalidUrl`]. The base path prefix is stripped so the result can
/// be fed back into the request builder.
pub fn relative_path(base: &Url, link: &str) -> Result<String, ApiError> {
    let target = base
        .join(link)
        .map_err(|e| ApiError::InvalidUrl(format!("{link}: {e}")))?;

    if target.scheme() != base.scheme()
        || target.host_str() != base.host_str()
        || target.port_or_known_default() != base.port_or_known_default()
    {
        return Err(ApiError::InvalidUrl(format!(
            "pagination link points at foreign host {}",
            target.host_str().unwrap_or("<none>")
        )));
    }

    let prefix = base.path().trim_end_matches('/');
    let path = target.path();
    let stripped = match path.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };

    let mut relative = if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    };
    if let Some(query) = target.query() {
        relative.push('?');
        relative.push_str(query);
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn base() -> Url {
        Url::parse("https://api.bitbucket.org/2.0").unwrap()
    }

    #[test]
    fn test_relative_path_strips_base_prefix() {
        let path = relative_path(
            &base(),
            "https://api.bitbucket.org/2.0/repositories/ws/repo/pipelines/?page=2",
        )
        .unwrap();
        assert_eq!(path, "/repositories/ws/repo/pipelines/?page=2");
    }

    #[test]
    fn test_relative_path_rejects_foreign_host() {
        let err = relative_path(&base(), "https://evil.example.com/2.0/repositories?page=2")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_cloud_cursor_decode() {
        let body = br#"{"values":[{"uuid":"1"}],"next":"https://api.bitbucket.org/2.0/x?page=2"}"#;
        let page: Page<Value> = CloudCursor::new(20).decode(&base(), "/x?pagelen=20", body).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next.as_deref(), Some("/x?page=2"));

        let body = br#"{"values":[{"uuid":"3"}]}"#;
        let page: Page<Value> = CloudCursor::new(20).decode(&base(), "/x?page=2", body).unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn test_cloud_cursor_stops_on_self_link() {
        let body = br#"{"values":[{"uuid":"1"}],"next":"https://api.bitbucket.org/2.0/x?page=2"}"#;
        let page: Page<Value> = CloudCursor::new(20).decode(&base(), "/x?page=2", body).unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn test_cloud_cursor_clamps_page_len() {
        assert_eq!(CloudCursor::new(500).page_len(), 50);
        assert_eq!(CloudCursor::new(0).page_len(), 1);
        let first = PageDecoder::<Value>::first_path(&CloudCursor::new(30), "/repositories/ws");
        assert_eq!(first, "/repositories/ws?pagelen=30");
    }

    #[test]
    fn test_server_offset_decode() {
        let dc = ServerOffset::new(25);
        let base = Url::parse("https://bitbucket.example.com").unwrap();
        let first = PageDecoder::<Value>::first_path(&dc, "/rest/api/1.0/projects");
        assert_eq!(first, "/rest/api/1.0/projects?limit=25&start=0");

        let body = br#"{"values":[1,2],"isLastPage":false,"nextPageStart":2,"start":0,"limit":25,"size":2}"#;
        let page: Page<Value> = dc.decode(&base, &first, body).unwrap();
        assert_eq!(page.next.as_deref(), Some("/rest/api/1.0/projects?limit=25&start=2"));

        let body = br#"{"values":[3],"isLastPage":true,"start":2}"#;
        let page: Page<Value> = dc.decode(&base, &first, body).unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn test_server_empty_page_stops() {
        let body = br#"{"values":[],"isLastPage":false,"nextPageStart":0}"#;
        let page: ServerPaginatedResponse<Value> = serde_json::from_slice(body).unwrap();
        assert!(!page.has_next());
        assert_eq!(page.next_start(), None);
    }
}
