//
//  bkt-cli
//  api/common/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Common API Types for Bitbucket Cloud and Data Center
//!
//! This module provides the pieces both API bindings share: the error
//! taxonomy every transport operation surfaces, page shapes and the page
//! walker, path and query helpers, and the tri-state [`Patch`] field used by
//! partial update bodies.
//!
//! # Overview
//!
//! - [`ApiError`] - Unified error type for all API operations
//! - [`error_message`] - Extracts a human message from a Bitbucket error body
//! - [`Patch`] - "unset" vs "explicit null" vs "explicit value" field carrier
//! - Pagination types and adapters (re-exported from [`pagination`])
//! - Path and query helpers (re-exported from [`path`])
//!
//! # Example
//!
//! ```rust
//! use bkt::api::common::ApiError;
//!
//! fn handle_result<T>(result: Result<T, ApiError>) {
//!     match result {
//!         Ok(_) => println!("Success!"),
//!         Err(e) if e.is_not_found() => println!("Resource not found"),
//!         Err(ApiError::Cancelled) => println!("Cancelled"),
//!         Err(e) => println!("Error: {}", e),
//!     }
//! }
//! ```

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod pagination;
mod patch;
mod path;

pub use pagination::*;
pub use patch::*;
pub use path::*;

/// Unified error type for all Bitbucket API operations.
///
/// Every operation on the transport and on both bindings returns this type.
/// Retryable failures are absorbed by the retry layer and only surface here
/// once the retry budget is spent.
///
/// # Variants
///
/// | Variant | When | Display |
/// |---------|------|---------|
/// | `Validation` | Empty required field or malformed locator | `<field> is required` |
/// | `InvalidUrl` | Absolute path, foreign pagination host | description |
/// | `Transport` | TCP/TLS/DNS failure after retries | wrapped cause |
/// | `Timeout` | Call deadline elapsed | `request timed out` |
/// | `Cancelled` | Caller cancelled | `cancelled` |
/// | `HttpStatus` | Non-2xx response | `<status>: <message>` |
/// | `Decode` | 2xx body that is not the expected JSON | `decode response: <cause>` |
/// | `Encode` | Request body could not be serialised | `encode request: <cause>` |
/// | `Io` | Stream sink or upload reader failure | wrapped cause |
///
/// A DC optimistic-lock rejection (409) is an `HttpStatus` carrying the
/// server's own message; use [`ApiError::is_conflict`] to detect it.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A caller-supplied value failed validation before any request was made.
    #[error("{0}")]
    Validation(String),

    /// A path or link could not be turned into a request URL for this transport.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A network-level failure that persisted past the retry budget.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The call context's deadline elapsed.
    #[error("request timed out")]
    Timeout,

    /// The call context was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The server answered with a non-2xx status.
    ///
    /// `message` is extracted from the error body by [`error_message`].
    #[error("{status}: {message}")]
    HttpStatus {
        /// Numeric HTTP status code
        status: u16,
        /// Server supplied message, or the trimmed raw body
        message: String,
    },

    /// The 2xx response body did not decode into the requested shape.
    #[error("decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request body could not be encoded as JSON.
    #[error("encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// Reading an upload source or writing a download sink failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Builds the `<field> is required` validation error.
    pub fn required(field: &str) -> Self {
        Self::Validation(format!("{field} is required"))
    }

    /// Builds an `HttpStatus` error from a status and raw error body.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        Self::HttpStatus {
            status: status.as_u16(),
            message: error_message(status, body),
        }
    }

    /// Returns the HTTP status for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// `true` for a 409 response (DC optimistic-lock rejection).
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// `true` for 401/403 responses.
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Whether a failed exchange may be replayed.
    ///
    /// Only network-level failures qualify: connection resets, DNS and TLS
    /// failures and idle timeouts. Builder, redirect and decode failures are
    /// permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => {
                !(e.is_builder() || e.is_redirect() || e.is_decode() || e.is_status())
            }
            _ => false,
        }
    }
}

/// Extracts a user-facing message from a Bitbucket error response body.
///
/// Bitbucket Cloud returns errors in the format:
/// ```json
/// {"type": "error", "error": {"message": "Human readable message"}}
/// ```
///
/// Bitbucket Data Center returns errors in the format:
/// ```json
/// {"errors": [{"message": "Human readable message"}]}
/// ```
///
/// Falls back to `error.detail`, a top-level `message`, the trimmed raw
/// body, and finally the canonical reason phrase for empty bodies.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        let candidates = [
            json.get("error").and_then(|e| e.get("message")),
            json.get("errors")
                .and_then(|e| e.as_array())
                .and_then(|arr| arr.first())
                .and_then(|e| e.get("message")),
            json.get("error").and_then(|e| e.get("detail")),
            json.get("message"),
        ];

        if let Some(message) = candidates
            .into_iter()
            .flatten()
            .find_map(|m| m.as_str())
        {
            return message.to_string();
        }
    }

    let raw = String::from_utf8_lossy(body);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// HATEOAS-style link for API resource navigation.
///
/// Bitbucket embeds links to related resources in most payloads; Cloud uses
/// `{"href": ...}` objects, DC uses arrays of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    /// The URL of the linked resource.
    #[serde(default)]
    pub href: String,

    /// Optional descriptive name for the link (`http`, `ssh`, ...).
    #[serde(default)]
    pub name: Option<String>,
}

/// Lightweight Cloud user reference.
///
/// Field aliases accept both `display_name` and `nickname` spellings so the
/// same type decodes authors, reviewers and reporters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRef {
    /// Atlassian account id.
    #[serde(default)]
    pub account_id: Option<String>,

    /// UUID with curly braces.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Display name.
    #[serde(default, alias = "display_name")]
    pub name: String,

    /// Username or nickname.
    #[serde(default, alias = "nickname")]
    pub username: Option<String>,
}

impl UserRef {
    /// Best short label for tables: nickname, then display name.
    pub fn label(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_cloud_format() {
        let body = br#"{"type":"error","error":{"message":"Repository not found"}}"#;
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, body),
            "Repository not found"
        );
    }

    #[test]
    fn test_error_message_server_format() {
        let body = br#"{"errors":[{"message":"stale version","context":null}]}"#;
        assert_eq!(error_message(StatusCode::CONFLICT, body), "stale version");
    }

    #[test]
    fn test_error_message_raw_body_trimmed() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, b"  upstream down \n"),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, b""),
            "Bad Gateway"
        );
    }

    #[test]
    fn test_http_status_display() {
        let err = ApiError::from_status(
            StatusCode::CONFLICT,
            br#"{"errors":[{"message":"The pull request has been updated"}]}"#,
        );
        assert_eq!(err.to_string(), "409: The pull request has been updated");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_required_display() {
        assert_eq!(
            ApiError::required("workspace").to_string(),
            "workspace is required"
        );
    }
}
