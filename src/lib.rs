//
//  bkt-cli
//  lib.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # bkt
//!
//! Library behind the `bkt` command-line client for Bitbucket Cloud and
//! Bitbucket Data Center.
//!
//! ## Overview
//!
//! Both products are reached through one HTTP [`api::Transport`] that adds
//! retries, conditional-GET caching, rate-limit tracking, pagination,
//! multipart uploads and streaming downloads. Two bindings sit on top of it:
//!
//! - [`api::cloud::CloudClient`] for `api.bitbucket.org/2.0`
//! - [`api::server::ServerClient`] for Data Center `/rest/...` roots
//!
//! ## Module Structure
//!
//! - [`api`]: transport, error taxonomy and the two REST bindings
//! - [`auth`]: token storage and resolution
//! - [`config`]: YAML config with hosts and contexts
//! - [`cli`]: clap command tree and the command [`cli::Factory`]
//! - [`output`]: table, JSON and YAML rendering
//! - [`util`]: formatting helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bkt::api::cloud::{CloudClient, CloudRepo};
//! use bkt::api::{CallContext, Transport, TransportOptions, CLOUD_API_URL};
//!
//! # async fn demo() -> Result<(), bkt::api::ApiError> {
//! let options = TransportOptions::new(CLOUD_API_URL).with_credentials("alice", "app-password");
//! let client = CloudClient::new(Arc::new(Transport::new(options)?));
//!
//! let repo = CloudRepo::parse("acme/widgets")?;
//! let prs = client
//!     .list_pull_requests(&CallContext::background(), &repo, &Default::default(), 10)
//!     .await?;
//! println!("{} open pull requests", prs.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Differences
//!
//! | Feature | Cloud | Data Center |
//! |---------|-------|-------------|
//! | Pagination | `next` links | `start` / `isLastPage` |
//! | Issues | Yes | No |
//! | Pipelines | Yes | No |
//! | Build status | No | Yes |
//! | Optimistic locking | No | PR `version` |

/// HTTP transport and REST bindings.
pub mod api;

/// Token storage and resolution.
pub mod auth;

/// Command-line interface definitions.
pub mod cli;

/// Configuration file management.
///
/// The config lives at `$BKT_CONFIG_DIR/config.yml`, or in the platform
/// config directory for `bkt` when the variable is unset.
pub mod config;

/// Output formatting.
pub mod output;

/// Formatting helpers.
pub mod util;

pub use cli::Cli;
pub use config::Config;

/// Name of the CLI binary.
pub const APP_NAME: &str = "bkt";

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes for the CLI.
///
/// - `0`: Success
/// - `1-3`: General errors and usage issues
/// - `4-7`: Authentication-related issues
/// - `8-15`: Resource-related issues
/// - `16-31`: Operation-related issues
/// - `32+`: External service issues
pub mod exit_codes {
    use crate::api::ApiError;

    /// Successful execution.
    pub const SUCCESS: i32 = 0;

    /// General error.
    pub const ERROR: i32 = 1;

    /// Invalid usage or arguments.
    pub const USAGE: i32 = 2;

    /// Authentication required or failed (HTTP 401/403).
    pub const AUTH_ERROR: i32 = 4;

    /// Resource not found (HTTP 404).
    pub const NOT_FOUND: i32 = 8;

    /// Operation cancelled (Ctrl+C).
    pub const CANCELLED: i32 = 16;

    /// API rate limit exceeded (HTTP 429).
    pub const RATE_LIMIT: i32 = 32;

    /// Picks the exit code for an error returned by a command.
    pub fn for_error(err: &anyhow::Error) -> i32 {
        let Some(api) = err.chain().find_map(|e| e.downcast_ref::<ApiError>()) else {
            return ERROR;
        };
        match api {
            ApiError::Cancelled => CANCELLED,
            ApiError::HttpStatus { status: 401 | 403, .. } => AUTH_ERROR,
            ApiError::HttpStatus { status: 404, .. } => NOT_FOUND,
            ApiError::HttpStatus { status: 429, .. } => RATE_LIMIT,
            _ => ERROR,
        }
    }

    #[cfg(test)]
    mod tests {
        use anyhow::Context;

        use super::*;

        fn status(status: u16) -> anyhow::Error {
            anyhow::Error::new(ApiError::HttpStatus {
                status,
                message: "nope".into(),
            })
        }

        #[test]
        fn test_for_error() {
            assert_eq!(for_error(&status(401)), AUTH_ERROR);
            assert_eq!(for_error(&status(403)), AUTH_ERROR);
            assert_eq!(for_error(&status(404)), NOT_FOUND);
            assert_eq!(for_error(&status(429)), RATE_LIMIT);
            assert_eq!(for_error(&status(500)), ERROR);
            assert_eq!(for_error(&anyhow::Error::new(ApiError::Cancelled)), CANCELLED);
            assert_eq!(for_error(&anyhow::anyhow!("plain")), ERROR);
        }

        #[test]
        fn test_for_error_sees_through_context() {
            let err: anyhow::Result<()> = Err(ApiError::HttpStatus {
                status: 404,
                message: "Repository not found".into(),
            })
            .context("fetching repo");
            assert_eq!(for_error(&err.unwrap_err()), NOT_FOUND);
        }
    }
}
