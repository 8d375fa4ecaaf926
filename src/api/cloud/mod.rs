//
//  bkt-cli
//  api/cloud/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Bitbucket Cloud API v2.0 binding.
//!
//! [`CloudClient`] maps Cloud endpoints onto typed operations over a shared
//! [`Transport`]. Every operation validates its locator, percent-encodes each
//! path segment, and either decodes one response or walks the `next` links.
//!
//! # Module Organization
//!
//! - [`repositories`] - Repository list, view, create, delete; branch delete
//! - [`pullrequests`] - Pull request list, view, create, update, review, merge
//! - [`issues`] - Issue tracker with BBQL filters and attachments
//! - [`pipelines`] - Pipelines and pipeline variables
//! - [`webhooks`] - Repository webhooks
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bkt::api::{CallContext, Transport, TransportOptions, CLOUD_API_URL};
//! use bkt::api::cloud::{CloudClient, CloudRepo};
//!
//! # async fn example() -> Result<(), bkt::api::ApiError> {
//! let transport = Arc::new(Transport::new(TransportOptions::new(CLOUD_API_URL))?);
//! let cloud = CloudClient::new(transport);
//! let repo = CloudRepo::new("my-team", "backend")?;
//! let prs = cloud.list_pull_requests(&CallContext::background(), &repo, &Default::default(), 20).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Notes
//!
//! - All timestamps are ISO 8601 strings
//! - UUIDs are returned with curly braces (e.g., `{123e4567-e89b-...}`)
//! - The issue tracker can be disabled per repository; a 404 then surfaces as
//!   [`ApiError::HttpStatus`]

use std::fmt;
use std::sync::Arc;

use crate::api::client::Transport;
use crate::api::common::{encode_segment, require, ApiError, CloudCursor};

pub mod issues;
pub mod pipelines;
pub mod pullrequests;
pub mod repositories;
pub mod webhooks;

pub use issues::*;
pub use pipelines::*;
pub use pullrequests::*;
pub use repositories::*;
pub use webhooks::*;

/// Page length used when the caller has no limit.
pub(crate) const DEFAULT_PAGE_LEN: usize = 30;

/// Cloud repository locator: `(workspace, repo_slug)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudRepo {
    workspace: String,
    slug: String,
}

impl CloudRepo {
    /// Validates and trims both halves.
    pub fn new(workspace: &str, slug: &str) -> Result<Self, ApiError> {
        Ok(Self {
            workspace: require("workspace", workspace)?.to_string(),
            slug: require("repository slug", slug)?.to_string(),
        })
    }

    /// Parses `workspace/slug`.
    pub fn parse(full_name: &str) -> Result<Self, ApiError> {
        let (workspace, slug) = full_name.split_once('/').ok_or_else(|| {
            ApiError::Validation(format!("{full_name}: expected <workspace>/<repo>"))
        })?;
        Self::new(workspace, slug)
    }

    /// Workspace slug.
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Repository slug.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// `/repositories/{workspace}/{slug}` with both segments encoded.
    pub fn path(&self) -> String {
        format!(
            "/repositories/{}/{}",
            encode_segment(&self.workspace),
            encode_segment(&self.slug)
        )
    }
}

impl fmt::Display for CloudRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.slug)
    }
}

/// Typed facade over the Cloud REST API.
#[derive(Debug, Clone)]
pub struct CloudClient {
    transport: Arc<Transport>,
}

impl CloudClient {
    /// Wraps a shared transport.
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub(crate) fn cursor(limit: usize) -> CloudCursor {
        CloudCursor::for_limit(limit, DEFAULT_PAGE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_path_is_encoded() {
        let repo = CloudRepo::new(" my team ", "repo.name").unwrap();
        assert_eq!(repo.path(), "/repositories/my%20team/repo.name");
        assert_eq!(repo.to_string(), "my team/repo.name");
    }

    #[test]
    fn test_repo_requires_both_parts() {
        assert_eq!(
            CloudRepo::new("", "x").unwrap_err().to_string(),
            "workspace is required"
        );
        assert!(CloudRepo::parse("no-slash").is_err());
        assert_eq!(CloudRepo::parse("ws/repo").unwrap().slug(), "repo");
    }
}
