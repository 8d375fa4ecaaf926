//
//  bkt-cli
//  api/server/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Bitbucket Data Center REST binding
//!
//! [`ServerClient`] maps Data Center endpoints onto typed operations over a
//! shared [`Transport`]. Data Center installs are self-hosted, so every path
//! is rooted at the install's base URL rather than a fixed API host.
//!
//! ## Module Organization
//!
//! - [`projects`] - Project list and view
//! - [`repositories`] - Repository list, view, create, delete; branches
//! - [`pullrequests`] - Pull requests, review, auto-merge, tasks, reactions, suggestions
//! - [`builds`] - Commit build statuses
//! - [`permissions`] - Branch restrictions
//! - [`webhooks`] - Repository webhooks
//!
//! ## REST Roots
//!
//! ```text
//! /rest/api/1.0/                 core resources
//! /rest/api/latest/              auto-merge
//! /rest/build-status/1.0/        build statuses
//! /rest/branch-utils/1.0/        branch deletion
//! /rest/branch-permissions/2.0/  branch restrictions
//! /rest/comment-likes/latest/    comment reactions
//! ```
//!
//! ## Notes
//!
//! - Timestamps are Unix milliseconds
//! - Project keys are upper-cased at the locator boundary
//! - Pull request writes carry the `version` from the last read; a stale
//!   version fails with a 409 whose server message is kept verbatim

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::client::Transport;
use crate::api::common::{encode_segment, require, ApiError, ServerOffset};

pub mod builds;
pub mod permissions;
pub mod projects;
pub mod pullrequests;
pub mod repositories;
pub mod webhooks;

pub use builds::*;
pub use permissions::*;
pub use projects::*;
pub use pullrequests::*;
pub use repositories::*;
pub use webhooks::*;

/// Page size used when the caller has no limit.
pub(crate) const DEFAULT_PAGE_SIZE: usize = 25;

pub(crate) const API_ROOT: &str = "/rest/api/1.0";

/// Data Center repository locator: `(project_key, repo_slug)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRepo {
    project_key: String,
    slug: String,
}

impl ServerRepo {
    /// Validates both halves and upper-cases the project key.
    pub fn new(project_key: &str, slug: &str) -> Result<Self, ApiError> {
        Ok(Self {
            project_key: require("project key", project_key)?.to_ascii_uppercase(),
            slug: require("repository slug", slug)?.to_string(),
        })
    }

    /// Parses `PROJECT/slug`.
    pub fn parse(full_name: &str) -> Result<Self, ApiError> {
        let (key, slug) = full_name.split_once('/').ok_or_else(|| {
            ApiError::Validation(format!("{full_name}: expected <project>/<repo>"))
        })?;
        Self::new(key, slug)
    }

    /// Upper-case project key.
    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Repository slug.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// `projects/{KEY}/repos/{slug}` without a REST root.
    pub(crate) fn segment(&self) -> String {
        format!(
            "projects/{}/repos/{}",
            encode_segment(&self.project_key),
            encode_segment(&self.slug)
        )
    }

    /// `/rest/api/1.0/projects/{KEY}/repos/{slug}`.
    pub fn path(&self) -> String {
        format!("{API_ROOT}/{}", self.segment())
    }
}

impl fmt::Display for ServerRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_key, self.slug)
    }
}

/// A Data Center user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// Numeric id.
    #[serde(default)]
    pub id: u64,

    /// Login name.
    #[serde(default)]
    pub name: String,

    /// Display name.
    #[serde(default, rename = "displayName")]
    pub display_name: String,

    /// Email address, when visible.
    #[serde(default, rename = "emailAddress")]
    pub email_address: Option<String>,

    /// URL slug.
    #[serde(default)]
    pub slug: Option<String>,
}

/// `{ "href": ... }` link as Data Center returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Href {
    /// Absolute URL.
    #[serde(default)]
    pub href: String,

    /// Link name (e.g. `http`, `ssh` for clone links).
    #[serde(default)]
    pub name: Option<String>,
}

/// Typed facade over the Data Center REST API.
#[derive(Debug, Clone)]
pub struct ServerClient {
    transport: Arc<Transport>,
}

impl ServerClient {
    /// Wraps a shared transport.
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub(crate) fn offset(limit: usize) -> ServerOffset {
        ServerOffset::for_limit(limit, DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_uppercases_key() {
        let repo = ServerRepo::new(" proj ", "my repo").unwrap();
        assert_eq!(repo.project_key(), "PROJ");
        assert_eq!(repo.path(), "/rest/api/1.0/projects/PROJ/repos/my%20repo");
        assert_eq!(repo.to_string(), "PROJ/my repo");
    }

    #[test]
    fn test_repo_validation() {
        assert_eq!(
            ServerRepo::new("KEY", "").unwrap_err().to_string(),
            "repository slug is required"
        );
        assert_eq!(ServerRepo::parse("abc/x").unwrap().project_key(), "ABC");
        assert!(ServerRepo::parse("abc").is_err());
    }
}
