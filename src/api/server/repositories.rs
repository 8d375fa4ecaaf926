//
//  bkt-cli
//  api/server/repositories.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Data Center repositories and branches
//!
//! ```text
//! GET/POST   /rest/api/1.0/projects/{projectKey}/repos
//! GET/DELETE /rest/api/1.0/projects/{projectKey}/repos/{repoSlug}
//! GET        /rest/api/1.0/projects/{projectKey}/repos/{repoSlug}/branches
//! DELETE     /rest/branch-utils/1.0/projects/{projectKey}/repos/{repoSlug}/branches
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use bkt::api::server::CreateRepositoryRequest;
//!
//! let request = CreateRepositoryRequest {
//!     description: Some("A sample repository".to_string()),
//!     ..CreateRepositoryRequest::new("my-new-repo")
//! };
//! ```

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Href, ServerClient, ServerRepo, API_ROOT};
use crate::api::common::{encode_segment, require, ApiError, Query};
use crate::api::context::CallContext;

/// A Data Center repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    /// Numeric id.
    #[serde(default)]
    pub id: u64,

    /// URL slug.
    #[serde(default)]
    pub slug: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Owning project.
    #[serde(default)]
    pub project: ProjectRef,

    /// Always `git`.
    #[serde(default, rename = "scmId")]
    pub scm_id: String,

    /// `AVAILABLE`, `INITIALISING`, `INITIALISATION_FAILED`.
    #[serde(default)]
    pub state: String,

    /// Whether forks are allowed.
    #[serde(default)]
    pub forkable: bool,

    /// Public read access.
    #[serde(default, rename = "public")]
    pub is_public: bool,

    /// Links.
    #[serde(default)]
    pub links: RepositoryLinks,
}

impl Repository {
    /// First clone URL with the given name (`http` or `ssh`).
    pub fn clone_url(&self, name: &str) -> Option<&str> {
        self.links
            .clone
            .iter()
            .find(|link| link.name.as_deref() == Some(name))
            .map(|link| link.href.as_str())
    }
}

/// Minimal project reference embedded in repositories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Numeric id.
    #[serde(default)]
    pub id: u64,

    /// Project key.
    #[serde(default)]
    pub key: String,

    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Links attached to a [`Repository`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryLinks {
    /// Clone URLs.
    #[serde(default)]
    pub clone: Vec<Href>,

    /// Browser URLs.
    #[serde(default, rename = "self")]
    pub self_link: Vec<Href>,
}

/// Request payload for creating a repository.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    /// Name; the slug is derived from it.
    pub name: String,

    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Always `git`.
    #[serde(rename = "scmId")]
    pub scm_id: String,

    /// Allow forks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forkable: Option<bool>,

    /// Public read access.
    #[serde(rename = "public", skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl CreateRepositoryRequest {
    /// A request with server defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            scm_id: "git".to_string(),
            forkable: None,
            is_public: None,
        }
    }
}

/// A branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Branch {
    /// Full ref, e.g. `refs/heads/main`.
    #[serde(default)]
    pub id: String,

    /// Short name.
    #[serde(default, rename = "displayId")]
    pub display_id: String,

    /// Tip commit.
    #[serde(default, rename = "latestCommit")]
    pub latest_commit: Option<String>,

    /// Whether this is the repository default.
    #[serde(default, rename = "isDefault")]
    pub is_default: bool,
}

#[derive(Serialize)]
struct DeleteBranchBody {
    name: String,
    #[serde(rename = "dryRun")]
    dry_run: bool,
}

/// Expands a short branch name into `refs/heads/...`.
pub fn branch_ref(name: &str) -> String {
    if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("refs/heads/{name}")
    }
}

impl ServerClient {
    /// Lists repositories in a project.
    pub async fn list_repositories(
        &self,
        ctx: &CallContext,
        project_key: &str,
        limit: usize,
    ) -> Result<Vec<Repository>, ApiError> {
        let key = require("project key", project_key)?.to_ascii_uppercase();
        let path = format!("{API_ROOT}/projects/{}/repos", encode_segment(&key));
        self.transport()
            .walk_pages(ctx, &path, &Self::offset(limit), limit)
            .await
    }

    /// Fetches one repository.
    pub async fn get_repository(&self, ctx: &CallContext, repo: &ServerRepo) -> Result<Repository, ApiError> {
        let request = self.transport().build_request(Method::GET, &repo.path(), None)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Creates a repository in `project_key`.
    pub async fn create_repository(
        &self,
        ctx: &CallContext,
        project_key: &str,
        body: &CreateRepositoryRequest,
    ) -> Result<Repository, ApiError> {
        let key = require("project key", project_key)?.to_ascii_uppercase();
        require("repository name", &body.name)?;
        let path = format!("{API_ROOT}/projects/{}/repos", encode_segment(&key));
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Schedules a repository for deletion.
    pub async fn delete_repository(&self, ctx: &CallContext, repo: &ServerRepo) -> Result<(), ApiError> {
        let request = self
            .transport()
            .build_request(Method::DELETE, &repo.path(), None)?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Lists branches, optionally filtered by text.
    pub async fn list_branches(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Branch>, ApiError> {
        let path = Query::new()
            .push_opt("filterText", filter)
            .apply(&format!("{}/branches", repo.path()));
        self.transport()
            .walk_pages(ctx, &path, &Self::offset(limit), limit)
            .await
    }

    /// Deletes a branch through the branch-utils API.
    ///
    /// `branch` may be a short name or a full `refs/heads/...` ref.
    pub async fn delete_branch(&self, ctx: &CallContext, repo: &ServerRepo, branch: &str) -> Result<(), ApiError> {
        let branch = require("branch", branch)?;
        let path = format!("/rest/branch-utils/1.0/{}/branches", repo.segment());
        let body = DeleteBranchBody {
            name: branch_ref(branch),
            dry_run: false,
        };
        let request = self
            .transport()
            .build_json_request(Method::DELETE, &path, &body)?;
        self.transport().execute_discard(ctx, request).await
    }
}
