//
//  bkt-cli
//  api/cloud/repositories.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Cloud repository API types and operations.
//!
//! Repositories belong to a workspace and optionally to a project within
//! that workspace. The `full_name` field follows `{workspace}/{repo_slug}`.
//!
//! # Example
//!
//! ```rust,no_run
//! use bkt::api::cloud::{CreateRepositoryRequest, ProjectKey};
//!
//! let request = CreateRepositoryRequest {
//!     description: Some("Main backend microservice".to_string()),
//!     is_private: Some(true),
//!     project: Some(ProjectKey { key: "BACKEND".to_string() }),
//!     ..CreateRepositoryRequest::new("backend-service")
//! };
//! ```

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{CloudClient, CloudRepo};
use crate::api::common::{encode_segment, require, ApiError, UserRef};
use crate::api::context::CallContext;

/// A Bitbucket Cloud repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    /// Unique identifier (e.g., `{123e4567-e89b-...}`).
    #[serde(default)]
    pub uuid: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// `{workspace_slug}/{repo_slug}`.
    #[serde(default)]
    pub full_name: String,

    /// URL-safe identifier derived from the name.
    #[serde(default)]
    pub slug: String,

    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,

    /// Whether the repository is private.
    #[serde(default)]
    pub is_private: bool,

    /// Primary language, if detected.
    #[serde(default)]
    pub language: Option<String>,

    /// Main branch reference.
    #[serde(default)]
    pub mainbranch: Option<Branch>,

    /// Owning user or team.
    #[serde(default)]
    pub owner: Option<UserRef>,

    /// Enclosing workspace.
    #[serde(default)]
    pub workspace: Option<WorkspaceRef>,

    /// Enclosing project, if any.
    #[serde(default)]
    pub project: Option<ProjectRef>,

    /// ISO 8601 creation time.
    #[serde(default)]
    pub created_on: Option<String>,

    /// ISO 8601 last-update time.
    #[serde(default)]
    pub updated_on: Option<String>,
}

/// A branch reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name (e.g., `main`, `feature/login`).
    #[serde(default)]
    pub name: String,

    /// `branch` or `named_branch`.
    #[serde(default, rename = "type")]
    pub branch_type: Option<String>,
}

/// Lightweight workspace reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceRef {
    /// Workspace UUID.
    #[serde(default)]
    pub uuid: String,

    /// Workspace slug.
    #[serde(default)]
    pub slug: String,

    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Lightweight project reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Project UUID.
    #[serde(default)]
    pub uuid: String,

    /// Short project key (typically uppercase).
    #[serde(default)]
    pub key: String,

    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Request payload for creating a repository.
///
/// The slug comes from the URL, not the body; if `is_private` is omitted the
/// workspace default applies.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    /// Name for the new repository.
    pub name: String,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Visibility; inherits the workspace default when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,

    /// Project to file the repository under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectKey>,

    /// Primary language tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Always `git`.
    pub scm: &'static str,
}

impl CreateRepositoryRequest {
    /// A minimal request.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_private: None,
            project: None,
            language: None,
            scm: "git",
        }
    }
}

/// Project key used when assigning a repository to a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectKey {
    /// Project key.
    pub key: String,
}

impl CloudClient {
    /// Lists repositories in a workspace, most recently updated first.
    pub async fn list_repositories(
        &self,
        ctx: &CallContext,
        workspace: &str,
        limit: usize,
    ) -> Result<Vec<Repository>, ApiError> {
        let workspace = require("workspace", workspace)?;
        let path = format!(
            "/repositories/{}?sort=-updated_on",
            encode_segment(workspace)
        );
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(limit), limit)
            .await
    }

    /// Fetches one repository.
    pub async fn get_repository(&self, ctx: &CallContext, repo: &CloudRepo) -> Result<Repository, ApiError> {
        let request = self.transport().build_request(Method::GET, &repo.path(), None)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Creates a repository at `repo`.
    pub async fn create_repository(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        body: &CreateRepositoryRequest,
    ) -> Result<Repository, ApiError> {
        require("repository name", &body.name)?;
        let request = self
            .transport()
            .build_json_request(Method::POST, &repo.path(), body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Deletes a repository.
    pub async fn delete_repository(&self, ctx: &CallContext, repo: &CloudRepo) -> Result<(), ApiError> {
        let request = self.transport().build_request(Method::DELETE, &repo.path(), None)?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Lists branches.
    pub async fn list_branches(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        limit: usize,
    ) -> Result<Vec<Branch>, ApiError> {
        let path = format!("{}/refs/branches", repo.path());
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(limit), limit)
            .await
    }

    /// Deletes a branch.
    pub async fn delete_branch(&self, ctx: &CallContext, repo: &CloudRepo, branch: &str) -> Result<(), ApiError> {
        let branch = require("branch", branch)?;
        let path = format!("{}/refs/branches/{}", repo.path(), encode_segment(branch));
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }
}
