//
//  bkt-cli
//  api/cloud/pullrequests.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Cloud pull request API types and operations.
//!
//! # Pull Request States
//!
//! | State | Description |
//! |-------|-------------|
//! | `OPEN` | Active and awaiting review or merge |
//! | `MERGED` | Merged into the destination branch |
//! | `DECLINED` | Rejected and closed without merging |
//! | `SUPERSEDED` | Replaced by another pull request |
//!
//! Approve, unapprove and decline are marked idempotent so the retry loop may
//! replay them; create and merge are not.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Branch, CloudClient, CloudRepo};
use crate::api::common::{require, require_id, ApiError, Patch, Query, UserRef};
use crate::api::context::CallContext;

/// A Bitbucket Cloud pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullRequest {
    /// Numeric id within the repository.
    #[serde(default)]
    pub id: u64,

    /// Title.
    #[serde(default)]
    pub title: String,

    /// Markdown description.
    #[serde(default)]
    pub description: Option<String>,

    /// `OPEN`, `MERGED`, `DECLINED` or `SUPERSEDED`.
    #[serde(default)]
    pub state: String,

    /// Author.
    #[serde(default)]
    pub author: Option<UserRef>,

    /// Source branch and repository.
    #[serde(default)]
    pub source: PrBranchRef,

    /// Destination branch and repository.
    #[serde(default)]
    pub destination: PrBranchRef,

    /// Requested reviewers.
    #[serde(default)]
    pub reviewers: Vec<UserRef>,

    /// Everyone who interacted, with their approval state.
    #[serde(default)]
    pub participants: Vec<Participant>,

    /// ISO 8601 creation time.
    #[serde(default)]
    pub created_on: Option<String>,

    /// ISO 8601 last-update time.
    #[serde(default)]
    pub updated_on: Option<String>,

    /// Who merged or declined it.
    #[serde(default)]
    pub closed_by: Option<UserRef>,

    /// Merge commit, once merged.
    #[serde(default)]
    pub merge_commit: Option<CommitRef>,

    /// Number of comments.
    #[serde(default)]
    pub comment_count: u32,

    /// Number of open tasks.
    #[serde(default)]
    pub task_count: u32,

    /// Whether the source branch is deleted on merge.
    #[serde(default)]
    pub close_source_branch: bool,
}

impl PullRequest {
    /// Participants that approved.
    pub fn approvals(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.approved)
    }
}

/// One side of a pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrBranchRef {
    /// Branch.
    #[serde(default)]
    pub branch: Branch,

    /// Repository holding the branch.
    #[serde(default)]
    pub repository: Option<RepositoryRef>,

    /// Tip commit.
    #[serde(default)]
    pub commit: Option<CommitRef>,
}

/// Lightweight repository reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Repository UUID.
    #[serde(default)]
    pub uuid: String,

    /// Repository name.
    #[serde(default)]
    pub name: String,

    /// `{workspace}/{slug}`.
    #[serde(default)]
    pub full_name: String,
}

/// Commit reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitRef {
    /// Commit SHA.
    #[serde(default)]
    pub hash: String,

    /// Commit message, when embedded.
    #[serde(default)]
    pub message: Option<String>,
}

/// A pull request participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    /// The user.
    #[serde(default)]
    pub user: UserRef,

    /// `PARTICIPANT` or `REVIEWER`.
    #[serde(default)]
    pub role: String,

    /// Whether they approved.
    #[serde(default)]
    pub approved: bool,

    /// `approved`, `changes_requested` or absent.
    #[serde(default)]
    pub state: Option<String>,

    /// When they last participated.
    #[serde(default)]
    pub participated_on: Option<String>,
}

/// Filters for [`CloudClient::list_pull_requests`].
#[derive(Debug, Clone, Default)]
pub struct PullRequestListOptions {
    /// `OPEN` (server default), `MERGED`, `DECLINED`, `SUPERSEDED`.
    pub state: Option<String>,
}

/// Request payload for creating a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequestRequest {
    /// Title.
    pub title: String,

    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source branch.
    pub source: BranchSpec,

    /// Destination branch; the repository main branch when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<BranchSpec>,

    /// Reviewers by UUID.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<UserUuid>,

    /// Delete the source branch on merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_source_branch: Option<bool>,
}

/// Partial update for a pull request; only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePullRequestRequest {
    /// New title.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub title: Patch<String>,

    /// New description; `Patch::Null` clears it.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub description: Patch<String>,

    /// New destination branch.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub destination: Patch<BranchSpec>,

    /// Replacement reviewer list.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub reviewers: Patch<Vec<UserUuid>>,
}

/// Branch selector used in request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchSpec {
    /// Branch wrapper.
    pub branch: BranchName,
}

impl BranchSpec {
    /// `{"branch": {"name": ...}}`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            branch: BranchName { name: name.into() },
        }
    }
}

/// Branch name wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchName {
    /// Branch name.
    pub name: String,
}

/// User reference by UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUuid {
    /// UUID with curly braces.
    pub uuid: String,
}

/// Request payload for merging a pull request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergePullRequestRequest {
    /// Merge commit message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Delete the source branch after merging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_source_branch: Option<bool>,

    /// `merge_commit`, `squash` or `fast_forward`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<String>,
}

fn pr_path(repo: &CloudRepo, id: u64) -> Result<String, ApiError> {
    Ok(format!(
        "{}/pullrequests/{}",
        repo.path(),
        require_id("pull request id", id)?
    ))
}

impl CloudClient {
    /// Lists pull requests.
    pub async fn list_pull_requests(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        options: &PullRequestListOptions,
        limit: usize,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let query = Query::new().push_opt(
            "state",
            options.state.as_deref().map(str::to_ascii_uppercase),
        );
        let path = query.apply(&format!("{}/pullrequests", repo.path()));
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(limit), limit)
            .await
    }

    /// Fetches one pull request.
    pub async fn get_pull_request(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
    ) -> Result<PullRequest, ApiError> {
        let request = self
            .transport()
            .build_request(Method::GET, &pr_path(repo, id)?, None)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Opens a pull request.
    pub async fn create_pull_request(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        body: &CreatePullRequestRequest,
    ) -> Result<PullRequest, ApiError> {
        require("title", &body.title)?;
        require("source branch", &body.source.branch.name)?;
        let path = format!("{}/pullrequests", repo.path());
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Applies a partial update.
    pub async fn update_pull_request(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
        body: &UpdatePullRequestRequest,
    ) -> Result<PullRequest, ApiError> {
        let request = self
            .transport()
            .build_json_request(Method::PUT, &pr_path(repo, id)?, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Approves as the authenticated user.
    pub async fn approve_pull_request(&self, ctx: &CallContext, repo: &CloudRepo, id: u64) -> Result<(), ApiError> {
        let path = format!("{}/approve", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_request(Method::POST, &path, None)?
            .idempotent();
        self.transport().execute_discard(ctx, request).await
    }

    /// Withdraws an approval.
    pub async fn unapprove_pull_request(&self, ctx: &CallContext, repo: &CloudRepo, id: u64) -> Result<(), ApiError> {
        let path = format!("{}/approve", pr_path(repo, id)?);
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Declines a pull request.
    pub async fn decline_pull_request(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
    ) -> Result<PullRequest, ApiError> {
        let path = format!("{}/decline", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_request(Method::POST, &path, None)?
            .idempotent();
        self.transport().execute_json(ctx, request).await
    }

    /// Merges a pull request.
    pub async fn merge_pull_request(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
        body: &MergePullRequestRequest,
    ) -> Result<PullRequest, ApiError> {
        let path = format!("{}/merge", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }
}
