//
//  bkt-cli
//  api/server/pullrequests.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Data Center pull requests
//!
//! Pull requests propose merging `fromRef` into `toRef`. Besides the core
//! lifecycle this module covers review (approve), auto-merge, blocker
//! comments (tasks), comment reactions and suggestion application.
//!
//! ## Endpoints
//!
//! ```text
//! GET/POST /rest/api/1.0/projects/{key}/repos/{slug}/pull-requests
//! GET/PUT  /rest/api/1.0/projects/{key}/repos/{slug}/pull-requests/{id}
//! POST     .../pull-requests/{id}/{decline,reopen,merge}
//! POST/DEL .../pull-requests/{id}/approve
//! GET/POST/DELETE /rest/api/latest/.../pull-requests/{id}/auto-merge
//! GET/POST/PUT    .../pull-requests/{id}/blocker-comments[/{commentId}]
//! PUT/DELETE      /rest/comment-likes/latest/.../comments/{commentId}/reactions/{emoji}
//! POST            .../pull-requests/{id}/comments/{commentId}/apply-suggestion
//! ```
//!
//! ## Optimistic Locking
//!
//! Every write that changes pull request state carries the `version` from
//! the last read. A concurrent change makes the server answer 409; the
//! error keeps the server's message so the caller can re-read and retry.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{branch_ref, ProjectRef, ServerClient, ServerRepo, User};
use crate::api::common::{encode_segment, require, require_id, ApiError, Patch, Query};
use crate::api::context::CallContext;

/// A Data Center pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullRequest {
    /// Id within the repository.
    #[serde(default)]
    pub id: u64,

    /// Optimistic-lock version.
    #[serde(default)]
    pub version: u64,

    /// Title.
    #[serde(default)]
    pub title: String,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// `OPEN`, `MERGED` or `DECLINED`.
    #[serde(default)]
    pub state: String,

    /// Whether the pull request is open.
    #[serde(default)]
    pub open: bool,

    /// Whether the pull request is closed.
    #[serde(default)]
    pub closed: bool,

    /// Creation time, Unix milliseconds.
    #[serde(default, rename = "createdDate")]
    pub created_date: u64,

    /// Last update, Unix milliseconds.
    #[serde(default, rename = "updatedDate")]
    pub updated_date: u64,

    /// Source ref.
    #[serde(default, rename = "fromRef")]
    pub from_ref: PrRef,

    /// Target ref.
    #[serde(default, rename = "toRef")]
    pub to_ref: PrRef,

    /// Author.
    #[serde(default)]
    pub author: Option<PrParticipant>,

    /// Reviewers.
    #[serde(default)]
    pub reviewers: Vec<PrParticipant>,

    /// Non-reviewer participants.
    #[serde(default)]
    pub participants: Vec<PrParticipant>,
}

/// A ref on either side of a pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrRef {
    /// Full ref, e.g. `refs/heads/feature`.
    #[serde(default)]
    pub id: String,

    /// Short name.
    #[serde(default, rename = "displayId")]
    pub display_id: String,

    /// Tip commit.
    #[serde(default, rename = "latestCommit")]
    pub latest_commit: Option<String>,

    /// Repository holding the ref.
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

/// Repository reference embedded in a [`PrRef`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Numeric id.
    #[serde(default)]
    pub id: u64,

    /// Slug.
    #[serde(default)]
    pub slug: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Owning project.
    #[serde(default)]
    pub project: ProjectRef,
}

/// A reviewer, author or participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrParticipant {
    /// The user.
    #[serde(default)]
    pub user: User,

    /// `AUTHOR`, `REVIEWER` or `PARTICIPANT`.
    #[serde(default)]
    pub role: String,

    /// Whether the participant approved.
    #[serde(default)]
    pub approved: bool,

    /// `APPROVED`, `NEEDS_WORK` or `UNAPPROVED`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Filters for [`ServerClient::list_pull_requests`].
#[derive(Debug, Clone, Default)]
pub struct PullRequestListOptions {
    /// `OPEN`, `MERGED`, `DECLINED` or `ALL`.
    pub state: Option<String>,
    /// `INCOMING` or `OUTGOING`.
    pub direction: Option<String>,
    /// Restrict to pull requests targeting this branch.
    pub at: Option<String>,
}

/// Request payload for opening a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequestRequest {
    /// Title.
    pub title: String,

    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source.
    #[serde(rename = "fromRef")]
    pub from_ref: RefSpec,

    /// Target.
    #[serde(rename = "toRef")]
    pub to_ref: RefSpec,

    /// Requested reviewers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<Reviewer>,
}

impl CreatePullRequestRequest {
    /// A same-repository pull request from `from` into `to`.
    pub fn new(repo: &ServerRepo, title: impl Into<String>, from: &str, to: &str) -> Self {
        Self {
            title: title.into(),
            description: None,
            from_ref: RefSpec::new(repo, from),
            to_ref: RefSpec::new(repo, to),
            reviewers: Vec::new(),
        }
    }
}

/// Ref in a request body.
#[derive(Debug, Clone, Serialize)]
pub struct RefSpec {
    /// Full ref.
    pub id: String,
    /// Repository holding the ref.
    pub repository: RepositorySpec,
}

impl RefSpec {
    /// `refs/heads/{branch}` in `repo`.
    pub fn new(repo: &ServerRepo, branch: &str) -> Self {
        Self {
            id: branch_ref(branch.trim()),
            repository: RepositorySpec {
                slug: repo.slug().to_string(),
                project: ProjectSpec {
                    key: repo.project_key().to_string(),
                },
            },
        }
    }
}

/// Repository in a request body.
#[derive(Debug, Clone, Serialize)]
pub struct RepositorySpec {
    /// Slug.
    pub slug: String,
    /// Project.
    pub project: ProjectSpec,
}

/// Project in a request body.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSpec {
    /// Key.
    pub key: String,
}

/// Reviewer in a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reviewer {
    /// The reviewer's login.
    pub user: UserName,
}

impl Reviewer {
    /// Reviewer by login name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            user: UserName { name: name.into() },
        }
    }
}

/// `{ "name": ... }` user reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserName {
    /// Login name.
    pub name: String,
}

/// Partial update for a pull request.
///
/// Fields left as [`Patch::Unset`] keep their server value; `fromRef`,
/// `toRef` and `reviewers` are round-tripped from a fresh read.
#[derive(Debug, Clone, Default)]
pub struct UpdatePullRequestRequest {
    /// Expected version; the freshly read version is used when `None`.
    pub version: Option<u64>,
    /// New title.
    pub title: Patch<String>,
    /// New description; `Patch::Null` clears it.
    pub description: Patch<String>,
    /// New target branch.
    pub to_branch: Patch<String>,
    /// Replacement reviewer list.
    pub reviewers: Patch<Vec<Reviewer>>,
}

/// Options for [`ServerClient::merge_pull_request`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergePullRequestRequest {
    /// Expected version.
    pub version: u64,

    /// Merge commit message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Merge strategy id, e.g. `no-ff`, `squash`.
    #[serde(rename = "strategyId", skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
}

/// A pending auto-merge request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoMergeRequest {
    /// Commit subject used when the merge happens.
    #[serde(default, rename = "autoSubject")]
    pub auto_subject: Option<String>,

    /// Merge strategy id.
    #[serde(default, rename = "strategyId")]
    pub strategy_id: Option<String>,

    /// Source ref.
    #[serde(default, rename = "fromRefDisplayId")]
    pub from_ref_display_id: Option<String>,

    /// Target ref.
    #[serde(default, rename = "toRefDisplayId")]
    pub to_ref_display_id: Option<String>,

    /// Requesting user.
    #[serde(default)]
    pub user: Option<User>,

    /// Request time, Unix milliseconds.
    #[serde(default, rename = "creationDate")]
    pub creation_date: Option<u64>,
}

/// Options for [`ServerClient::set_auto_merge`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoMergeOptions {
    /// Commit subject.
    #[serde(rename = "autoSubject", skip_serializing_if = "Option::is_none")]
    pub auto_subject: Option<String>,

    /// Merge strategy id.
    #[serde(rename = "strategyId", skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
}

/// A pull request comment; blocker comments are tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    #[serde(default)]
    pub id: u64,

    /// Optimistic-lock version.
    #[serde(default)]
    pub version: u64,

    /// Markdown text.
    #[serde(default)]
    pub text: String,

    /// `OPEN` or `RESOLVED`.
    #[serde(default)]
    pub state: Option<String>,

    /// `NORMAL` or `BLOCKER`.
    #[serde(default)]
    pub severity: Option<String>,

    /// Author.
    #[serde(default)]
    pub author: Option<User>,

    /// Creation time, Unix milliseconds.
    #[serde(default, rename = "createdDate")]
    pub created_date: u64,
}

/// Identifies one suggestion inside a comment.
#[derive(Debug, Clone, Serialize)]
pub struct ApplySuggestionRequest {
    /// Version of the comment holding the suggestion.
    #[serde(rename = "commentVersion")]
    pub comment_version: u64,

    /// Pull request version.
    #[serde(rename = "pullRequestVersion")]
    pub pull_request_version: u64,

    /// Zero-based index of the suggestion within the comment.
    #[serde(rename = "suggestionIndex")]
    pub suggestion_index: u32,

    /// Commit message for the resulting commit.
    #[serde(rename = "commitMessage", skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

fn pr_segment(repo: &ServerRepo, id: u64) -> Result<String, ApiError> {
    Ok(format!(
        "{}/pull-requests/{}",
        repo.segment(),
        require_id("pull request id", id)?
    ))
}

fn pr_path(repo: &ServerRepo, id: u64) -> Result<String, ApiError> {
    Ok(format!("{}/{}", super::API_ROOT, pr_segment(repo, id)?))
}

fn version_body(version: u64) -> Value {
    json!({ "version": version })
}

/// Builds the PUT body for an update from the current server state.
fn merge_update(current: &Value, update: &UpdatePullRequestRequest, repo: &ServerRepo) -> Result<Value, ApiError> {
    let mut body = Map::new();

    let version = match update.version {
        Some(version) => version,
        None => current
            .get("version")
            .and_then(Value::as_u64)
            .unwrap_or_default(),
    };
    body.insert("version".into(), json!(version));

    let title = match &update.title {
        Patch::Value(title) => json!(require("title", title)?),
        Patch::Null => return Err(ApiError::required("title")),
        Patch::Unset => current.get("title").cloned().unwrap_or(Value::Null),
    };
    body.insert("title".into(), title);

    match &update.description {
        Patch::Value(text) => {
            body.insert("description".into(), json!(text));
        }
        Patch::Null => {
            body.insert("description".into(), Value::Null);
        }
        Patch::Unset => {
            if let Some(text) = current.get("description") {
                body.insert("description".into(), text.clone());
            }
        }
    }

    if let Some(from) = current.get("fromRef") {
        body.insert("fromRef".into(), from.clone());
    }

    let to_ref = match &update.to_branch {
        Patch::Value(branch) => serde_json::to_value(RefSpec::new(repo, require("target branch", branch)?))
            .map_err(ApiError::Encode)?,
        Patch::Null => return Err(ApiError::required("target branch")),
        Patch::Unset => current.get("toRef").cloned().unwrap_or(Value::Null),
    };
    body.insert("toRef".into(), to_ref);

    let reviewers = match &update.reviewers {
        Patch::Value(reviewers) => serde_json::to_value(reviewers).map_err(ApiError::Encode)?,
        Patch::Null => json!([]),
        Patch::Unset => current
            .get("reviewers")
            .cloned()
            .unwrap_or_else(|| json!([])),
    };
    body.insert("reviewers".into(), reviewers);

    Ok(Value::Object(body))
}

impl ServerClient {
    /// Lists pull requests.
    pub async fn list_pull_requests(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        options: &PullRequestListOptions,
        limit: usize,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let path = Query::new()
            .push_opt("state", options.state.as_deref().map(str::to_ascii_uppercase))
            .push_opt("direction", options.direction.as_deref().map(str::to_ascii_uppercase))
            .push_opt("at", options.at.as_deref().map(branch_ref))
            .apply(&format!("{}/pull-requests", repo.path()));
        self.transport()
            .walk_pages(ctx, &path, &Self::offset(limit), limit)
            .await
    }

    /// Fetches one pull request.
    pub async fn get_pull_request(&self, ctx: &CallContext, repo: &ServerRepo, id: u64) -> Result<PullRequest, ApiError> {
        let request = self
            .transport()
            .build_request(Method::GET, &pr_path(repo, id)?, None)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Opens a pull request.
    pub async fn create_pull_request(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        body: &CreatePullRequestRequest,
    ) -> Result<PullRequest, ApiError> {
        require("title", &body.title)?;
        let path = format!("{}/pull-requests", repo.path());
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Updates a pull request, preserving refs and reviewers the caller
    /// does not replace.
    pub async fn update_pull_request(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        update: &UpdatePullRequestRequest,
    ) -> Result<PullRequest, ApiError> {
        let path = pr_path(repo, id)?;
        let read = self
            .transport()
            .build_request(Method::GET, &path, None)?
            .no_cache();
        let current: Value = self.transport().execute_json(ctx, read).await?;

        let body = merge_update(&current, update, repo)?;
        let request = self
            .transport()
            .build_json_request(Method::PUT, &path, &body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Declines a pull request at `version`.
    pub async fn decline_pull_request(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        version: u64,
    ) -> Result<PullRequest, ApiError> {
        let path = format!("{}/decline", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, &version_body(version))?
            .idempotent();
        self.transport().execute_json(ctx, request).await
    }

    /// Reopens a declined pull request at `version`.
    pub async fn reopen_pull_request(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        version: u64,
    ) -> Result<PullRequest, ApiError> {
        let path = format!("{}/reopen", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, &version_body(version))?;
        self.transport().execute_json(ctx, request).await
    }

    /// Merges a pull request.
    pub async fn merge_pull_request(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        body: &MergePullRequestRequest,
    ) -> Result<PullRequest, ApiError> {
        let path = format!("{}/merge", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Approves as the authenticated user.
    pub async fn approve_pull_request(&self, ctx: &CallContext, repo: &ServerRepo, id: u64) -> Result<(), ApiError> {
        let path = format!("{}/approve", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_request(Method::POST, &path, None)?
            .idempotent();
        self.transport().execute_discard(ctx, request).await
    }

    /// Withdraws an approval.
    pub async fn unapprove_pull_request(&self, ctx: &CallContext, repo: &ServerRepo, id: u64) -> Result<(), ApiError> {
        let path = format!("{}/approve", pr_path(repo, id)?);
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Pending auto-merge request, or `None` when there is none.
    pub async fn get_auto_merge(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
    ) -> Result<Option<AutoMergeRequest>, ApiError> {
        let path = format!("/rest/api/latest/{}/auto-merge", pr_segment(repo, id)?);
        let request = self
            .transport()
            .build_request(Method::GET, &path, None)?
            .no_cache();
        match self.transport().execute_json(ctx, request).await {
            Ok(state) => Ok(state),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Asks the server to merge once all checks pass.
    pub async fn set_auto_merge(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        options: &AutoMergeOptions,
    ) -> Result<Option<AutoMergeRequest>, ApiError> {
        let path = format!("/rest/api/latest/{}/auto-merge", pr_segment(repo, id)?);
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, options)?
            .idempotent();
        self.transport().execute_json(ctx, request).await
    }

    /// Cancels a pending auto-merge.
    pub async fn cancel_auto_merge(&self, ctx: &CallContext, repo: &ServerRepo, id: u64) -> Result<(), ApiError> {
        let path = format!("/rest/api/latest/{}/auto-merge", pr_segment(repo, id)?);
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Lists blocker comments (tasks), optionally by state.
    pub async fn list_tasks(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        state: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Comment>, ApiError> {
        let path = Query::new()
            .push_opt("state", state.map(str::to_ascii_uppercase))
            .apply(&format!("{}/blocker-comments", pr_path(repo, id)?));
        self.transport()
            .walk_pages(ctx, &path, &Self::offset(limit), limit)
            .await
    }

    /// Creates a task.
    pub async fn create_task(&self, ctx: &CallContext, repo: &ServerRepo, id: u64, text: &str) -> Result<Comment, ApiError> {
        let text = require("task text", text)?;
        let path = format!("{}/blocker-comments", pr_path(repo, id)?);
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, &json!({ "text": text }))?;
        self.transport().execute_json(ctx, request).await
    }

    /// Resolves (or reopens) a task at `version`.
    pub async fn resolve_task(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        comment_id: u64,
        version: u64,
        resolved: bool,
    ) -> Result<Comment, ApiError> {
        let path = format!(
            "{}/blocker-comments/{}",
            pr_path(repo, id)?,
            require_id("comment id", comment_id)?
        );
        let state = if resolved { "RESOLVED" } else { "OPEN" };
        let request = self.transport().build_json_request(
            Method::PUT,
            &path,
            &json!({ "state": state, "version": version }),
        )?;
        self.transport().execute_json(ctx, request).await
    }

    fn reaction_path(repo: &ServerRepo, id: u64, comment_id: u64, emoji: &str) -> Result<String, ApiError> {
        let emoji = require("emoji", emoji)?.trim_matches(':');
        Ok(format!(
            "/rest/comment-likes/latest/{}/comments/{}/reactions/{}",
            pr_segment(repo, id)?,
            require_id("comment id", comment_id)?,
            encode_segment(emoji)
        ))
    }

    /// Adds an emoji reaction to a comment.
    pub async fn add_reaction(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        comment_id: u64,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let path = Self::reaction_path(repo, id, comment_id, emoji)?;
        let request = self.transport().build_request(Method::PUT, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Removes an emoji reaction from a comment.
    pub async fn remove_reaction(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        comment_id: u64,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let path = Self::reaction_path(repo, id, comment_id, emoji)?;
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Commits a code suggestion from a comment.
    pub async fn apply_suggestion(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        id: u64,
        comment_id: u64,
        body: &ApplySuggestionRequest,
    ) -> Result<(), ApiError> {
        let path = format!(
            "{}/comments/{}/apply-suggestion",
            pr_path(repo, id)?,
            require_id("comment id", comment_id)?
        );
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_discard(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ServerRepo {
        ServerRepo::new("proj", "repo").unwrap()
    }

    fn current() -> Value {
        json!({
            "id": 10,
            "version": 2,
            "title": "Old",
            "description": "keep me",
            "fromRef": {"id": "refs/heads/feature", "displayId": "feature"},
            "toRef": {"id": "refs/heads/main", "displayId": "main"},
            "reviewers": [{"user": {"name": "bob"}, "approved": false}]
        })
    }

    #[test]
    fn test_update_preserves_refs_and_reviewers() {
        let update = UpdatePullRequestRequest {
            title: Patch::Value("New".into()),
            ..Default::default()
        };
        let body = merge_update(&current(), &update, &repo()).unwrap();
        assert_eq!(body["version"], 2);
        assert_eq!(body["title"], "New");
        assert_eq!(body["description"], "keep me");
        assert_eq!(body["fromRef"]["displayId"], "feature");
        assert_eq!(body["toRef"]["id"], "refs/heads/main");
        assert_eq!(body["reviewers"][0]["user"]["name"], "bob");
    }

    #[test]
    fn test_update_replaces_when_asked() {
        let update = UpdatePullRequestRequest {
            version: Some(5),
            description: Patch::Null,
            to_branch: Patch::Value("release".into()),
            reviewers: Patch::Value(vec![Reviewer::named("carol")]),
            ..Default::default()
        };
        let body = merge_update(&current(), &update, &repo()).unwrap();
        assert_eq!(body["version"], 5);
        assert_eq!(body["title"], "Old");
        assert!(body["description"].is_null());
        assert_eq!(body["toRef"]["id"], "refs/heads/release");
        assert_eq!(body["toRef"]["repository"]["project"]["key"], "PROJ");
        assert_eq!(body["reviewers"], json!([{"user": {"name": "carol"}}]));
    }

    #[test]
    fn test_update_rejects_clearing_title() {
        let update = UpdatePullRequestRequest {
            title: Patch::Null,
            ..Default::default()
        };
        assert!(merge_update(&current(), &update, &repo()).is_err());
    }

    #[test]
    fn test_reaction_path_strips_colons() {
        let path = ServerClient::reaction_path(&repo(), 3, 7, ":thumbsup:").unwrap();
        assert_eq!(
            path,
            "/rest/comment-likes/latest/projects/PROJ/repos/repo/pull-requests/3/comments/7/reactions/thumbsup"
        );
    }

    #[test]
    fn test_create_request_uses_full_refs() {
        let body = serde_json::to_value(CreatePullRequestRequest::new(&repo(), "T", "feature", "main")).unwrap();
        assert_eq!(body["fromRef"]["id"], "refs/heads/feature");
        assert_eq!(body["toRef"]["repository"]["slug"], "repo");
        assert!(body.get("reviewers").is_none());
    }
}
