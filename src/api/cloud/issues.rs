//
//  bkt-cli
//  api/cloud/issues.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Cloud issue tracker types and operations.
//!
//! # Issue Properties
//!
//! | Property | Values |
//! |----------|--------|
//! | State | `new`, `open`, `resolved`, `on hold`, `invalid`, `duplicate`, `wontfix`, `closed` |
//! | Priority | `trivial`, `minor`, `major`, `critical`, `blocker` |
//! | Kind | `bug`, `enhancement`, `proposal`, `task` |
//!
//! # Filtering
//!
//! List filters are compiled into a BBQL expression sent as `q`:
//!
//! ```rust
//! use bkt::api::cloud::IssueListOptions;
//!
//! let options = IssueListOptions {
//!     state: Some("open".into()),
//!     kind: Some("bug".into()),
//!     ..Default::default()
//! };
//! assert_eq!(options.bbql().as_deref(), Some(r#"state = "open" AND kind = "bug""#));
//! ```
//!
//! # Notes
//!
//! - The tracker must be enabled for the repository; otherwise every call
//!   fails with a 404 [`ApiError::HttpStatus`]
//! - Attachment downloads follow the server's redirect to file storage

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use super::{CloudClient, CloudRepo, UserUuid};
use crate::api::common::{encode_segment, require, require_id, ApiError, Link, Patch, Query, UserRef};
use crate::api::context::CallContext;
use crate::api::multipart::MultipartFile;

/// A Bitbucket Cloud issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    /// Sequential id within the repository.
    #[serde(default)]
    pub id: u64,

    /// Summary line.
    #[serde(default)]
    pub title: String,

    /// Body.
    #[serde(default)]
    pub content: Option<IssueContent>,

    /// Workflow state.
    #[serde(default)]
    pub state: String,

    /// Priority.
    #[serde(default)]
    pub priority: String,

    /// Kind.
    #[serde(default)]
    pub kind: String,

    /// Reporter.
    #[serde(default)]
    pub reporter: Option<UserRef>,

    /// Assignee.
    #[serde(default)]
    pub assignee: Option<UserRef>,

    /// ISO 8601 creation time.
    #[serde(default)]
    pub created_on: Option<String>,

    /// ISO 8601 last-update time.
    #[serde(default)]
    pub updated_on: Option<String>,

    /// Vote count.
    #[serde(default)]
    pub votes: u32,
}

/// Rendered and raw issue body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueContent {
    /// Raw markup.
    #[serde(default)]
    pub raw: String,

    /// `markdown`, `creole` or `plaintext`.
    #[serde(default)]
    pub markup: Option<String>,

    /// Rendered HTML.
    #[serde(default)]
    pub html: Option<String>,
}

/// Raw body for request payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueContentInput {
    /// Raw markup.
    pub raw: String,
}

/// Filters for [`CloudClient::list_issues`].
#[derive(Debug, Clone, Default)]
pub struct IssueListOptions {
    /// State; `all` disables the filter.
    pub state: Option<String>,
    /// Kind.
    pub kind: Option<String>,
    /// Priority.
    pub priority: Option<String>,
    /// Assignee nickname.
    pub assignee: Option<String>,
    /// Milestone name.
    pub milestone: Option<String>,
    /// Substring match on the title.
    pub search: Option<String>,
    /// Sort key, e.g. `-updated_on`.
    pub sort: Option<String>,
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl IssueListOptions {
    /// Compiles the filters into BBQL, or `None` when nothing filters.
    pub fn bbql(&self) -> Option<String> {
        let mut pieces = Vec::new();

        if let Some(state) = present(&self.state).filter(|s| !s.eq_ignore_ascii_case("all")) {
            pieces.push(format!("state = {}", quoted(state)));
        }
        if let Some(kind) = present(&self.kind) {
            pieces.push(format!("kind = {}", quoted(kind)));
        }
        if let Some(priority) = present(&self.priority) {
            pieces.push(format!("priority = {}", quoted(priority)));
        }
        if let Some(assignee) = present(&self.assignee) {
            pieces.push(format!("assignee.nickname = {}", quoted(assignee)));
        }
        if let Some(milestone) = present(&self.milestone) {
            pieces.push(format!("milestone.name = {}", quoted(milestone)));
        }
        if let Some(search) = present(&self.search) {
            pieces.push(format!("title ~ {}", quoted(search)));
        }

        (!pieces.is_empty()).then(|| pieces.join(" AND "))
    }

    fn query(&self) -> Query {
        Query::new()
            .push_opt("q", self.bbql())
            .push_opt("sort", present(&self.sort))
    }
}

/// Request payload for creating an issue.
#[derive(Debug, Clone, Serialize)]
pub struct CreateIssueRequest {
    /// Title.
    pub title: String,

    /// Body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IssueContentInput>,

    /// Initial state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    /// Kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Assignee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserUuid>,
}

/// Partial update for an issue; only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateIssueRequest {
    /// New title.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub title: Patch<String>,

    /// New body.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub content: Patch<IssueContentInput>,

    /// New state.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub state: Patch<String>,

    /// New priority.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub priority: Patch<String>,

    /// New kind.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub kind: Patch<String>,

    /// New assignee; `Patch::Null` unassigns.
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub assignee: Patch<UserUuid>,
}

/// An issue attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    /// File name.
    #[serde(default)]
    pub name: String,

    /// Links; `self` points at the download endpoint.
    #[serde(default)]
    pub links: AttachmentLinks,
}

/// Links embedded in an [`Attachment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentLinks {
    /// Download link.
    #[serde(default, rename = "self")]
    pub self_link: Option<Link>,
}

fn issue_path(repo: &CloudRepo, id: u64) -> Result<String, ApiError> {
    Ok(format!(
        "{}/issues/{}",
        repo.path(),
        require_id("issue id", id)?
    ))
}

impl CloudClient {
    /// Lists issues matching `options`.
    pub async fn list_issues(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        options: &IssueListOptions,
        limit: usize,
    ) -> Result<Vec<Issue>, ApiError> {
        let path = options.query().apply(&format!("{}/issues", repo.path()));
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(limit), limit)
            .await
    }

    /// Fetches one issue.
    pub async fn get_issue(&self, ctx: &CallContext, repo: &CloudRepo, id: u64) -> Result<Issue, ApiError> {
        let request = self
            .transport()
            .build_request(Method::GET, &issue_path(repo, id)?, None)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Files a new issue.
    pub async fn create_issue(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        body: &CreateIssueRequest,
    ) -> Result<Issue, ApiError> {
        require("title", &body.title)?;
        let path = format!("{}/issues", repo.path());
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Applies a partial update.
    pub async fn update_issue(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
        body: &UpdateIssueRequest,
    ) -> Result<Issue, ApiError> {
        let request = self
            .transport()
            .build_json_request(Method::PUT, &issue_path(repo, id)?, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Lists attachments on an issue.
    pub async fn list_issue_attachments(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
    ) -> Result<Vec<Attachment>, ApiError> {
        let path = format!("{}/attachments", issue_path(repo, id)?);
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(0), 0)
            .await
    }

    /// Uploads files as attachments (multipart field `files`).
    pub async fn upload_issue_attachments(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
        files: Vec<MultipartFile>,
    ) -> Result<(), ApiError> {
        if files.is_empty() {
            return Err(ApiError::required("files"));
        }
        let path = format!("{}/attachments", issue_path(repo, id)?);
        let request = self
            .transport()
            .build_multipart_request(Method::POST, &path, files, &[])?;
        self.transport().execute_discard(ctx, request).await
    }

    /// Streams one attachment into `sink`, returning the byte count.
    pub async fn download_issue_attachment<W>(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        id: u64,
        name: &str,
        sink: &mut W,
    ) -> Result<u64, ApiError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let name = require("attachment name", name)?;
        let path = format!(
            "{}/attachments/{}",
            issue_path(repo, id)?,
            encode_segment(name)
        );
        let request = self
            .transport()
            .build_request(Method::GET, &path, None)?
            .accept("*/*");
        self.transport().execute_to(ctx, request, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbql_joins_pieces() {
        let options = IssueListOptions {
            state: Some("open".into()),
            kind: Some("bug".into()),
            ..Default::default()
        };
        assert_eq!(
            options.query().to_string(),
            "?q=state%20%3D%20%22open%22%20AND%20kind%20%3D%20%22bug%22"
        );
    }

    #[test]
    fn test_bbql_elides_all_and_blank() {
        let options = IssueListOptions {
            state: Some("ALL".into()),
            kind: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(options.bbql(), None);
        assert!(options.query().is_empty());
    }

    #[test]
    fn test_bbql_escapes_quotes_and_keeps_sort() {
        let options = IssueListOptions {
            search: Some("say \"hi\"".into()),
            sort: Some("-updated_on".into()),
            ..Default::default()
        };
        assert_eq!(options.bbql().unwrap(), r#"title ~ "say \"hi\"""#);
        assert!(options.query().to_string().ends_with("&sort=-updated_on"));
    }

    #[test]
    fn test_update_can_unassign() {
        let body = UpdateIssueRequest {
            assignee: Patch::Null,
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"assignee":null}"#);
    }
}
