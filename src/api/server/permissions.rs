//
//  bkt-cli
//  api/server/permissions.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Branch restrictions
//!
//! Restrictions live under `/rest/branch-permissions/2.0` and pair a
//! restriction type with a matcher:
//!
//! | Type | Effect |
//! |------|--------|
//! | `read-only` | No pushes at all |
//! | `no-deletes` | Branch cannot be deleted |
//! | `fast-forward-only` | Rewriting history is rejected |
//! | `pull-request-only` | Changes must arrive via pull request |
//!
//! Users and groups listed on a restriction are exempt from it.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ServerClient, ServerRepo, User};
use crate::api::common::{require, require_id, ApiError};
use crate::api::context::CallContext;

/// An existing branch restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchRestriction {
    /// Restriction id.
    #[serde(default)]
    pub id: u64,

    /// Restriction type.
    #[serde(default, rename = "type")]
    pub restriction_type: String,

    /// Branches the restriction applies to.
    #[serde(default)]
    pub matcher: RestrictionMatcher,

    /// Exempt users.
    #[serde(default)]
    pub users: Vec<User>,

    /// Exempt groups.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Selects branches for a restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestrictionMatcher {
    /// Ref, pattern or model category id.
    #[serde(default)]
    pub id: String,

    /// Human-readable form of `id`.
    #[serde(default, rename = "displayId")]
    pub display_id: String,

    /// Matcher kind.
    #[serde(default, rename = "type")]
    pub matcher_type: MatcherType,

    /// Whether the matcher is active.
    #[serde(default)]
    pub active: bool,
}

/// `BRANCH`, `PATTERN`, `MODEL_CATEGORY` or `MODEL_BRANCH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherType {
    /// Kind id.
    #[serde(default)]
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Request payload for creating a restriction.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRestrictionRequest {
    /// Restriction type.
    #[serde(rename = "type")]
    pub restriction_type: String,

    /// Matcher.
    pub matcher: MatcherSpec,

    /// Exempt user names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,

    /// Exempt group names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl CreateRestrictionRequest {
    /// Restricts a single branch.
    pub fn branch(restriction_type: impl Into<String>, branch: &str) -> Self {
        Self::with_matcher(restriction_type, super::branch_ref(branch), "BRANCH")
    }

    /// Restricts every branch matching a glob pattern.
    pub fn pattern(restriction_type: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::with_matcher(restriction_type, pattern.into(), "PATTERN")
    }

    fn with_matcher(restriction_type: impl Into<String>, id: String, kind: &str) -> Self {
        Self {
            restriction_type: restriction_type.into(),
            matcher: MatcherSpec {
                id,
                matcher_type: MatcherTypeSpec { id: kind.to_string() },
            },
            users: Vec::new(),
            groups: Vec::new(),
        }
    }
}

/// Matcher in a request body.
#[derive(Debug, Clone, Serialize)]
pub struct MatcherSpec {
    /// Ref or pattern.
    pub id: String,

    /// Matcher kind.
    #[serde(rename = "type")]
    pub matcher_type: MatcherTypeSpec,
}

/// Matcher kind in a request body.
#[derive(Debug, Clone, Serialize)]
pub struct MatcherTypeSpec {
    /// Kind id.
    pub id: String,
}

fn restrictions_path(repo: &ServerRepo) -> String {
    format!("/rest/branch-permissions/2.0/{}/restrictions", repo.segment())
}

impl ServerClient {
    /// Lists branch restrictions.
    pub async fn list_branch_restrictions(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        limit: usize,
    ) -> Result<Vec<BranchRestriction>, ApiError> {
        self.transport()
            .walk_pages(ctx, &restrictions_path(repo), &Self::offset(limit), limit)
            .await
    }

    /// Creates a branch restriction.
    pub async fn create_branch_restriction(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        body: &CreateRestrictionRequest,
    ) -> Result<BranchRestriction, ApiError> {
        require("restriction type", &body.restriction_type)?;
        require("matcher", &body.matcher.id)?;
        let request = self
            .transport()
            .build_json_request(Method::POST, &restrictions_path(repo), body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Deletes a branch restriction.
    pub async fn delete_branch_restriction(&self, ctx: &CallContext, repo: &ServerRepo, id: u64) -> Result<(), ApiError> {
        let path = format!(
            "{}/{}",
            restrictions_path(repo),
            require_id("restriction id", id)?
        );
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_restriction_body() {
        let body = serde_json::to_value(CreateRestrictionRequest::branch("no-deletes", "main")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "type": "no-deletes",
                "matcher": {"id": "refs/heads/main", "type": {"id": "BRANCH"}}
            })
        );
    }

    #[test]
    fn test_restrictions_path() {
        let repo = ServerRepo::new("abc", "svc").unwrap();
        assert_eq!(
            restrictions_path(&repo),
            "/rest/branch-permissions/2.0/projects/ABC/repos/svc/restrictions"
        );
    }
}
