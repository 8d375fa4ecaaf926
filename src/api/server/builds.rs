//
//  bkt-cli
//  api/server/builds.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Commit build statuses (`/rest/build-status/1.0`).

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ServerClient;
use crate::api::common::{encode_segment, require, ApiError};
use crate::api::context::CallContext;

const BUILD_STATES: [&str; 3] = ["SUCCESSFUL", "FAILED", "INPROGRESS"];

/// A build result reported against a commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStatus {
    /// `SUCCESSFUL`, `FAILED` or `INPROGRESS`.
    #[serde(default)]
    pub state: String,

    /// Identifies the build within the commit.
    #[serde(default)]
    pub key: String,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Link to the build.
    #[serde(default)]
    pub url: String,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Report time, Unix milliseconds.
    #[serde(default, rename = "dateAdded")]
    pub date_added: Option<u64>,
}

fn commit_path(hash: &str) -> Result<String, ApiError> {
    let hash = require("commit", hash)?;
    Ok(format!("/rest/build-status/1.0/commits/{}", encode_segment(hash)))
}

impl ServerClient {
    /// Lists build statuses for a commit.
    pub async fn list_build_statuses(
        &self,
        ctx: &CallContext,
        commit: &str,
        limit: usize,
    ) -> Result<Vec<BuildStatus>, ApiError> {
        let path = commit_path(commit)?;
        self.transport()
            .walk_pages(ctx, &path, &Self::offset(limit), limit)
            .await
    }

    /// Reports a build status; re-posting the same key replaces it.
    pub async fn post_build_status(&self, ctx: &CallContext, commit: &str, status: &BuildStatus) -> Result<(), ApiError> {
        require("build key", &status.key)?;
        require("build url", &status.url)?;
        if !BUILD_STATES.contains(&status.state.as_str()) {
            return Err(ApiError::Validation(format!(
                "build state must be one of {}",
                BUILD_STATES.join(", ")
            )));
        }
        let request = self
            .transport()
            .build_json_request(Method::POST, &commit_path(commit)?, status)?
            .idempotent();
        self.transport().execute_discard(ctx, request).await
    }
}
