//
//  bkt-cli
//  api/cloud/pipelines.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Cloud pipelines and repository pipeline variables.
//!
//! # Pipeline Lifecycle
//!
//! ```text
//! PENDING -> IN_PROGRESS -> COMPLETED (SUCCESSFUL/FAILED/STOPPED)
//!                       \-> PAUSED -> IN_PROGRESS -> ...
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use bkt::api::cloud::{PipelineVariable, TriggerPipelineRequest};
//!
//! let mut request = TriggerPipelineRequest::branch("main");
//! request.variables.push(PipelineVariable::new("DEPLOY_ENV", "production", false));
//! ```
//!
//! # Notes
//!
//! - The collection endpoints end in a slash (`/pipelines/`); Cloud
//!   redirects without it
//! - Secured variable values are write-only; reads return them blank

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{CloudClient, CloudRepo};
use crate::api::common::{encode_segment, require, ApiError};
use crate::api::context::CallContext;

/// A Bitbucket Pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique identifier (with curly braces).
    #[serde(default)]
    pub uuid: String,

    /// Sequential build number.
    #[serde(default)]
    pub build_number: u64,

    /// Current state.
    #[serde(default)]
    pub state: Option<PipelineState>,

    /// What triggered this run.
    #[serde(default)]
    pub target: Option<PipelineTarget>,

    /// ISO 8601 creation time.
    #[serde(default)]
    pub created_on: Option<String>,

    /// ISO 8601 completion time.
    #[serde(default)]
    pub completed_on: Option<String>,

    /// Total runtime.
    #[serde(default)]
    pub duration_in_seconds: Option<u64>,
}

impl Pipeline {
    /// `RESULT` for completed runs, `STATE` otherwise, `-` when unknown.
    pub fn status(&self) -> &str {
        match &self.state {
            Some(PipelineState {
                result: Some(result),
                ..
            }) => &result.name,
            Some(state) => &state.name,
            None => "-",
        }
    }
}

/// Execution state of a pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    /// `PENDING`, `IN_PROGRESS`, `COMPLETED`, `PAUSED`.
    #[serde(default)]
    pub name: String,

    /// API type string, e.g. `pipeline_state_in_progress`.
    #[serde(default, rename = "type")]
    pub state_type: String,

    /// Outcome, for completed pipelines.
    #[serde(default)]
    pub result: Option<PipelineResult>,
}

/// Outcome of a completed pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    /// `SUCCESSFUL`, `FAILED`, `STOPPED`, `ERROR`.
    #[serde(default)]
    pub name: String,

    /// API type string.
    #[serde(default, rename = "type")]
    pub result_type: String,
}

/// The ref a pipeline ran against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineTarget {
    /// Target type, e.g. `pipeline_ref_target`.
    #[serde(default, rename = "type")]
    pub target_type: String,

    /// Branch or tag name.
    #[serde(default)]
    pub ref_name: Option<String>,

    /// `branch`, `tag` or `bookmark`.
    #[serde(default)]
    pub ref_type: Option<String>,

    /// Custom pipeline selector.
    #[serde(default)]
    pub selector: Option<PipelineSelector>,
}

/// Selects a pipeline definition from `bitbucket-pipelines.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSelector {
    /// `custom`, `branches`, `tags`...
    #[serde(default, rename = "type")]
    pub selector_type: String,

    /// Definition name.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Request payload for starting a pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerPipelineRequest {
    /// What to build.
    pub target: TriggerTarget,

    /// Per-run variables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<PipelineVariable>,
}

impl TriggerPipelineRequest {
    /// Runs the default pipeline for `branch`.
    pub fn branch(branch: impl Into<String>) -> Self {
        Self {
            target: TriggerTarget {
                target_type: "pipeline_ref_target".to_string(),
                ref_type: "branch".to_string(),
                ref_name: branch.into(),
                selector: None,
            },
            variables: Vec::new(),
        }
    }

    /// Selects a custom pipeline definition.
    pub fn with_custom(mut self, pattern: impl Into<String>) -> Self {
        self.target.selector = Some(TriggerSelector {
            selector_type: "custom".to_string(),
            pattern: pattern.into(),
        });
        self
    }
}

/// Target of a [`TriggerPipelineRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct TriggerTarget {
    /// Always `pipeline_ref_target` for ref builds.
    #[serde(rename = "type")]
    pub target_type: String,

    /// `branch`, `tag` or `bookmark`.
    pub ref_type: String,

    /// Ref name.
    pub ref_name: String,

    /// Custom pipeline selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<TriggerSelector>,
}

/// Selector used when triggering a custom pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerSelector {
    /// `custom`.
    #[serde(rename = "type")]
    pub selector_type: String,

    /// Name under `custom:` in the pipeline config.
    pub pattern: String,
}

/// A pipeline variable, either per-run or stored on the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineVariable {
    /// Stored variables only; absent on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Environment variable name.
    #[serde(default)]
    pub key: String,

    /// Value; blank when read back from a secured variable.
    #[serde(default)]
    pub value: String,

    /// Masked in logs and never returned.
    #[serde(default)]
    pub secured: bool,
}

impl PipelineVariable {
    /// A new variable without a uuid.
    pub fn new(key: impl Into<String>, value: impl Into<String>, secured: bool) -> Self {
        Self {
            uuid: None,
            key: key.into(),
            value: value.into(),
            secured,
        }
    }
}

fn pipeline_path(repo: &CloudRepo, uuid: &str) -> Result<String, ApiError> {
    let uuid = require("pipeline uuid", uuid)?;
    Ok(format!("{}/pipelines/{}", repo.path(), encode_segment(uuid)))
}

fn variable_path(repo: &CloudRepo, uuid: &str) -> Result<String, ApiError> {
    let uuid = require("variable uuid", uuid)?;
    Ok(format!(
        "{}/pipelines_config/variables/{}",
        repo.path(),
        encode_segment(uuid)
    ))
}

impl CloudClient {
    /// Lists pipeline runs, newest first.
    pub async fn list_pipelines(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        limit: usize,
    ) -> Result<Vec<Pipeline>, ApiError> {
        let path = format!("{}/pipelines/?sort=-created_on", repo.path());
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(limit), limit)
            .await
    }

    /// Fetches one pipeline run by uuid.
    pub async fn get_pipeline(&self, ctx: &CallContext, repo: &CloudRepo, uuid: &str) -> Result<Pipeline, ApiError> {
        let request = self
            .transport()
            .build_request(Method::GET, &pipeline_path(repo, uuid)?, None)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Starts a pipeline.
    pub async fn trigger_pipeline(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        body: &TriggerPipelineRequest,
    ) -> Result<Pipeline, ApiError> {
        require("ref name", &body.target.ref_name)?;
        let path = format!("{}/pipelines/", repo.path());
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Stops a running pipeline.
    pub async fn stop_pipeline(&self, ctx: &CallContext, repo: &CloudRepo, uuid: &str) -> Result<(), ApiError> {
        let path = format!("{}/stopPipeline", pipeline_path(repo, uuid)?);
        let request = self
            .transport()
            .build_request(Method::POST, &path, None)?
            .idempotent();
        self.transport().execute_discard(ctx, request).await
    }

    /// Lists repository-level pipeline variables.
    pub async fn list_pipeline_variables(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        limit: usize,
    ) -> Result<Vec<PipelineVariable>, ApiError> {
        let path = format!("{}/pipelines_config/variables/", repo.path());
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(limit), limit)
            .await
    }

    /// Creates a repository-level pipeline variable.
    pub async fn create_pipeline_variable(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        variable: &PipelineVariable,
    ) -> Result<PipelineVariable, ApiError> {
        require("variable key", &variable.key)?;
        let path = format!("{}/pipelines_config/variables/", repo.path());
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, variable)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Replaces a stored variable's key, value or secured flag.
    pub async fn update_pipeline_variable(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        uuid: &str,
        variable: &PipelineVariable,
    ) -> Result<PipelineVariable, ApiError> {
        let request = self
            .transport()
            .build_json_request(Method::PUT, &variable_path(repo, uuid)?, variable)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Deletes a stored variable.
    pub async fn delete_pipeline_variable(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        uuid: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .transport()
            .build_request(Method::DELETE, &variable_path(repo, uuid)?, None)?;
        self.transport().execute_discard(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_custom_pipeline_body() {
        let body = serde_json::to_value(TriggerPipelineRequest::branch("main").with_custom("deploy")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "target": {
                    "type": "pipeline_ref_target",
                    "ref_type": "branch",
                    "ref_name": "main",
                    "selector": {"type": "custom", "pattern": "deploy"}
                }
            })
        );
    }

    #[test]
    fn test_pipeline_status_prefers_result() {
        let pipeline: Pipeline = serde_json::from_str(
            r#"{"uuid":"{1}","state":{"name":"COMPLETED","result":{"name":"FAILED"}}}"#,
        )
        .unwrap();
        assert_eq!(pipeline.status(), "FAILED");

        let bare: Pipeline = serde_json::from_str(r#"{"uuid":"3"}"#).unwrap();
        assert_eq!(bare.status(), "-");
    }

    #[test]
    fn test_variable_paths_encode_uuid() {
        let repo = CloudRepo::new("ws", "repo").unwrap();
        assert_eq!(
            variable_path(&repo, "{abc}").unwrap(),
            "/repositories/ws/repo/pipelines_config/variables/%7Babc%7D"
        );
        assert!(pipeline_path(&repo, " ").is_err());
    }
}
