//
//  bkt-cli
//  api/server/projects.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Data Center projects
//!
//! Projects group repositories and carry shared permissions. Personal
//! projects have type `PERSONAL` and a key starting with `~`.
//!
//! ```text
//! GET /rest/api/1.0/projects
//! GET /rest/api/1.0/projects/{projectKey}
//! ```

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Href, ServerClient, API_ROOT};
use crate::api::common::{encode_segment, require, ApiError, Query};
use crate::api::context::CallContext;

/// A Data Center project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// Numeric id.
    #[serde(default)]
    pub id: u64,

    /// Project key.
    #[serde(default)]
    pub key: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Public read access.
    #[serde(default, rename = "public")]
    pub is_public: bool,

    /// `NORMAL` or `PERSONAL`.
    #[serde(default, rename = "type")]
    pub project_type: String,

    /// Links.
    #[serde(default)]
    pub links: ProjectLinks,
}

/// Links attached to a [`Project`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectLinks {
    /// Browser URLs.
    #[serde(default, rename = "self")]
    pub self_link: Vec<Href>,
}

impl ServerClient {
    /// Lists projects, optionally filtered by name.
    pub async fn list_projects(
        &self,
        ctx: &CallContext,
        name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Project>, ApiError> {
        let path = Query::new()
            .push_opt("name", name)
            .apply(&format!("{API_ROOT}/projects"));
        self.transport()
            .walk_pages(ctx, &path, &Self::offset(limit), limit)
            .await
    }

    /// Fetches one project.
    pub async fn get_project(&self, ctx: &CallContext, key: &str) -> Result<Project, ApiError> {
        let key = require("project key", key)?.to_ascii_uppercase();
        let path = format!("{API_ROOT}/projects/{}", encode_segment(&key));
        let request = self.transport().build_request(Method::GET, &path, None)?;
        self.transport().execute_json(ctx, request).await
    }
}
