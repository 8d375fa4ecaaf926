//
//  bkt-cli
//  api/server/webhooks.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Repository webhooks on Data Center.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ServerClient, ServerRepo};
use crate::api::common::{require, require_id, ApiError};
use crate::api::context::CallContext;

/// A webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Webhook {
    /// Id.
    #[serde(default)]
    pub id: u64,

    /// Name.
    #[serde(default)]
    pub name: String,

    /// Delivery URL.
    #[serde(default)]
    pub url: String,

    /// Event keys, e.g. `repo:refs_changed`.
    #[serde(default)]
    pub events: Vec<String>,

    /// Whether deliveries are active.
    #[serde(default)]
    pub active: bool,
}

/// Request payload for creating a webhook.
#[derive(Debug, Clone, Serialize)]
pub struct CreateWebhookRequest {
    /// Name.
    pub name: String,
    /// Delivery URL.
    pub url: String,
    /// Event keys.
    pub events: Vec<String>,
    /// Whether deliveries start enabled.
    pub active: bool,
}

impl ServerClient {
    /// Lists webhooks.
    pub async fn list_webhooks(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        limit: usize,
    ) -> Result<Vec<Webhook>, ApiError> {
        let path = format!("{}/webhooks", repo.path());
        self.transport()
            .walk_pages(ctx, &path, &Self::offset(limit), limit)
            .await
    }

    /// Registers a webhook.
    pub async fn create_webhook(
        &self,
        ctx: &CallContext,
        repo: &ServerRepo,
        body: &CreateWebhookRequest,
    ) -> Result<Webhook, ApiError> {
        require("webhook name", &body.name)?;
        require("webhook url", &body.url)?;
        if body.events.is_empty() {
            return Err(ApiError::required("events"));
        }
        let path = format!("{}/webhooks", repo.path());
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Removes a webhook.
    pub async fn delete_webhook(&self, ctx: &CallContext, repo: &ServerRepo, id: u64) -> Result<(), ApiError> {
        let path = format!("{}/webhooks/{}", repo.path(), require_id("webhook id", id)?);
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }
}
