//
//  bkt-cli
//  api/cloud/webhooks.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Repository webhooks on Cloud.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{CloudClient, CloudRepo};
use crate::api::common::{encode_segment, require, ApiError};
use crate::api::context::CallContext;

/// A webhook subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Webhook {
    /// Subscription uuid.
    #[serde(default)]
    pub uuid: String,

    /// Delivery URL.
    #[serde(default)]
    pub url: String,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Whether deliveries are active.
    #[serde(default)]
    pub active: bool,

    /// Subscribed event keys, e.g. `repo:push`.
    #[serde(default)]
    pub events: Vec<String>,
}

/// Request payload for creating a webhook.
#[derive(Debug, Clone, Serialize)]
pub struct CreateWebhookRequest {
    /// Description shown in the UI.
    pub description: String,
    /// Delivery URL.
    pub url: String,
    /// Whether deliveries start enabled.
    pub active: bool,
    /// Event keys.
    pub events: Vec<String>,
}

impl CloudClient {
    /// Lists webhooks on a repository.
    pub async fn list_webhooks(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        limit: usize,
    ) -> Result<Vec<Webhook>, ApiError> {
        let path = format!("{}/hooks", repo.path());
        self.transport()
            .walk_pages(ctx, &path, &Self::cursor(limit), limit)
            .await
    }

    /// Registers a webhook.
    pub async fn create_webhook(
        &self,
        ctx: &CallContext,
        repo: &CloudRepo,
        body: &CreateWebhookRequest,
    ) -> Result<Webhook, ApiError> {
        require("webhook url", &body.url)?;
        if body.events.is_empty() {
            return Err(ApiError::required("events"));
        }
        let path = format!("{}/hooks", repo.path());
        let request = self
            .transport()
            .build_json_request(Method::POST, &path, body)?;
        self.transport().execute_json(ctx, request).await
    }

    /// Removes a webhook.
    pub async fn delete_webhook(&self, ctx: &CallContext, repo: &CloudRepo, uuid: &str) -> Result<(), ApiError> {
        let uuid = require("webhook uuid", uuid)?;
        let path = format!("{}/hooks/{}", repo.path(), encode_segment(uuid));
        let request = self.transport().build_request(Method::DELETE, &path, None)?;
        self.transport().execute_discard(ctx, request).await
    }
}
