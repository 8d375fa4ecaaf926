//
//  bkt-cli
//  api/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # API Client Layer
//!
//! This module provides the HTTP transport and the two API bindings that sit
//! on top of it.
//!
//! ## Supported Platforms
//!
//! - **Bitbucket Cloud**: API v2.0 at `api.bitbucket.org`
//! - **Bitbucket Data Center**: `/rest/...` roots at your own host
//!
//! ## Architecture
//!
//! - [`client`]: the shared [`Transport`] (request building, execution, pagination)
//! - [`layers`]: retry, cache and rate-limit decorators around the HTTP round trip
//! - [`cloud`]: Cloud binding ([`CloudClient`](cloud::CloudClient))
//! - [`server`]: Data Center binding ([`ServerClient`](server::ServerClient))
//! - [`common`]: shared types (errors, pagination, path helpers, [`Patch`](common::Patch))
//!
//! The bindings never depend on each other; both hold the transport behind an `Arc`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bkt::api::{CallContext, Transport, TransportOptions};
//! use bkt::api::cloud::{CloudClient, CloudRepo};
//!
//! # async fn example() -> Result<(), bkt::api::ApiError> {
//! let transport = Transport::new(
//!     TransportOptions::new("https://api.bitbucket.org/2.0")
//!         .with_credentials("alice", "app-password"),
//! )?;
//! let cloud = CloudClient::new(Arc::new(transport));
//! let repo = CloudRepo::new("myworkspace", "myrepo")?;
//! let pipelines = cloud.list_pipelines(&CallContext::background(), &repo, 10).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`ApiError`]. Non-2xx responses surface as
//! [`ApiError::HttpStatus`] with the server's message.

/// Conditional-GET response cache.
pub mod cache;

/// The shared HTTP transport.
pub mod client;

/// Bitbucket Cloud API v2.0 binding.
pub mod cloud;

/// Common types shared between the Cloud and Data Center bindings.
pub mod common;

/// Cancellation and deadline handle.
pub mod context;

/// Round-tripper decorator stack.
pub mod layers;

/// Multipart body encoding.
pub mod multipart;

/// Rate-limit header tracking.
pub mod ratelimit;

/// Retry policy and backoff.
pub mod retry;

/// Bitbucket Data Center REST binding.
pub mod server;

pub use client::{
    ApiRequest, Credential, Dialect, RequestBody, Transport, TransportOptions, CLOUD_API_URL,
};
pub use common::{ApiError, Patch};
pub use context::CallContext;
pub use multipart::MultipartFile;
pub use ratelimit::{RateLimit, RateLimitSource};
pub use retry::RetryPolicy;
