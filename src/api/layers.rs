//
//  bkt-cli
//  api/layers.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Transport Layers
//!
//! A [`Transport`](super::Transport) sends every request through a stack of
//! [`RoundTripper`] decorators:
//!
//! ```text
//! RetryLayer -> CacheLayer -> RateLimitLayer -> HttpRoundTripper -> network
//! ```
//!
//! - The retry layer is outermost so a replayed exchange passes through the
//!   cache and rate-limit layers again.
//! - The rate-limit layer sits next to the network so it observes the headers
//!   of every attempt, including the ones the retry layer absorbs.
//! - The cache layer sits between them so a `304` is materialised before the
//!   retry layer classifies the response.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Method, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::cache::{CacheEntry, CacheKey, ResponseCache};
use super::common::ApiError;
use super::context::CallContext;
use super::ratelimit::RateLimitTracker;
use super::retry::{retry_after, RetryPolicy};

/// A request on its way down the stack.
#[derive(Debug)]
pub struct Outgoing {
    /// The fully built request.
    pub request: reqwest::Request,
    /// Whether replaying it is safe.
    pub idempotent: bool,
    /// Whether the cache layer may store or revalidate it.
    pub cacheable: bool,
}

impl Outgoing {
    /// Wraps a request with its replay and cache flags.
    pub fn new(request: reqwest::Request, idempotent: bool, cacheable: bool) -> Self {
        Self {
            request,
            idempotent,
            cacheable,
        }
    }

    /// A copy for replay; `None` when the body is a one-shot stream.
    pub fn try_clone(&self) -> Option<Self> {
        Some(Self {
            request: self.request.try_clone()?,
            idempotent: self.idempotent,
            cacheable: self.cacheable,
        })
    }
}

enum ExchangeBody {
    Buffered(Bytes),
    Live(reqwest::Response),
}

impl std::fmt::Debug for ExchangeBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(b) => write!(f, "Buffered({} bytes)", b.len()),
            Self::Live(_) => f.write_str("Live"),
        }
    }
}

/// A response on its way up the stack.
///
/// The body is either still on the wire or already buffered (cache hits and
/// freshly cached responses).
#[derive(Debug)]
pub struct Exchange {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    body: ExchangeBody,
}

impl Exchange {
    /// An exchange whose body is still being received.
    pub fn live(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: ExchangeBody::Live(response),
        }
    }

    /// An exchange with a body already in memory.
    pub fn buffered(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body: ExchangeBody::Buffered(body),
        }
    }

    /// Reads the whole body.
    pub async fn bytes(self) -> Result<Bytes, ApiError> {
        match self.body {
            ExchangeBody::Buffered(bytes) => Ok(bytes),
            ExchangeBody::Live(response) => Ok(response.bytes().await?),
        }
    }

    /// Copies the body into `sink` chunk by chunk, returning the byte count.
    pub async fn copy_to<W>(self, sink: &mut W) -> Result<u64, ApiError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mut written = 0u64;
        match self.body {
            ExchangeBody::Buffered(bytes) => {
                sink.write_all(&bytes).await?;
                written = bytes.len() as u64;
            }
            ExchangeBody::Live(mut response) => {
                while let Some(chunk) = response.chunk().await? {
                    sink.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
            }
        }
        sink.flush().await?;
        Ok(written)
    }
}

/// One step of the request pipeline.
#[async_trait]
pub trait RoundTripper: Send + Sync {
    /// Sends `request` and returns the response, or a transport-level failure.
    ///
    /// Non-2xx statuses are *not* errors at this level.
    async fn round_trip(&self, ctx: &CallContext, request: Outgoing) -> Result<Exchange, ApiError>;
}

/// The innermost layer: hands the request to `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRoundTripper {
    client: reqwest::Client,
}

impl HttpRoundTripper {
    /// Wraps a configured `reqwest` client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoundTripper for HttpRoundTripper {
    async fn round_trip(&self, ctx: &CallContext, request: Outgoing) -> Result<Exchange, ApiError> {
        let client = self.client.clone();
        let response = ctx
            .run(async move { client.execute(request.request).await.map_err(ApiError::from) })
            .await?;
        Ok(Exchange::live(response))
    }
}

/// Records rate-limit headers from every response that passes through.
pub struct RateLimitLayer {
    inner: Box<dyn RoundTripper>,
    tracker: Arc<RateLimitTracker>,
}

impl RateLimitLayer {
    /// Wraps `inner`, feeding `tracker`.
    pub fn new(inner: Box<dyn RoundTripper>, tracker: Arc<RateLimitTracker>) -> Self {
        Self { inner, tracker }
    }
}

#[async_trait]
impl RoundTripper for RateLimitLayer {
    async fn round_trip(&self, ctx: &CallContext, request: Outgoing) -> Result<Exchange, ApiError> {
        let exchange = self.inner.round_trip(ctx, request).await?;
        self.tracker.observe(&exchange.headers);
        Ok(exchange)
    }
}

/// Conditional-GET cache.
///
/// Adds `If-None-Match` / `If-Modified-Since` when it holds an entry, turns a
/// `304` into the stored response, stores fresh `2xx` responses that carry a
/// validator and evicts on `404`/`410`. Failures never touch the cache.
pub struct CacheLayer {
    inner: Box<dyn RoundTripper>,
    cache: Arc<ResponseCache>,
    identity: String,
}

impl CacheLayer {
    /// Wraps `inner`; `identity` separates entries by credential.
    pub fn new(inner: Box<dyn RoundTripper>, cache: Arc<ResponseCache>, identity: String) -> Self {
        Self {
            inner,
            cache,
            identity,
        }
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl RoundTripper for CacheLayer {
    async fn round_trip(&self, ctx: &CallContext, mut request: Outgoing) -> Result<Exchange, ApiError> {
        let method = request.request.method().clone();
        if !request.cacheable || (method != Method::GET && method != Method::HEAD) {
            return self.inner.round_trip(ctx, request).await;
        }

        let url = request.request.url().clone();
        let key = CacheKey::new(method.as_str(), url.as_str(), &self.identity);
        let cached = self.cache.get(&key);

        if let Some(entry) = &cached {
            let headers = request.request.headers_mut();
            if let Some(etag) = entry.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.entry(IF_NONE_MATCH).or_insert(etag);
            }
            if let Some(modified) = entry
                .last_modified
                .as_deref()
                .and_then(|v| HeaderValue::from_str(v).ok())
            {
                headers.entry(IF_MODIFIED_SINCE).or_insert(modified);
            }
        }

        let exchange = self.inner.round_trip(ctx, request).await?;

        match exchange.status {
            StatusCode::NOT_MODIFIED => match cached {
                Some(entry) => {
                    debug!(url = %url, bytes = entry.body.len(), "cache revalidated");
                    let status = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
                    Ok(Exchange::buffered(status, exchange.headers, entry.body))
                }
                None => Ok(exchange),
            },
            status if status.is_success() => {
                let etag = header_string(&exchange.headers, ETAG);
                let last_modified = header_string(&exchange.headers, LAST_MODIFIED);
                if etag.is_none() && last_modified.is_none() {
                    return Ok(exchange);
                }
                let headers = exchange.headers.clone();
                let body = exchange.bytes().await?;
                self.cache.insert(
                    key,
                    CacheEntry {
                        etag,
                        last_modified,
                        body: body.clone(),
                        status: status.as_u16(),
                        received_at: Utc::now(),
                    },
                );
                Ok(Exchange::buffered(status, headers, body))
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                self.cache.remove(&key);
                Ok(exchange)
            }
            _ => Ok(exchange),
        }
    }
}

/// Replays idempotent requests on retryable statuses and transient failures.
pub struct RetryLayer {
    inner: Box<dyn RoundTripper>,
    policy: RetryPolicy,
}

impl RetryLayer {
    /// Wraps `inner` with `policy`.
    pub fn new(inner: Box<dyn RoundTripper>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl RoundTripper for RetryLayer {
    async fn round_trip(&self, ctx: &CallContext, request: Outgoing) -> Result<Exchange, ApiError> {
        let mut attempt = 1u32;
        let mut current = request;

        loop {
            ctx.check()?;

            let replay = if current.idempotent && attempt < self.policy.max_attempts {
                current.try_clone()
            } else {
                None
            };

            let result = self.inner.round_trip(ctx, current).await;

            // Some(server delay) when the outcome is worth another attempt.
            let decision = match &result {
                Ok(exchange) if self.policy.is_retryable_status(exchange.status) => {
                    Some(retry_after(&exchange.headers))
                }
                Err(err) if err.is_transient() => Some(None),
                _ => None,
            };

            let (Some(server_delay), Some(next)) = (decision, replay) else {
                return result;
            };

            let delay = self.policy.delay(attempt, server_delay);
            match &result {
                Ok(exchange) => warn!(
                    status = exchange.status.as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                ),
                Err(err) => warn!(
                    error = %err,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                ),
            }
            drop(result);

            ctx.run(async move {
                tokio::time::sleep(delay).await;
                Ok::<(), ApiError>(())
            })
            .await?;

            attempt += 1;
            current = next;
        }
    }
}
