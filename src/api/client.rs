//
//  bkt-cli
//  api/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # HTTP Transport for Bitbucket APIs
//!
//! This module provides the transport both API bindings share. It turns
//! "call this endpoint, decode into this shape" into an authenticated,
//! cacheable, rate-limit-aware, retryable HTTP exchange.
//!
//! ## Features
//!
//! - Base URL normalisation and path-only request building
//! - HTTP Basic authentication and a custom User-Agent header
//! - Retries with exponential backoff ([`RetryPolicy`])
//! - Optional conditional-GET cache ([`ResponseCache`](super::cache::ResponseCache))
//! - Rate-limit header tracking ([`Transport::rate_limit_state`])
//! - Cursor and offset pagination ([`Transport::walk_pages`])
//! - Multipart uploads and streaming downloads
//!
//! ## Example
//!
//! ```rust,no_run
//! use bkt::api::{ApiError, CallContext, Transport, TransportOptions};
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), ApiError> {
//! let transport = Transport::new(
//!     TransportOptions::new("https://bitbucket.example.com")
//!         .with_credentials("x-token-auth", "secret"),
//! )?;
//!
//! let ctx = CallContext::background();
//! let request = transport.build_request(Method::GET, "/rest/api/1.0/projects/KEY", None)?;
//! let project: serde_json::Value = transport.execute_json(&ctx, request).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWrite;
use tracing::debug;
use url::Url;

use super::cache::{auth_identity, ResponseCache, DEFAULT_CACHE_CAPACITY};
use super::common::{relative_path, ApiError, PageDecoder};
use super::context::CallContext;
use super::layers::{
    CacheLayer, Exchange, HttpRoundTripper, Outgoing, RateLimitLayer, RetryLayer, RoundTripper,
};
use super::multipart::{self, MultipartFile};
use super::ratelimit::{RateLimit, RateLimitTracker};
use super::retry::RetryPolicy;

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = "bkt-cli";

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bitbucket Cloud API root.
pub const CLOUD_API_URL: &str = "https://api.bitbucket.org/2.0";

const JSON: &str = "application/json";

/// Which Bitbucket REST dialect a transport speaks.
///
/// Only rate-limit header interpretation differs at the transport level;
/// everything else is the bindings' business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Bitbucket Cloud (`api.bitbucket.org`)
    Cloud,
    /// Bitbucket Data Center / Server at a custom host
    #[default]
    DataCenter,
}

impl Dialect {
    /// Guesses the dialect from a base URL: `bitbucket.org` hosts are Cloud.
    pub fn infer(base_url: &str) -> Self {
        let host = Url::parse(base_url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
        match host.as_deref() {
            Some("api.bitbucket.org") | Some("bitbucket.org") => Self::Cloud,
            _ => Self::DataCenter,
        }
    }
}

/// HTTP Basic credentials.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential {
    /// Username (`x-token-auth` for DC HTTP access tokens).
    pub username: String,
    /// Password, app password or access token.
    pub secret: String,
}

impl Credential {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// `true` when both halves are blank; requests then go unauthenticated.
    pub fn is_empty(&self) -> bool {
        self.username.trim().is_empty() && self.secret.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Construction-time options for a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// API root, e.g. `https://api.bitbucket.org/2.0`.
    pub base_url: String,
    /// Basic auth credentials; empty means anonymous.
    pub credential: Credential,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Deadline applied when the caller's context has none.
    pub timeout: Duration,
    /// Enables the conditional-GET cache.
    pub enable_cache: bool,
    /// Maximum cached responses.
    pub cache_capacity: usize,
    /// Retry behaviour.
    pub retry: RetryPolicy,
    /// Rate-limit header dialect.
    pub dialect: Dialect,
}

impl TransportOptions {
    /// Defaults for `base_url`, with the dialect inferred from its host.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            dialect: Dialect::infer(&base_url),
            base_url,
            credential: Credential::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            enable_cache: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets Basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credential = Credential::new(username, secret);
        self
    }

    /// Overrides the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the default deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Turns the conditional-GET cache on or off.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Forces a dialect instead of inferring it.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

/// Validates and normalises a base URL.
///
/// The result is absolute, `http` or `https`, has no query, no fragment and
/// no trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::required("base url"));
    }
    let mut url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl(format!(
            "{raw}: scheme must be http or https"
        )));
    }
    if !url.has_host() {
        return Err(ApiError::InvalidUrl(format!("{raw}: missing host")));
    }
    url.set_query(None);
    url.set_fragment(None);
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    Ok(url)
}

/// Body of a JSON or raw request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Pre-encoded JSON.
    Json(Vec<u8>),
    /// Raw bytes with an explicit content type.
    Raw {
        /// Payload
        bytes: Bytes,
        /// `Content-Type` header value
        content_type: String,
    },
}

impl RequestBody {
    /// Encodes `value` as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_vec(value)
            .map(Self::Json)
            .map_err(ApiError::Encode)
    }
}

/// A request built by [`Transport::build_request`], ready to execute.
#[derive(Debug)]
pub struct ApiRequest {
    inner: reqwest::Request,
    idempotent: bool,
    cacheable: bool,
}

impl ApiRequest {
    /// Marks a POST as safe to replay (`approve`, `decline`, ...).
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    /// Overrides the `Accept` header (binary downloads use `*/*`).
    pub fn accept(mut self, value: &'static str) -> Self {
        self.inner
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(value));
        self
    }

    /// Bypasses the response cache.
    pub fn no_cache(mut self) -> Self {
        self.cacheable = false;
        self
    }

    /// Absolute URL the request targets.
    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Request headers.
    pub fn headers(&self) -> &reqwest::header::HeaderMap {
        self.inner.headers()
    }
}

fn default_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

/// The shared HTTP transport.
///
/// A transport owns its retry policy, cache and rate-limit tracker. Bindings
/// hold it behind an [`Arc`] and it is safe to use from several tasks.
pub struct Transport {
    base_url: Url,
    credential: Option<Credential>,
    timeout: Duration,
    dialect: Dialect,
    client: Client,
    stack: Box<dyn RoundTripper>,
    rate_limit: Arc<RateLimitTracker>,
    cache: Option<Arc<ResponseCache>>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .field("dialect", &self.dialect)
            .field("authenticated", &self.credential.is_some())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl Transport {
    /// Builds a transport from options.
    ///
    /// # Errors
    ///
    /// - [`ApiError::InvalidUrl`] / [`ApiError::Validation`] for a bad base URL
    /// - [`ApiError::Validation`] for an inconsistent retry policy
    /// - [`ApiError::Transport`] if the HTTP client cannot be built
    pub fn new(options: TransportOptions) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&options.base_url)?;
        options.retry.validate()?;

        let client = Client::builder().user_agent(options.user_agent).build()?;

        let credential = (!options.credential.is_empty()).then_some(options.credential);
        let identity = auth_identity(
            credential.as_ref().map(|c| c.username.as_str()),
            credential.as_ref().map(|c| c.secret.as_str()),
        );

        let rate_limit = Arc::new(RateLimitTracker::new(options.dialect));
        let cache = options
            .enable_cache
            .then(|| Arc::new(ResponseCache::new(options.cache_capacity)));

        let http: Box<dyn RoundTripper> = Box::new(HttpRoundTripper::new(client.clone()));
        let observed: Box<dyn RoundTripper> = Box::new(RateLimitLayer::new(http, rate_limit.clone()));
        let cached: Box<dyn RoundTripper> = match &cache {
            Some(cache) => Box::new(CacheLayer::new(observed, cache.clone(), identity)),
            None => observed,
        };
        let stack: Box<dyn RoundTripper> = Box::new(RetryLayer::new(cached, options.retry));

        Ok(Self {
            base_url,
            credential,
            timeout: options.timeout,
            dialect: options.dialect,
            client,
            stack,
            rate_limit,
            cache,
        })
    }

    /// The normalised base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The dialect this transport speaks.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The latest rate-limit snapshot.
    pub fn rate_limit_state(&self) -> RateLimit {
        self.rate_limit.snapshot()
    }

    /// Number of cached responses (0 when caching is off).
    pub fn cached_entries(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.len())
    }

    /// Resolves a caller path against the base URL.
    ///
    /// Leading slashes are collapsed to one; absolute URLs are rejected.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        let path = path.trim();
        if path.contains("://") {
            return Err(ApiError::InvalidUrl(format!(
                "{path}: absolute URLs are not accepted, pass a path"
            )));
        }
        let relative = path.trim_start_matches('/');
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            relative
        );
        Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Converts an absolute link from a response into a path for this transport.
    pub fn relative_path(&self, link: &str) -> Result<String, ApiError> {
        relative_path(&self.base_url, link)
    }

    fn builder(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.resolve(path)?;
        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static(JSON));
        if let Some(credential) = &self.credential {
            builder = builder.basic_auth(&credential.username, Some(&credential.secret));
        }
        Ok(builder)
    }

    /// Builds a request for `path` with an optional body.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<ApiRequest, ApiError> {
        let idempotent = default_idempotent(&method);
        let mut builder = self.builder(method, path)?;
        builder = match body {
            Some(RequestBody::Json(bytes)) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static(JSON))
                .body(bytes),
            Some(RequestBody::Raw {
                bytes,
                content_type,
            }) => builder.header(CONTENT_TYPE, content_type).body(bytes),
            None => builder,
        };
        Ok(ApiRequest {
            inner: builder.build()?,
            idempotent,
            cacheable: true,
        })
    }

    /// Builds a request with a JSON body.
    pub fn build_json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<ApiRequest, ApiError> {
        self.build_request(method, path, Some(RequestBody::json(body)?))
    }

    /// Builds a `multipart/form-data` request.
    ///
    /// String `fields` precede the file parts. The body is streamed, so the
    /// request is never retried.
    pub fn build_multipart_request(
        &self,
        method: Method,
        path: &str,
        files: Vec<MultipartFile>,
        fields: &[(String, String)],
    ) -> Result<ApiRequest, ApiError> {
        let form = multipart::form(fields, files)?;
        let builder = self.builder(method, path)?.multipart(form);
        Ok(ApiRequest {
            inner: builder.build()?,
            idempotent: false,
            cacheable: false,
        })
    }

    async fn dispatch(
        &self,
        ctx: &CallContext,
        request: ApiRequest,
    ) -> Result<(CallContext, Exchange), ApiError> {
        let ctx = match ctx.deadline() {
            Some(_) => ctx.child(),
            None => ctx.with_timeout(self.timeout),
        };
        ctx.check()?;

        let method = request.inner.method().clone();
        let url = request.inner.url().clone();
        debug!(%method, %url, "sending request");

        let outgoing = Outgoing::new(
            request.inner,
            request.idempotent,
            request.cacheable && self.cache.is_some(),
        );
        let exchange = ctx.run(self.stack.round_trip(&ctx, outgoing)).await?;
        debug!(%method, %url, status = exchange.status.as_u16(), "received response");

        if !exchange.status.is_success() {
            let status = exchange.status;
            let body = ctx.run(exchange.bytes()).await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
        Ok((ctx, exchange))
    }

    /// Executes `request` and returns the raw response body.
    pub async fn execute_bytes(&self, ctx: &CallContext, request: ApiRequest) -> Result<Bytes, ApiError> {
        let (ctx, exchange) = self.dispatch(ctx, request).await?;
        ctx.run(exchange.bytes()).await
    }

    /// Executes `request` and decodes the JSON response into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `Option<T>` and `()` targets
    /// accept `204 No Content`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let body = self.execute_bytes(ctx, request).await?;
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &body
        };
        Ok(serde_json::from_slice(body)?)
    }

    /// Executes `request` and discards the response body.
    pub async fn execute_discard(&self, ctx: &CallContext, request: ApiRequest) -> Result<(), ApiError> {
        self.execute_bytes(ctx, request).await.map(drop)
    }

    /// Executes `request` and streams the response body into `sink`.
    ///
    /// No JSON decoding happens. Returns the number of bytes written.
    pub async fn execute_to<W>(
        &self,
        ctx: &CallContext,
        request: ApiRequest,
        sink: &mut W,
    ) -> Result<u64, ApiError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let (ctx, exchange) = self.dispatch(ctx, request.no_cache()).await?;
        ctx.run(exchange.copy_to(sink)).await
    }

    /// Walks every page starting at `path` and returns the flattened records.
    ///
    /// `limit == 0` fetches everything. Otherwise the walk stops as soon as
    /// `limit` records are collected, without requesting the next page.
    pub async fn walk_pages<T, D>(
        &self,
        ctx: &CallContext,
        path: &str,
        decoder: &D,
        limit: usize,
    ) -> Result<Vec<T>, ApiError>
    where
        D: PageDecoder<T> + Sync,
        T: Send,
    {
        let mut current = decoder.first_path(path);
        let mut records = Vec::new();

        loop {
            let request = self.build_request(Method::GET, &current, None)?;
            let body = self.execute_bytes(ctx, request).await?;
            let page = decoder.decode(&self.base_url, &current, &body)?;
            records.extend(page.records);

            if limit > 0 && records.len() >= limit {
                records.truncate(limit);
                break;
            }
            match page.next {
                Some(next) => current = next,
                None => break,
            }
        }

        debug!(count = records.len(), "pagination finished");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> Transport {
        Transport::new(TransportOptions::new(base)).unwrap()
    }

    #[test]
    fn test_normalize_base_url() {
        let url = normalize_base_url(" https://bitbucket.example.com/context/?x=1#frag ").unwrap();
        assert_eq!(url.as_str(), "https://bitbucket.example.com/context");
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_dialect_inference() {
        assert_eq!(Dialect::infer(CLOUD_API_URL), Dialect::Cloud);
        assert_eq!(Dialect::infer("https://git.example.com"), Dialect::DataCenter);
    }

    #[test]
    fn test_resolve_synthesises_leading_slash() {
        let t = transport("https://api.bitbucket.org/2.0/");
        assert_eq!(
            t.resolve("repositories/ws").unwrap().as_str(),
            "https://api.bitbucket.org/2.0/repositories/ws"
        );
        assert_eq!(
            t.resolve("///repositories/ws?q=1").unwrap().as_str(),
            "https://api.bitbucket.org/2.0/repositories/ws?q=1"
        );
    }

    #[test]
    fn test_resolve_rejects_absolute() {
        let t = transport("https://bitbucket.example.com");
        let err = t.resolve("https://evil.example.com/steal").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
        // A protocol-relative path stays on the configured host.
        assert_eq!(
            t.resolve("//evil.example.com/x").unwrap().host_str(),
            Some("bitbucket.example.com")
        );
    }

    #[test]
    fn test_build_request_headers() {
        let t = Transport::new(
            TransportOptions::new("https://bitbucket.example.com").with_credentials("alice", "s3cret"),
        )
        .unwrap();
        let request = t
            .build_json_request(Method::POST, "/rest/api/1.0/x", &serde_json::json!({"a": 1}))
            .unwrap();
        assert_eq!(request.headers().get(ACCEPT).unwrap(), JSON);
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), JSON);
        assert!(request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("Basic "));
        assert!(!request.idempotent);
        assert!(request.idempotent().idempotent);
    }

    #[test]
    fn test_anonymous_has_no_authorization() {
        let t = transport("https://bitbucket.example.com");
        let request = t.build_request(Method::GET, "/x", None).unwrap();
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
        assert_eq!(
            request.accept("*/*").headers().get(ACCEPT).unwrap(),
            "*/*"
        );
    }

    #[test]
    fn test_credential_debug_redacts() {
        let c = Credential::new("alice", "hunter2");
        assert!(!format!("{c:?}").contains("hunter2"));
    }
}
