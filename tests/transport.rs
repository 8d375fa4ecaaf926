//
//  bkt-cli
//  tests/transport.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mockito::{Matcher, Server};
use reqwest::Method;
use serde_json::Value;

use bkt::api::{
    ApiError, CallContext, Dialect, MultipartFile, RateLimitSource, RetryPolicy, Transport,
    TransportOptions,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        jitter: 0.0,
        ..Default::default()
    }
}

fn transport(url: &str) -> Transport {
    Transport::new(TransportOptions::new(url).with_retry(fast_retry())).unwrap()
}

#[test]
fn test_paths_stay_under_base_url() {
    let t = Transport::new(TransportOptions::new("https://bitbucket.example.com/context")).unwrap();

    let request = t
        .build_request(Method::GET, "//rest/api/1.0/projects", None)
        .unwrap();
    assert_eq!(
        request.url().as_str(),
        "https://bitbucket.example.com/context/rest/api/1.0/projects"
    );

    let err = t
        .build_request(Method::GET, "https://evil.example.com/steal", None)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl(_)));
}

#[test]
fn test_rejects_bad_base_url() {
    assert!(Transport::new(TransportOptions::new("ftp://example.com")).is_err());
    assert!(Transport::new(TransportOptions::new("")).is_err());
}

#[tokio::test]
async fn test_basic_auth_and_user_agent() {
    let mut server = Server::new_async().await;
    let expected = format!("Basic {}", STANDARD.encode("alice:secret"));
    let mock = server
        .mock("GET", "/rest/api/1.0/projects/PROJ")
        .match_header("authorization", expected.as_str())
        .match_header("user-agent", "bkt-cli")
        .with_header("content-type", "application/json")
        .with_body(r#"{"key":"PROJ"}"#)
        .expect(1)
        .create_async()
        .await;

    let t = Transport::new(TransportOptions::new(server.url()).with_credentials("alice", "secret")).unwrap();
    let request = t
        .build_request(Method::GET, "/rest/api/1.0/projects/PROJ", None)
        .unwrap();
    let body: Value = t
        .execute_json(&CallContext::background(), request)
        .await
        .unwrap();

    assert_eq!(body["key"], "PROJ");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retries_transient_status() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/flaky")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let healthy = server
        .mock("GET", "/flaky")
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;

    let t = transport(&server.url());
    let started = Instant::now();
    let request = t.build_request(Method::GET, "/flaky", None).unwrap();
    let body: Value = t
        .execute_json(&CallContext::background(), request)
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
    assert!(started.elapsed() >= Duration::from_millis(10));
    failing.assert_async().await;
    healthy.assert_async().await;
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/down")
        .with_status(500)
        .with_body(r#"{"error":{"message":"Something broke"}}"#)
        .expect(3)
        .create_async()
        .await;

    let t = transport(&server.url());
    let request = t.build_request(Method::GET, "/down", None).unwrap();
    let err = t
        .execute_discard(&CallContext::background(), request)
        .await
        .unwrap_err();

    match err {
        ApiError::HttpStatus { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Something broke");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_is_not_replayed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/create")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let t = transport(&server.url());
    let request = t
        .build_json_request(Method::POST, "/create", &serde_json::json!({"name": "x"}))
        .unwrap();
    let err = t
        .execute_discard(&CallContext::background(), request)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body(r#"{"errors":[{"message":"Repository PROJ/nope does not exist."}]}"#)
        .expect(1)
        .create_async()
        .await;

    let t = transport(&server.url());
    let request = t.build_request(Method::GET, "/missing", None).unwrap();
    let err = t
        .execute_discard(&CallContext::background(), request)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "404: Repository PROJ/nope does not exist.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_conditional_get_serves_cached_body() {
    let mut server = Server::new_async().await;
    let fresh = server
        .mock("GET", "/rest/api/1.0/projects")
        .with_header("etag", "\"etag-123\"")
        .with_body(r#"{"values":[{"key":"PROJ"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let revalidated = server
        .mock("GET", "/rest/api/1.0/projects")
        .match_header("if-none-match", "\"etag-123\"")
        .with_status(304)
        .expect(1)
        .create_async()
        .await;

    let t = Transport::new(
        TransportOptions::new(server.url())
            .with_retry(fast_retry())
            .with_cache(true),
    )
    .unwrap();
    let ctx = CallContext::background();

    let first: Value = t
        .execute_json(&ctx, t.build_request(Method::GET, "/rest/api/1.0/projects", None).unwrap())
        .await
        .unwrap();
    assert_eq!(t.cached_entries(), 1);

    let second: Value = t
        .execute_json(&ctx, t.build_request(Method::GET, "/rest/api/1.0/projects", None).unwrap())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second["values"][0]["key"], "PROJ");
    fresh.assert_async().await;
    revalidated.assert_async().await;
}

#[tokio::test]
async fn test_cache_disabled_by_default() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/thing")
        .match_header("if-none-match", Matcher::Missing)
        .with_header("etag", "\"v1\"")
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let t = transport(&server.url());
    let ctx = CallContext::background();
    for _ in 0..2 {
        let request = t.build_request(Method::GET, "/thing", None).unwrap();
        t.execute_discard(&ctx, request).await.unwrap();
    }

    assert_eq!(t.cached_entries(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_large_integers_survive_decoding() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/big")
        .with_body(r#"{"id":18446744073709551615,"nested":{"n":9007199254740993}}"#)
        .create_async()
        .await;

    let t = transport(&server.url());
    let request = t.build_request(Method::GET, "/big", None).unwrap();
    let body: Value = t
        .execute_json(&CallContext::background(), request)
        .await
        .unwrap();

    assert_eq!(body["id"].as_u64(), Some(u64::MAX));
    let encoded = serde_json::to_string(&body).unwrap();
    assert!(encoded.contains("18446744073709551615"));
    assert!(encoded.contains("9007199254740993"));
}

#[tokio::test]
async fn test_empty_body_decodes_as_null() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", "/gone")
        .with_status(204)
        .create_async()
        .await;

    let t = transport(&server.url());
    let request = t.build_request(Method::DELETE, "/gone", None).unwrap();
    let body: Option<Value> = t
        .execute_json(&CallContext::background(), request)
        .await
        .unwrap();
    assert!(body.is_none());
}

#[tokio::test]
async fn test_rate_limit_headers_are_tracked() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/rest/api/1.0/projects")
        .with_header("x-ratelimit-limit", "100")
        .with_header("x-ratelimit-remaining", "42")
        .with_header("x-arequestid", "abc123")
        .with_body(r#"{"values":[]}"#)
        .create_async()
        .await;

    let t = transport(&server.url());
    assert_eq!(t.rate_limit_state().source, RateLimitSource::None);

    let request = t
        .build_request(Method::GET, "/rest/api/1.0/projects", None)
        .unwrap();
    t.execute_discard(&CallContext::background(), request)
        .await
        .unwrap();

    let state = t.rate_limit_state();
    assert_eq!(state.limit, 100);
    assert_eq!(state.remaining, 42);
    assert_eq!(state.source, RateLimitSource::Dc);
}

#[tokio::test]
async fn test_cloud_rate_limit_source() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/user")
        .with_header("x-ratelimit-limit", "1000")
        .with_header("x-ratelimit-remaining", "999")
        .with_header("x-ratelimit-reset", "1767225600")
        .with_body("{}")
        .create_async()
        .await;

    let t = Transport::new(
        TransportOptions::new(server.url())
            .with_retry(fast_retry())
            .with_dialect(Dialect::Cloud),
    )
    .unwrap();
    let request = t.build_request(Method::GET, "/user", None).unwrap();
    t.execute_discard(&CallContext::background(), request)
        .await
        .unwrap();

    let state = t.rate_limit_state();
    assert_eq!(state.source, RateLimitSource::Cloud);
    assert_eq!(state.remaining, 999);
    assert_eq!(state.reset.map(|r| r.timestamp()), Some(1_767_225_600));
}

#[tokio::test]
async fn test_cancelled_context_sends_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/never")
        .expect(0)
        .create_async()
        .await;

    let t = transport(&server.url());
    let ctx = CallContext::background();
    ctx.cancel();

    let request = t.build_request(Method::GET, "/never", None).unwrap();
    let err = t.execute_discard(&ctx, request).await.unwrap_err();

    assert!(matches!(err, ApiError::Cancelled));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_multipart_upload() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/upload")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::Regex(
            r#"name="files"; filename="notes.txt""#.into(),
        ))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let t = transport(&server.url());
    let file = MultipartFile::from_bytes("files", "notes.txt", &b"release notes"[..]);
    let request = t
        .build_multipart_request(Method::POST, "/upload", vec![file], &[])
        .unwrap();
    t.execute_discard(&CallContext::background(), request)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_stream_download_follows_redirect() {
    let mut server = Server::new_async().await;
    let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    let location = format!("{}/blobs/report.bin", server.url());

    let _redirect = server
        .mock("GET", "/download/report.bin")
        .with_status(302)
        .with_header("location", &location)
        .create_async()
        .await;
    let blob = server
        .mock("GET", "/blobs/report.bin")
        .with_header("content-type", "application/octet-stream")
        .with_body(payload.clone())
        .expect(1)
        .create_async()
        .await;

    let t = transport(&server.url());
    let request = t
        .build_request(Method::GET, "/download/report.bin", None)
        .unwrap()
        .accept("*/*");
    let mut sink: Vec<u8> = Vec::new();
    let written = t
        .execute_to(&CallContext::background(), request, &mut sink)
        .await
        .unwrap();

    assert_eq!(written, payload.len() as u64);
    assert_eq!(sink, payload);
    blob.assert_async().await;
}

#[tokio::test]
async fn test_oversized_integers_pass_through() {
    let mut server = Server::new_async().await;
    let raw = r#"{"id":18446744073709551616,"neg":-9223372036854775809}"#;
    let _mock = server
        .mock("GET", "/huge")
        .with_body(raw)
        .create_async()
        .await;

    let t = transport(&server.url());
    let request = t.build_request(Method::GET, "/huge", None).unwrap();
    let body: Value = t
        .execute_json(&CallContext::background(), request)
        .await
        .unwrap();

    assert_eq!(serde_json::to_string(&body).unwrap(), raw);
}

#[tokio::test]
async fn test_non_200_success_is_cached() {
    let mut server = Server::new_async().await;
    let fresh = server
        .mock("GET", "/mirror")
        .with_status(203)
        .with_header("etag", "\"e1\"")
        .with_body(r#"{"v":1}"#)
        .expect(1)
        .create_async()
        .await;
    let revalidated = server
        .mock("GET", "/mirror")
        .match_header("if-none-match", "\"e1\"")
        .with_status(304)
        .expect(1)
        .create_async()
        .await;

    let t = Transport::new(
        TransportOptions::new(server.url())
            .with_retry(fast_retry())
            .with_cache(true),
    )
    .unwrap();
    let ctx = CallContext::background();

    let first: Value = t
        .execute_json(&ctx, t.build_request(Method::GET, "/mirror", None).unwrap())
        .await
        .unwrap();
    assert_eq!(t.cached_entries(), 1);

    let second: Value = t
        .execute_json(&ctx, t.build_request(Method::GET, "/mirror", None).unwrap())
        .await
        .unwrap();

    assert_eq!(first, second);
    fresh.assert_async().await;
    revalidated.assert_async().await;
}

#[tokio::test]
async fn test_gone_evicts_cached_entry() {
    let mut server = Server::new_async().await;
    let fresh = server
        .mock("GET", "/rest/api/1.0/projects/OLD")
        .with_header("etag", "\"v1\"")
        .with_body(r#"{"key":"OLD"}"#)
        .expect(1)
        .create_async()
        .await;
    let gone = server
        .mock("GET", "/rest/api/1.0/projects/OLD")
        .match_header("if-none-match", "\"v1\"")
        .with_status(410)
        .expect(1)
        .create_async()
        .await;

    let t = Transport::new(
        TransportOptions::new(server.url())
            .with_retry(fast_retry())
            .with_cache(true),
    )
    .unwrap();
    let ctx = CallContext::background();

    t.execute_discard(&ctx, t.build_request(Method::GET, "/rest/api/1.0/projects/OLD", None).unwrap())
        .await
        .unwrap();
    assert_eq!(t.cached_entries(), 1);

    let err = t
        .execute_discard(&ctx, t.build_request(Method::GET, "/rest/api/1.0/projects/OLD", None).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(410));
    assert_eq!(t.cached_entries(), 0);
    fresh.assert_async().await;
    gone.assert_async().await;
}

#[tokio::test]
async fn test_retry_after_is_honoured() {
    let mut server = Server::new_async().await;
    let throttled = server
        .mock("GET", "/busy")
        .with_status(429)
        .with_header("retry-after", "1")
        .expect(1)
        .create_async()
        .await;
    let healthy = server
        .mock("GET", "/busy")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let t = transport(&server.url());
    let started = Instant::now();
    let request = t.build_request(Method::GET, "/busy", None).unwrap();
    t.execute_discard(&CallContext::background(), request)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    throttled.assert_async().await;
    healthy.assert_async().await;
}

#[tokio::test]
async fn test_cancel_interrupts_backoff() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/slow")
        .with_status(503)
        .with_header("retry-after", "30")
        .expect(1)
        .create_async()
        .await;

    let t = transport(&server.url());
    let ctx = CallContext::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let request = t.build_request(Method::GET, "/slow", None).unwrap();
    let err = t.execute_discard(&ctx, request).await.unwrap_err();

    assert!(matches!(err, ApiError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    mock.assert_async().await;
}
