//
//  bkt-cli
//  tests/cloud.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use bkt::api::cloud::{CloudClient, CloudRepo, CreateWebhookRequest, IssueListOptions, PipelineVariable};
use bkt::api::{ApiError, CallContext, Dialect, MultipartFile, RetryPolicy, Transport, TransportOptions};

fn client(server: &ServerGuard) -> CloudClient {
    let options = TransportOptions::new(server.url())
        .with_dialect(Dialect::Cloud)
        .with_credentials("bob", "app-password")
        .with_retry(RetryPolicy {
            initial_backoff: Duration::from_millis(5),
            jitter: 0.0,
            ..Default::default()
        });
    CloudClient::new(Arc::new(Transport::new(options).unwrap()))
}

fn repo() -> CloudRepo {
    CloudRepo::parse("acme/app").unwrap()
}

#[tokio::test]
async fn test_pipelines_follow_next_links() {
    let mut server = Server::new_async().await;
    let next = format!("{}/repositories/acme/app/pipelines/?page=2", server.url());

    let first = server
        .mock("GET", "/repositories/acme/app/pipelines/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sort".into(), "-created_on".into()),
            Matcher::UrlEncoded("pagelen".into(), "30".into()),
        ]))
        .with_body(
            json!({
                "values": [{"uuid": "1", "build_number": 1}, {"uuid": "2", "build_number": 2}],
                "next": next,
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/repositories/acme/app/pipelines/")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_body(json!({"values": [{"uuid": "3", "build_number": 3}]}).to_string())
        .expect(1)
        .create_async()
        .await;

    let pipelines = client(&server)
        .list_pipelines(&CallContext::background(), &repo(), 0)
        .await
        .unwrap();

    let uuids: Vec<&str> = pipelines.iter().map(|p| p.uuid.as_str()).collect();
    assert_eq!(uuids, ["1", "2", "3"]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_limit_stops_before_next_page() {
    let mut server = Server::new_async().await;
    let next = format!("{}/repositories/acme/app/pipelines/?page=2", server.url());

    let first = server
        .mock("GET", "/repositories/acme/app/pipelines/")
        .match_query(Matcher::UrlEncoded("pagelen".into(), "2".into()))
        .with_body(
            json!({
                "values": [{"uuid": "1"}, {"uuid": "2"}],
                "next": next,
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/repositories/acme/app/pipelines/")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_body(json!({"values": [{"uuid": "3"}]}).to_string())
        .expect(0)
        .create_async()
        .await;

    let pipelines = client(&server)
        .list_pipelines(&CallContext::background(), &repo(), 2)
        .await
        .unwrap();

    assert_eq!(pipelines.len(), 2);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_next_link_to_other_host_is_rejected() {
    let mut server = Server::new_async().await;
    let _page = server
        .mock("GET", "/repositories/acme/app/pipelines/")
        .match_query(Matcher::Any)
        .with_body(
            json!({
                "values": [{"uuid": "1"}],
                "next": "https://evil.example.com/repositories/acme/app/pipelines/?page=2",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = client(&server)
        .list_pipelines(&CallContext::background(), &repo(), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_issue_filters_become_bbql() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repositories/acme/app/issues")
        .match_query(Matcher::AllOf(vec![
            Matcher::Regex(r"q=state%20%3D%20%22open%22%20AND%20kind%20%3D%20%22bug%22".into()),
            Matcher::UrlEncoded("pagelen".into(), "30".into()),
        ]))
        .with_body(json!({"values": [{"id": 7, "title": "Crash on start"}]}).to_string())
        .expect(1)
        .create_async()
        .await;

    let options = IssueListOptions {
        state: Some("open".into()),
        kind: Some("bug".into()),
        ..Default::default()
    };
    let issues = client(&server)
        .list_issues(&CallContext::background(), &repo(), &options, 0)
        .await
        .unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].id, 7);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_all_state_sends_no_filter() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repositories/acme/app/issues")
        .match_query(Matcher::Regex(r"^pagelen=30$".into()))
        .with_body(json!({"values": []}).to_string())
        .expect(1)
        .create_async()
        .await;

    let options = IssueListOptions {
        state: Some("ALL".into()),
        ..Default::default()
    };
    let issues = client(&server)
        .list_issues(&CallContext::background(), &repo(), &options, 0)
        .await
        .unwrap();

    assert!(issues.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upload_issue_attachments() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/repositories/acme/app/issues/7/attachments")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"filename="crash.log""#.into()),
            Matcher::Regex("panicked at main".into()),
        ]))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crash.log");
    std::fs::write(&path, "thread 'main' panicked at main.rs").unwrap();
    let file = MultipartFile::open("files", &path).await.unwrap();

    client(&server)
        .upload_issue_attachments(&CallContext::background(), &repo(), 7, vec![file])
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_upload_requires_files() {
    let server = Server::new_async().await;
    let err = client(&server)
        .upload_issue_attachments(&CallContext::background(), &repo(), 7, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_download_issue_attachment() {
    let mut server = Server::new_async().await;
    let content = b"\x89PNG\r\n\x1a\n not really an image".to_vec();
    let mock = server
        .mock("GET", "/repositories/acme/app/issues/7/attachments/screenshot.png")
        .with_body(content.clone())
        .expect(1)
        .create_async()
        .await;

    let mut sink: Vec<u8> = Vec::new();
    let written = client(&server)
        .download_issue_attachment(&CallContext::background(), &repo(), 7, "screenshot.png", &mut sink)
        .await
        .unwrap();

    assert_eq!(written, content.len() as u64);
    assert_eq!(sink, content);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_issue_tracker_is_not_found() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/repositories/acme/app/issues/1")
        .with_status(404)
        .with_body(json!({"type": "error", "error": {"message": "Repository has no issue tracker."}}).to_string())
        .create_async()
        .await;

    let err = client(&server)
        .get_issue(&CallContext::background(), &repo(), 1)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "404: Repository has no issue tracker.");
}

#[tokio::test]
async fn test_stop_pipeline_is_retried() {
    let mut server = Server::new_async().await;
    let path = "/repositories/acme/app/pipelines/run-42/stopPipeline";
    let busy = server
        .mock("POST", path)
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let stopped = server
        .mock("POST", path)
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    client(&server)
        .stop_pipeline(&CallContext::background(), &repo(), "run-42")
        .await
        .unwrap();

    busy.assert_async().await;
    stopped.assert_async().await;
}

#[tokio::test]
async fn test_pipeline_variables() {
    let mut server = Server::new_async().await;
    let collection = "/repositories/acme/app/pipelines_config/variables/";
    let list = server
        .mock("GET", collection)
        .match_query(Matcher::UrlEncoded("pagelen".into(), "30".into()))
        .with_body(
            json!({
                "values": [{"uuid": "var-1", "key": "API_TOKEN", "value": "", "secured": true}]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("POST", collection)
        .match_body(Matcher::Json(json!({"key": "DEPLOY_ENV", "value": "staging", "secured": false})))
        .with_status(201)
        .with_body(json!({"uuid": "var-2", "key": "DEPLOY_ENV", "value": "staging", "secured": false}).to_string())
        .expect(1)
        .create_async()
        .await;
    let update = server
        .mock("PUT", "/repositories/acme/app/pipelines_config/variables/var-2")
        .match_body(Matcher::PartialJson(json!({"key": "DEPLOY_ENV", "value": "production"})))
        .with_body(json!({"uuid": "var-2", "key": "DEPLOY_ENV", "value": "production", "secured": false}).to_string())
        .expect(1)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/repositories/acme/app/pipelines_config/variables/var-1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let client = client(&server);
    let ctx = CallContext::background();

    let variables = client.list_pipeline_variables(&ctx, &repo(), 0).await.unwrap();
    assert!(variables[0].secured);
    assert_eq!(variables[0].uuid.as_deref(), Some("var-1"));

    let created = client
        .create_pipeline_variable(&ctx, &repo(), &PipelineVariable::new("DEPLOY_ENV", "staging", false))
        .await
        .unwrap();
    let uuid = created.uuid.clone().unwrap();

    let mut changed = created;
    changed.value = "production".into();
    let updated = client
        .update_pipeline_variable(&ctx, &repo(), &uuid, &changed)
        .await
        .unwrap();
    assert_eq!(updated.value, "production");

    client.delete_pipeline_variable(&ctx, &repo(), "var-1").await.unwrap();

    list.assert_async().await;
    create.assert_async().await;
    update.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn test_webhooks() {
    let mut server = Server::new_async().await;
    let collection = "/repositories/acme/app/hooks";
    let list = server
        .mock("GET", collection)
        .match_query(Matcher::UrlEncoded("pagelen".into(), "30".into()))
        .with_body(
            json!({
                "values": [{"uuid": "hook-1", "url": "https://ci.example.com/hook", "active": true, "events": ["repo:push"]}]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("POST", collection)
        .match_body(Matcher::Json(json!({
            "description": "Deploy",
            "url": "https://deploy.example.com/hook",
            "active": true,
            "events": ["pullrequest:fulfilled"]
        })))
        .with_status(201)
        .with_body(json!({"uuid": "hook-2", "url": "https://deploy.example.com/hook", "active": true}).to_string())
        .expect(1)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/repositories/acme/app/hooks/hook-1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let client = client(&server);
    let ctx = CallContext::background();

    let hooks = client.list_webhooks(&ctx, &repo(), 0).await.unwrap();
    assert_eq!(hooks[0].events, ["repo:push"]);

    let body = CreateWebhookRequest {
        description: "Deploy".into(),
        url: "https://deploy.example.com/hook".into(),
        active: true,
        events: vec!["pullrequest:fulfilled".into()],
    };
    let created = client.create_webhook(&ctx, &repo(), &body).await.unwrap();
    assert_eq!(created.uuid, "hook-2");

    client.delete_webhook(&ctx, &repo(), "hook-1").await.unwrap();

    list.assert_async().await;
    create.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn test_webhook_requires_events() {
    let server = Server::new_async().await;
    let body = CreateWebhookRequest {
        description: "Empty".into(),
        url: "https://ci.example.com/hook".into(),
        active: true,
        events: Vec::new(),
    };
    let err = client(&server)
        .create_webhook(&CallContext::background(), &repo(), &body)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}
