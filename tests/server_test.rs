// Integration tests for the HTTP server
//
// The router is driven in-process with `ServiceExt::oneshot`.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{chat_body, controller, seeded_store, CountingStore, Script, ScriptedProvider};
use folio::config::ServerConfig;
use folio::server::ChatServer;

fn router(store: Arc<CountingStore>, provider: Arc<ScriptedProvider>) -> Router {
    ChatServer::new(controller(store, provider), ServerConfig::default()).router()
}

fn post_chat(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_chat_streams_data_stream_frames() {
    let app = router(seeded_store(), ScriptedProvider::reply(vec!["Hel", "lo"]));

    let response = app.oneshot(post_chat(chat_body("ada", "Hi"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers()["x-vercel-ai-data-stream"], "v1");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("f:{\"messageId\":\"msg-"));
    assert_eq!(lines[1], "0:\"Hel\"");
    assert_eq!(lines[2], "0:\"lo\"");
    assert_eq!(lines[3], "d:{\"finishReason\":\"stop\"}");
}

#[tokio::test]
async fn test_chat_body_arrives_frame_by_frame() {
    let app = router(seeded_store(), ScriptedProvider::reply(vec!["a", "b", "c"]));

    let response = app.oneshot(post_chat(chat_body("ada", "Hi"))).await.unwrap();
    let mut body = response.into_body();

    let mut frames = Vec::new();
    while let Some(frame) = body.frame().await {
        let data = frame.unwrap().into_data().unwrap();
        frames.push(String::from_utf8(data.to_vec()).unwrap());
    }

    assert_eq!(frames.len(), 5);
    assert!(frames.iter().all(|f| f.ends_with('\n') && f.matches('\n').count() == 1));
    assert_eq!(frames[2], "0:\"b\"\n");
}

#[tokio::test]
async fn test_chat_invalid_request_is_400() {
    let provider = ScriptedProvider::reply(vec!["unused"]);
    let app = router(seeded_store(), provider.clone());

    let response = app
        .oneshot(post_chat(br#"{"messages":"hi","portfolioId":"ada"}"#.to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "invalid_request");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_chat_unknown_portfolio_is_404() {
    let provider = ScriptedProvider::reply(vec!["unused"]);
    let app = router(seeded_store(), provider.clone());

    let response = app.oneshot(post_chat(chat_body("ghost", "Hi"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "not_found");
    assert_eq!(body["error"]["message"], "Portfolio 'ghost' not found");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_chat_store_failure_is_502() {
    let app = router(CountingStore::failing(), ScriptedProvider::reply(vec![]));

    let response = app.oneshot(post_chat(chat_body("ada", "Hi"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"]["type"], "store_error");
}

#[tokio::test]
async fn test_chat_provider_failure_is_200_with_error_frame() {
    let app = router(
        seeded_store(),
        ScriptedProvider::new(Script::FailOpen("upstream 500")),
    );

    let response = app.oneshot(post_chat(chat_body("ada", "Hi"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("3:\""));
    assert_eq!(text.lines().count(), 1);
}

#[tokio::test]
async fn test_chat_body_limit() {
    let config = ServerConfig {
        body_limit_bytes: 64,
        ..ServerConfig::default()
    };
    let app = ChatServer::new(
        controller(seeded_store(), ScriptedProvider::reply(vec![])),
        config,
    )
    .router();

    let question = "x".repeat(512);
    let response = app.oneshot(post_chat(chat_body("ada", &question))).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_opener_prompt() {
    let app = router(seeded_store(), ScriptedProvider::reply(vec![]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/portfolios/ada/opener")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["role"], "user");
    assert_eq!(
        body["content"],
        "Please concisely describe Ada Lovelace's background, skills, and key accomplishments based on the provided context."
    );
}

#[tokio::test]
async fn test_opener_unknown_portfolio_is_404() {
    let app = router(seeded_store(), ScriptedProvider::reply(vec![]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/portfolios/ghost/opener")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let app = router(seeded_store(), ScriptedProvider::reply(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "scripted");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let app = router(seeded_store(), ScriptedProvider::reply(vec![]));

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/chat")
                .header(header::ORIGIN, "https://portfolio.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
