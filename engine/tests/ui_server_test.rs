//! Integration tests for the browser host's HTTP surface

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use codify_engine::ui_server::{router, AppState};
use common::Harness;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(fragments: &[&str]) -> (Router, AppState) {
    let h = Harness::new(fragments);
    let session = h.session();
    let state = AppState::new(Arc::new(h.orchestrator), session);
    (router(state.clone()), state)
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn get_json(app: &Router, uri: &str) -> Value {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

async fn post_json(app: &Router, uri: &str, body: Value) -> axum::response::Response {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

/// `data:` payloads of an event-stream body
fn sse_events(body: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(body)
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_index_page() {
    let (app, _) = app(&[]);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("Codify - Your Coding Partner"));
    assert!(html.contains("Tell me about your coding problems!"));
}

#[tokio::test]
async fn test_initial_session() {
    let (app, _) = app(&[]);
    let session = get_json(&app, "/api/session").await;

    assert_eq!(session["messages"], json!([]));
    assert_eq!(session["backends"], json!(["mistral", "gemini"]));
    assert_eq!(session["backend"], "gemini");
    assert_eq!(session["feedback_style"], "thumbs");
    assert_eq!(session["show_style_toggle"], false);
    assert_eq!(session["show_feedback"], false);
    assert_eq!(session["use_demo_key"], true);
    assert_eq!(session["project_name"], "Codify Demo");
    assert_eq!(session["max_input_chars"], 500);
    assert_eq!(session["state"], "idle");
}

#[tokio::test]
async fn test_chat_streams_events() {
    let (app, state) = app(&["def ", "f(): ..."]);

    let resp = post_json(&app, "/api/chat", json!({"prompt": "write a function"})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let events = sse_events(&body_bytes(resp).await);
    let kinds: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec!["user", "partial", "partial", "final", "trace_link", "done"]
    );
    assert_eq!(events[1]["text"], "def ▌");
    assert_eq!(events[3]["text"], "def f(): ...");

    let session = state.session.lock().await;
    assert_eq!(session.memory.len(), 2);
    drop(session);

    let snapshot = get_json(&app, "/api/session").await;
    assert_eq!(snapshot["messages"][0]["role"], "user");
    assert_eq!(snapshot["show_style_toggle"], true);
    assert_eq!(snapshot["show_feedback"], true);
    assert!(snapshot["trace_url"].as_str().is_some());
}

#[tokio::test]
async fn test_chat_warns_on_long_input() {
    let (app, _) = app(&["unused"]);

    let resp = post_json(&app, "/api/chat", json!({"prompt": "y".repeat(501)})).await;
    let events = sse_events(&body_bytes(resp).await);

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "warning");
    assert!(events[0]["message"]
        .as_str()
        .unwrap()
        .contains("limit your input to 500 characters"));
    assert_eq!(events[1]["type"], "done");
}

#[tokio::test]
async fn test_settings_without_key_prompts_for_configuration() {
    let (app, _) = app(&["unused"]);

    let resp = post_json(&app, "/api/settings", json!({"use_demo_key": false})).await;
    let snapshot: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(snapshot["use_demo_key"], false);
    assert_eq!(snapshot["has_manual_key"], false);

    let resp = post_json(&app, "/api/chat", json!({"prompt": "hello"})).await;
    let events = sse_events(&body_bytes(resp).await);
    assert_eq!(events[0]["type"], "configuration_required");
}

#[tokio::test]
async fn test_feedback_flow() {
    let (app, _) = app(&["answer"]);

    let resp = post_json(&app, "/api/chat", json!({"prompt": "hello"})).await;
    body_bytes(resp).await;
    let run_id = get_json(&app, "/api/session").await["run_id"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = post_json(
        &app,
        "/api/feedback",
        json!({"run_id": run_id, "score": "👎", "text": "wrong language"}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["status"], "recorded");

    let resp = post_json(
        &app,
        "/api/feedback",
        json!({"run_id": run_id, "score": "👍"}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = post_json(
        &app,
        "/api/feedback",
        json!({"run_id": "not-a-uuid", "score": "👍"}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feedback_style_toggle() {
    let (app, _) = app(&[]);

    let resp = post_json(&app, "/api/feedback-style", json!({})).await;
    let snapshot: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(snapshot["feedback_style"], "faces");
    assert_eq!(snapshot["feedback_options"].as_array().unwrap().len(), 5);

    let resp = post_json(&app, "/api/feedback-style", json!({"style": "thumbs"})).await;
    let snapshot: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(snapshot["feedback_style"], "thumbs");
    assert_eq!(snapshot["feedback_options"], json!(["👍", "👎"]));
}

#[tokio::test]
async fn test_clear_history() {
    let (app, _) = app(&["answer"]);

    let resp = post_json(&app, "/api/chat", json!({"prompt": "hello"})).await;
    body_bytes(resp).await;

    let resp = post_json(&app, "/api/clear", json!({})).await;
    let snapshot: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(snapshot["messages"], json!([]));
    assert_eq!(snapshot["trace_url"], Value::Null);
    assert_eq!(snapshot["show_feedback"], false);
}

#[tokio::test]
async fn test_status() {
    let (app, _) = app(&[]);
    let status = get_json(&app, "/api/status").await;
    assert_eq!(status["status"], "running");
    assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
    assert!(!status["commit"].as_str().unwrap().is_empty());
}
