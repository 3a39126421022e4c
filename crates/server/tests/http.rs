//! End-to-end HTTP tests: webhook ingestion through the router into the
//! store, then back out through the tool-calling surface.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use notify::LogSink;
use relay::{MemoryEventStore, NotificationDispatcher};
use server::{router, AppState};

fn test_router() -> axum::Router {
    let state = AppState::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(NotificationDispatcher::new(Arc::new(LogSink))),
    );
    router(Arc::new(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn webhook_request(event_type: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook/github")
        .header("x-github-event", event_type)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn call_request(tool: &str, arguments: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/call/{tool}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({"arguments": arguments})).unwrap(),
        ))
        .unwrap()
}

fn docs_failure_payload() -> Value {
    json!({
        "action": "completed",
        "workflow_run": {
            "name": "Build PR Documentation",
            "status": "completed",
            "conclusion": "failure",
            "run_number": 42,
            "updated_at": "2024-05-01T10:00:00Z",
            "html_url": "https://github.com/octo/widgets/actions/runs/42"
        },
        "repository": {"full_name": "octo/widgets"},
        "sender": {"login": "octocat"}
    })
}

#[tokio::test]
async fn webhook_ingestion_acknowledges_the_event_type() {
    let app = test_router();
    let response = app
        .oneshot(webhook_request("workflow_run", &docs_failure_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({"status": "received", "event_type": "workflow_run"}));
}

#[tokio::test]
async fn ingested_failure_is_visible_through_every_query_tool() {
    let app = test_router();
    app.clone()
        .oneshot(webhook_request("workflow_run", &docs_failure_payload()))
        .await
        .unwrap();

    // Documentation query: the summary carries the known description.
    let response = app
        .clone()
        .oneshot(call_request("get_documentation_workflow_status", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    let summaries = body["result"].as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["name"], "Build PR Documentation");
    assert_ne!(summaries[0]["description"], "Unknown workflow");

    // Failed-only query sees it too.
    let response = app
        .clone()
        .oneshot(call_request("get_failed_workflows", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["result"].as_array().unwrap().len(), 1);

    // A name filter that matches nothing is an empty array once events exist.
    let response = app
        .oneshot(call_request(
            "get_workflow_status",
            json!({"workflow_name": "Deploy"}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["result"], json!([]));
}

#[tokio::test]
async fn malformed_json_payload_is_a_structured_400() {
    let app = test_router();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/github")
        .header("x-github-event", "push")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_payload");
}

#[tokio::test]
async fn empty_body_is_acknowledged_but_ignored() {
    let app = test_router();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/github")
        .header("x-github-event", "push")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ignored");

    // Nothing was recorded: queries still see the fresh-store sentinel.
    let response = app
        .oneshot(call_request("get_workflow_status", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(
        body["result"],
        json!({"message": "No GitHub Actions events received yet"})
    );
}

#[tokio::test]
async fn form_encoded_envelopes_are_accepted() {
    let app = test_router();
    let inner = serde_json::to_string(&docs_failure_payload()).unwrap();
    let body = serde_urlencoded_body(&inner);

    let request = Request::builder()
        .method("POST")
        .uri("/webhook/github")
        .header("x-github-event", "workflow_run")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn serde_urlencoded_body(payload_json: &str) -> String {
    let encoded: String = payload_json
        .bytes()
        .map(|b| match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect();
    format!("payload={encoded}")
}

#[tokio::test]
async fn health_info_and_catalog_routes_respond() {
    let app = test_router();

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["message"], "AutoPRX Relay");

    let response = app
        .oneshot(Request::get("/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["tools"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn unknown_tool_is_a_404() {
    let app = test_router();
    let response = app
        .oneshot(call_request("does_not_exist", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unknown_tool");
}
