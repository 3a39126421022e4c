//! AutoPRX HTTP shell.
//!
//! Binds the relay's domain logic to its HTTP surface:
//!
//! - `POST /webhook/github` — webhook ingress. Reads the `X-GitHub-Event`
//!   header, normalises the body through [`relay::gateway`], appends the
//!   canonical record to the event store, and evaluates ingestion-time
//!   notifications.
//! - `GET /` and `GET /health` — service info and liveness.
//! - `GET /tools` and `POST /call/{tool}` — the tool-calling surface an LLM
//!   agent uses to query CI status, inspect recent events, analyse pending
//!   changes, and send notifications on demand.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Routing, header handling, and status-code mapping live
//! here; every domain decision is delegated to the [`relay`] crate through
//! the injected [`relay::EventStore`] and [`relay::NotificationDispatcher`].
//!
//! ## Error mapping
//!
//! Malformed payloads answer `400` with a structured body; store write and
//! integrity failures answer `500` (the event is lost, the caller must know);
//! notification failures never affect a response — they are logged and
//! reduced to status strings.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};

use relay::gateway::{self, NormalizedPayload};
use relay::{EventStore, NotificationDispatcher, RelayRunId, StoreError};

pub mod pr;
pub mod tools;

/// Shared state injected into every route handler.
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub run_id: RelayRunId,
}

impl AppState {
    /// Creates the shared state with a fresh run identifier.
    pub fn new(store: Arc<dyn EventStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            run_id: RelayRunId::new_random(),
        }
    }
}

/// Builds the full relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/webhook/github", post(github_webhook))
        .route("/tools", get(list_tools))
        .route("/call/{tool}", post(call_tool))
        .with_state(state)
}

async fn service_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "AutoPRX Relay",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "run_id": state.run_id,
        "services": {
            "webhook": "/webhook/github",
            "health": "/health",
            "tools": "/tools",
        },
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "services": {
            "webhook": "active",
            "notifications": "active",
        },
    }))
}

async fn github_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let event_type = header_str(&headers, "x-github-event").unwrap_or("unknown");
    let content_type = header_str(&headers, header::CONTENT_TYPE.as_str());

    let payload = match gateway::normalize(&body, content_type) {
        Ok(NormalizedPayload::Empty) => {
            tracing::info!(event_type, "empty webhook body acknowledged and ignored");
            return (
                StatusCode::OK,
                Json(json!({"status": "ignored", "reason": "empty payload"})),
            )
                .into_response();
        }
        Ok(NormalizedPayload::Json(payload)) => payload,
        Err(err) => {
            tracing::warn!(event_type, error = %err, "webhook payload rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.kind(), "detail": err.to_string()})),
            )
                .into_response();
        }
    };

    let event = gateway::build_event(event_type, payload, Utc::now());

    if let Err(err) = state.store.append(event.clone()).await {
        // The event is lost; the sender must see the failure.
        tracing::error!(event_type, error = %err, "failed to persist webhook event");
        return store_error_response(err);
    }

    // Notification failures are recovered to status strings inside the
    // dispatcher; they never affect the ingestion response.
    if let Some(status) = state.dispatcher.on_event(&event).await {
        tracing::info!(event_type, status, "ingestion notification evaluated");
    }

    (
        StatusCode::OK,
        Json(json!({"status": "received", "event_type": event_type})),
    )
        .into_response()
}

async fn list_tools() -> Json<Value> {
    Json(json!({"tools": tools::catalog()}))
}

async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(tool): Path<String>,
    body: axum::body::Bytes,
) -> Response {
    // A missing or non-JSON body means "no arguments"; tools apply their
    // own defaults.
    let arguments = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("arguments").cloned())
        .unwrap_or_else(|| json!({}));

    match tools::call(&state, &tool, arguments).await {
        Ok(result) => (StatusCode::OK, Json(json!({"tool": tool, "result": result}))).into_response(),
        Err(tools::ToolError::UnknownTool(name)) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown_tool", "detail": format!("Tool '{name}' not found")})),
        )
            .into_response(),
        Err(tools::ToolError::InvalidArguments(detail)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_arguments", "detail": detail})),
        )
            .into_response(),
        Err(tools::ToolError::Store(err)) => {
            tracing::error!(tool, error = %err, "tool call failed on the event store");
            store_error_response(err)
        }
    }
}

fn store_error_response(err: StoreError) -> Response {
    let kind = match err {
        StoreError::Integrity { .. } => "data_integrity",
        StoreError::Read { .. } => "store_read",
        StoreError::Write { .. } => "store_write",
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": kind, "detail": err.to_string()})),
    )
        .into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
