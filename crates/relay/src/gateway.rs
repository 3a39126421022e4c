//! Ingestion gateway: raw webhook bodies → canonical event records.
//!
//! GitHub delivers webhook payloads either as a JSON body
//! (`application/json`) or as a form envelope
//! (`application/x-www-form-urlencoded`) whose `payload` field holds the
//! JSON. [`normalize`] folds both shapes — plus deliveries with a missing or
//! unrecognised content type — into one canonical decoded payload, and
//! [`build_event`] turns that payload into an [`EventRecord`] with a closed
//! [`EventKind`] category.
//!
//! An empty request body is not an error: it yields
//! [`NormalizedPayload::Empty`], which the caller reports as
//! received-but-ignored.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::IngestError;
use crate::events::{
    CheckRunDetails, EventKind, EventRecord, PingDetails, PushDetails, WorkflowRunDetails,
};
use crate::identifiers::RepositoryId;

/// A webhook body after content-type normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedPayload {
    /// The body was empty; the delivery is acknowledged but not recorded.
    Empty,
    /// The decoded JSON payload.
    Json(Value),
}

/// Normalises a raw request body plus its declared content type.
///
/// - A JSON content type decodes the body directly; decode failure is
///   [`IngestError::InvalidPayload`].
/// - A form content type extracts the `payload` field and decodes that;
///   a missing field is [`IngestError::MissingPayload`].
/// - An absent or unrecognised content type tries JSON first, then the form
///   envelope; if both fail the result is [`IngestError::UnparseablePayload`].
pub fn normalize(body: &[u8], content_type: Option<&str>) -> Result<NormalizedPayload, IngestError> {
    if body.is_empty() {
        return Ok(NormalizedPayload::Empty);
    }

    match content_type {
        Some(ct) if ct.contains("json") => {
            let value = serde_json::from_slice(body).map_err(|e| IngestError::InvalidPayload {
                detail: e.to_string(),
            })?;
            Ok(NormalizedPayload::Json(value))
        }
        Some(ct) if ct.contains("x-www-form-urlencoded") => {
            decode_form_envelope(body).map(NormalizedPayload::Json)
        }
        _ => {
            if let Ok(value) = serde_json::from_slice(body) {
                return Ok(NormalizedPayload::Json(value));
            }
            decode_form_envelope(body)
                .map(NormalizedPayload::Json)
                .map_err(|_| IngestError::UnparseablePayload)
        }
    }
}

/// Extracts and decodes the `payload` field of a form-encoded body.
fn decode_form_envelope(body: &[u8]) -> Result<Value, IngestError> {
    let fields: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|e| IngestError::InvalidPayload {
            detail: e.to_string(),
        })?;

    let payload = fields
        .into_iter()
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value)
        .ok_or(IngestError::MissingPayload)?;

    serde_json::from_str(&payload).map_err(|e| IngestError::InvalidPayload {
        detail: e.to_string(),
    })
}

/// Builds the canonical event record for a decoded payload.
///
/// Categorisation is driven by the event-category header, not by probing the
/// payload: a `workflow_run` delivery whose nested structure is malformed
/// degrades to [`EventKind::Other`] with the raw payload retained, rather
/// than failing ingestion.
pub fn build_event(event_type: &str, payload: Value, received_at: DateTime<Utc>) -> EventRecord {
    let action = string_at(&payload, &["action"]);
    let repository = string_at(&payload, &["repository", "full_name"]).and_then(RepositoryId::new);
    let sender = string_at(&payload, &["sender", "login"]);

    let kind = match event_type {
        "push" => EventKind::Push(PushDetails {
            pusher: string_at(&payload, &["pusher", "name"])
                .or_else(|| sender.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            git_ref: string_at(&payload, &["ref"]).unwrap_or_else(|| "Unknown".to_string()),
        }),
        "workflow_run" => nested_details::<WorkflowRunDetails>(&payload, "workflow_run")
            .map(EventKind::WorkflowRun)
            .unwrap_or(EventKind::Other),
        "check_run" => nested_details::<CheckRunDetails>(&payload, "check_run")
            .map(EventKind::CheckRun)
            .unwrap_or(EventKind::Other),
        "ping" => EventKind::Ping(PingDetails {
            hook_id: payload.get("hook_id").and_then(Value::as_u64).unwrap_or(0),
            hook_url: string_at(&payload, &["hook", "config", "url"])
                .or_else(|| string_at(&payload, &["hook", "url"]))
                .unwrap_or_default(),
        }),
        _ => EventKind::Other,
    };

    if matches!(&kind, EventKind::Other) && matches!(event_type, "workflow_run" | "check_run") {
        tracing::debug!(event_type, "nested event structure missing or malformed");
    }

    EventRecord {
        timestamp: received_at,
        event_type: event_type.to_string(),
        action,
        repository,
        sender,
        kind,
        raw_payload: payload,
    }
}

/// Walks `path` through nested JSON objects and returns the string leaf.
fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().map(str::to_string)
}

/// Deserialises the nested structure under `key`, if present and well-formed.
fn nested_details<T: serde::de::DeserializeOwned>(payload: &Value, key: &str) -> Option<T> {
    payload
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IngestError;
    use crate::events::RunConclusion;

    fn workflow_payload() -> Value {
        serde_json::json!({
            "action": "completed",
            "workflow_run": {
                "name": "Build documentation",
                "status": "completed",
                "conclusion": "failure",
                "run_number": 12,
                "updated_at": "2024-05-01T10:00:00Z",
                "html_url": "https://github.com/octo/widgets/actions/runs/12"
            },
            "repository": {"full_name": "octo/widgets"},
            "sender": {"login": "octocat"}
        })
    }

    #[test]
    fn json_content_type_decodes_directly() {
        let body = serde_json::to_vec(&workflow_payload()).unwrap();
        let normalized = normalize(&body, Some("application/json")).unwrap();
        assert!(matches!(normalized, NormalizedPayload::Json(_)));
    }

    #[test]
    fn json_content_type_with_garbage_is_invalid_payload() {
        let err = normalize(b"not json", Some("application/json")).unwrap_err();
        assert!(matches!(err, IngestError::InvalidPayload { .. }));
    }

    #[test]
    fn form_envelope_extracts_payload_field() {
        let inner = serde_json::to_string(&workflow_payload()).unwrap();
        let body = serde_urlencoded::to_string([("payload", inner.as_str())]).unwrap();
        let normalized =
            normalize(body.as_bytes(), Some("application/x-www-form-urlencoded")).unwrap();
        match normalized {
            NormalizedPayload::Json(value) => {
                assert_eq!(value["repository"]["full_name"], "octo/widgets");
            }
            other => panic!("expected JSON payload, got {other:?}"),
        }
    }

    #[test]
    fn form_envelope_without_payload_field_is_missing_payload() {
        let err = normalize(
            b"something=else",
            Some("application/x-www-form-urlencoded"),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::MissingPayload));
    }

    #[test]
    fn unknown_content_type_falls_back_to_json_then_form() {
        let body = serde_json::to_vec(&workflow_payload()).unwrap();
        assert!(normalize(&body, None).is_ok());

        let inner = serde_json::to_string(&workflow_payload()).unwrap();
        let form = serde_urlencoded::to_string([("payload", inner.as_str())]).unwrap();
        assert!(normalize(form.as_bytes(), Some("text/plain")).is_ok());

        let err = normalize(b"\x00\xff garbage", None).unwrap_err();
        assert!(matches!(err, IngestError::UnparseablePayload));
    }

    #[test]
    fn empty_body_is_not_an_error() {
        assert_eq!(normalize(b"", None).unwrap(), NormalizedPayload::Empty);
        assert_eq!(
            normalize(b"", Some("application/json")).unwrap(),
            NormalizedPayload::Empty
        );
    }

    #[test]
    fn workflow_run_event_is_categorised() {
        let event = build_event("workflow_run", workflow_payload(), Utc::now());
        let run = event.workflow_run().expect("workflow run details");
        assert_eq!(run.name.as_str(), "Build documentation");
        assert_eq!(run.conclusion, Some(RunConclusion::Failure));
        assert_eq!(event.action.as_deref(), Some("completed"));
        assert_eq!(event.repository.as_ref().unwrap().as_str(), "octo/widgets");
        assert_eq!(event.sender.as_deref(), Some("octocat"));
    }

    #[test]
    fn malformed_workflow_run_degrades_to_other() {
        let payload = serde_json::json!({"workflow_run": {"status": "completed"}});
        let event = build_event("workflow_run", payload.clone(), Utc::now());
        assert_eq!(event.kind, EventKind::Other);
        assert_eq!(event.raw_payload, payload);
    }

    #[test]
    fn push_and_ping_events_are_categorised() {
        let push = build_event(
            "push",
            serde_json::json!({
                "ref": "refs/heads/main",
                "pusher": {"name": "octocat"},
                "repository": {"full_name": "octo/widgets"}
            }),
            Utc::now(),
        );
        assert!(matches!(push.kind, EventKind::Push(ref p) if p.git_ref == "refs/heads/main"));

        let ping = build_event(
            "ping",
            serde_json::json!({
                "hook_id": 42,
                "hook": {"config": {"url": "https://relay.example/webhook/github"}}
            }),
            Utc::now(),
        );
        assert!(matches!(ping.kind, EventKind::Ping(ref p) if p.hook_id == 42));
    }

    #[test]
    fn unrecognised_event_type_is_other() {
        let event = build_event("issues", serde_json::json!({"action": "opened"}), Utc::now());
        assert_eq!(event.kind, EventKind::Other);
        assert_eq!(event.event_type, "issues");
    }
}
