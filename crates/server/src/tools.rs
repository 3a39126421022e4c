//! The direct tool-calling surface.
//!
//! Each tool mirrors one read or notification capability of the relay and is
//! reachable both from the `/tools` catalog and via `POST /call/{tool}` with
//! a JSON `arguments` object. Query tools are pure reads over the event log;
//! the workflow-status and failed-workflow tools additionally feed any
//! freshly observed outcomes to the dispatcher (which deduplicates through
//! its transition detector, so repeated polling does not re-alert).

use serde_json::{json, Value};
use thiserror::Error;

use relay::projection::{self, QueryMode, StatusReport};
use relay::EventStore;

use crate::pr;
use crate::AppState;

/// Default number of events returned by the recent-events tool.
const DEFAULT_RECENT_LIMIT: u64 = 10;

/// A tool invocation that could not produce a result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{0}' not found")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Store(#[from] relay::StoreError),
}

/// The tool catalog served by `GET /tools`.
pub fn catalog() -> Value {
    json!([
        {
            "name": "get_recent_actions_events",
            "description": "Get recent GitHub Actions events received via webhook",
            "parameters": ["limit"],
        },
        {
            "name": "get_workflow_status",
            "description": "Get current status of GitHub Actions workflows",
            "parameters": ["workflow_name"],
        },
        {
            "name": "get_documentation_workflow_status",
            "description": "Get status of documentation-related workflows",
            "parameters": [],
        },
        {
            "name": "get_failed_workflows",
            "description": "Get only failed workflows for troubleshooting",
            "parameters": [],
        },
        {
            "name": "analyze_file_changes",
            "description": "Analyze git file changes and generate summaries",
            "parameters": ["base_branch", "include_diff", "max_diff_lines"],
        },
        {
            "name": "get_pr_templates",
            "description": "Get available PR templates for different change types",
            "parameters": [],
        },
        {
            "name": "suggest_template",
            "description": "Suggest appropriate PR template based on changes",
            "parameters": ["changes_summary", "change_type"],
        },
        {
            "name": "send_slack_notification",
            "description": "Send a notification through the configured sink",
            "parameters": ["message"],
        },
    ])
}

/// Invokes `name` with `args`.
pub async fn call(state: &AppState, name: &str, args: Value) -> Result<Value, ToolError> {
    match name {
        "get_recent_actions_events" => {
            let limit = args
                .get("limit")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_RECENT_LIMIT) as usize;
            let events = state.store.load().await?;
            Ok(json!(projection::recent_events(&events, limit)))
        }
        "get_workflow_status" => {
            let name_filter = args
                .get("workflow_name")
                .and_then(Value::as_str)
                .map(str::to_string);
            workflow_query(state, QueryMode::All, name_filter.as_deref()).await
        }
        "get_documentation_workflow_status" => {
            workflow_query(state, QueryMode::DocsOnly, None).await
        }
        "get_failed_workflows" => workflow_query(state, QueryMode::FailedOnly, None).await,
        "analyze_file_changes" => {
            let base_branch = args
                .get("base_branch")
                .and_then(Value::as_str)
                .unwrap_or("main");
            let include_diff = args
                .get("include_diff")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            let max_diff_lines = args
                .get("max_diff_lines")
                .and_then(Value::as_u64)
                .unwrap_or(500) as usize;
            let working_directory = args.get("working_directory").and_then(Value::as_str);
            Ok(pr::analyze_file_changes(base_branch, include_diff, max_diff_lines, working_directory).await)
        }
        "get_pr_templates" => Ok(pr::templates()),
        "suggest_template" => {
            let changes_summary = args
                .get("changes_summary")
                .and_then(Value::as_str)
                .unwrap_or("");
            let change_type = args
                .get("change_type")
                .and_then(Value::as_str)
                .unwrap_or("feature");
            Ok(pr::suggest_template(changes_summary, change_type))
        }
        "send_slack_notification" => {
            let message = args
                .get("message")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArguments("'message' is required".to_string()))?;
            let status = state.dispatcher.send_message(message).await;
            Ok(json!(status))
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// Runs a projection query and renders its report, forwarding outcome
/// observations to the dispatcher.
async fn workflow_query(
    state: &AppState,
    mode: QueryMode,
    name_filter: Option<&str>,
) -> Result<Value, ToolError> {
    let events = state.store.load().await?;
    let output = projection::query(&events, mode, name_filter);
    state.dispatcher.dispatch_observations(&output.observations).await;
    Ok(render_report(output.report))
}

/// Renders a status report the way consumers expect: the "never initialised"
/// sentinel is a message object, a match list is a plain array.
fn render_report(report: StatusReport) -> Value {
    match report {
        StatusReport::NoEventsYet => json!({"message": "No GitHub Actions events received yet"}),
        StatusReport::Summaries(summaries) => json!(summaries),
    }
}
