//! The canonical event record and its derived workflow summaries.
//!
//! One [`EventRecord`] is created per received webhook delivery and appended
//! to the bounded log. Records are never mutated after creation; they remain
//! reachable only while inside the log and become unreachable once evicted.
//!
//! The event category is a closed tagged union ([`EventKind`]) with
//! category-specific payloads, so consumers match on the category instead of
//! probing optional fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{RepositoryId, WorkflowName};

/// Maximum number of event records retained in the log.
///
/// Appending beyond this capacity drops the oldest entries (FIFO by insertion
/// order), never the newest.
pub const EVENT_LOG_CAPACITY: usize = 100;

/// Description shown for workflows not present in the known-workflow table.
pub const UNKNOWN_WORKFLOW_DESCRIPTION: &str = "Unknown workflow";

/// The documentation workflows tracked by the docs-only query mode, with
/// their human-readable descriptions.
const KNOWN_WORKFLOWS: [(&str, &str); 3] = [
    ("Build documentation", "Main branch documentation build"),
    ("Build PR Documentation", "Pull request documentation build"),
    (
        "Upload PR Documentation",
        "PR documentation upload to Hugging Face",
    ),
];

/// Returns the description for a known workflow, or `None` for any other name.
pub fn known_workflow_description(name: &WorkflowName) -> Option<&'static str> {
    KNOWN_WORKFLOWS
        .iter()
        .find(|(n, _)| *n == name.as_str())
        .map(|(_, description)| *description)
}

/// Returns `true` if `name` is one of the tracked documentation workflows.
pub fn is_documentation_workflow(name: &WorkflowName) -> bool {
    KNOWN_WORKFLOWS.iter().any(|(n, _)| *n == name.as_str())
}

// ---------------------------------------------------------------------------
// Run status / conclusion
// ---------------------------------------------------------------------------

/// Lifecycle state of a workflow run as reported by GitHub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is waiting for a runner.
    Queued,
    /// The run is currently executing.
    InProgress,
    /// The run has finished; see the conclusion for the outcome.
    Completed,
    /// Any status value this relay does not recognise.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Outcome of a completed workflow run.
///
/// Only [`Success`](RunConclusion::Success) and
/// [`Failure`](RunConclusion::Failure) trigger notifications; the remaining
/// variants are retained for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Neutral,
    Stale,
    /// Any conclusion value this relay does not recognise.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunConclusion::Success => "success",
            RunConclusion::Failure => "failure",
            RunConclusion::Cancelled => "cancelled",
            RunConclusion::Skipped => "skipped",
            RunConclusion::TimedOut => "timed_out",
            RunConclusion::ActionRequired => "action_required",
            RunConclusion::Neutral => "neutral",
            RunConclusion::Stale => "stale",
            RunConclusion::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Category-specific payloads
// ---------------------------------------------------------------------------

/// Details of a `workflow_run` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunDetails {
    /// The configured workflow name; the grouping key for projections.
    pub name: WorkflowName,
    /// Lifecycle state of the run.
    #[serde(default)]
    pub status: RunStatus,
    /// Outcome of the run; `None` while the run is still in progress.
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    /// Monotonically increasing run number within the workflow.
    #[serde(default)]
    pub run_number: u64,
    /// Last-update time as reported by GitHub, ISO-8601 UTC.
    ///
    /// Kept as the raw string: ISO-8601 timestamps sort lexicographically,
    /// and the projection merge compares these strings directly rather than
    /// trusting log order.
    pub updated_at: String,
    /// Link to the run on github.com.
    #[serde(default)]
    pub html_url: String,
    /// Branch the run executed on, when reported.
    #[serde(default)]
    pub head_branch: Option<String>,
}

/// Details of a `check_run` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRunDetails {
    pub name: String,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
}

/// Details of a `push` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushDetails {
    /// Login of the account that pushed.
    pub pusher: String,
    /// The full git ref that was pushed to (e.g. `"refs/heads/main"`).
    #[serde(rename = "ref")]
    pub git_ref: String,
}

/// Details of a `ping` event (sent by GitHub when a hook is registered).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingDetails {
    /// GitHub-assigned identifier of the hook.
    #[serde(default)]
    pub hook_id: u64,
    /// Delivery URL the hook is configured with.
    #[serde(default)]
    pub hook_url: String,
}

/// Closed set of event categories the relay understands.
///
/// Categories the relay has no structured model for are retained as
/// [`EventKind::Other`]; their payload is still available via
/// [`EventRecord::raw_payload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EventKind {
    Push(PushDetails),
    WorkflowRun(WorkflowRunDetails),
    CheckRun(CheckRunDetails),
    Ping(PingDetails),
    Other,
}

// ---------------------------------------------------------------------------
// Event record
// ---------------------------------------------------------------------------

/// One entry in the bounded event log: a single received webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Receipt time (not the event's own update time), ISO-8601 UTC.
    pub timestamp: DateTime<Utc>,
    /// The webhook category header value (`push`, `workflow_run`, `ping`, …).
    pub event_type: String,
    /// Optional sub-action field from the payload (e.g. `"completed"`).
    pub action: Option<String>,
    /// Repository the event originated from, when the payload names one.
    pub repository: Option<RepositoryId>,
    /// Login of the account that triggered the event, when present.
    pub sender: Option<String>,
    /// Structured category-specific details.
    pub kind: EventKind,
    /// The original decoded payload, retained for detailed inspection.
    pub raw_payload: Value,
}

impl EventRecord {
    /// Returns the workflow-run details if this is a CI run event.
    pub fn workflow_run(&self) -> Option<&WorkflowRunDetails> {
        match &self.kind {
            EventKind::WorkflowRun(run) => Some(run),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow summary (derived, never persisted)
// ---------------------------------------------------------------------------

/// The latest known state of one named workflow.
///
/// A projection output: recomputed from scratch on every query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub name: WorkflowName,
    pub status: RunStatus,
    pub conclusion: Option<RunConclusion>,
    pub run_number: u64,
    pub updated_at: String,
    pub html_url: String,
    /// Description from the known-workflow table, or
    /// [`UNKNOWN_WORKFLOW_DESCRIPTION`].
    pub description: String,
}

impl WorkflowSummary {
    /// Builds a summary for `run`, attaching the known-workflow description.
    pub fn from_run(run: &WorkflowRunDetails) -> Self {
        let description = known_workflow_description(&run.name)
            .unwrap_or(UNKNOWN_WORKFLOW_DESCRIPTION)
            .to_string();
        Self {
            name: run.name.clone(),
            status: run.status,
            conclusion: run.conclusion,
            run_number: run.run_number,
            updated_at: run.updated_at.clone(),
            html_url: run.html_url.clone(),
            description,
        }
    }
}
