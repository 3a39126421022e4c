//! Latest-status-per-workflow queries over the raw event log.
//!
//! A projection is a read-only derived view: recomputed from scratch on every
//! query, never persisted. For the selected event subset, events are grouped
//! by workflow name and merged last-write-wins by the run's `updated_at`
//! string (ISO-8601, hence lexicographically comparable). Events are *not*
//! assumed to arrive in update-time order, so the merge compares timestamps
//! explicitly instead of trusting log order.
//!
//! Queries also report the outcome each merged group resolved to. Those
//! observations feed the notification dispatcher through the transition
//! detector (see [`crate::dispatch`]); the read path itself performs no
//! sends.

use std::collections::HashMap;

use crate::events::{
    is_documentation_workflow, EventRecord, RunConclusion, WorkflowRunDetails, WorkflowSummary,
};
use crate::identifiers::{RepositoryId, WorkflowName};

/// Which subset of workflow-run events a query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Every event carrying workflow-run details.
    All,
    /// Only the known documentation workflows.
    DocsOnly,
    /// Only runs whose conclusion is `failure`.
    FailedOnly,
}

/// Result of a workflow-status query.
///
/// `NoEventsYet` signals a log that has never been written; it is distinct
/// from `Summaries(vec![])`, which means events exist but none matched the
/// filter.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    /// The event log is empty or has never been initialised.
    NoEventsYet,
    /// One summary per distinct workflow name, in first-seen scan order.
    Summaries(Vec<WorkflowSummary>),
}

/// A workflow group that resolved to a notifiable outcome during a query.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeObservation {
    pub name: WorkflowName,
    pub conclusion: RunConclusion,
    pub repository: Option<RepositoryId>,
}

/// A status report plus the outcome observations the scan produced.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub report: StatusReport,
    /// Populated for [`QueryMode::All`] and [`QueryMode::FailedOnly`] when a
    /// merged group's conclusion is success or failure. Always empty for
    /// [`QueryMode::DocsOnly`].
    pub observations: Vec<OutcomeObservation>,
}

/// Runs a workflow-status query over the full event sequence.
///
/// `name_filter` restricts the scan to a single workflow name (used by the
/// "workflow status" tool); a filter that matches nothing yields an empty
/// summary list, not the `NoEventsYet` sentinel — unless the log itself is
/// empty.
pub fn query(events: &[EventRecord], mode: QueryMode, name_filter: Option<&str>) -> QueryOutput {
    if events.is_empty() {
        return QueryOutput {
            report: StatusReport::NoEventsYet,
            observations: Vec::new(),
        };
    }

    // Winners per workflow name, in first-seen order of the scan.
    let mut order: Vec<WorkflowName> = Vec::new();
    let mut winners: HashMap<WorkflowName, (&WorkflowRunDetails, Option<&RepositoryId>)> =
        HashMap::new();

    for event in events {
        let Some(run) = event.workflow_run() else {
            continue;
        };
        if !matches_mode(run, mode) {
            continue;
        }
        if let Some(filter) = name_filter {
            if run.name.as_str() != filter {
                continue;
            }
        }

        // Last-write-wins by update time, not by log order.
        let wins = match winners.get(&run.name) {
            Some((current, _)) => run.updated_at > current.updated_at,
            None => {
                order.push(run.name.clone());
                true
            }
        };
        if wins {
            winners.insert(run.name.clone(), (run, event.repository.as_ref()));
        }
    }

    let mut summaries = Vec::with_capacity(order.len());
    let mut observations = Vec::new();
    for name in &order {
        let (run, repository) = winners[name];
        summaries.push(WorkflowSummary::from_run(run));

        if mode != QueryMode::DocsOnly {
            if let Some(conclusion @ (RunConclusion::Success | RunConclusion::Failure)) =
                run.conclusion
            {
                observations.push(OutcomeObservation {
                    name: name.clone(),
                    conclusion,
                    repository: repository.cloned(),
                });
            }
        }
    }

    QueryOutput {
        report: StatusReport::Summaries(summaries),
        observations,
    }
}

fn matches_mode(run: &WorkflowRunDetails, mode: QueryMode) -> bool {
    match mode {
        QueryMode::All => true,
        QueryMode::DocsOnly => is_documentation_workflow(&run.name),
        QueryMode::FailedOnly => run.conclusion == Some(RunConclusion::Failure),
    }
}

/// Returns the most recent `limit` events, oldest first (most recent last).
pub fn recent_events(events: &[EventRecord], limit: usize) -> &[EventRecord] {
    let start = events.len().saturating_sub(limit);
    &events[start..]
}
