//! Notification dispatch: the [`NotificationSink`] port, fixed message
//! templates, and the outcome transition detector.
//!
//! The dispatcher owns *whether* and *what* to send; the sink owns *how*.
//! Sink failures are always recovered locally into a human-readable status
//! string — a failed notification must never fail the ingestion or query
//! path that triggered it. No retry: at most one delivery attempt per call.
//!
//! ## Transition detector
//!
//! Workflow outcomes reach the dispatcher both at ingestion time and from
//! projection scans, and an unchanged log can be queried repeatedly. The
//! [`TransitionDetector`] remembers every `(workflow, conclusion)` pair that
//! has already been notified, making the dispatcher an idempotent consumer of
//! a change feed: each transition is announced on first observation only.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::SinkError;
use crate::events::{EventKind, EventRecord, RunConclusion};
use crate::identifiers::{RepositoryId, WorkflowName};
use crate::projection::OutcomeObservation;

/// Port for an external message-delivery capability (chat or email).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one message. Implementations carry a seconds-scale timeout;
    /// an elapsed timeout is reported as [`SinkError::Timeout`].
    async fn send(&self, message: &str) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// Transition detector
// ---------------------------------------------------------------------------

/// Remembers which `(workflow, conclusion)` transitions have been notified.
///
/// In-memory only: a relay restart forgets past notifications and the next
/// observation of each transition is announced again.
#[derive(Default)]
pub struct TransitionDetector {
    seen: Mutex<HashSet<(WorkflowName, RunConclusion)>>,
}

impl TransitionDetector {
    /// Creates a detector with no remembered transitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the transition; returns `true` exactly once per pair.
    pub fn first_observation(&self, name: &WorkflowName, conclusion: RunConclusion) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.insert((name.clone(), conclusion))
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Decides whether an event or projection delta warrants a notification,
/// formats the message, and invokes the sink.
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    detector: TransitionDetector,
}

impl NotificationDispatcher {
    /// Creates a dispatcher delivering through `sink`.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            detector: TransitionDetector::new(),
        }
    }

    /// Announces a workflow outcome, at most once per `(workflow, conclusion)`
    /// transition. Returns a human-readable delivery status.
    pub async fn on_workflow_outcome(
        &self,
        name: &WorkflowName,
        conclusion: RunConclusion,
        repository: Option<&RepositoryId>,
    ) -> String {
        let message = match conclusion {
            RunConclusion::Failure => format!(
                "CI Failure Alert - A CI workflow has failed: Workflow: {}, Repository: {}, \
                 Status: Failed. Please check the logs and address any issues.",
                name,
                repository_label(repository),
            ),
            RunConclusion::Success => format!(
                "Deployment Successful - Workflow completed successfully: Workflow: {}, \
                 Repository: {}, Status: Success",
                name,
                repository_label(repository),
            ),
            other => {
                return format!("Conclusion '{other}' does not trigger notifications");
            }
        };

        if !self.detector.first_observation(name, conclusion) {
            tracing::debug!(workflow = %name, %conclusion, "transition already notified");
            return format!("Already notified for {name} ({conclusion})");
        }

        self.deliver(&message).await
    }

    /// Announces a push event. Returns a human-readable delivery status.
    pub async fn on_push(&self, repository: &str, pusher: &str, git_ref: &str) -> String {
        let message = format!("New push to {repository} by {pusher} on {git_ref}");
        self.deliver(&message).await
    }

    /// Announces a webhook registration ping.
    pub async fn on_ping(&self, repository: &str, hook_id: u64, hook_url: &str) -> String {
        let message =
            format!("Webhook registered for {repository}: hook {hook_id} delivering to {hook_url}");
        self.deliver(&message).await
    }

    /// Evaluates a freshly ingested event.
    ///
    /// Returns `None` when the event category carries no notification.
    pub async fn on_event(&self, event: &EventRecord) -> Option<String> {
        let repository = event
            .repository
            .as_ref()
            .map(RepositoryId::as_str)
            .unwrap_or("Unknown");

        match &event.kind {
            EventKind::Push(push) => Some(self.on_push(repository, &push.pusher, &push.git_ref).await),
            EventKind::Ping(ping) => {
                Some(self.on_ping(repository, ping.hook_id, &ping.hook_url).await)
            }
            EventKind::WorkflowRun(run) => match run.conclusion {
                Some(conclusion @ (RunConclusion::Success | RunConclusion::Failure)) => Some(
                    self.on_workflow_outcome(&run.name, conclusion, event.repository.as_ref())
                        .await,
                ),
                _ => None,
            },
            EventKind::CheckRun(_) | EventKind::Other => None,
        }
    }

    /// Announces the outcome observations produced by a projection scan.
    pub async fn dispatch_observations(&self, observations: &[OutcomeObservation]) {
        for observation in observations {
            let status = self
                .on_workflow_outcome(
                    &observation.name,
                    observation.conclusion,
                    observation.repository.as_ref(),
                )
                .await;
            tracing::debug!(workflow = %observation.name, status, "outcome observation handled");
        }
    }

    /// Sends a free-form message (the direct notification tool).
    pub async fn send_message(&self, message: &str) -> String {
        self.deliver(message).await
    }

    async fn deliver(&self, message: &str) -> String {
        match self.sink.send(message).await {
            Ok(()) => "Message sent successfully".to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "notification delivery failed");
                format!("Failed to send notification: {err}")
            }
        }
    }
}

fn repository_label(repository: Option<&RepositoryId>) -> &str {
    repository.map(RepositoryId::as_str).unwrap_or("Unknown")
}
