//! AutoPRX notification sink infrastructure.
//!
//! Implements the [`relay::NotificationSink`] port with two backends:
//!
//! - [`SlackSink`] — posts messages to a Slack incoming webhook over HTTPS.
//!   Carries a seconds-scale request timeout; an elapsed timeout is reported
//!   as a failure, never a hang.
//! - [`LogSink`] — writes messages to the process log. Used in development
//!   and whenever no webhook URL is configured, so the relay keeps running
//!   with notifications visibly degraded instead of silently dropped.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, payload formatting, and transport
//! error mapping all live here. The [`relay`] crate sees only
//! [`relay::NotificationSink`] and [`relay::SinkError`].

use std::time::Duration;

use async_trait::async_trait;

use relay::{NotificationSink, SinkError};

/// Environment variable holding the Slack incoming-webhook URL.
pub const SLACK_WEBHOOK_URL_VAR: &str = "SLACK_WEBHOOK_URL";

/// Default delivery timeout. A sink call that exceeds this is treated as a
/// failure, not a hang.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

/// Delivers messages to a Slack incoming webhook.
pub struct SlackSink {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackSink {
    /// Creates a sink posting to `webhook_url` with the default timeout.
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, SinkError> {
        Self::with_timeout(webhook_url, DEFAULT_TIMEOUT)
    }

    /// Creates a sink with a custom delivery timeout.
    pub fn with_timeout(
        webhook_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SinkError::Connection {
                detail: err.to_string(),
            })?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }

    /// Creates a sink from the `SLACK_WEBHOOK_URL` environment variable.
    pub fn from_env() -> Result<Self, SinkError> {
        let url = std::env::var(SLACK_WEBHOOK_URL_VAR).map_err(|_| SinkError::NotConfigured {
            detail: format!("{SLACK_WEBHOOK_URL_VAR} environment variable not set"),
        })?;
        Self::new(url)
    }
}

#[async_trait]
impl NotificationSink for SlackSink {
    async fn send(&self, message: &str) -> Result<(), SinkError> {
        let payload = serde_json::json!({
            "text": message,
            "mrkdwn": true,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SinkError::Timeout
                } else {
                    SinkError::Connection {
                        detail: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SinkError::Auth {
                detail: format!("webhook rejected with status {status}"),
            });
        }
        if !status.is_success() {
            return Err(SinkError::Status {
                code: status.as_u16(),
            });
        }

        tracing::debug!(len = message.len(), "slack notification delivered");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log fallback
// ---------------------------------------------------------------------------

/// Sink that writes every message to the process log and always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, message: &str) -> Result<(), SinkError> {
        tracing::info!(message, "notification (log sink)");
        Ok(())
    }
}
