//! Ingestion, store, and sink error taxonomies.
//!
//! Each boundary of the relay has its own error type with a fixed propagation
//! rule:
//!
//! - [`IngestError`] — malformed inbound payloads; surfaced to the webhook
//!   caller as a structured response, never as a panic.
//! - [`StoreError`] — persisted-log failures; write failures must reach the
//!   ingestion caller (the event is otherwise silently lost), integrity
//!   failures are fatal for the current call and never silently resume as an
//!   empty log.
//! - [`SinkError`] — notification delivery failures; always recovered locally
//!   into a human-readable status string, never escalated to ingestion or
//!   query results.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Ingestion-time errors
// ---------------------------------------------------------------------------

/// A webhook body that could not be normalised into a canonical payload.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The declared content type indicated JSON but the body did not decode.
    #[error("invalid JSON payload: {detail}")]
    InvalidPayload {
        /// Decoder error text.
        detail: String,
    },

    /// The body was a form envelope without the required `payload` field.
    #[error("form envelope is missing the 'payload' field")]
    MissingPayload,

    /// No declared content type, and the body decoded neither as JSON nor as
    /// a form envelope.
    #[error("payload is neither JSON nor a form envelope")]
    UnparseablePayload,
}

impl IngestError {
    /// Stable machine-readable tag for structured error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::InvalidPayload { .. } => "invalid_payload",
            IngestError::MissingPayload => "missing_payload",
            IngestError::UnparseablePayload => "unparseable_payload",
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted-log errors
// ---------------------------------------------------------------------------

/// A failure in the persisted event log.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The log exists but cannot be parsed as structured data.
    ///
    /// This is a data-integrity failure for the current call; callers must
    /// not treat it as "no events".
    #[error("event log is present but not valid structured data: {detail}")]
    Integrity {
        /// Parser error text.
        detail: String,
    },

    /// The log could not be read.
    #[error("failed to read event log: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// The appended log could not be persisted. The event is lost; there is
    /// no buffering or retry.
    #[error("failed to persist event log: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Notification sink errors
// ---------------------------------------------------------------------------

/// A failure reported by a notification sink.
///
/// Sinks have a seconds-scale timeout; an elapsed timeout is a failure, not a
/// hang. No variant is retried.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The delivery attempt exceeded the sink's timeout.
    #[error("notification request timed out")]
    Timeout,

    /// The sink endpoint could not be reached.
    #[error("could not connect to notification endpoint: {detail}")]
    Connection {
        /// Transport error text.
        detail: String,
    },

    /// The sink rejected the relay's credentials or webhook URL.
    #[error("notification endpoint rejected authentication: {detail}")]
    Auth {
        /// Endpoint error text.
        detail: String,
    },

    /// The sink answered with a non-success status code.
    #[error("notification endpoint answered with status {code}")]
    Status {
        /// HTTP status code of the response.
        code: u16,
    },

    /// The sink is not configured (e.g. no webhook URL was provided).
    #[error("notification sink is not configured: {detail}")]
    NotConfigured {
        /// Which piece of configuration is missing.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_error_kinds_are_stable() {
        assert_eq!(
            IngestError::InvalidPayload {
                detail: "x".to_string()
            }
            .kind(),
            "invalid_payload"
        );
        assert_eq!(IngestError::MissingPayload.kind(), "missing_payload");
        assert_eq!(
            IngestError::UnparseablePayload.kind(),
            "unparseable_payload"
        );
    }
}
