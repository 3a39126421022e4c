//! Core relay domain for AutoPRX.
//!
//! This crate contains every domain concept, shared value type, port trait,
//! and cross-cutting error type used throughout the relay. Infrastructure
//! crates implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`WorkflowName`, `RepositoryId`, `RelayRunId`) |
//! | [`events`] | The canonical event record, event categories, and workflow summaries |
//! | [`errors`] | Ingestion, store, and sink error taxonomies |
//! | [`gateway`] | Payload normalisation: raw webhook body → canonical event record |
//! | [`store`] | The [`EventStore`] port and the in-memory reference implementation |
//! | [`projection`] | Latest-status-per-workflow queries over the event log |
//! | [`dispatch`] | The [`NotificationSink`] port, message templates, and the transition detector |

pub mod dispatch;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod identifiers;
pub mod projection;
pub mod store;

// Re-export the most commonly used types at the crate root for ergonomic
// usage by downstream crates.
pub use dispatch::{NotificationDispatcher, NotificationSink, TransitionDetector};
pub use errors::{IngestError, SinkError, StoreError};
pub use events::{
    EventKind, EventRecord, RunConclusion, RunStatus, WorkflowRunDetails, WorkflowSummary,
    EVENT_LOG_CAPACITY,
};
pub use gateway::NormalizedPayload;
pub use identifiers::{RelayRunId, RepositoryId, WorkflowName};
pub use projection::{OutcomeObservation, QueryMode, QueryOutput, StatusReport};
pub use store::{EventStore, MemoryEventStore};
