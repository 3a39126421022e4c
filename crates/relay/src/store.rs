//! The [`EventStore`] port: an append-only, capacity-capped event log.
//!
//! The store is the single source of truth for the relay; projections are
//! pure functions of its current contents. Implementations enforce the
//! capacity bound on append: when the log would exceed
//! [`EVENT_LOG_CAPACITY`](crate::events::EVENT_LOG_CAPACITY) entries, the
//! oldest entries are dropped (FIFO by insertion order), never the newest.
//!
//! ## Concurrency
//!
//! The relay is a single-process, single-writer system. Implementations
//! serialise in-process appends, but no cross-process protection exists: two
//! relay processes sharing one log file can lose updates. Known limitation.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::events::{EventRecord, EVENT_LOG_CAPACITY};

/// Port for the bounded event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends `event`, enforcing the capacity bound.
    ///
    /// The write is all-or-nothing from a reader's perspective: a failed
    /// append never leaves a truncated log visible. On failure the event is
    /// lost; there is no buffering or retry, so the error must reach the
    /// ingestion caller.
    async fn append(&self, event: EventRecord) -> Result<(), StoreError>;

    /// Returns the full log, oldest first.
    ///
    /// A store that has never been written returns `Ok(vec![])` — never an
    /// error. A persisted log that exists but cannot be parsed is
    /// [`StoreError::Integrity`].
    async fn load(&self) -> Result<Vec<EventRecord>, StoreError>;
}

/// Trims `events` in place to the newest `capacity` entries, preserving order.
pub fn enforce_capacity(events: &mut Vec<EventRecord>, capacity: usize) {
    if events.len() > capacity {
        let excess = events.len() - capacity;
        events.drain(..excess);
    }
}

// ---------------------------------------------------------------------------
// In-memory reference implementation
// ---------------------------------------------------------------------------

/// In-memory [`EventStore`] used by tests and as the behavioural reference
/// for the file-backed implementation.
pub struct MemoryEventStore {
    events: Mutex<Vec<EventRecord>>,
    capacity: usize,
}

impl MemoryEventStore {
    /// Creates an empty store with the standard capacity.
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }

    /// Creates an empty store with a custom capacity (tests only need small
    /// logs to exercise eviction).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            capacity,
        }
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: EventRecord) -> Result<(), StoreError> {
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
        enforce_capacity(&mut events, self.capacity);
        Ok(())
    }

    async fn load(&self) -> Result<Vec<EventRecord>, StoreError> {
        let events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(events.clone())
    }
}
