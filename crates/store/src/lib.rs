//! AutoPRX file-backed event log.
//!
//! Implements the [`relay::EventStore`] port with one human-readable JSON
//! file holding the ordered event sequence, capped at
//! [`relay::EVENT_LOG_CAPACITY`] entries.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File layout, atomic-write discipline, and I/O error
//! mapping all live here. The [`relay`] crate sees only
//! [`relay::EventStore`].
//!
//! ## Atomicity
//!
//! Appends are read-modify-write: load, push, truncate, persist. The persist
//! step writes to a temporary file in the log's directory, syncs it, and
//! renames it over the log, so a reader never observes a truncated or
//! half-written file. In-process appends are serialised behind a mutex;
//! there is no cross-process locking (single-writer system, known
//! limitation).

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use relay::store::enforce_capacity;
use relay::{EventRecord, EventStore, StoreError, EVENT_LOG_CAPACITY};

/// File-backed [`EventStore`]: an append-only, capped JSON log.
pub struct FileEventStore {
    path: PathBuf,
    capacity: usize,
    /// Serialises the read-modify-write append cycle within this process.
    write_lock: Mutex<()>,
}

impl FileEventStore {
    /// Creates a store persisting to `path` with the standard capacity.
    ///
    /// The file is created lazily on the first append; a store whose file
    /// does not exist yet loads as empty.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, EVENT_LOG_CAPACITY)
    }

    /// Creates a store with a custom capacity (tests exercise eviction with
    /// small logs).
    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            write_lock: Mutex::new(()),
        }
    }

    /// The path of the persisted log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_log(&self) -> Result<Vec<EventRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Read { source: err }),
        };

        serde_json::from_slice(&bytes).map_err(|err| StoreError::Integrity {
            detail: err.to_string(),
        })
    }

    async fn persist(&self, events: &[EventRecord]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(events)
            .map_err(|err| StoreError::Write {
                source: io::Error::other(err),
            })?;

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("events");
        let tmp = self
            .path
            .with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));

        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &self.path).await
        };

        if let Err(err) = write.await {
            // Leave no stray temporary behind a failed write.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Write { source: err });
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn append(&self, event: EventRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut events = self.load_log().await?;
        events.push(event);
        enforce_capacity(&mut events, self.capacity);
        self.persist(&events).await?;

        tracing::debug!(
            path = %self.path.display(),
            len = events.len(),
            "event appended to log"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Vec<EventRecord>, StoreError> {
        self.load_log().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use relay::events::EventKind;

    fn sample_event(n: usize) -> EventRecord {
        EventRecord {
            timestamp: Utc::now(),
            event_type: "push".to_string(),
            action: None,
            repository: None,
            sender: None,
            kind: EventKind::Other,
            raw_payload: json!({"sequence": n}),
        }
    }

    #[tokio::test]
    async fn appends_load_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEventStore::new(dir.path().join("events.json"));

        for n in 0..5 {
            store.append(sample_event(n)).await.unwrap();
        }

        let events = store.load().await.unwrap();
        assert_eq!(events.len(), 5);
        for (n, event) in events.iter().enumerate() {
            assert_eq!(event.raw_payload["sequence"], n);
        }
    }

    #[tokio::test]
    async fn capacity_overflow_drops_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEventStore::with_capacity(dir.path().join("events.json"), 100);

        for n in 0..120 {
            store.append(sample_event(n)).await.unwrap();
        }

        let events = store.load().await.unwrap();
        assert_eq!(events.len(), 100);
        assert_eq!(events[0].raw_payload["sequence"], 20);
        assert_eq!(events[99].raw_payload["sequence"], 119);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEventStore::new(dir.path().join("events.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_log_is_an_integrity_error_not_an_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        tokio::fs::write(&path, b"{ definitely not a json array")
            .await
            .unwrap();

        let store = FileEventStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));

        // Appending must also surface the integrity failure rather than
        // silently replacing the damaged log.
        let err = store.append(sample_event(0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));
    }

    #[tokio::test]
    async fn no_temporary_files_survive_an_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEventStore::new(dir.path().join("events.json"));
        store.append(sample_event(0)).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["events.json"]);
    }

    #[tokio::test]
    async fn failed_persist_leaves_the_existing_log_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let store = FileEventStore::new(&path);
        store.append(sample_event(1)).await.unwrap();

        // Occupy the temporary-file slot with a directory so the next
        // persist cannot create it.
        let tmp = dir
            .path()
            .join(format!(".events.json.tmp.{}", std::process::id()));
        tokio::fs::create_dir(&tmp).await.unwrap();

        let err = store.append(sample_event(2)).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));

        // The previously persisted log is still loadable, unchanged.
        let events = store.load().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].raw_payload["sequence"], 1);
    }

    #[tokio::test]
    async fn persisted_log_is_human_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let store = FileEventStore::new(&path);
        store.append(sample_event(0)).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains('\n'));
        assert!(text.contains("\"event_type\": \"push\""));
    }

    #[tokio::test]
    async fn a_new_store_instance_sees_previous_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");

        let store = FileEventStore::new(&path);
        store.append(sample_event(7)).await.unwrap();
        drop(store);

        let reopened = FileEventStore::new(&path);
        let events = reopened.load().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].raw_payload["sequence"], 7);
    }
}
