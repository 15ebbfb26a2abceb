//! Retention store: the file-backed log of observations.
//!
//! All reads, appends and prunes go through one async mutex, so the check
//! and cleanup timers can interleave safely. The log is written to disk as a
//! single pretty-printed JSON document on every [`RetentionStore::flush`].

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use shared::{Observation, Roster};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::utils::get_timestamp_nanos;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("status file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize status log: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StatusLog {
    #[serde(default)]
    entries: Vec<Observation>,
}

#[derive(Debug)]
pub struct RetentionStore {
    path: PathBuf,
    log: Mutex<StatusLog>,
}

impl RetentionStore {
    /// Opens the log at `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty log; the error
    /// is logged and the next flush overwrites the file.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let log = match tokio::fs::read(&path).await {
            Ok(data) => match serde_json::from_slice::<StatusLog>(&data) {
                Ok(log) => {
                    info!(
                        "Loaded {} status entries from {}",
                        log.entries.len(),
                        path.display()
                    );
                    log
                }
                Err(e) => {
                    error!("Error parsing status file {}: {}", path.display(), e);
                    StatusLog::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No status file at {}, starting empty", path.display());
                StatusLog::default()
            }
            Err(e) => {
                error!("Error reading status file {}: {}", path.display(), e);
                StatusLog::default()
            }
        };

        Self {
            path,
            log: Mutex::new(log),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Most recent observation by timestamp; later appends win ties.
    pub async fn latest(&self) -> Option<Observation> {
        let log = self.log.lock().await;
        log.entries
            .iter()
            .max_by_key(|entry| entry.timestamp_ms)
            .cloned()
    }

    /// Appends one observation with a fresh id and returns it.
    pub async fn append(&self, online: bool, timestamp_ms: i64, players: Roster) -> Observation {
        let mut log = self.log.lock().await;

        let last_id = log.entries.iter().map(|entry| entry.id).max();
        let id = match last_id {
            Some(last) => get_timestamp_nanos().max(last.saturating_add(1)),
            None => get_timestamp_nanos(),
        };

        let observation = Observation {
            id,
            online,
            timestamp_ms,
            players,
        };
        log.entries.push(observation.clone());
        observation
    }

    /// Removes every observation older than `cutoff_ms`; returns how many.
    pub async fn prune_older_than(&self, cutoff_ms: i64) -> usize {
        let mut log = self.log.lock().await;
        let before = log.entries.len();
        log.entries.retain(|entry| entry.timestamp_ms >= cutoff_ms);
        before - log.entries.len()
    }

    pub async fn len(&self) -> usize {
        self.log.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Writes the whole log to disk.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let log = self.log.lock().await;
        let data = serde_json::to_vec_pretty(&*log)?;

        // Written beside the log and renamed over it
        let tmp = self.path.with_extension("json.tmp");
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, &data).await.map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }

        debug!(
            "Flushed {} status entries to {}",
            log.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn roster(names: &[&str]) -> Roster {
        Roster::from_names(names.iter().copied())
    }

    async fn temp_store() -> (TempDir, RetentionStore) {
        let dir = TempDir::new().unwrap();
        let store = RetentionStore::open(dir.path().join("status.json")).await;
        (dir, store)
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let (_dir, store) = temp_store().await;

        assert!(store.is_empty().await);
        assert!(store.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        std::fs::write(&path, b"{ this is not json").unwrap();

        let store = RetentionStore::open(&path).await;

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let (_dir, store) = temp_store().await;

        let first = store.append(true, 1_000, roster(&["Alice"])).await;
        let second = store.append(false, 2_000, Roster::new()).await;
        let third = store.append(false, 3_000, Roster::new()).await;

        assert!(second.id > first.id);
        assert!(third.id > second.id);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_latest_by_timestamp() {
        let (_dir, store) = temp_store().await;

        store.append(true, 5_000, roster(&["Newest"])).await;
        store.append(true, 1_000, roster(&["Older"])).await;

        let latest = store.latest().await.unwrap();
        assert_eq!(latest.timestamp_ms, 5_000);
        assert_eq!(latest.players, roster(&["Newest"]));
    }

    #[tokio::test]
    async fn test_latest_tie_prefers_last_appended() {
        let (_dir, store) = temp_store().await;

        store.append(true, 5_000, roster(&["First"])).await;
        store.append(true, 5_000, roster(&["Second"])).await;

        let latest = store.latest().await.unwrap();
        assert_eq!(latest.players, roster(&["Second"]));
    }

    #[tokio::test]
    async fn test_prune_older_than() {
        let (_dir, store) = temp_store().await;

        store.append(false, 100, Roster::new()).await;
        store.append(false, 200, Roster::new()).await;
        store.append(true, 300, roster(&["Alice"])).await;

        assert_eq!(store.prune_older_than(200).await, 1);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.prune_older_than(1_000).await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_flush_and_reopen() {
        let (dir, store) = temp_store().await;

        let written = store.append(true, 42, roster(&["Alice", "Bob"])).await;
        store.flush().await.unwrap();

        let reopened = RetentionStore::open(dir.path().join("status.json")).await;
        assert_eq!(reopened.latest().await, Some(written));
        assert!(!dir.path().join("status.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_flush_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = RetentionStore::open(dir.path().join("missing").join("status.json")).await;
        store.append(true, 1, Roster::new()).await;

        let err = store.flush().await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn test_loads_existing_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        std::fs::write(
            &path,
            r#"{
  "entries": [
    {"id": 1, "online": true, "lastChecked": 1000, "players": ["Alice"]},
    {"id": 2, "online": false, "lastChecked": 2000, "players": null}
  ]
}"#,
        )
        .unwrap();

        let store = RetentionStore::open(&path).await;

        assert_eq!(store.len().await, 2);
        let latest = store.latest().await.unwrap();
        assert_eq!(latest.id, 2);
        assert!(latest.players.is_empty());

        // New ids keep increasing past whatever the file already holds
        let next = store.append(true, 3000, Roster::new()).await;
        assert!(next.id > 2);
    }

    #[tokio::test]
    async fn test_append_after_max_id_does_not_overflow() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"entries":[{{"id":{},"online":true,"lastChecked":1000,"players":[]}}]}}"#,
                i64::MAX
            ),
        )
        .unwrap();

        let store = RetentionStore::open(&path).await;
        let next = store.append(false, 2000, Roster::new()).await;

        assert_eq!(next.id, i64::MAX);
        assert_eq!(store.len().await, 2);
    }
}
