//! # File-Backed Offset Strategy
//!
//! Offsets are kept in memory and written through to a JSON document on every
//! accepted update, so a restarted consumer resumes from the last persisted
//! position. Writes go to a sibling temporary file that is renamed over the
//! target; a crash mid-write leaves the previous document intact.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::memory::advance_entry;
use super::{Advance, ResumeStrategy, UpdatableResumeStrategy};
use crate::error::{ResumeError, ResumeResult};
use crate::offset::{Addressable, Offset, Resumable};

const NAME: &str = "file";

#[derive(Debug)]
pub struct FileOffsetStrategy {
    path: PathBuf,
    offsets: DashMap<Addressable, Offset>,
    started: AtomicBool,
    // Serializes snapshot writes so renames land in update order
    write_lock: Mutex<()>,
    // Held across load so a concurrent start waits for the loaded offsets
    start_lock: Mutex<()>,
}

impl FileOffsetStrategy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offsets: DashMap::new(),
            started: AtomicBool::new(false),
            write_lock: Mutex::new(()),
            start_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn load(&self) -> ResumeResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !tokio::fs::try_exists(parent).await.unwrap_or(false) {
                return Err(ResumeError::store_unavailable(
                    NAME,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No offset file yet; starting empty");
                return Ok(());
            }
            Err(e) => {
                return Err(ResumeError::store_unavailable(
                    NAME,
                    format!("failed to read {}: {e}", self.path.display()),
                ))
            }
        };

        let stored: BTreeMap<Addressable, Offset> = serde_json::from_str(&contents)
            .map_err(|e| {
                ResumeError::store_unavailable(
                    NAME,
                    format!("malformed offset file {}: {e}", self.path.display()),
                )
            })?;

        // Merge rather than overwrite: offsets still held from an earlier run may be newer
        for (addressable, offset) in stored {
            advance_entry(self.offsets.entry(addressable), &offset);
        }
        Ok(())
    }

    async fn write_snapshot(&self) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;

        let snapshot: BTreeMap<Addressable, Offset> = self
            .offsets
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(std::io::Error::other)?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await
    }
}

#[async_trait]
impl ResumeStrategy for FileOffsetStrategy {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self) -> ResumeResult<()> {
        let _guard = self.start_lock.lock().await;
        if self.is_started() {
            return Ok(());
        }
        self.load().await?;
        self.started.store(true, Ordering::Release);
        info!(
            strategy = NAME,
            path = %self.path.display(),
            tracked = self.offsets.len(),
            "Resume strategy started"
        );
        Ok(())
    }

    async fn stop(&self) -> ResumeResult<()> {
        if !self.started.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.write_snapshot().await.map_err(|e| {
            ResumeError::store_unavailable(
                NAME,
                format!("failed to flush {}: {e}", self.path.display()),
            )
        })?;
        info!(strategy = NAME, path = %self.path.display(), "Resume strategy stopped");
        Ok(())
    }
}

#[async_trait]
impl UpdatableResumeStrategy for FileOffsetStrategy {
    async fn update_last_offset(&self, resumable: &Resumable) -> ResumeResult<()> {
        if !self.is_started() {
            return Err(ResumeError::NotStarted(NAME.to_string()));
        }

        let advance = advance_entry(
            self.offsets.entry(resumable.addressable().clone()),
            resumable.last_offset(),
        );
        if advance == Advance::Ignored {
            return Ok(());
        }

        self.write_snapshot().await.map_err(|e| {
            error!(
                strategy = NAME,
                resumable = %resumable,
                error = %e,
                "Failed to persist offset"
            );
            ResumeError::persist_failed(resumable.addressable(), e.to_string())
        })
    }

    async fn reset_offset(&self, resumable: &Resumable) -> ResumeResult<()> {
        if !self.is_started() {
            return Err(ResumeError::NotStarted(NAME.to_string()));
        }
        self.offsets.insert(
            resumable.addressable().clone(),
            resumable.last_offset().clone(),
        );
        self.write_snapshot()
            .await
            .map_err(|e| ResumeError::persist_failed(resumable.addressable(), e.to_string()))
    }

    fn last_offset(&self, addressable: &Addressable) -> Option<Offset> {
        self.offsets.get(addressable).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_offsets_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offsets.json");
        let key = Addressable::partition("orders", 2);

        let first = FileOffsetStrategy::new(&path);
        first.start().await.unwrap();
        first
            .update_last_offset(&Resumable::new(key.clone(), Offset::sequence(41)))
            .await
            .unwrap();
        first
            .update_last_offset(&Resumable::new(key.clone(), Offset::sequence(17)))
            .await
            .unwrap();
        first.stop().await.unwrap();
        first.stop().await.unwrap();

        let second = FileOffsetStrategy::new(&path);
        second.start().await.unwrap();
        assert_eq!(second.last_offset(&key), Some(Offset::sequence(41)));
    }

    #[tokio::test]
    async fn test_missing_directory_is_store_unavailable() {
        let dir = TempDir::new().unwrap();
        let strategy = FileOffsetStrategy::new(dir.path().join("absent").join("offsets.json"));

        let result = strategy.start().await;
        assert!(matches!(result, Err(ResumeError::StoreUnavailable { .. })));
        assert!(!strategy.is_started());
    }

    #[tokio::test]
    async fn test_malformed_file_is_store_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offsets.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileOffsetStrategy::new(&path).start().await;
        assert!(matches!(result, Err(ResumeError::StoreUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_write_failure_is_persist_failed() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("state");
        std::fs::create_dir(&nested).unwrap();
        let strategy = FileOffsetStrategy::new(nested.join("offsets.json"));
        strategy.start().await.unwrap();

        std::fs::remove_dir_all(&nested).unwrap();
        let result = strategy
            .update_last_offset(&Resumable::new("3.txt", Offset::sequence(3)))
            .await;
        assert!(matches!(
            result,
            Err(ResumeError::PersistFailed { ref addressable, .. }) if addressable.as_str() == "3.txt"
        ));
    }

    #[tokio::test]
    async fn test_concurrent_start_waits_for_loaded_offsets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offsets.json");
        let key = Addressable::partition("orders", 0);
        let seeded = FileOffsetStrategy::new(&path);
        seeded.start().await.unwrap();
        seeded
            .update_last_offset(&Resumable::new(key.clone(), Offset::sequence(41)))
            .await
            .unwrap();
        seeded.stop().await.unwrap();

        let strategy = FileOffsetStrategy::new(&path);
        let (first, seen_by_second) = tokio::join!(strategy.start(), async {
            strategy.start().await.unwrap();
            strategy.last_offset(&key)
        });

        first.unwrap();
        assert_eq!(seen_by_second, Some(Offset::sequence(41)));
    }

    #[tokio::test]
    async fn test_restart_does_not_regress_newer_offsets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offsets.json");
        let key = Addressable::partition("orders", 1);

        let strategy = FileOffsetStrategy::new(&path);
        strategy.start().await.unwrap();
        strategy
            .update_last_offset(&Resumable::new(key.clone(), Offset::sequence(10)))
            .await
            .unwrap();
        let stale = std::fs::read_to_string(&path).unwrap();
        strategy
            .update_last_offset(&Resumable::new(key.clone(), Offset::sequence(60)))
            .await
            .unwrap();
        strategy.stop().await.unwrap();

        std::fs::write(&path, stale).unwrap();
        strategy.start().await.unwrap();
        assert_eq!(strategy.last_offset(&key), Some(Offset::sequence(60)));
    }
}
