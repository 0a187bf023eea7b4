//! Directory polling source with set-based resume.
//!
//! Each poll lists the directory, drops files already emitted by this source,
//! and lets the set-resumable strategy remove files processed in earlier runs.
//! Every remaining file becomes one unit of work carrying its contents and a
//! [`Resumable`] keyed by file name. A file that cannot be read fails as its
//! own unit; the rest of the batch is still delivered.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::runner::PollSource;
use crate::constants::headers;
use crate::offset::{Addressable, Offset, Resumable};
use crate::strategy::{ConfiguredStrategy, ResumeSet, SetResumeStrategy};
use crate::unit_of_work::UnitOfWork;

pub struct DirectorySource {
    directory: PathBuf,
    strategy: Option<Arc<dyn SetResumeStrategy>>,
    emitted: HashSet<Addressable>,
}

impl DirectorySource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            strategy: None,
            emitted: HashSet::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SetResumeStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Use the set capability of a configured strategy, if it has one
    pub fn with_configured_strategy(mut self, strategy: &ConfiguredStrategy) -> Self {
        self.strategy = strategy.as_set().cloned();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Regular files in the directory, sorted by name
    async fn list_files(&self) -> anyhow::Result<Vec<(Addressable, PathBuf)>> {
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .with_context(|| format!("failed to list {}", self.directory.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push((Addressable::file(name), entry.path()));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    /// A file that cannot be read becomes a failed unit rather than a failed poll
    async fn read_unit(addressable: &Addressable, path: &Path) -> UnitOfWork {
        let read = async {
            let bytes = tokio::fs::read(path).await?;
            let metadata = tokio::fs::metadata(path).await?;
            Ok::<_, std::io::Error>((bytes, metadata))
        };

        match read.await {
            Ok((bytes, metadata)) => {
                let offset = match metadata.modified() {
                    Ok(modified) => Offset::timestamp(DateTime::<Utc>::from(modified)),
                    Err(_) => Offset::sequence(metadata.len()),
                };
                let body = match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        debug!(path = %path.display(), "File is not valid UTF-8; decoding lossily");
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };

                Self::unit_for(addressable, path, body)
                    .with_header(headers::FILE_LENGTH, metadata.len())
                    .with_header(
                        headers::OFFSET,
                        Resumable::new(addressable.clone(), offset).to_header(),
                    )
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "⚠️ Failed to read file; emitting it as a failed unit"
                );
                let mut unit = Self::unit_for(addressable, path, serde_json::Value::Null);
                unit.set_error(
                    anyhow::Error::new(e).context(format!("failed to read {}", path.display())),
                );
                unit
            }
        }
    }

    fn unit_for(
        addressable: &Addressable,
        path: &Path,
        body: impl Into<serde_json::Value>,
    ) -> UnitOfWork {
        UnitOfWork::new(body)
            .with_header(headers::FILE_NAME, addressable.as_str())
            .with_header(headers::FILE_PATH, path.display().to_string())
    }
}

#[async_trait]
impl PollSource for DirectorySource {
    async fn poll(&mut self) -> anyhow::Result<Vec<UnitOfWork>> {
        let files = self.list_files().await?;
        let listed = files.len();

        // Forget names that left the directory so a recreated file is delivered again
        let present: HashSet<&Addressable> =
            files.iter().map(|(addressable, _)| addressable).collect();
        self.emitted.retain(|addressable| present.contains(addressable));

        let mut candidates: ResumeSet<PathBuf> = files
            .into_iter()
            .filter(|(addressable, _)| !self.emitted.contains(addressable))
            .collect();
        if let Some(strategy) = &self.strategy {
            strategy.resume(&mut candidates);
        }

        let entries = candidates.into_entries();
        let units = join_all(
            entries
                .iter()
                .map(|(addressable, path)| Self::read_unit(addressable, path)),
        )
        .await;
        self.emitted
            .extend(entries.into_iter().map(|(addressable, _)| addressable));

        debug!(
            directory = %self.directory.display(),
            listed,
            emitted = units.len(),
            tracked = self.emitted.len(),
            "Polled directory"
        );
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ProcessedSetStrategy;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_emits_each_file_once_with_headers() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "bravo").unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let mut source = DirectorySource::new(dir.path());
        let units = source.poll().await.unwrap();

        let names: Vec<_> = units
            .iter()
            .filter_map(|u| u.header(headers::FILE_NAME).and_then(|v| v.as_str()))
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(units[0].body_str(), Some("alpha"));
        assert_eq!(
            units[0].header(headers::FILE_LENGTH).and_then(|v| v.as_u64()),
            Some(5)
        );
        let resumable = units[0]
            .header(headers::OFFSET)
            .and_then(Resumable::from_header)
            .unwrap();
        assert_eq!(resumable.addressable().as_str(), "a.txt");

        assert!(source.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skips_files_processed_in_earlier_runs() {
        let dir = TempDir::new().unwrap();
        for name in ["1.txt", "2.txt"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        let strategy = Arc::new(ProcessedSetStrategy::with_processed([Resumable::new(
            "1.txt",
            Offset::sequence(0),
        )]));

        let mut source = DirectorySource::new(dir.path()).with_strategy(strategy);
        let units = source.poll().await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].body_str(), Some("2.txt"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_poll_error() {
        let dir = TempDir::new().unwrap();
        let mut source = DirectorySource::new(dir.path().join("gone"));
        assert!(source.poll().await.is_err());
    }

    #[tokio::test]
    async fn test_undecodable_file_does_not_fail_the_batch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("b.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        std::fs::write(dir.path().join("c.txt"), "charlie").unwrap();

        let mut source = DirectorySource::new(dir.path());
        let units = source.poll().await.unwrap();

        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| !u.is_failed()));
        assert_eq!(units[0].body_str(), Some("alpha"));
        assert_eq!(units[2].body_str(), Some("charlie"));
        assert!(units[1].body_str().is_some_and(|body| body.contains('\u{fffd}')));
        assert_eq!(
            units[1].header(headers::FILE_LENGTH).and_then(|v| v.as_u64()),
            Some(4)
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_becomes_failed_unit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vanished.txt");

        let unit = DirectorySource::read_unit(&Addressable::file("vanished.txt"), &path).await;

        assert!(unit.is_failed());
        assert!(unit.header(headers::OFFSET).is_none());
        assert_eq!(
            unit.header(headers::FILE_NAME).and_then(|v| v.as_str()),
            Some("vanished.txt")
        );
        let message = unit.error().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("failed to read"));
    }

    #[tokio::test]
    async fn test_recreated_file_is_delivered_again() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("5.txt");
        let mut source = DirectorySource::new(dir.path());

        for round in 0..20 {
            std::fs::write(&path, format!("round {round}")).unwrap();
            assert_eq!(source.poll().await.unwrap().len(), 1);
            std::fs::remove_file(&path).unwrap();
            assert!(source.poll().await.unwrap().is_empty());
        }
        assert!(source.emitted.is_empty());

        std::fs::write(&path, "new content").unwrap();
        let units = source.poll().await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].body_str(), Some("new content"));
    }
}
