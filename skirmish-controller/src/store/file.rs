//! File-backed store
//!
//! Each job lives in `<dir>/<job-id>.json`. Writes go to a temporary file
//! that is synced to disk and then renamed into place, so a reader never
//! observes a partially written record. Writers are serialized by an
//! in-process lock, which is what keeps `pop_next_unclaimed` atomic.
//!
//! A record that cannot be parsed is skipped by scans (claims, listing,
//! the reclaim sweep) and reported as `Corrupt` only when read by id.

use async_trait::async_trait;
use chrono::Utc;
use skirmish_core::domain::job::Job;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{JobStore, Result, StoreError, oldest_unclaimed};

const RECORD_EXTENSION: &str = "json";

/// Durable job store rooted at a directory
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        tracing::info!("File store opened at {}", dir.display());

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    async fn read_record(&self, path: &Path) -> Result<Job> {
        let bytes = fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn write_record(&self, job: &Job) -> Result<()> {
        let path = self.record_path(job.id);
        let tmp = self.dir.join(format!(".{}.{}.tmp", job.id, RECORD_EXTENSION));

        let bytes = serde_json::to_vec_pretty(job).map_err(std::io::Error::from)?;

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path).await?;

        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(fs::try_exists(self.record_path(id)).await?)
    }

    async fn read_all(&self) -> Result<Vec<Job>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut jobs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            match self.read_record(&path).await {
                Ok(job) => jobs.push(job),
                // Removed between read_dir and read
                Err(StoreError::Unavailable(err)) if err.kind() == ErrorKind::NotFound => {}
                Err(StoreError::Corrupt { path, source }) => {
                    tracing::warn!(
                        path = %path.display(),
                        "Skipping unreadable job record: {}",
                        source
                    );
                }
                Err(err) => return Err(err),
            }
        }

        jobs.sort_by_key(|job| (job.created_at, job.id));
        Ok(jobs)
    }
}

#[async_trait]
impl JobStore for FileStore {
    async fn put(&self, job: Job) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_record(&job).await
    }

    async fn get(&self, id: Uuid) -> Result<Job> {
        match self.read_record(&self.record_path(id)).await {
            Err(StoreError::Unavailable(err)) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(id))
            }
            other => other,
        }
    }

    async fn pop_next_unclaimed(&self, owner: &str) -> Result<Option<Job>> {
        let _guard = self.write_lock.lock().await;

        let jobs = self.read_all().await?;
        let Some(job) = oldest_unclaimed(jobs.iter()) else {
            return Ok(None);
        };

        let mut job = job.clone();
        job.claim(owner, Utc::now());
        self.write_record(&job).await?;

        Ok(Some(job))
    }

    async fn update(&self, job: Job) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if !self.exists(job.id).await? {
            return Err(StoreError::NotFound(job.id));
        }

        self.write_record(&job).await
    }

    async fn list(&self) -> Result<Vec<Job>> {
        self.read_all().await
    }
}
