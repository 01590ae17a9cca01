//! Store Module
//!
//! Persistence layer for job records. The controller owns a single
//! `JobStore` and is the only component that touches it.
//!
//! Two backends are available:
//! - `memory`: volatile, lives as long as the process
//! - `file`: one JSON document per job under a directory, survives restarts

pub mod file;
pub mod memory;

use async_trait::async_trait;
use skirmish_core::domain::job::{Job, JobStatus};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("corrupt job record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Key-value persistence for jobs, keyed by job id
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts or overwrites a job record.
    async fn put(&self, job: Job) -> Result<()>;

    /// Looks up a job, failing with `NotFound` if absent.
    async fn get(&self, id: Uuid) -> Result<Job>;

    /// Atomically claims the oldest unclaimed job for `owner`.
    ///
    /// Two concurrent callers never receive the same job. Returns `None`
    /// when nothing is waiting.
    async fn pop_next_unclaimed(&self, owner: &str) -> Result<Option<Job>>;

    /// Persists a mutation of an existing job, failing with `NotFound` if it is gone.
    async fn update(&self, job: Job) -> Result<()>;

    /// Returns every stored job, oldest first.
    async fn list(&self) -> Result<Vec<Job>>;
}

/// Store backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StoreKind::Memory),
            "file" => Ok(StoreKind::File),
            other => Err(format!(
                "unknown storage option '{}' (expected 'memory' or 'file')",
                other
            )),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Memory => f.write_str("memory"),
            StoreKind::File => f.write_str("file"),
        }
    }
}

/// Builds the configured store backend. `save_dir` is only used by the file store.
pub async fn create_store(kind: StoreKind, save_dir: &Path) -> Result<Arc<dyn JobStore>> {
    let store: Arc<dyn JobStore> = match kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => Arc::new(FileStore::open(save_dir).await?),
    };

    tracing::info!("Using {} store", kind);

    Ok(store)
}

/// Picks the oldest unclaimed job from a snapshot of records
fn oldest_unclaimed<'a>(jobs: impl Iterator<Item = &'a Job>) -> Option<&'a Job> {
    jobs.filter(|job| job.status == JobStatus::Unclaimed)
        .min_by_key(|job| (job.created_at, job.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_from_str() {
        assert_eq!("memory".parse::<StoreKind>(), Ok(StoreKind::Memory));
        assert_eq!("file".parse::<StoreKind>(), Ok(StoreKind::File));
        assert!("redis".parse::<StoreKind>().is_err());
        assert!("".parse::<StoreKind>().is_err());
    }

    #[tokio::test]
    async fn test_create_file_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let save_dir = dir.path().join("nested").join("games");

        let store = create_store(StoreKind::File, &save_dir).await.unwrap();
        assert!(save_dir.is_dir());
        assert!(store.list().await.unwrap().is_empty());
    }
}
