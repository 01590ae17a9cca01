//! In-memory store
//!
//! Volatile backend guarded by one lock around the whole map.

use async_trait::async_trait;
use chrono::Utc;
use skirmish_core::domain::job::Job;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{JobStore, Result, StoreError, oldest_unclaimed};

/// Process-lifetime job store
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn put(&self, job: Job) -> Result<()> {
        self.jobs.lock().await.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Job> {
        self.jobs
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn pop_next_unclaimed(&self, owner: &str) -> Result<Option<Job>> {
        let mut jobs = self.jobs.lock().await;

        let Some(id) = oldest_unclaimed(jobs.values()).map(|job| job.id) else {
            return Ok(None);
        };

        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.claim(owner, Utc::now());

        Ok(Some(job.clone()))
    }

    async fn update(&self, job: Job) -> Result<()> {
        let mut jobs = self.jobs.lock().await;

        match jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job;
                Ok(())
            }
            None => Err(StoreError::NotFound(job.id)),
        }
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by_key(|job| (job.created_at, job.id));
        Ok(jobs)
    }
}
