//! Job Service
//!
//! Business logic for the job lifecycle. Every mutation goes through here;
//! the store is never touched directly by workers.

use chrono::Utc;
use skirmish_core::domain::job::{Job, JobOutcome, JobStatus, Payload};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{JobStore, StoreError};

/// Service error type
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {job_id} is not owned by worker '{worker_id}'")]
    NotOwner { job_id: Uuid, worker_id: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ControllerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ControllerError::NotFound(id),
            other => ControllerError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// Owns the store and enforces the job state machine
pub struct JobService {
    store: Arc<dyn JobStore>,
    /// Serializes read-check-write transitions (heartbeat, report, reclaim).
    /// Claims rely on `pop_next_unclaimed` being atomic instead.
    transitions: Mutex<()>,
    staleness_threshold: Duration,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, staleness_threshold: Duration) -> Self {
        Self {
            store,
            transitions: Mutex::new(()),
            staleness_threshold,
        }
    }

    pub fn staleness_threshold(&self) -> Duration {
        self.staleness_threshold
    }

    /// Create a new unclaimed job
    pub async fn create_job(&self, payload: impl Into<Payload>) -> Result<Job> {
        let job = Job::new(payload);
        self.store.put(job.clone()).await?;

        tracing::info!("Job created: {}", job.id);

        Ok(job)
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        Ok(self.store.get(id).await?)
    }

    /// List jobs, optionally filtered by status
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let jobs = self.store.list().await?;

        Ok(match status {
            Some(status) => jobs.into_iter().filter(|job| job.status == status).collect(),
            None => jobs,
        })
    }

    /// Claim the next unclaimed job for a worker
    ///
    /// `Ok(None)` means there is no work right now. That is the normal idle
    /// case, not a failure.
    pub async fn claim_job(&self, worker_id: &str) -> Result<Option<Job>> {
        validate_worker_id(worker_id)?;

        let claimed = self.store.pop_next_unclaimed(worker_id).await?;

        match &claimed {
            Some(job) => tracing::info!("Job {} claimed by {}", job.id, worker_id),
            None => tracing::debug!("No unclaimed jobs for {}", worker_id),
        }

        Ok(claimed)
    }

    /// Refresh the claim held by `worker_id`
    pub async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> Result<Job> {
        validate_worker_id(worker_id)?;

        let _guard = self.transitions.lock().await;

        let mut job = self.owned_job(job_id, worker_id).await?;
        job.beat(Utc::now());
        self.store.update(job.clone()).await?;

        tracing::debug!("Heartbeat for job {} from {}", job_id, worker_id);

        Ok(job)
    }

    /// Record the final outcome of a job
    pub async fn report_result(
        &self,
        job_id: Uuid,
        worker_id: &str,
        outcome: JobOutcome,
    ) -> Result<Job> {
        validate_worker_id(worker_id)?;

        let _guard = self.transitions.lock().await;

        let mut job = self.owned_job(job_id, worker_id).await?;
        job.finish(outcome, Utc::now());
        self.store.update(job.clone()).await?;

        tracing::info!("Job {} finished with status: {}", job_id, job.status);

        Ok(job)
    }

    /// Return every stale claim to the unclaimed pool
    ///
    /// A claim is stale once its last heartbeat is older than the staleness
    /// threshold. Returns the ids of the reclaimed jobs.
    pub async fn reclaim_stale(&self) -> Result<Vec<Uuid>> {
        let _guard = self.transitions.lock().await;

        let now = Utc::now();
        let mut reclaimed = Vec::new();

        for mut job in self.store.list().await? {
            if !job.is_stale(now, self.staleness_threshold) {
                continue;
            }

            let previous_owner = job.owner.take().unwrap_or_default();
            job.release();

            match self.store.update(job.clone()).await {
                Ok(()) => {
                    tracing::warn!(
                        "Reclaimed stale job {} from {} (no heartbeat for over {:?})",
                        job.id,
                        previous_owner,
                        self.staleness_threshold
                    );
                    reclaimed.push(job.id);
                }
                // Removed since it was listed
                Err(StoreError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(reclaimed)
    }

    /// Loads a job and checks that `worker_id` holds a live claim on it
    async fn owned_job(&self, job_id: Uuid, worker_id: &str) -> Result<Job> {
        let job = self.store.get(job_id).await?;

        if !job.is_owned_by(worker_id) {
            return Err(ControllerError::NotOwner {
                job_id,
                worker_id: worker_id.to_string(),
            });
        }

        if job.is_terminal() {
            return Err(ControllerError::InvalidState(format!(
                "Job {} is already {}",
                job_id, job.status
            )));
        }

        Ok(job)
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_worker_id(worker_id: &str) -> Result<()> {
    if worker_id.trim().is_empty() {
        return Err(ControllerError::ValidationError(
            "Worker ID cannot be empty".to_string(),
        ));
    }

    if worker_id.len() > 255 {
        return Err(ControllerError::ValidationError(
            "Worker ID is too long (max 255 characters)".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashSet;

    fn service(staleness: Duration) -> JobService {
        JobService::new(Arc::new(MemoryStore::new()), staleness)
    }

    #[test]
    fn test_validate_worker_id() {
        assert!(validate_worker_id("worker-1").is_ok());
        assert!(validate_worker_id("").is_err());
        assert!(validate_worker_id("   ").is_err());
        assert!(validate_worker_id(&"w".repeat(256)).is_err());
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips_payload() {
        let service = service(Duration::from_secs(30));
        let payload =
            Payload::from(json!({"width": 11, "height": 11, "snakes": [{"name": "a"}]}));

        let job = service.create_job(payload.clone()).await.unwrap();
        let stored = service.get_job(job.id).await.unwrap();

        assert_eq!(stored.status, JobStatus::Unclaimed);
        assert_eq!(stored.payload, payload);
        assert!(stored.owner.is_none());
    }

    #[tokio::test]
    async fn test_payload_bytes_are_not_reencoded() {
        let service = service(Duration::from_secs(30));
        let text = r#"{"zeta":1,"alpha":2.50,"big":18446744073709551616}"#;

        let job = service.create_job(Payload::from_raw(text).unwrap()).await.unwrap();
        let stored = service.get_job(job.id).await.unwrap();
        assert_eq!(stored.payload.as_str(), text);

        service.claim_job("worker-1").await.unwrap();
        let result = r#"{"winner":"b", "turns":1.0e2}"#;
        service
            .report_result(
                job.id,
                "worker-1",
                JobOutcome::completed(Payload::from_raw(result).unwrap()),
            )
            .await
            .unwrap();

        match service.get_job(job.id).await.unwrap().result {
            Some(JobOutcome::Completed { result: stored }) => assert_eq!(stored.as_str(), result),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_claim_with_no_jobs_is_not_an_error() {
        let service = service(Duration::from_secs(30));
        assert!(service.claim_job("worker-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let service = service(Duration::from_secs(30));
        let job = service.create_job(json!({})).await.unwrap();

        let claimed = service.claim_job("worker-1").await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Claimed);

        let running = service.heartbeat(job.id, "worker-1").await.unwrap();
        assert_eq!(running.status, JobStatus::Running);

        let done = service
            .report_result(job.id, "worker-1", JobOutcome::completed(json!({"turns": 120})))
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(
            service.get_job(job.id).await.unwrap().result,
            Some(JobOutcome::completed(json!({"turns": 120})))
        );
    }

    #[tokio::test]
    async fn test_report_from_claimed_skips_running() {
        let service = service(Duration::from_secs(30));
        let job = service.create_job(json!({})).await.unwrap();
        service.claim_job("worker-1").await.unwrap();

        let failed = service
            .report_result(job.id, "worker-1", JobOutcome::failed("engine crashed"))
            .await
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_report_by_other_worker_is_not_owner() {
        let service = service(Duration::from_secs(30));
        let job = service.create_job(json!({})).await.unwrap();
        service.claim_job("worker-a").await.unwrap();

        let err = service
            .report_result(job.id, "worker-b", JobOutcome::completed(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::NotOwner { .. }));

        let err = service.heartbeat(job.id, "worker-b").await.unwrap_err();
        assert!(matches!(err, ControllerError::NotOwner { .. }));

        // The rightful owner is unaffected
        assert_eq!(
            service.get_job(job.id).await.unwrap().owner.as_deref(),
            Some("worker-a")
        );
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let service = service(Duration::from_secs(30));
        let id = Uuid::new_v4();

        assert!(matches!(
            service.heartbeat(id, "worker-1").await,
            Err(ControllerError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            service
                .report_result(id, "worker-1", JobOutcome::failed("x"))
                .await,
            Err(ControllerError::NotFound(_))
        ));
        assert!(matches!(service.get_job(id).await, Err(ControllerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_immutable() {
        let service = service(Duration::from_secs(30));
        let job = service.create_job(json!({"seed": 1})).await.unwrap();
        service.claim_job("worker-1").await.unwrap();
        let done = service
            .report_result(job.id, "worker-1", JobOutcome::completed(json!({"winner": "a"})))
            .await
            .unwrap();

        let err = service
            .report_result(job.id, "worker-1", JobOutcome::failed("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidState(_)));

        let err = service.heartbeat(job.id, "worker-1").await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidState(_)));

        assert_eq!(service.get_job(job.id).await.unwrap(), done);
    }

    #[tokio::test]
    async fn test_concurrent_claims_hand_out_each_job_once() {
        let service = Arc::new(service(Duration::from_secs(30)));
        let mut created = HashSet::new();
        for n in 0..12 {
            created.insert(service.create_job(json!({ "n": n })).await.unwrap().id);
        }

        let mut handles = Vec::new();
        for worker in 0..6 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let worker_id = format!("worker-{}", worker);
                let mut claimed = Vec::new();
                while let Some(job) = service.claim_job(&worker_id).await.unwrap() {
                    claimed.push(job.id);
                }
                claimed
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "job {} claimed twice", id);
            }
        }
        assert_eq!(seen, created);
    }

    #[tokio::test]
    async fn test_reclaim_returns_stale_claims() {
        let service = service(Duration::from_millis(50));
        let job = service.create_job(json!({})).await.unwrap();
        service.claim_job("worker-1").await.unwrap();

        assert!(service.reclaim_stale().await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(service.reclaim_stale().await.unwrap(), vec![job.id]);

        let stored = service.get_job(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Unclaimed);
        assert!(stored.owner.is_none());

        // The old owner has lost the job; someone else can take it
        assert!(matches!(
            service.heartbeat(job.id, "worker-1").await,
            Err(ControllerError::NotOwner { .. })
        ));
        let again = service.claim_job("worker-2").await.unwrap().unwrap();
        assert_eq!(again.id, job.id);
    }

    #[tokio::test]
    async fn test_heartbeat_keeps_claim_alive() {
        let service = service(Duration::from_millis(100));
        let job = service.create_job(json!({})).await.unwrap();
        service.claim_job("worker-1").await.unwrap();

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(40)).await;
            service.heartbeat(job.id, "worker-1").await.unwrap();
            assert!(service.reclaim_stale().await.unwrap().is_empty());
        }

        assert_eq!(
            service.get_job(job.id).await.unwrap().status,
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn test_list_jobs_filters_by_status() {
        let service = service(Duration::from_secs(30));
        service.create_job(json!({"n": 1})).await.unwrap();
        service.create_job(json!({"n": 2})).await.unwrap();
        service.claim_job("worker-1").await.unwrap();

        assert_eq!(service.list_jobs(None).await.unwrap().len(), 2);
        assert_eq!(
            service
                .list_jobs(Some(JobStatus::Unclaimed))
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            service
                .list_jobs(Some(JobStatus::Claimed))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
