//! Control-plane seam
//!
//! The subset of controller calls a polling loop needs. The HTTP client
//! implements it; tests can substitute an in-process controller.

use async_trait::async_trait;
use skirmish_client::{ControllerClient, Result};
use skirmish_core::domain::job::{Job, JobOutcome};
use uuid::Uuid;

/// Calls a worker loop makes to the controller
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Claims the next unclaimed job. `Ok(None)` means no work is available.
    async fn claim_job(&self, worker_id: &str) -> Result<Option<Job>>;

    /// Refreshes the claim on a running job
    async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> Result<()>;

    /// Reports the final outcome of a job
    async fn report_result(
        &self,
        job_id: Uuid,
        worker_id: &str,
        outcome: JobOutcome,
    ) -> Result<()>;
}

#[async_trait]
impl ControlPlane for ControllerClient {
    async fn claim_job(&self, worker_id: &str) -> Result<Option<Job>> {
        ControllerClient::claim_job(self, worker_id).await
    }

    async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> Result<()> {
        ControllerClient::heartbeat(self, job_id, worker_id)
            .await
            .map(|_| ())
    }

    async fn report_result(
        &self,
        job_id: Uuid,
        worker_id: &str,
        outcome: JobOutcome,
    ) -> Result<()> {
        ControllerClient::report_result(self, job_id, worker_id, outcome)
            .await
            .map(|_| ())
    }
}
