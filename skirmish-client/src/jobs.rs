//! Job-related control-plane calls

use crate::ControllerClient;
use crate::error::Result;
use skirmish_core::domain::job::{Job, JobOutcome, JobStatus, Payload};
use skirmish_core::dto::job::{
    ClaimJobRequest, CreateJob, HeartbeatRequest, ListJobsQuery, ReportResultRequest,
};
use uuid::Uuid;

impl ControllerClient {
    // =============================================================================
    // Producer / Status Reads
    // =============================================================================

    /// Create a new unclaimed job
    ///
    /// # Example
    /// ```no_run
    /// # use skirmish_client::ControllerClient;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = ControllerClient::new("http://localhost:3004");
    /// let job = client.create_job(serde_json::json!({ "snakes": 4 })).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_job(&self, payload: impl Into<Payload>) -> Result<Job> {
        let url = format!("{}/jobs", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateJob {
                payload: payload.into(),
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List jobs, optionally only those in `status`
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let url = format!("{}/jobs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&ListJobsQuery { status })
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Worker Calls
    // =============================================================================

    /// Claim the next unclaimed job
    ///
    /// # Returns
    /// `None` when no job is waiting. That is the normal idle case.
    pub async fn claim_job(&self, worker_id: &str) -> Result<Option<Job>> {
        let url = format!("{}/jobs/claim", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ClaimJobRequest {
                worker_id: worker_id.to_string(),
            })
            .send()
            .await?;

        self.handle_optional_response(response).await
    }

    /// Refresh the claim `worker_id` holds on a job
    pub async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> Result<Job> {
        let url = format!("{}/jobs/{}/heartbeat", self.base_url, job_id);
        let response = self
            .client
            .post(&url)
            .json(&HeartbeatRequest {
                worker_id: worker_id.to_string(),
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Report the final outcome of a job
    pub async fn report_result(
        &self,
        job_id: Uuid,
        worker_id: &str,
        outcome: JobOutcome,
    ) -> Result<Job> {
        let url = format!("{}/jobs/{}/result", self.base_url, job_id);
        let response = self
            .client
            .post(&url)
            .json(&ReportResultRequest {
                worker_id: worker_id.to_string(),
                outcome,
            })
            .send()
            .await?;

        self.handle_response(response).await
    }
}
