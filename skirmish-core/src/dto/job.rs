//! Job DTOs for the control plane

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobOutcome, JobStatus, Payload};

/// Request to create a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub payload: Payload,
}

/// Request from a worker asking for the next unclaimed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimJobRequest {
    pub worker_id: String,
}

/// Heartbeat from the worker currently holding a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub worker_id: String,
}

/// Final result reported by the worker holding a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResultRequest {
    pub worker_id: String,
    pub outcome: JobOutcome,
}

/// Query string for listing jobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
}
