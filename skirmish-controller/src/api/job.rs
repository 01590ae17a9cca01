//! Job API Handlers
//!
//! HTTP endpoints for the job lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use skirmish_core::domain::job::Job;
use skirmish_core::dto::job::{
    ClaimJobRequest, CreateJob, HeartbeatRequest, ListJobsQuery, ReportResultRequest,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::JobService;

// =============================================================================
// Producer Endpoints
// =============================================================================

/// POST /jobs
/// Create a new unclaimed job
pub async fn create_job(
    State(service): State<Arc<JobService>>,
    Json(req): Json<CreateJob>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let job = service.create_job(req.payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    Ok(Json(service.get_job(id).await?))
}

/// GET /jobs
///
/// Query parameters:
/// - `status` (optional): only return jobs in this status
pub async fn list_jobs(
    State(service): State<Arc<JobService>>,
    Query(params): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing jobs (status: {:?})", params.status);

    Ok(Json(service.list_jobs(params.status).await?))
}

// =============================================================================
// Worker Endpoints
// =============================================================================

/// POST /jobs/claim
/// Claim the next unclaimed job. Responds 204 when there is no work.
pub async fn claim_job(
    State(service): State<Arc<JobService>>,
    Json(req): Json<ClaimJobRequest>,
) -> ApiResult<Response> {
    let response = match service.claim_job(&req.worker_id).await? {
        Some(job) => Json(job).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };

    Ok(response)
}

/// POST /jobs/{id}/heartbeat
pub async fn heartbeat(
    State(service): State<Arc<JobService>>,
    Path(id): Path<Uuid>,
    Json(req): Json<HeartbeatRequest>,
) -> ApiResult<Json<Job>> {
    Ok(Json(service.heartbeat(id, &req.worker_id).await?))
}

/// POST /jobs/{id}/result
/// Move a job into `Completed` or `Failed`
pub async fn report_result(
    State(service): State<Arc<JobService>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReportResultRequest>,
) -> ApiResult<Json<Job>> {
    tracing::info!(
        "Worker {} reporting {:?} for job {}",
        req.worker_id,
        req.outcome.status(),
        id
    );

    Ok(Json(
        service.report_result(id, &req.worker_id, req.outcome).await?,
    ))
}
