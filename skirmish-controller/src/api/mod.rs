//! API Module
//!
//! HTTP control plane for the controller. Workers and presentation layers
//! reach the job lifecycle only through these routes.

pub mod error;
pub mod health;
pub mod job;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::JobService;

/// Create the control-plane router with all endpoints
pub fn create_router(service: Arc<JobService>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/jobs", post(job::create_job).get(job::list_jobs))
        .route("/jobs/claim", post(job::claim_job))
        .route("/jobs/{id}", get(job::get_job))
        .route("/jobs/{id}/heartbeat", post(job::heartbeat))
        .route("/jobs/{id}/result", post(job::report_result))
        // Add state and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}
