//! Skirmish Controller
//!
//! Owns the job store and exposes the job lifecycle (create, claim,
//! heartbeat, report) over an HTTP control plane.
//!
//! Architecture:
//! - Store: pluggable persistence (`memory` or `file`)
//! - Service: the job state machine and the reclaim sweep
//! - API: axum handlers translating control-plane calls to service calls

pub mod api;
pub mod config;
pub mod service;
pub mod store;

pub use config::ControllerConfig;
pub use service::{ControllerError, JobService, spawn_reclaim_sweep};
pub use store::{JobStore, StoreError, StoreKind, create_store};

use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;

/// Binds `addr` and serves the control plane until `shutdown` is cancelled
/// or the listener fails
pub async fn serve(
    addr: impl ToSocketAddrs,
    service: Arc<JobService>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, service, shutdown).await
}

/// Serves the control plane on an already bound listener
///
/// Binding before serving lets callers dial the controller as soon as this
/// future is spawned.
pub async fn serve_listener(
    listener: TcpListener,
    service: Arc<JobService>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = api::create_router(service);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Controller listening on {}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
