//! Reclaim sweep
//!
//! Timer-driven background task that hands abandoned claims back to the
//! unclaimed pool. It is what recovers jobs from workers that died mid-run.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::job::JobService;

/// Starts the sweep, running every `interval` until `shutdown` is cancelled
pub fn spawn_reclaim_sweep(
    service: Arc<JobService>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            "Starting reclaim sweep (interval: {:?}, staleness threshold: {:?})",
            interval,
            service.staleness_threshold()
        );

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match service.reclaim_stale().await {
                Ok(reclaimed) if !reclaimed.is_empty() => {
                    tracing::info!("Reclaimed {} stale job(s)", reclaimed.len());
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Reclaim sweep failed: {}", e),
            }
        }

        tracing::info!("Reclaim sweep stopped");
    })
}
