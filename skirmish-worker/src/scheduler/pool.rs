//! Worker pool
//!
//! A fixed number of independent `JobPoller`s sharing one control-plane
//! handle. Loops never wait on each other.

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::control::ControlPlane;
use crate::scheduler::poller::{JobPoller, PollerStats};
use crate::service::GameRunner;

/// Pool of worker loops
pub struct WorkerPool {
    config: WorkerConfig,
    control: Arc<dyn ControlPlane>,
    runner: Arc<dyn GameRunner>,
}

impl WorkerPool {
    /// Creates a new worker pool
    pub fn new(
        config: WorkerConfig,
        control: Arc<dyn ControlPlane>,
        runner: Arc<dyn GameRunner>,
    ) -> Self {
        Self {
            config,
            control,
            runner,
        }
    }

    /// Runs every loop until `shutdown` is cancelled (or, in drain mode,
    /// until every loop has gone idle)
    ///
    /// # Returns
    /// The stats of each loop that exited normally
    pub async fn run(self, shutdown: CancellationToken) -> Vec<PollerStats> {
        info!(
            "Starting {} worker(s) with prefix '{}'",
            self.config.worker_count, self.config.id_prefix
        );

        let mut workers = JoinSet::new();

        for index in 0..self.config.worker_count {
            let poller = JobPoller::new(
                self.config.worker_id(index),
                &self.config,
                Arc::clone(&self.control),
                Arc::clone(&self.runner),
            );
            workers.spawn(poller.run(shutdown.clone()));
        }

        let mut stats = Vec::with_capacity(self.config.worker_count);

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_stats) => stats.push(worker_stats),
                Err(e) => warn!("Worker task panicked: {}", e),
            }
        }

        info!("All workers stopped");

        stats
    }
}
