//! Worker pool configuration
//!
//! Pool size, polling and heartbeat timing.

use std::time::Duration;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Prefix for worker identifiers; loop `i` is `<prefix>-<i>`
    pub id_prefix: String,

    /// Number of independent polling loops
    pub worker_count: usize,

    /// How long a loop sleeps after finding no work
    pub poll_interval: Duration,

    /// How often a loop beats while a game is running
    pub heartbeat_interval: Duration,

    /// Stop a loop after this many consecutive empty polls (drain mode)
    pub exit_after_idle_polls: Option<u32>,
}

impl WorkerConfig {
    /// Creates a new configuration with defaults
    pub fn new(id_prefix: String) -> Self {
        Self {
            id_prefix,
            worker_count: 10,
            poll_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(5),
            exit_after_idle_polls: None,
        }
    }

    /// Identifier of the `index`-th loop
    pub fn worker_id(&self, index: usize) -> String {
        format!("{}-{}", self.id_prefix, index)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.id_prefix.trim().is_empty() {
            anyhow::bail!("id_prefix cannot be empty");
        }

        if self.worker_count == 0 {
            anyhow::bail!("worker_count must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.heartbeat_interval.is_zero() {
            anyhow::bail!("heartbeat_interval must be greater than 0");
        }

        if self.exit_after_idle_polls == Some(0) {
            anyhow::bail!("exit_after_idle_polls must be greater than 0 when set");
        }

        Ok(())
    }

    /// Checks heartbeats are frequent enough for the controller's staleness threshold
    ///
    /// The interval must be under half the threshold so a single missed beat
    /// does not lose the claim.
    pub fn validate_against(&self, staleness_threshold: Duration) -> anyhow::Result<()> {
        self.validate()?;

        if self.heartbeat_interval * 2 >= staleness_threshold {
            anyhow::bail!(
                "heartbeat_interval ({:?}) must be less than half the staleness threshold ({:?})",
                self.heartbeat_interval,
                staleness_threshold
            );
        }

        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let process_tag = uuid::Uuid::new_v4().simple().to_string();
        Self::new(format!("worker-{}", &process_tag[..8]))
    }
}
