//! Command-line flags and their mapping onto component configs

use clap::Parser;
use skirmish_controller::{ControllerConfig, StoreKind};
use skirmish_worker::WorkerConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "skirmish-engine")]
#[command(about = "Skirmish game controller and worker pool", long_about = None)]
pub struct Cli {
    /// Control-plane listen address
    #[arg(long, env = "SKIRMISH_CONTROLLER_ADDR", default_value = "127.0.0.1:3004")]
    pub controller_listen: String,

    /// Store backend (`memory` or `file`)
    #[arg(long, env = "SKIRMISH_STORE", default_value = "memory")]
    pub store: StoreKind,

    /// Directory for the file store
    #[arg(long, env = "SKIRMISH_SAVE_DIR", default_value = "~/.skirmish/games")]
    pub save_dir: PathBuf,

    /// Number of worker loops
    #[arg(long, env = "SKIRMISH_WORKERS", default_value_t = 10)]
    pub workers: usize,

    /// Sleep between polls that found no work, in milliseconds
    #[arg(long, env = "SKIRMISH_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Heartbeat interval while a game runs, in milliseconds
    #[arg(long, env = "SKIRMISH_HEARTBEAT_INTERVAL_MS", default_value_t = 5000)]
    pub heartbeat_interval_ms: u64,

    /// Claims without a heartbeat for longer than this are reclaimed, in milliseconds
    #[arg(long, env = "SKIRMISH_STALENESS_MS", default_value_t = 15000)]
    pub staleness_ms: u64,

    /// Reclaim sweep period in milliseconds [default: staleness / 4]
    #[arg(long, env = "SKIRMISH_SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: Option<u64>,

    /// Stop each worker after this many consecutive empty polls, then exit
    #[arg(long, env = "SKIRMISH_EXIT_AFTER_IDLE_POLLS")]
    pub exit_after_idle_polls: Option<u32>,

    /// Create this many jobs with an empty payload at startup
    #[arg(long, default_value_t = 0)]
    pub seed: usize,
}

impl Cli {
    pub fn controller_config(&self) -> ControllerConfig {
        let mut config = ControllerConfig::new(
            self.controller_listen.clone(),
            self.store,
            self.save_dir.clone(),
        );
        config.staleness_threshold = Duration::from_millis(self.staleness_ms);
        config.sweep_interval = match self.sweep_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => config.staleness_threshold / 4,
        };
        config
    }

    pub fn worker_config(&self) -> WorkerConfig {
        let mut config = WorkerConfig::default();
        config.worker_count = self.workers;
        config.poll_interval = Duration::from_millis(self.poll_interval_ms);
        config.heartbeat_interval = Duration::from_millis(self.heartbeat_interval_ms);
        config.exit_after_idle_polls = self.exit_after_idle_polls;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cli = Cli::try_parse_from(["skirmish-engine"]).unwrap();
        let controller = cli.controller_config();
        let worker = cli.worker_config();

        assert_eq!(controller.store, StoreKind::Memory);
        assert_eq!(controller.staleness_threshold, Duration::from_secs(15));
        assert_eq!(controller.sweep_interval, Duration::from_millis(3750));
        assert_eq!(worker.worker_count, 10);
        assert_eq!(cli.seed, 0);

        controller.validate().unwrap();
        worker
            .validate_against(controller.staleness_threshold)
            .unwrap();
    }

    #[test]
    fn test_unknown_store_is_rejected() {
        let err = Cli::try_parse_from(["skirmish-engine", "--store", "postgres"]).unwrap_err();
        assert!(err.to_string().contains("unknown storage option"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "skirmish-engine",
            "--store",
            "file",
            "--save-dir",
            "/tmp/games",
            "--workers",
            "3",
            "--staleness-ms",
            "2000",
            "--sweep-interval-ms",
            "100",
            "--heartbeat-interval-ms",
            "400",
            "--exit-after-idle-polls",
            "2",
        ])
        .unwrap();

        let controller = cli.controller_config();
        assert_eq!(controller.store, StoreKind::File);
        assert_eq!(controller.save_dir, PathBuf::from("/tmp/games"));
        assert_eq!(controller.sweep_interval, Duration::from_millis(100));

        let worker = cli.worker_config();
        assert_eq!(worker.worker_count, 3);
        assert_eq!(worker.exit_after_idle_polls, Some(2));
        assert!(worker.validate_against(controller.staleness_threshold).is_ok());
    }

    #[test]
    fn test_slow_heartbeat_fails_validation() {
        let cli = Cli::try_parse_from([
            "skirmish-engine",
            "--staleness-ms",
            "1000",
            "--heartbeat-interval-ms",
            "600",
        ])
        .unwrap();

        let controller = cli.controller_config();
        assert!(
            cli.worker_config()
                .validate_against(controller.staleness_threshold)
                .is_err()
        );
    }

    #[test]
    fn test_zero_workers_fails_validation() {
        let cli = Cli::try_parse_from(["skirmish-engine", "--workers", "0"]).unwrap();
        assert!(cli.worker_config().validate().is_err());
    }
}
