//! Controller configuration
//!
//! Listen address, store selection and claim-staleness timing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::StoreKind;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Control-plane listen address (e.g., "127.0.0.1:3004")
    pub listen_addr: String,

    /// Which store backend to use
    pub store: StoreKind,

    /// Directory for the file store. Ignored by the memory store.
    pub save_dir: PathBuf,

    /// How long a claim may go without a heartbeat before it is reclaimed
    pub staleness_threshold: Duration,

    /// How often the reclaim sweep runs
    pub sweep_interval: Duration,
}

impl ControllerConfig {
    /// Creates a configuration with default timing
    pub fn new(listen_addr: String, store: StoreKind, save_dir: PathBuf) -> Self {
        let staleness_threshold = Duration::from_secs(15);
        Self {
            listen_addr,
            store,
            save_dir: expand_home(&save_dir),
            staleness_threshold,
            sweep_interval: staleness_threshold / 4,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.is_empty() {
            anyhow::bail!("listen_addr cannot be empty");
        }

        if self.store == StoreKind::File && self.save_dir.as_os_str().is_empty() {
            anyhow::bail!("save_dir is required when using the file store");
        }

        if self.staleness_threshold.is_zero() {
            anyhow::bail!("staleness_threshold must be greater than 0");
        }

        if self.sweep_interval.is_zero() {
            anyhow::bail!("sweep_interval must be greater than 0");
        }

        if self.sweep_interval > self.staleness_threshold {
            anyhow::bail!("sweep_interval must not exceed staleness_threshold");
        }

        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(
            "127.0.0.1:3004".to_string(),
            StoreKind::Memory,
            PathBuf::from("~/.skirmish/games"),
        )
    }
}

/// Expands a leading `~` to the current user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
