//! Service Module
//!
//! Business logic layer for the controller.
//! Services sit between the control-plane API and the store.

pub mod job;
pub mod reclaim;

// Re-export for convenience
pub use job::{ControllerError, JobService};
pub use reclaim::spawn_reclaim_sweep;
