//! Scheduler layer for the worker
//!
//! Runs the polling loops that claim jobs from the controller and manages
//! each job from claim to reported outcome.

pub mod poller;
pub mod pool;

pub use poller::{JobPoller, PollerStats, WorkerState};
pub use pool::WorkerPool;
