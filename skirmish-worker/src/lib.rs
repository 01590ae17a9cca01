//! Skirmish Worker
//!
//! A pool of independent polling loops that pull games from the controller,
//! run them through an injected run function, and report the outcome.
//!
//! Architecture:
//! - Configuration: pool size and timing
//! - Control plane: the calls a loop makes to the controller, behind a trait
//! - Services: the injected game runner
//! - Scheduler: the per-worker polling loop and the pool that drives them

pub mod config;
pub mod control;
pub mod scheduler;
pub mod service;

pub use config::WorkerConfig;
pub use control::ControlPlane;
pub use scheduler::{JobPoller, PollerStats, WorkerPool, WorkerState};
pub use service::{EchoRunner, FnRunner, GameRunner, runner_fn};
