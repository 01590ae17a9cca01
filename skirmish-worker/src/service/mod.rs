//! Service layer
//!
//! The game itself is an external collaborator. Workers only see it as a
//! `GameRunner`: something that turns a payload into an outcome or an error
//! in finite time.

mod runner;

pub use runner::{EchoRunner, FnRunner, GameRunner, runner_fn};
