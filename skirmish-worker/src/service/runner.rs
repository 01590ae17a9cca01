//! Game runner capability
//!
//! Injected into the worker pool so the polling loop never depends on a
//! concrete game implementation.

use anyhow::Result;
use async_trait::async_trait;
use skirmish_core::domain::job::Payload;
use std::future::Future;
use uuid::Uuid;

/// Runs one game
#[async_trait]
pub trait GameRunner: Send + Sync {
    /// Runs the game described by `payload`
    ///
    /// # Returns
    /// The opaque result blob, or an error that is reported as a `Failed` outcome
    async fn run(&self, job_id: Uuid, payload: Payload) -> Result<Payload>;
}

/// Adapts a closure into a [`GameRunner`]
pub struct FnRunner<F> {
    func: F,
}

/// Wraps `func` so it can be handed to the worker pool
///
/// # Example
/// ```
/// use skirmish_worker::runner_fn;
///
/// let runner = runner_fn(|_job_id, payload| async move { Ok(payload) });
/// ```
pub fn runner_fn<F, Fut>(func: F) -> FnRunner<F>
where
    F: Fn(Uuid, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    FnRunner { func }
}

#[async_trait]
impl<F, Fut> GameRunner for FnRunner<F>
where
    F: Fn(Uuid, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    async fn run(&self, job_id: Uuid, payload: Payload) -> Result<Payload> {
        (self.func)(job_id, payload).await
    }
}

/// Stand-in runner that reports the payload back as the result
///
/// Used by the engine binary when no game implementation is linked in.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoRunner;

#[async_trait]
impl GameRunner for EchoRunner {
    async fn run(&self, job_id: Uuid, payload: Payload) -> Result<Payload> {
        tracing::debug!("Echoing payload for job {}", job_id);
        Ok(payload)
    }
}
