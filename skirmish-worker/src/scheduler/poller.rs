//! Job poller
//!
//! One independent worker loop: poll → claim → run → report, forever.
//! Heartbeats are sent while the game runs so the controller does not
//! reclaim the job.

use anyhow::Result;
use skirmish_client::ClientError;
use skirmish_core::domain::job::{Job, JobOutcome, JobStatus, Payload};
use std::iter::Sum;
use std::sync::Arc;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::control::ControlPlane;
use crate::service::GameRunner;

/// Where a worker loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Polling,
    Claimed,
    Running,
    Reporting,
    Stopped,
}

/// Counters collected by one worker loop over its lifetime
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollerStats {
    /// Jobs reported as `Completed`
    pub completed: u64,
    /// Jobs reported as `Failed`
    pub failed: u64,
    /// Jobs given up because the claim was lost
    pub abandoned: u64,
    /// Polls that found no work
    pub empty_polls: u64,
    /// Control-plane calls that failed for other reasons
    pub errors: u64,
}

impl PollerStats {
    /// Jobs this loop carried to a terminal state
    pub fn finished(&self) -> u64 {
        self.completed + self.failed
    }
}

impl Sum for PollerStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, s| Self {
            completed: acc.completed + s.completed,
            failed: acc.failed + s.failed,
            abandoned: acc.abandoned + s.abandoned,
            empty_polls: acc.empty_polls + s.empty_polls,
            errors: acc.errors + s.errors,
        })
    }
}

/// A single worker loop
pub struct JobPoller {
    worker_id: String,
    poll_interval: Duration,
    heartbeat_interval: Duration,
    exit_after_idle_polls: Option<u32>,
    control: Arc<dyn ControlPlane>,
    runner: Arc<dyn GameRunner>,
    state: WorkerState,
}

impl JobPoller {
    /// Creates a new job poller
    pub fn new(
        worker_id: String,
        config: &WorkerConfig,
        control: Arc<dyn ControlPlane>,
        runner: Arc<dyn GameRunner>,
    ) -> Self {
        Self {
            worker_id,
            poll_interval: config.poll_interval,
            heartbeat_interval: config.heartbeat_interval,
            exit_after_idle_polls: config.exit_after_idle_polls,
            control,
            runner,
            state: WorkerState::Idle,
        }
    }

    /// Runs the loop until `shutdown` is cancelled
    ///
    /// Cancellation is observed between jobs and while sleeping, never in the
    /// middle of a game. A game that is never reported is left to the
    /// controller's reclaim sweep.
    pub async fn run(mut self, shutdown: CancellationToken) -> PollerStats {
        info!(
            "Worker {} starting (poll interval: {:?}, heartbeat interval: {:?})",
            self.worker_id, self.poll_interval, self.heartbeat_interval
        );

        let mut stats = PollerStats::default();
        let mut idle_streak: u32 = 0;

        while !shutdown.is_cancelled() {
            self.transition(WorkerState::Polling);

            match self.control.claim_job(&self.worker_id).await {
                Ok(Some(job)) => {
                    idle_streak = 0;
                    self.execute(job, &mut stats).await;
                    // Straight back to polling, no cooldown
                    continue;
                }
                Ok(None) => {
                    debug!("Worker {}: no jobs available", self.worker_id);
                    stats.empty_polls += 1;
                    idle_streak += 1;

                    if self
                        .exit_after_idle_polls
                        .is_some_and(|limit| idle_streak >= limit)
                    {
                        info!(
                            "Worker {} drained after {} empty poll(s)",
                            self.worker_id, idle_streak
                        );
                        break;
                    }
                }
                Err(e) => {
                    warn!("Worker {}: failed to claim job: {}", self.worker_id, e);
                    stats.errors += 1;
                    idle_streak = 0;
                }
            }

            self.transition(WorkerState::Idle);

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        self.transition(WorkerState::Stopped);
        info!("Worker {} stopped ({:?})", self.worker_id, stats);

        stats
    }

    /// Runs a claimed job through to a reported outcome
    async fn execute(&mut self, job: Job, stats: &mut PollerStats) {
        let job_id = job.id;
        self.transition(WorkerState::Claimed);
        info!("Worker {} claimed job {}", self.worker_id, job_id);

        // The first beat moves the job to Running on the controller
        match self.control.heartbeat(job_id, &self.worker_id).await {
            Ok(()) => {}
            Err(e) if claim_lost(&e) => {
                warn!("Worker {} lost job {} before starting: {}", self.worker_id, job_id, e);
                stats.abandoned += 1;
                return;
            }
            Err(e) => warn!("Initial heartbeat for job {} failed: {}", job_id, e),
        }

        self.transition(WorkerState::Running);

        let Some(result) = self.run_with_heartbeats(job_id, job.payload).await else {
            stats.abandoned += 1;
            return;
        };

        self.transition(WorkerState::Reporting);

        let outcome = match result {
            Ok(result) => JobOutcome::completed(result),
            Err(e) => {
                warn!("Job {} failed: {:#}", job_id, e);
                JobOutcome::failed(format!("{:#}", e))
            }
        };
        let status = outcome.status();

        match self
            .control
            .report_result(job_id, &self.worker_id, outcome)
            .await
        {
            Ok(()) => {
                info!("Job {} reported as {}", job_id, status);
                match status {
                    JobStatus::Completed => stats.completed += 1,
                    _ => stats.failed += 1,
                }
            }
            Err(e) if claim_lost(&e) => {
                warn!("Worker {} lost job {} before reporting: {}", self.worker_id, job_id, e);
                stats.abandoned += 1;
            }
            Err(e) => {
                error!("Failed to report result for job {}: {}", job_id, e);
                stats.errors += 1;
            }
        }
    }

    /// Runs the game on its own task, beating until it finishes
    ///
    /// Returns `None` if the claim was lost; the game is aborted in that case.
    async fn run_with_heartbeats(&self, job_id: Uuid, payload: Payload) -> Option<Result<Payload>> {
        let runner = Arc::clone(&self.runner);
        let mut game = tokio::spawn(async move { runner.run(job_id, payload).await });

        let mut ticker = time::interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                joined = &mut game => {
                    return Some(joined.unwrap_or_else(|e| {
                        Err(anyhow::anyhow!("run function panicked: {}", e))
                    }));
                }
                _ = ticker.tick() => {
                    match self.control.heartbeat(job_id, &self.worker_id).await {
                        Ok(()) => debug!("Heartbeat sent for job {}", job_id),
                        Err(e) if claim_lost(&e) => {
                            warn!(
                                "Worker {} lost claim on job {}, abandoning: {}",
                                self.worker_id, job_id, e
                            );
                            game.abort();
                            return None;
                        }
                        Err(e) => warn!("Heartbeat for job {} failed: {}", job_id, e),
                    }
                }
            }
        }
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(worker_id = %self.worker_id, from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }
}

/// Errors that mean this worker no longer holds the job
fn claim_lost(err: &ClientError) -> bool {
    err.is_not_owner() || err.is_not_found() || matches!(err, ClientError::InvalidState(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::runner_fn;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Claim,
        Heartbeat(Uuid),
        Report(Uuid, JobOutcome),
    }

    /// Scripted control plane that hands out a fixed queue of jobs
    #[derive(Default)]
    struct ScriptedControl {
        jobs: Mutex<VecDeque<Job>>,
        calls: Mutex<Vec<Call>>,
        reject_heartbeats: bool,
    }

    impl ScriptedControl {
        fn with_jobs(jobs: Vec<Job>) -> Self {
            Self {
                jobs: Mutex::new(jobs.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ControlPlane for ScriptedControl {
        async fn claim_job(&self, _worker_id: &str) -> skirmish_client::Result<Option<Job>> {
            self.calls.lock().unwrap().push(Call::Claim);
            Ok(self.jobs.lock().unwrap().pop_front())
        }

        async fn heartbeat(&self, job_id: Uuid, _worker_id: &str) -> skirmish_client::Result<()> {
            self.calls.lock().unwrap().push(Call::Heartbeat(job_id));
            if self.reject_heartbeats {
                return Err(ClientError::NotOwner("reclaimed".to_string()));
            }
            Ok(())
        }

        async fn report_result(
            &self,
            job_id: Uuid,
            _worker_id: &str,
            outcome: JobOutcome,
        ) -> skirmish_client::Result<()> {
            self.calls.lock().unwrap().push(Call::Report(job_id, outcome));
            Ok(())
        }
    }

    fn config() -> WorkerConfig {
        let mut config = WorkerConfig::new("test".to_string());
        config.poll_interval = Duration::from_millis(5);
        config.heartbeat_interval = Duration::from_millis(20);
        config.exit_after_idle_polls = Some(2);
        config
    }

    #[tokio::test]
    async fn test_runs_and_reports_claimed_job() {
        let job = Job::new(json!({"seed": 1}));
        let control = Arc::new(ScriptedControl::with_jobs(vec![job.clone()]));
        let runner = Arc::new(runner_fn(|_, _| async { Ok(json!({"winner": "a"}).into()) }));

        let poller = JobPoller::new("test-0".to_string(), &config(), control.clone(), runner);
        let stats = poller.run(CancellationToken::new()).await;

        assert_eq!(stats.completed, 1);
        assert_eq!(stats.empty_polls, 2);
        assert_eq!(
            control.calls(),
            vec![
                Call::Claim,
                Call::Heartbeat(job.id),
                Call::Report(job.id, JobOutcome::completed(json!({"winner": "a"}))),
                Call::Claim,
                Call::Claim,
            ]
        );
    }

    #[tokio::test]
    async fn test_run_error_is_reported_as_failed() {
        let job = Job::new(json!({}));
        let control = Arc::new(ScriptedControl::with_jobs(vec![job.clone()]));
        let runner = Arc::new(runner_fn(|_, _| async { anyhow::bail!("board too small") }));

        let poller = JobPoller::new("test-0".to_string(), &config(), control.clone(), runner);
        let stats = poller.run(CancellationToken::new()).await;

        assert_eq!(stats.failed, 1);
        assert!(
            control
                .calls()
                .contains(&Call::Report(job.id, JobOutcome::failed("board too small")))
        );
    }

    #[tokio::test]
    async fn test_panicking_runner_is_reported_as_failed() {
        let job = Job::new(json!({}));
        let control = Arc::new(ScriptedControl::with_jobs(vec![job.clone()]));
        let runner = Arc::new(runner_fn(|_, payload: Payload| async move {
            if payload == Payload::default() {
                panic!("simulation bug");
            }
            Ok(payload)
        }));

        let poller = JobPoller::new("test-0".to_string(), &config(), control.clone(), runner);
        let stats = poller.run(CancellationToken::new()).await;

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 0);
    }

    #[tokio::test]
    async fn test_beats_while_game_runs() {
        let job = Job::new(json!({}));
        let control = Arc::new(ScriptedControl::with_jobs(vec![job.clone()]));
        let runner = Arc::new(runner_fn(|_, _| async {
            tokio::time::sleep(Duration::from_millis(110)).await;
            Ok(Payload::default())
        }));

        let poller = JobPoller::new("test-0".to_string(), &config(), control.clone(), runner);
        poller.run(CancellationToken::new()).await;

        let beats = control
            .calls()
            .iter()
            .filter(|call| **call == Call::Heartbeat(job.id))
            .count();
        // One on claim plus periodic beats every 20ms
        assert!(beats >= 3, "only {} heartbeats sent", beats);
    }

    #[tokio::test]
    async fn test_lost_claim_abandons_job() {
        let job = Job::new(json!({}));
        let control = Arc::new(ScriptedControl {
            jobs: Mutex::new(vec![job.clone()].into()),
            reject_heartbeats: true,
            ..Default::default()
        });
        let runner = Arc::new(runner_fn(|_, _| async { Ok(Payload::default()) }));

        let poller = JobPoller::new("test-0".to_string(), &config(), control.clone(), runner);
        let stats = poller.run(CancellationToken::new()).await;

        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.finished(), 0);
        assert!(
            !control
                .calls()
                .iter()
                .any(|call| matches!(call, Call::Report(..)))
        );
    }

    #[tokio::test]
    async fn test_cancelled_loop_stops_while_idle() {
        let control = Arc::new(ScriptedControl::default());
        let runner = Arc::new(runner_fn(|_, payload| async move { Ok(payload) }));

        let mut config = config();
        config.exit_after_idle_polls = None;
        config.poll_interval = Duration::from_secs(60);

        let shutdown = CancellationToken::new();
        let poller = JobPoller::new("test-0".to_string(), &config, control.clone(), runner);
        let handle = tokio::spawn(poller.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not observe cancellation")
            .unwrap();
        assert_eq!(stats.empty_polls, 1);
    }

    #[test]
    fn test_stats_sum() {
        let total: PollerStats = [
            PollerStats {
                completed: 2,
                empty_polls: 3,
                ..Default::default()
            },
            PollerStats {
                failed: 1,
                errors: 1,
                ..Default::default()
            },
        ]
        .into_iter()
        .sum();

        assert_eq!(total.finished(), 3);
        assert_eq!(total.empty_polls, 3);
        assert_eq!(total.errors, 1);
    }
}
