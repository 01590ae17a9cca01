//! Job domain types

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Opaque game configuration or result blob
///
/// Holds the JSON text exactly as received. The core only checks that it is
/// well-formed; key order, number formatting and precision are kept
/// byte-for-byte through the control plane and both stores.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payload(String);

impl Payload {
    /// Wraps JSON text without re-encoding it
    pub fn from_raw(json: impl Into<String>) -> serde_json::Result<Self> {
        let raw = RawValue::from_string(json.into())?;
        Ok(Self(raw.get().to_owned()))
    }

    /// Encodes `value` as a payload
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_string(value).map(Self)
    }

    /// The JSON text as it was received
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the payload for a caller that understands it
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.0)
    }
}

impl Default for Payload {
    /// The empty object
    fn default() -> Self {
        Self("{}".to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({})", self.0)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw: &RawValue = serde_json::from_str(&self.0).map_err(serde::ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self(raw.get().to_owned()))
    }
}

/// A single game job
///
/// Structure shared between the controller (persists and mutates) and the
/// workers (execute and report).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    /// Worker holding the claim. `None` iff the job is `Unclaimed`.
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub payload: Payload,
    /// Set only once the job reaches a terminal state.
    pub result: Option<JobOutcome>,
}

impl Job {
    /// Creates a fresh, unclaimed job with a new identifier.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Unclaimed,
            owner: None,
            created_at: Utc::now(),
            claimed_at: None,
            last_heartbeat_at: None,
            completed_at: None,
            payload: payload.into(),
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_owned_by(&self, worker_id: &str) -> bool {
        self.owner.as_deref() == Some(worker_id)
    }

    /// Hands the job to `owner`, stamping both the claim and heartbeat times.
    pub fn claim(&mut self, owner: &str, now: DateTime<Utc>) {
        self.status = JobStatus::Claimed;
        self.owner = Some(owner.to_string());
        self.claimed_at = Some(now);
        self.last_heartbeat_at = Some(now);
    }

    /// Records a heartbeat. The first beat after a claim promotes the job to `Running`.
    pub fn beat(&mut self, now: DateTime<Utc>) {
        if self.status == JobStatus::Claimed {
            self.status = JobStatus::Running;
        }
        self.last_heartbeat_at = Some(now);
    }

    /// Moves the job into its terminal state.
    pub fn finish(&mut self, outcome: JobOutcome, now: DateTime<Utc>) {
        self.status = outcome.status();
        self.result = Some(outcome);
        self.completed_at = Some(now);
    }

    /// Returns an abandoned claim to the unclaimed pool.
    pub fn release(&mut self) {
        self.status = JobStatus::Unclaimed;
        self.owner = None;
        self.claimed_at = None;
        self.last_heartbeat_at = None;
    }

    /// Whether a live claim has gone longer than `threshold` without a heartbeat.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        if !self.status.is_claimed() {
            return false;
        }

        let Some(last) = self.last_heartbeat_at.or(self.claimed_at) else {
            return true;
        };

        // A heartbeat stamped in the future is never stale.
        now.signed_duration_since(last)
            .to_std()
            .map(|age| age > threshold)
            .unwrap_or(false)
    }
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Unclaimed,
    Claimed,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// `Claimed` or `Running`: some worker currently holds the job.
    pub fn is_claimed(self) -> bool {
        matches!(self, JobStatus::Claimed | JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Unclaimed => "Unclaimed",
            JobStatus::Claimed => "Claimed",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unclaimed" => Ok(JobStatus::Unclaimed),
            "Claimed" => Ok(JobStatus::Claimed),
            "Running" => Ok(JobStatus::Running),
            "Completed" => Ok(JobStatus::Completed),
            "Failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// Final outcome reported by a worker
///
/// Externally tagged (`{"completed": {...}}`) so the raw result blob is read
/// straight off the wire instead of through a buffered tag lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// The game ran to completion; `result` is opaque to the core.
    Completed { result: Payload },
    /// The run function failed.
    Failed { error: String },
}

impl JobOutcome {
    pub fn completed(result: impl Into<Payload>) -> Self {
        JobOutcome::Completed {
            result: result.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        JobOutcome::Failed {
            error: error.into(),
        }
    }

    /// Terminal status this outcome moves a job into.
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::Failed { .. } => JobStatus::Failed,
        }
    }
}
