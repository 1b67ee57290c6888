//! Task engine types: handles, lifecycle status, record snapshots, errors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use platescan_core::ClassifyError;

// ── Handle ────────────────────────────────────────────────────────────────────

/// Opaque task handle: 128 random bits, hex-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId([u8; 16]);

impl TaskId {
    pub fn generate() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task id must be 32 hex characters")]
pub struct InvalidTaskId;

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| InvalidTaskId)?;
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidTaskId)?;
        Ok(Self(arr))
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Lifecycle: `Queued → Running → Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether `self → next` is a legal forward step.
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Queued, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// Caller-supplied key/value pairs. The engine never reads them.
pub type TaskMetadata = BTreeMap<String, String>;

/// Snapshot of one task.
///
/// Once `status` is terminal exactly one of `result` / `error` is set;
/// before that both are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Unix ms at submission.
    pub created_at: u64,
    /// Unix ms of the last status change.
    pub updated_at: u64,
    pub metadata: TaskMetadata,
}

impl TaskRecord {
    pub(crate) fn queued(id: TaskId, metadata: TaskMetadata, now_ms: u64) -> Self {
        Self {
            id,
            status: TaskStatus::Queued,
            result: None,
            error: None,
            created_at: now_ms,
            updated_at: now_ms,
            metadata,
        }
    }
}

// ── Work ──────────────────────────────────────────────────────────────────────

/// What a unit of work hands back to the engine.
pub type TaskOutcome = Result<serde_json::Value, TaskError>;

/// A unit of work. Runs once, on a blocking worker thread.
pub type Work = Box<dyn FnOnce() -> TaskOutcome + Send + 'static>;

/// Failure raised by a unit of work. Recorded on the task, never propagated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Execution(String),
}

impl From<ClassifyError> for TaskError {
    fn from(e: ClassifyError) -> Self {
        TaskError::Decode(e.to_string())
    }
}

/// Synchronous engine outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task engine is shut down")]
    ShutDown,
}
