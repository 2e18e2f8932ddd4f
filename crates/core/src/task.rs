//! Task record, status state machine, and the `TaskStore` contract.
//!
//! A task is `Running` from the instant it is durably recorded — enqueue and
//! "start" are the same observable event to a polling client, so there is no
//! pending state. The only legal transitions are `Running -> Done` and
//! `Running -> Failed`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{TaskId, Timestamp};

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Task lifecycle status.
///
/// Discriminants match the `status_id` column values; wire names are the
/// SCREAMING strings clients poll for.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Running = 1,
    Done = 2,
    Failed = 3,
}

impl TaskStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> CoreResult<Self> {
        match id {
            1 => Ok(TaskStatus::Running),
            2 => Ok(TaskStatus::Done),
            3 => Ok(TaskStatus::Failed),
            other => Err(CoreError::Internal(format!("Unknown status id: {other}"))),
        }
    }

    /// Wire representation: `RUNNING`, `DONE`, `FAILED`.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "RUNNING",
            TaskStatus::Done => "DONE",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Done and Failed are terminal; no further transitions are permitted.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task ended `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The analysis function raised or returned an error.
    Analysis,
    /// Execution exceeded the configured ceiling.
    Timeout,
    /// The work queue was unavailable at submission time.
    QueueUnavailable,
}

/// Terminal outcome of a task, stored as the `result` payload.
///
/// Tagged variant rather than an untyped map so terminal-state handling
/// stays exhaustive. The variant also determines the terminal status, which
/// makes "result written atomically with the transition" structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success { payload: serde_json::Value },
    Failure { reason: FailureReason, detail: String },
}

impl TaskOutcome {
    pub fn success(payload: serde_json::Value) -> Self {
        TaskOutcome::Success { payload }
    }

    pub fn failure(reason: FailureReason, detail: impl Into<String>) -> Self {
        TaskOutcome::Failure {
            reason,
            detail: detail.into(),
        }
    }

    /// The terminal status this outcome transitions the task to.
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskOutcome::Success { .. } => TaskStatus::Done,
            TaskOutcome::Failure { .. } => TaskStatus::Failed,
        }
    }
}

/// One migration-analysis job tracked from submission to terminal outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Opaque input payload captured at submission, immutable thereafter.
    pub input: serde_json::Value,
    /// Present exactly when `status` is terminal.
    pub result: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Durable keyed storage for task records; the single source of truth.
///
/// Opened at process start, closed at shutdown, passed explicitly to the
/// dispatcher and the workers — never a process-wide singleton. `complete`
/// is the one mandatory concurrency-control point in the engine: concurrent
/// calls on the same id must be serialized so exactly one wins.
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    /// Allocate a fresh id and durably persist a `Running` task.
    ///
    /// The record must be durable before this returns: a crash immediately
    /// after must not lose a record whose id the caller already received.
    async fn create(&self, input: &serde_json::Value) -> CoreResult<TaskId>;

    /// Fetch the full record, or `CoreError::NotFound`.
    async fn get(&self, id: TaskId) -> CoreResult<Task>;

    /// Lightweight status projection for polling; same NotFound semantics.
    async fn get_status(&self, id: TaskId) -> CoreResult<TaskStatus>;

    /// Atomically transition `Running -> terminal` and store the result.
    ///
    /// Compare-and-swap on the current status: fails with
    /// `CoreError::InvalidTransition` if the task is not `Running` (guards
    /// against double completion when redelivery races a slow worker) or
    /// `NotFound` if the id is unknown.
    async fn complete(&self, id: TaskId, outcome: TaskOutcome) -> CoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ids_round_trip() {
        for status in [TaskStatus::Running, TaskStatus::Done, TaskStatus::Failed] {
            assert_eq!(TaskStatus::from_id(status.id()).unwrap(), status);
        }
        assert!(TaskStatus::from_id(0).is_err());
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn status_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskStatus::Running).unwrap(),
            serde_json::json!("RUNNING")
        );
        assert_eq!(TaskStatus::Failed.as_str(), "FAILED");
    }

    #[test]
    fn outcome_determines_terminal_status() {
        let ok = TaskOutcome::success(serde_json::json!({"ok": true}));
        assert_eq!(ok.status(), TaskStatus::Done);

        let failed = TaskOutcome::failure(FailureReason::Timeout, "exceeded 1200s");
        assert_eq!(failed.status(), TaskStatus::Failed);
    }

    #[test]
    fn outcome_serde_is_tagged() {
        let outcome = TaskOutcome::failure(FailureReason::QueueUnavailable, "broker down");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["kind"], "failure");
        assert_eq!(value["reason"], "queue_unavailable");
        assert_eq!(value["detail"], "broker down");

        let back: TaskOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(back, outcome);
    }
}
