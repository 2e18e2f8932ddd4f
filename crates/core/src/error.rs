use crate::task::TaskStatus;
use crate::types::TaskId;

/// Convenience alias for fallible core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Domain error taxonomy for the task engine.
///
/// `InvalidTransition` is an internal race-resolution signal and must never
/// be surfaced to a polling client; `StoreUnavailable` / `QueueUnavailable`
/// are transient infrastructure failures the worker retries with backoff.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Task not found: {id}")]
    NotFound { id: TaskId },

    #[error("Invalid transition for task {id}: task is already {current}")]
    InvalidTransition { id: TaskId, current: TaskStatus },

    #[error("Failed to enqueue task {id}: {reason}")]
    EnqueueFailed { id: TaskId, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Work queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// True for transient infrastructure errors that a worker should retry
    /// with bounded backoff instead of treating as a task outcome.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::StoreUnavailable(_) | CoreError::QueueUnavailable(_)
        )
    }
}
