//! Submission dispatcher.
//!
//! Creates the task record, enqueues the work, returns the id — never waits
//! for completion. If the queue is down at submission time the task is
//! immediately failed with a queue-unavailable outcome so a polling client
//! never sees a task stuck `RUNNING` forever.

use std::sync::Arc;

use migplan_core::request::MigrationRequest;
use migplan_core::{CoreError, FailureReason, TaskId, TaskOutcome, TaskStore, WorkQueue};

/// Submission-side engine: validates, persists, enqueues.
pub struct Dispatcher {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn WorkQueue>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn TaskStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Accept a migration-analysis job and return its task id synchronously.
    ///
    /// The task is durably `RUNNING` from the moment the id is returned;
    /// enqueue and "start" are the same observable event to the client.
    pub async fn submit(&self, request: MigrationRequest) -> Result<TaskId, CoreError> {
        request.validate()?;

        let input = serde_json::to_value(&request)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize request: {e}")))?;
        let id = self.store.create(&input).await?;

        if let Err(e) = self.queue.enqueue(id).await {
            tracing::warn!(
                task_id = %id,
                error = %e,
                "Enqueue failed, recording synthetic failure",
            );
            let outcome = TaskOutcome::failure(
                FailureReason::QueueUnavailable,
                format!("queue unavailable: {e}"),
            );
            // If even this fails the task would be stuck RUNNING, so the
            // error must propagate rather than be swallowed.
            self.store.complete(id, outcome).await?;
        }

        tracing::info!(task_id = %id, "Task submitted");
        Ok(id)
    }
}
