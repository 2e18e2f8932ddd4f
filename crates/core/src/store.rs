//! In-memory `TaskStore` used by tests and broker-less local runs.
//!
//! Same transition semantics as the PostgreSQL store, including the
//! compare-and-swap completion guard, but durability degrades to
//! process-lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::task::{Task, TaskOutcome, TaskStatus, TaskStore};
use crate::types::TaskId;

/// Mutex-guarded task map. Cheap to share behind an `Arc`.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<HashMap<TaskId, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, input: &serde_json::Value) -> CoreResult<TaskId> {
        let id = TaskId::new_v4();
        let now = chrono::Utc::now();
        let task = Task {
            id,
            status: TaskStatus::Running,
            input: input.clone(),
            result: None,
            created_at: now,
            updated_at: now,
        };
        self.tasks
            .lock()
            .expect("task store mutex poisoned")
            .insert(id, task);
        Ok(id)
    }

    async fn get(&self, id: TaskId) -> CoreResult<Task> {
        self.tasks
            .lock()
            .expect("task store mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { id })
    }

    async fn get_status(&self, id: TaskId) -> CoreResult<TaskStatus> {
        self.get(id).await.map(|task| task.status)
    }

    async fn complete(&self, id: TaskId, outcome: TaskOutcome) -> CoreResult<()> {
        let mut tasks = self.tasks.lock().expect("task store mutex poisoned");
        let task = tasks.get_mut(&id).ok_or(CoreError::NotFound { id })?;

        // The one mandatory concurrency-control point: only a Running task
        // may transition, and exactly one concurrent caller wins.
        if task.status != TaskStatus::Running {
            return Err(CoreError::InvalidTransition {
                id,
                current: task.status,
            });
        }

        let status = outcome.status();
        let result = serde_json::to_value(&outcome)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize outcome: {e}")))?;
        task.status = status;
        task.result = Some(result);
        task.updated_at = chrono::Utc::now();
        Ok(())
    }
}
