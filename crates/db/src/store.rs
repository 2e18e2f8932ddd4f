//! `TaskStore` implementation backed by PostgreSQL.

use migplan_core::{CoreError, Task, TaskId, TaskOutcome, TaskStatus, TaskStore};
use sqlx::PgPool;

use crate::repositories::TaskRepo;

/// Durable task store over the `tasks` table.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// sqlx errors here mean the store itself is unreachable or misbehaving,
/// never a task-domain condition.
fn store_err(err: sqlx::Error) -> CoreError {
    CoreError::StoreUnavailable(err.to_string())
}

#[async_trait::async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, input: &serde_json::Value) -> Result<TaskId, CoreError> {
        let row = TaskRepo::create(&self.pool, input).await.map_err(store_err)?;
        Ok(row.id)
    }

    async fn get(&self, id: TaskId) -> Result<Task, CoreError> {
        let row = TaskRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_err)?
            .ok_or(CoreError::NotFound { id })?;
        row.into_task()
    }

    async fn get_status(&self, id: TaskId) -> Result<TaskStatus, CoreError> {
        let status_id = TaskRepo::status(&self.pool, id)
            .await
            .map_err(store_err)?
            .ok_or(CoreError::NotFound { id })?;
        TaskStatus::from_id(status_id)
    }

    async fn complete(&self, id: TaskId, outcome: TaskOutcome) -> Result<(), CoreError> {
        let status = outcome.status();
        let result = serde_json::to_value(&outcome)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize outcome: {e}")))?;

        let affected = TaskRepo::complete(&self.pool, id, status, &result)
            .await
            .map_err(store_err)?;
        if affected > 0 {
            return Ok(());
        }

        // CAS lost: distinguish an unknown id from a finished task.
        match self.get_status(id).await? {
            TaskStatus::Running => Err(CoreError::Internal(format!(
                "Completion of running task {id} affected no rows"
            ))),
            current => Err(CoreError::InvalidTransition { id, current }),
        }
    }
}
