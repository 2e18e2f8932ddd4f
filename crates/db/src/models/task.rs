use migplan_core::{CoreError, Task, TaskId, TaskStatus, Timestamp};
use sqlx::FromRow;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: TaskId,
    pub status_id: i16,
    pub input: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskRow {
    /// Convert into the domain task, decoding the status id.
    pub fn into_task(self) -> Result<Task, CoreError> {
        Ok(Task {
            id: self.id,
            status: TaskStatus::from_id(self.status_id)?,
            input: self.input,
            result: self.result,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A claimed row from the `task_queue` table.
#[derive(Debug, Clone, FromRow)]
pub struct QueueMessage {
    pub receipt: i64,
    pub task_id: TaskId,
    pub attempts: i32,
}
