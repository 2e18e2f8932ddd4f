//! Repository for the `tasks` table.
//!
//! `complete` is the engine's mandatory concurrency-control point: a
//! conditional UPDATE guarded on `status_id = RUNNING`, so concurrent
//! completions of the same id are serialized by the database and exactly
//! one caller observes `rows_affected = 1`.

use sqlx::PgPool;

use migplan_core::{TaskId, TaskStatus};

use crate::models::TaskRow;

/// Column list for `tasks` queries.
const COLUMNS: &str = "id, status_id, input, result, created_at, updated_at";

/// Provides CRUD operations for task records.
pub struct TaskRepo;

impl TaskRepo {
    /// Persist a new task in `RUNNING` state and return the row.
    ///
    /// The INSERT commits before this returns, so a caller that received
    /// the id can rely on the record surviving a crash.
    pub async fn create(
        pool: &PgPool,
        input: &serde_json::Value,
    ) -> Result<TaskRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (id, status_id, input) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(TaskId::new_v4())
            .bind(TaskStatus::Running.id())
            .bind(input)
            .fetch_one(pool)
            .await
    }

    /// Fetch a task by id.
    pub async fn find_by_id(
        pool: &PgPool,
        task_id: TaskId,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// Status-only projection for polling.
    pub async fn status(pool: &PgPool, task_id: TaskId) -> Result<Option<i16>, sqlx::Error> {
        let row: Option<(i16,)> = sqlx::query_as("SELECT status_id FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|(status_id,)| status_id))
    }

    /// Compare-and-swap completion: transition a `RUNNING` task to the given
    /// terminal status and store the result atomically.
    ///
    /// Returns the number of affected rows: 0 means the task was not in
    /// `RUNNING` state (or does not exist) and the caller must discard its
    /// own result.
    pub async fn complete(
        pool: &PgPool,
        task_id: TaskId,
        status: TaskStatus,
        result: &serde_json::Value,
    ) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, result = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(task_id)
        .bind(status.id())
        .bind(result)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected())
    }
}
