//! Repository for the `task_queue` table.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so concurrent workers never race
//! on the same row, and pushes `visible_at` forward by the visibility
//! timeout — an unacked claim is redelivered after the window elapses.

use sqlx::PgPool;

use migplan_core::TaskId;

use crate::models::QueueMessage;

/// Provides delivery bookkeeping for queued task ids.
pub struct QueueRepo;

impl QueueRepo {
    /// Durably admit a task id for delivery. Returns the receipt.
    pub async fn enqueue(pool: &PgPool, task_id: TaskId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("INSERT INTO task_queue (task_id) VALUES ($1) RETURNING receipt")
                .bind(task_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Atomically claim the next visible message, if any.
    ///
    /// Bumps the attempt counter and hides the row for `visibility_secs`.
    pub async fn claim_next(
        pool: &PgPool,
        visibility_secs: f64,
        max_attempts: i32,
    ) -> Result<Option<QueueMessage>, sqlx::Error> {
        sqlx::query_as::<_, QueueMessage>(
            "UPDATE task_queue \
             SET attempts = attempts + 1, \
                 visible_at = NOW() + ($1 * INTERVAL '1 second') \
             WHERE receipt = ( \
                 SELECT receipt FROM task_queue \
                 WHERE NOT dead AND visible_at <= NOW() AND attempts < $2 \
                 ORDER BY receipt \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING receipt, task_id, attempts",
        )
        .bind(visibility_secs)
        .bind(max_attempts)
        .fetch_optional(pool)
        .await
    }

    /// Flag messages whose attempt budget is spent so they are never
    /// delivered again. Returns how many rows were dead-lettered.
    pub async fn sweep_dead(pool: &PgPool, max_attempts: i32) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE task_queue SET dead = TRUE \
             WHERE NOT dead AND visible_at <= NOW() AND attempts >= $1",
        )
        .bind(max_attempts)
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected())
    }

    /// Permanently remove an acknowledged message.
    pub async fn ack(pool: &PgPool, receipt: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_queue WHERE receipt = $1")
            .bind(receipt)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Make a claimed message immediately visible for redelivery.
    pub async fn nack(pool: &PgPool, receipt: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE task_queue SET visible_at = NOW() WHERE receipt = $1")
            .bind(receipt)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Count of dead-lettered messages, for operator inspection.
    pub async fn dead_letter_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_queue WHERE dead")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
