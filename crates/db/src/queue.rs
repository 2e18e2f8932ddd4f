//! `WorkQueue` implementation backed by the `task_queue` table.
//!
//! `dequeue` is a poll loop: each tick sweeps exhausted messages into the
//! dead-letter flag, then attempts a `SKIP LOCKED` claim. Blocking semantics
//! come from the loop suspending on the poll interval or the cancellation
//! token, whichever fires first.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use migplan_core::{CoreError, Delivery, TaskId, WorkQueue};

use crate::repositories::QueueRepo;

/// Tuning knobs for [`PgWorkQueue`], sourced from the environment by the
/// binaries that own it.
#[derive(Debug, Clone)]
pub struct PgQueueConfig {
    /// Window after which an unacked claim is redelivered. Tuned for crash
    /// recovery, not business SLAs — the worker's execution ceiling handles
    /// user-facing timeouts.
    pub visibility_timeout: Duration,
    /// Delivery attempts allowed before a message is dead-lettered.
    pub max_attempts: i32,
    /// How often `dequeue` re-checks for visible work.
    pub poll_interval: Duration,
}

impl Default for PgQueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(60),
            max_attempts: 3,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Durable work queue over the `task_queue` table.
#[derive(Clone)]
pub struct PgWorkQueue {
    pool: PgPool,
    config: PgQueueConfig,
}

impl PgWorkQueue {
    pub fn new(pool: PgPool, config: PgQueueConfig) -> Self {
        Self { pool, config }
    }
}

fn queue_err(err: sqlx::Error) -> CoreError {
    CoreError::QueueUnavailable(err.to_string())
}

#[async_trait::async_trait]
impl WorkQueue for PgWorkQueue {
    async fn enqueue(&self, task_id: TaskId) -> Result<(), CoreError> {
        QueueRepo::enqueue(&self.pool, task_id)
            .await
            .map_err(|e| CoreError::EnqueueFailed {
                id: task_id,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn dequeue(&self, cancel: &CancellationToken) -> Result<Option<Delivery>, CoreError> {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = ticker.tick() => {}
            }

            let swept = QueueRepo::sweep_dead(&self.pool, self.config.max_attempts)
                .await
                .map_err(queue_err)?;
            if swept > 0 {
                tracing::warn!(count = swept, "Dead-lettered messages over retry budget");
            }

            let claimed = QueueRepo::claim_next(
                &self.pool,
                self.config.visibility_timeout.as_secs_f64(),
                self.config.max_attempts,
            )
            .await
            .map_err(queue_err)?;

            if let Some(msg) = claimed {
                return Ok(Some(Delivery {
                    receipt: msg.receipt,
                    task_id: msg.task_id,
                    attempt: msg.attempts,
                }));
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), CoreError> {
        QueueRepo::ack(&self.pool, delivery.receipt)
            .await
            .map_err(queue_err)
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), CoreError> {
        QueueRepo::nack(&self.pool, delivery.receipt)
            .await
            .map_err(queue_err)
    }
}
