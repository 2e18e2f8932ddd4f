//! Work queue contract and the in-memory implementation.
//!
//! The queue is a durable, at-least-once delivery channel carrying task ids
//! from the dispatcher to the workers. It owns all delivery bookkeeping
//! (visibility timeout, attempt counting, dead-lettering); the engine never
//! infers delivery state itself. At-least-once delivery plus the store's
//! idempotent completion guard give effectively-once *outcome* semantics.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, CoreResult};
use crate::types::TaskId;

/// One unit of claimed work. Holds the receipt needed to ack or nack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Queue-internal receipt identifying this message.
    pub receipt: i64,
    pub task_id: TaskId,
    /// 1-based delivery attempt; above 1 means redelivery.
    pub attempt: i32,
}

/// Durable, at-least-once message channel between dispatcher and workers.
#[async_trait::async_trait]
pub trait WorkQueue: Send + Sync {
    /// Admit a task id for later delivery.
    ///
    /// Either succeeds durably or fails with `CoreError::EnqueueFailed`;
    /// never silently drops. On failure the dispatcher must mark the task
    /// `Failed` so it does not stay `Running` forever.
    async fn enqueue(&self, task_id: TaskId) -> CoreResult<()>;

    /// Deliver one unit of work, suspending until work arrives or the
    /// cancellation token fires. Returns `None` on shutdown.
    ///
    /// A claimed delivery is invisible to other consumers for the visibility
    /// timeout window and is redelivered afterwards if neither acked nor
    /// nacked (handles a worker crash mid-processing). Messages that exhaust
    /// their attempt budget move to the dead-letter area instead.
    async fn dequeue(&self, cancel: &CancellationToken) -> CoreResult<Option<Delivery>>;

    /// Confirm success: remove the message permanently.
    async fn ack(&self, delivery: &Delivery) -> CoreResult<()>;

    /// Signal failure: make the message immediately visible for redelivery.
    async fn nack(&self, delivery: &Delivery) -> CoreResult<()>;
}

/// Tuning knobs for [`MemoryQueue`].
#[derive(Debug, Clone)]
pub struct MemoryQueueConfig {
    /// Window after which an unacked delivery is considered abandoned.
    pub visibility_timeout: Duration,
    /// Delivery attempts allowed before a message is dead-lettered.
    pub max_attempts: i32,
    /// How often `dequeue` re-checks for visible work.
    pub poll_interval: Duration,
}

impl Default for MemoryQueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(30),
            max_attempts: 3,
            poll_interval: Duration::from_millis(25),
        }
    }
}

#[derive(Debug)]
struct Message {
    receipt: i64,
    task_id: TaskId,
    attempts: i32,
    visible_at: Instant,
}

#[derive(Default)]
struct QueueInner {
    next_receipt: i64,
    messages: VecDeque<Message>,
    dead: Vec<Message>,
}

/// In-memory `WorkQueue` with real visibility-timeout semantics.
///
/// Used by tests and broker-less local runs; delivery bookkeeping matches
/// the PostgreSQL queue, durability degrades to process-lifetime.
pub struct MemoryQueue {
    inner: Mutex<QueueInner>,
    config: MemoryQueueConfig,
}

impl MemoryQueue {
    pub fn new(config: MemoryQueueConfig) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            config,
        }
    }

    /// Messages currently queued or in flight (excludes dead letters).
    pub fn pending_count(&self) -> usize {
        self.inner.lock().expect("queue mutex poisoned").messages.len()
    }

    /// Messages that exhausted their attempt budget.
    pub fn dead_letter_count(&self) -> usize {
        self.inner.lock().expect("queue mutex poisoned").dead.len()
    }

    /// Claim the next visible message, if any. Also sweeps messages whose
    /// attempt budget is spent into the dead-letter area.
    fn try_claim(&self) -> Option<Delivery> {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        let now = Instant::now();

        let mut idx = 0;
        while idx < inner.messages.len() {
            let visible = inner.messages[idx].visible_at <= now;
            let exhausted = inner.messages[idx].attempts >= self.config.max_attempts;
            if visible && exhausted {
                let msg = inner.messages.remove(idx).unwrap();
                tracing::warn!(
                    task_id = %msg.task_id,
                    attempts = msg.attempts,
                    "Message exceeded retry budget, moving to dead letters",
                );
                inner.dead.push(msg);
            } else {
                idx += 1;
            }
        }

        let pos = inner.messages.iter().position(|m| m.visible_at <= now)?;
        let msg = &mut inner.messages[pos];
        msg.attempts += 1;
        msg.visible_at = now + self.config.visibility_timeout;
        Some(Delivery {
            receipt: msg.receipt,
            task_id: msg.task_id,
            attempt: msg.attempts,
        })
    }
}

#[async_trait::async_trait]
impl WorkQueue for MemoryQueue {
    async fn enqueue(&self, task_id: TaskId) -> CoreResult<()> {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        inner.next_receipt += 1;
        let receipt = inner.next_receipt;
        inner.messages.push_back(Message {
            receipt,
            task_id,
            attempts: 0,
            visible_at: Instant::now(),
        });
        Ok(())
    }

    async fn dequeue(&self, cancel: &CancellationToken) -> CoreResult<Option<Delivery>> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if let Some(delivery) = self.try_claim() {
                return Ok(Some(delivery));
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> CoreResult<()> {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        inner.messages.retain(|m| m.receipt != delivery.receipt);
        // The message may have been swept to the dead-letter area while the
        // acking worker was still executing; an ack removes it from there
        // too, matching the Postgres queue's unconditional DELETE.
        inner.dead.retain(|m| m.receipt != delivery.receipt);
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> CoreResult<()> {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        let now = Instant::now();
        if let Some(msg) = inner
            .messages
            .iter_mut()
            .find(|m| m.receipt == delivery.receipt)
        {
            msg.visible_at = now;
        }
        Ok(())
    }
}
