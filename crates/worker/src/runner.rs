//! The worker execution loop.
//!
//! Per delivery: load the task, run the analyzer under the execution
//! ceiling, write the terminal outcome, acknowledge. Duplicate deliveries
//! of finished tasks are acked and discarded; a lost completion race is
//! acked and the local result discarded. If the store is unreachable when
//! a finished outcome must be recorded, the delivery is deliberately left
//! unacked so the visibility timeout redelivers it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use migplan_core::error::CoreResult;
use migplan_core::{
    CoreError, Delivery, FailureReason, Task, TaskOutcome, TaskStore, WorkQueue,
};

use crate::analyzer::Analyzer;
use crate::config::WorkerConfig;

/// Base delay for transient-error backoff.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Ceiling for transient-error backoff.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

/// Attempts before giving up on a store/queue call.
const RETRY_ATTEMPTS: u32 = 5;

/// A single worker loop. Spawn several via [`crate::WorkerPool`].
pub struct Worker {
    id: usize,
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn WorkQueue>,
    analyzer: Arc<dyn Analyzer>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        id: usize,
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn WorkQueue>,
        analyzer: Arc<dyn Analyzer>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            id,
            store,
            queue,
            analyzer,
            config,
        }
    }

    /// Run until the cancellation token fires.
    ///
    /// Work already claimed when shutdown starts is allowed to finish; only
    /// the blocking `dequeue` observes the token.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(worker = self.id, "Worker started");
        loop {
            let delivery = match self.queue.dequeue(&cancel).await {
                Ok(Some(delivery)) => delivery,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(worker = self.id, error = %e, "Dequeue failed, backing off");
                    tokio::time::sleep(RETRY_BASE_DELAY).await;
                    continue;
                }
            };

            if let Err(e) = self.process(&delivery).await {
                tracing::error!(
                    worker = self.id,
                    task_id = %delivery.task_id,
                    error = %e,
                    "Abandoning delivery; queue will redeliver after the visibility timeout",
                );
            }
        }
        tracing::info!(worker = self.id, "Worker stopped");
    }

    /// Handle one delivery end to end.
    ///
    /// Returns `Err` only when no safe recorded outcome was possible and the
    /// delivery must stay unacked for redelivery.
    pub(crate) async fn process(&self, delivery: &Delivery) -> CoreResult<()> {
        let task_id = delivery.task_id;

        let task = match self
            .with_backoff("load task", || self.store.get(task_id))
            .await
        {
            Ok(task) => task,
            Err(CoreError::NotFound { .. }) => {
                tracing::warn!(worker = self.id, %task_id, "Delivery for unknown task, discarding");
                self.ack_best_effort(delivery).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if task.status.is_terminal() {
            // Redelivery raced a completed execution; nothing left to do.
            tracing::debug!(
                worker = self.id,
                %task_id,
                status = %task.status,
                "Duplicate delivery of finished task, discarding",
            );
            self.ack_best_effort(delivery).await;
            return Ok(());
        }

        tracing::info!(
            worker = self.id,
            %task_id,
            attempt = delivery.attempt,
            "Executing task",
        );
        let outcome = self.execute(&task).await;

        match self
            .with_backoff("record outcome", || {
                self.store.complete(task_id, outcome.clone())
            })
            .await
        {
            Ok(()) => {
                tracing::info!(worker = self.id, %task_id, status = %outcome.status(), "Task finished");
            }
            Err(CoreError::InvalidTransition { current, .. }) => {
                // Another worker won the completion race; discard our result
                // and still ack to stop redelivery.
                tracing::warn!(
                    worker = self.id,
                    %task_id,
                    %current,
                    "Lost completion race, discarding result",
                );
            }
            // An uncommitted completion must not be silently lost: leave the
            // delivery unacked and let redelivery re-execute.
            Err(e) => return Err(e),
        }

        self.ack_best_effort(delivery).await;
        Ok(())
    }

    /// Run the analyzer under the execution ceiling and fold every failure
    /// mode into a terminal outcome.
    async fn execute(&self, task: &Task) -> TaskOutcome {
        match tokio::time::timeout(self.config.task_timeout, self.analyzer.analyze(&task.input))
            .await
        {
            Ok(Ok(payload)) => TaskOutcome::success(payload),
            Ok(Err(e)) => TaskOutcome::failure(FailureReason::Analysis, format!("{e:#}")),
            Err(_) => TaskOutcome::failure(
                FailureReason::Timeout,
                format!(
                    "Execution exceeded the {}s ceiling",
                    self.config.task_timeout.as_secs()
                ),
            ),
        }
    }

    /// Ack a delivery, retrying transient failures.
    ///
    /// If acking ultimately fails the task will be redelivered, load as
    /// terminal, and be discarded then — safe, just wasted work.
    async fn ack_best_effort(&self, delivery: &Delivery) {
        if let Err(e) = self
            .with_backoff("ack delivery", || self.queue.ack(delivery))
            .await
        {
            tracing::warn!(
                worker = self.id,
                task_id = %delivery.task_id,
                error = %e,
                "Failed to ack delivery; redelivery will be discarded as duplicate",
            );
        }
    }

    /// Retry `op` with bounded exponential backoff while it fails with a
    /// transient infrastructure error.
    async fn with_backoff<T, F, Fut>(&self, what: &str, mut op: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < RETRY_ATTEMPTS => {
                    tracing::warn!(
                        worker = self.id,
                        attempt,
                        error = %e,
                        "Transient failure during {what}, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use migplan_core::{
        MemoryQueue, MemoryQueueConfig, MemoryTaskStore, TaskId, TaskStatus,
    };

    use super::*;

    struct OkAnalyzer;

    #[async_trait::async_trait]
    impl Analyzer for OkAnalyzer {
        async fn analyze(&self, _input: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({"ok": true}))
        }
    }

    struct FailingAnalyzer;

    #[async_trait::async_trait]
    impl Analyzer for FailingAnalyzer {
        async fn analyze(&self, _input: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
            anyhow::bail!("catalog unreachable")
        }
    }

    struct HangingAnalyzer;

    #[async_trait::async_trait]
    impl Analyzer for HangingAnalyzer {
        async fn analyze(&self, _input: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(serde_json::json!({"too": "late"}))
        }
    }

    /// Completes the task out from under the worker mid-execution, then
    /// reports its own success. Simulates a redelivered sibling finishing
    /// first while this worker is still executing.
    struct RacingAnalyzer {
        store: Arc<MemoryTaskStore>,
        target: std::sync::OnceLock<TaskId>,
    }

    #[async_trait::async_trait]
    impl Analyzer for RacingAnalyzer {
        async fn analyze(&self, _input: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
            let id = *self.target.get().expect("target task id not set");
            self.store
                .complete(id, TaskOutcome::success(serde_json::json!({"winner": "other"})))
                .await
                .unwrap();
            Ok(serde_json::json!({"winner": "me"}))
        }
    }

    fn fixtures(
        analyzer: Arc<dyn Analyzer>,
    ) -> (Arc<MemoryTaskStore>, Arc<MemoryQueue>, Worker) {
        let store = Arc::new(MemoryTaskStore::new());
        let queue = Arc::new(MemoryQueue::new(MemoryQueueConfig {
            visibility_timeout: Duration::from_secs(30),
            max_attempts: 3,
            poll_interval: Duration::from_millis(10),
        }));
        let config = WorkerConfig {
            task_timeout: Duration::from_secs(5),
            ..WorkerConfig::default()
        };
        let worker = Worker::new(
            0,
            Arc::clone(&store) as Arc<dyn TaskStore>,
            Arc::clone(&queue) as Arc<dyn WorkQueue>,
            analyzer,
            config,
        );
        (store, queue, worker)
    }

    async fn submit(
        store: &MemoryTaskStore,
        queue: &MemoryQueue,
        input: serde_json::Value,
    ) -> TaskId {
        let id = store.create(&input).await.unwrap();
        queue.enqueue(id).await.unwrap();
        id
    }

    #[tokio::test(start_paused = true)]
    async fn successful_execution_ends_done_with_result() {
        let (store, queue, worker) = fixtures(Arc::new(OkAnalyzer));
        let cancel = CancellationToken::new();
        let id = submit(&store, &queue, serde_json::json!({"ddl": []})).await;

        let delivery = queue.dequeue(&cancel).await.unwrap().unwrap();
        worker.process(&delivery).await.unwrap();

        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.result.unwrap()["payload"]["ok"], true);
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_error_ends_failed_with_reason() {
        let (store, queue, worker) = fixtures(Arc::new(FailingAnalyzer));
        let cancel = CancellationToken::new();
        let id = submit(&store, &queue, serde_json::json!({})).await;

        let delivery = queue.dequeue(&cancel).await.unwrap().unwrap();
        worker.process(&delivery).await.unwrap();

        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        let result = task.result.unwrap();
        assert_eq!(result["kind"], "failure");
        assert_eq!(result["reason"], "analysis");
        assert!(result["detail"].as_str().unwrap().contains("catalog unreachable"));
        // A failed analysis is a handled outcome: never redelivered.
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn execution_ceiling_ends_failed_with_timeout_reason() {
        let (store, queue, worker) = fixtures(Arc::new(HangingAnalyzer));
        let cancel = CancellationToken::new();
        let id = submit(&store, &queue, serde_json::json!({})).await;

        let delivery = queue.dequeue(&cancel).await.unwrap().unwrap();
        let started = tokio::time::Instant::now();
        worker.process(&delivery).await.unwrap();

        // Bounded by ceiling + epsilon, not the analyzer's hour-long hang.
        assert!(started.elapsed() < Duration::from_secs(6));

        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        let result = task.result.unwrap();
        assert_eq!(result["reason"], "timeout");
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_delivery_of_finished_task_is_discarded() {
        let (store, queue, worker) = fixtures(Arc::new(OkAnalyzer));
        let cancel = CancellationToken::new();
        let id = submit(&store, &queue, serde_json::json!({})).await;

        store
            .complete(id, TaskOutcome::success(serde_json::json!({"first": true})))
            .await
            .unwrap();

        let delivery = queue.dequeue(&cancel).await.unwrap().unwrap();
        worker.process(&delivery).await.unwrap();

        // Original result untouched, message gone.
        let task = store.get(id).await.unwrap();
        assert_eq!(task.result.unwrap()["payload"]["first"], true);
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_task_delivery_is_discarded() {
        let (store, queue, worker) = fixtures(Arc::new(OkAnalyzer));
        let cancel = CancellationToken::new();

        queue.enqueue(TaskId::new_v4()).await.unwrap();
        let delivery = queue.dequeue(&cancel).await.unwrap().unwrap();
        worker.process(&delivery).await.unwrap();

        assert_eq!(queue.pending_count(), 0);
        assert_matches!(
            store.get(delivery.task_id).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn losing_the_completion_race_discards_local_result() {
        let store = Arc::new(MemoryTaskStore::new());
        let queue = Arc::new(MemoryQueue::new(MemoryQueueConfig::default()));
        let analyzer = Arc::new(RacingAnalyzer {
            store: Arc::clone(&store),
            target: std::sync::OnceLock::new(),
        });
        let worker = Worker::new(
            0,
            Arc::clone(&store) as Arc<dyn TaskStore>,
            Arc::clone(&queue) as Arc<dyn WorkQueue>,
            Arc::clone(&analyzer) as Arc<dyn Analyzer>,
            WorkerConfig::default(),
        );
        let cancel = CancellationToken::new();

        let id = submit(&store, &queue, serde_json::json!({})).await;
        analyzer.target.set(id).unwrap();

        let delivery = queue.dequeue(&cancel).await.unwrap().unwrap();
        worker.process(&delivery).await.unwrap();

        // The sibling's result stands; the local result was discarded and
        // the delivery acked anyway to stop redelivery.
        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.result.unwrap()["payload"]["winner"], "other");
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn crash_before_ack_leads_to_redelivery_and_single_outcome() {
        let (store, queue, worker) = fixtures(Arc::new(OkAnalyzer));
        let cancel = CancellationToken::new();
        let id = submit(&store, &queue, serde_json::json!({})).await;

        // Worker A claims and "crashes": never acks.
        let abandoned = queue.dequeue(&cancel).await.unwrap().unwrap();
        assert_eq!(abandoned.attempt, 1);

        // After the visibility timeout, worker B receives the same task.
        tokio::time::sleep(Duration::from_secs(31)).await;
        let redelivered = queue.dequeue(&cancel).await.unwrap().unwrap();
        assert_eq!(redelivered.task_id, id);
        assert_eq!(redelivered.attempt, 2);

        worker.process(&redelivered).await.unwrap();

        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_exits_on_cancellation() {
        let (_store, _queue, worker) = fixtures(Arc::new(OkAnalyzer));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(worker.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
