//! Worker pool: spawns the configured number of worker loops and joins
//! them on shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use migplan_core::{TaskStore, WorkQueue};

use crate::analyzer::Analyzer;
use crate::config::WorkerConfig;
use crate::runner::Worker;

/// Handle over the running worker loops.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.concurrency` workers sharing the given collaborators.
    ///
    /// All workers observe the same cancellation token; claimed work is
    /// allowed to finish before a worker exits.
    pub fn start(
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn WorkQueue>,
        analyzer: Arc<dyn Analyzer>,
        config: WorkerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..config.concurrency)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    Arc::clone(&store),
                    Arc::clone(&queue),
                    Arc::clone(&analyzer),
                    config.clone(),
                );
                tokio::spawn(worker.run(cancel.clone()))
            })
            .collect();
        tracing::info!(concurrency = config.concurrency, "Worker pool started");
        Self { handles }
    }

    /// Wait for every worker loop to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}
