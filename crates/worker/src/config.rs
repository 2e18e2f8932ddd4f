use std::time::Duration;

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent worker loops (default: `4`).
    pub concurrency: usize,
    /// Per-task execution ceiling (default: `1200` seconds). This is the
    /// user-facing timeout; the queue's visibility timeout only covers
    /// crash recovery.
    pub task_timeout: Duration,
    /// Queue visibility timeout (default: `60` seconds).
    pub visibility_timeout: Duration,
    /// Delivery attempts before dead-lettering (default: `3`).
    pub queue_max_attempts: i32,
    /// Queue poll interval (default: `1000` ms).
    pub queue_poll_interval: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `WORKER_CONCURRENCY`      | `4`     |
    /// | `TASK_TIMEOUT_SECS`       | `1200`  |
    /// | `VISIBILITY_TIMEOUT_SECS` | `60`    |
    /// | `QUEUE_MAX_ATTEMPTS`      | `3`     |
    /// | `QUEUE_POLL_INTERVAL_MS`  | `1000`  |
    pub fn from_env() -> Self {
        let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid usize");

        let task_timeout_secs: u64 = std::env::var("TASK_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1200".into())
            .parse()
            .expect("TASK_TIMEOUT_SECS must be a valid u64");

        let visibility_timeout_secs: u64 = std::env::var("VISIBILITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("VISIBILITY_TIMEOUT_SECS must be a valid u64");

        let queue_max_attempts: i32 = std::env::var("QUEUE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("QUEUE_MAX_ATTEMPTS must be a valid i32");

        let queue_poll_interval_ms: u64 = std::env::var("QUEUE_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("QUEUE_POLL_INTERVAL_MS must be a valid u64");

        Self {
            concurrency,
            task_timeout: Duration::from_secs(task_timeout_secs),
            visibility_timeout: Duration::from_secs(visibility_timeout_secs),
            queue_max_attempts,
            queue_poll_interval: Duration::from_millis(queue_poll_interval_ms),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            task_timeout: Duration::from_secs(1200),
            visibility_timeout: Duration::from_secs(60),
            queue_max_attempts: 3,
            queue_poll_interval: Duration::from_millis(1000),
        }
    }
}
