use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use migplan_db::{PgQueueConfig, PgTaskStore, PgWorkQueue};
use migplan_worker::{StaticAnalyzer, WorkerConfig, WorkerPool};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "migplan_worker=debug,migplan_db=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        concurrency = config.concurrency,
        task_timeout_secs = config.task_timeout.as_secs(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = migplan_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    migplan_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Collaborators ---
    let store = Arc::new(PgTaskStore::new(pool.clone()));
    let queue = Arc::new(PgWorkQueue::new(
        pool.clone(),
        PgQueueConfig {
            visibility_timeout: config.visibility_timeout,
            max_attempts: config.queue_max_attempts,
            poll_interval: config.queue_poll_interval,
        },
    ));
    // Placeholder analyzer until a real analysis backend is wired in.
    let analyzer = Arc::new(StaticAnalyzer);

    // --- Worker pool ---
    let cancel = CancellationToken::new();
    let pool_handle = WorkerPool::start(store, queue, analyzer, config, cancel.clone());

    shutdown_signal().await;
    cancel.cancel();
    pool_handle.join().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
