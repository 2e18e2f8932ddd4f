//! PostgreSQL persistence for the task engine.
//!
//! Pool helpers plus the `PgTaskStore` / `PgWorkQueue` implementations of
//! the core collaborator traits. Repositories are zero-sized structs with
//! async methods taking `&PgPool`.

pub mod models;
pub mod queue;
pub mod repositories;
pub mod store;

pub use queue::{PgQueueConfig, PgWorkQueue};
pub use store::PgTaskStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Database connection pool shared across the process.
pub type DbPool = PgPool;

/// Create a connection pool for the given database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations. Both binaries run this at boot.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
