//! Domain core for the migration-analysis task engine.
//!
//! Holds the task state machine, the `TaskStore` and `WorkQueue` collaborator
//! traits, their in-memory implementations, and request validation. No
//! database dependency lives here; PostgreSQL implementations are in
//! `migplan-db`.

pub mod error;
pub mod queue;
pub mod request;
pub mod store;
pub mod task;
pub mod types;

pub use error::CoreError;
pub use queue::{Delivery, MemoryQueue, MemoryQueueConfig, WorkQueue};
pub use store::MemoryTaskStore;
pub use task::{FailureReason, Task, TaskOutcome, TaskStatus, TaskStore};
pub use types::{TaskId, Timestamp};
