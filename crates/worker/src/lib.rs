//! Worker pool for the migration-analysis task engine.
//!
//! Workers pull task ids off the work queue, run the external analysis
//! collaborator against the stored input, and write the terminal outcome
//! back to the task store. Analysis failures and timeouts are terminal task
//! outcomes, never process faults; only unrecoverable store/queue outages
//! abandon a delivery to queue redelivery.

pub mod analyzer;
pub mod config;
pub mod pool;
pub mod runner;

pub use analyzer::{Analyzer, StaticAnalyzer};
pub use config::WorkerConfig;
pub use pool::WorkerPool;
pub use runner::Worker;
