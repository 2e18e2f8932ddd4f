//! Row types mapping database tables to domain structs.

pub mod task;

pub use task::{QueueMessage, TaskRow};
