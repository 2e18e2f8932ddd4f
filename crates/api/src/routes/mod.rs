//! Route definitions.

pub mod health;
pub mod tasks;
