//! HTTP handlers.

pub mod tasks;
