//! HTTP service for the migration-analysis task engine.
//!
//! Thin transport layer over the core: the dispatcher owns submission, the
//! task store answers status/result polling. All task-domain failures
//! terminate at the task record; only infrastructure errors surface as 500s.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod routes;
pub mod state;
