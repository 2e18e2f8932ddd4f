use std::sync::Arc;

use migplan_core::TaskStore;

use crate::config::ServerConfig;
use crate::engine::Dispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The store and
/// dispatcher are trait objects so tests run over the in-memory
/// implementations and production over PostgreSQL.
#[derive(Clone)]
pub struct AppState {
    /// Read side: status/result polling goes straight to the task store.
    pub store: Arc<dyn TaskStore>,
    /// Write side: submission goes through the dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
