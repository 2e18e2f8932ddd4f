//! Route definitions for the task endpoints.
//!
//! ```text
//! POST   /new         -> start_task
//! GET    /status      -> get_status     (?task_id={uuid})
//! GET    /getresult   -> get_result     (?task_id={uuid})
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at the application root.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new", post(tasks::start_task))
        .route("/status", get(tasks::get_status))
        .route("/getresult", get(tasks::get_result))
}
