//! Wire DTOs for the task endpoints.

use serde::{Deserialize, Serialize};

use migplan_core::{TaskId, TaskStatus};

/// Response body for `POST /new`.
#[derive(Debug, Serialize)]
pub struct TaskCreated {
    pub taskid: TaskId,
}

/// Response body for `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: TaskStatus,
}

/// Response body for `GET /getresult`. `result` is null unless the task
/// reached a terminal state.
#[derive(Debug, Serialize)]
pub struct ResultBody {
    pub taskid: TaskId,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
}

/// Query parameters for the polling endpoints.
#[derive(Debug, Deserialize)]
pub struct TaskIdQuery {
    pub task_id: TaskId,
}
