/// Task identifiers are UUIDs generated at submission time, never reused.
pub type TaskId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
