//! Submission payload for a migration-analysis job.
//!
//! The engine treats the payload as opaque once captured; validation covers
//! shape only, never SQL semantics.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// A single DDL statement, typically `CREATE TABLE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdlStatement {
    pub statement: String,
}

/// One workload query with its run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryItem {
    pub queryid: Uuid,
    pub query: String,
    /// Number of times the query is run.
    pub runquantity: i64,
    /// Observed execution time, if the client reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executiontime: Option<i64>,
}

/// Full migration-analysis request: target connection, schema, workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    /// JDBC connection string for the target database.
    pub url: String,
    pub ddl: Vec<DdlStatement>,
    pub queries: Vec<QueryItem>,
}

impl MigrationRequest {
    /// Validate the request shape.
    ///
    /// Rules:
    /// - `url` must not be empty.
    /// - Every DDL statement must be non-empty.
    /// - Every query must be non-empty with a non-negative `runquantity`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.url.trim().is_empty() {
            return Err(CoreError::Validation(
                "Connection url must not be empty".to_string(),
            ));
        }
        for (i, ddl) in self.ddl.iter().enumerate() {
            if ddl.statement.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "DDL statement at index {i} must not be empty"
                )));
            }
        }
        for (i, item) in self.queries.iter().enumerate() {
            if item.query.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "Query at index {i} must not be empty"
                )));
            }
            if item.runquantity < 0 {
                return Err(CoreError::Validation(format!(
                    "Query at index {i} has negative runquantity"
                )));
            }
        }
        Ok(())
    }
}
