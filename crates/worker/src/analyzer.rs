//! The external analysis collaborator boundary.
//!
//! The engine does not interpret the analysis internals, only its outcome:
//! a result payload or a typed failure. Calls may be unboundedly long; the
//! worker wraps them in the execution ceiling.

use serde_json::json;

/// Analysis function invoked with a task's input payload.
///
/// Delivery is at-least-once: a worker crash mid-execution leads to the
/// same task being re-executed elsewhere, so implementations must be safe
/// to repeat.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, input: &serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

/// Canned analyzer for development runs without a real analysis backend.
///
/// Produces a placeholder migration plan echoing the submitted queries,
/// marked as rewritten.
#[derive(Debug, Default)]
pub struct StaticAnalyzer;

#[async_trait::async_trait]
impl Analyzer for StaticAnalyzer {
    async fn analyze(&self, input: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let queries: Vec<serde_json::Value> = input["queries"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|q| {
                        json!({
                            "queryid": q["queryid"],
                            "query": format!("{} -- updated", q["query"].as_str().unwrap_or("")),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "ddl": [{"statement": "CREATE TABLE new_t1 (x int)"}],
            "migrations": [{"statement": "INSERT INTO new_t1 SELECT * FROM old_t1"}],
            "queries": queries,
        }))
    }
}
