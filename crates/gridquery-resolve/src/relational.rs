//! Relational store seam.

use crate::error::StoreError;
use gridquery_sql::{ResultRow, SqlQuery};

/// Executes validated, parameterized queries. Calls block until the store
/// answers; there is no timeout or retry at this layer.
pub trait RelationalStore: Send + Sync {
    fn execute(&self, query: &SqlQuery) -> Result<Vec<ResultRow>, StoreError>;
}

impl<F> RelationalStore for F
where
    F: Fn(&SqlQuery) -> Result<Vec<ResultRow>, StoreError> + Send + Sync,
{
    fn execute(&self, query: &SqlQuery) -> Result<Vec<ResultRow>, StoreError> {
        self(query)
    }
}
