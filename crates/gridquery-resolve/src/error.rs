//! Error taxonomy for resolution runs.
//!
//! Every variant collapses to the same [`ThoughtValidity::Invalid`] verdict at
//! the state-machine boundary; the distinction is kept for logs and traces.
//!
//! [`ThoughtValidity::Invalid`]: crate::ThoughtValidity::Invalid

use crate::{Intent, Slot};
use gridquery_sql::SqlError;

/// Failure reported by a graph or relational store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed store response: {0}")]
    Malformed(String),
    #[error("unsupported statement: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("no intent pattern matched the query")]
    Classification,

    #[error("{intent} requires the `{slot}` slot, but nothing was extracted")]
    Extraction { intent: Intent, slot: Slot },

    #[error("`{value}` ({slot}) is not a known entity")]
    EntityValidation { slot: Slot, value: String },

    #[error("no schema binding for {intent} ({key})")]
    SchemaResolution { intent: Intent, key: String },

    #[error("cannot synthesize {intent} query: {reason}")]
    Synthesis { intent: Intent, reason: String },

    #[error("query rejected by validator: {0}")]
    QuerySyntax(SqlError),

    #[error("query returned no rows")]
    EmptyResult,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("problem text does not match the text this run was started with")]
    ProblemMismatch,

    #[error("run already finished")]
    RunFinished,
}

impl ResolveError {
    /// Stable taxonomy label used in traces and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            ResolveError::Classification => "classification_failure",
            ResolveError::Extraction { .. } => "extraction_failure",
            ResolveError::EntityValidation { .. } => "entity_validation_failure",
            ResolveError::SchemaResolution { .. } => "schema_resolution_failure",
            ResolveError::Synthesis { .. } => "synthesis_failure",
            ResolveError::QuerySyntax(_) => "query_syntax_failure",
            ResolveError::EmptyResult => "empty_result",
            ResolveError::Store(_) => "store_error",
            ResolveError::ProblemMismatch => "problem_mismatch",
            ResolveError::RunFinished => "run_finished",
        }
    }
}

/// Why a template could not be filled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("result row has no `{0}` column")]
    MissingField(String),
    #[error("column `{field}` is {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot compute {0}: division by zero")]
    DivisionByZero(&'static str),
}
