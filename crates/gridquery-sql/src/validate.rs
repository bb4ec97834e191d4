//! Syntactic gate for synthesized query text.
//!
//! The default gate is deliberately weak: the text must mention `SELECT` and
//! `FROM` (case-insensitively). It catches obviously malformed output, not
//! semantic errors. Strict mode additionally runs the text through `sqlparser`
//! and requires exactly one `SELECT` statement.

use crate::{SqlError, SqlQuery};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryValidator {
    strict: bool,
}

impl QueryValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn validate(&self, query: &SqlQuery) -> Result<(), SqlError> {
        self.validate_text(query.text())
    }

    pub fn validate_text(&self, text: &str) -> Result<(), SqlError> {
        let upper = text.to_ascii_uppercase();
        if !upper.contains("SELECT") {
            return Err(SqlError::MissingKeyword("SELECT"));
        }
        if !upper.contains("FROM") {
            return Err(SqlError::MissingKeyword("FROM"));
        }
        if self.strict {
            check_single_select(text)?;
        }
        Ok(())
    }
}

fn check_single_select(text: &str) -> Result<(), SqlError> {
    let dialect = MySqlDialect {};
    let statements =
        Parser::parse_sql(&dialect, text).map_err(|e| SqlError::Parse(e.to_string()))?;
    if statements.len() != 1 {
        return Err(SqlError::NotASingleSelect(format!(
            "{} statements",
            statements.len()
        )));
    }
    match &statements[0] {
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Select(_) => Ok(()),
            other => Err(SqlError::NotASingleSelect(format!("{other}"))),
        },
        other => Err(SqlError::NotASingleSelect(format!("{other}"))),
    }
}
