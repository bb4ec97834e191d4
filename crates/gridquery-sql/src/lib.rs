//! Parameterized SQL for gridquery.
//!
//! Queries are never assembled by splicing user text into SQL. Values travel as
//! ordered `?` parameters next to the statement text, and the only names that
//! reach the text are [`Ident`]s, which reject anything that could escape a
//! backtick-quoted identifier.
//!
//! ```text
//! SqlBuilder ──push_str / push_ident / push_param──► SqlQuery { text, params }
//!                                                        │
//!                                                 QueryValidator
//!                                                        │
//!                                                 relational store ──► Vec<ResultRow>
//! ```

pub mod validate;
mod value;

pub use validate::QueryValidator;
pub use value::{ResultRow, SqlValue};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SqlError {
    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("query text is missing the `{0}` keyword")]
    MissingKeyword(&'static str),
    #[error("failed to parse SQL: {0}")]
    Parse(String),
    #[error("expected exactly one SELECT statement, got {0}")]
    NotASingleSelect(String),
    #[error("placeholder count mismatch: text has {placeholders}, {params} parameters bound")]
    ParamCountMismatch { placeholders: usize, params: usize },
}

// ============================================================================
// Identifiers
// ============================================================================

/// A table or column name that is safe to quote into statement text.
///
/// Names come from the schema directory rather than from users, but they are
/// still checked: no quotes, backticks, statement separators, placeholders,
/// comment markers or control/whitespace characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: &str) -> Result<Self, SqlError> {
        let trimmed = name.trim();
        let bad_char = |c: char| {
            c.is_control()
                || c.is_whitespace()
                || matches!(c, '`' | '\'' | '"' | ';' | '?' | '\\' | '#')
        };
        if trimmed.is_empty() || trimmed != name || name.chars().any(bad_char) || name.contains("--")
        {
            return Err(SqlError::InvalidIdentifier(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form used in statement text.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.0)
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Statement text plus the values bound to its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    text: String,
    params: Vec<SqlValue>,
}

impl SqlQuery {
    pub fn new(text: impl Into<String>, params: Vec<SqlValue>) -> Result<Self, SqlError> {
        let text = text.into();
        let placeholders = count_placeholders(&text);
        if placeholders != params.len() {
            return Err(SqlError::ParamCountMismatch {
                placeholders,
                params: params.len(),
            });
        }
        Ok(Self { text, params })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, " -- params: [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// `?` outside quoted identifiers and string literals.
fn count_placeholders(text: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '`' | '\'' | '"' => quote = Some(c),
                '?' => count += 1,
                _ => {}
            },
        }
    }
    count
}

/// Incremental builder that keeps text and parameters in lockstep.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    text: String,
    params: Vec<SqlValue>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, sql: &str) -> &mut Self {
        self.text.push_str(sql);
        self
    }

    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        self.text.push_str(&ident.quoted());
        self
    }

    /// Qualified `alias.`name``.
    pub fn push_qualified(&mut self, alias: &str, ident: &Ident) -> &mut Self {
        self.text.push_str(alias);
        self.text.push('.');
        self.push_ident(ident)
    }

    pub fn push_param(&mut self, value: SqlValue) -> &mut Self {
        self.text.push('?');
        self.params.push(value);
        self
    }

    pub fn build(self) -> Result<SqlQuery, SqlError> {
        SqlQuery::new(self.text, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_accepts_schema_names() {
        for name in ["系统负荷", "yc_hs_720001cur_010", "power_plant_info", "预测值表"] {
            assert!(Ident::new(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn ident_rejects_escape_attempts() {
        for name in [
            "",
            " load",
            "a`b",
            "x'; DROP TABLE t; --",
            "a b",
            "t--",
            "a?b",
            "a\nb",
        ] {
            assert!(
                matches!(Ident::new(name), Err(SqlError::InvalidIdentifier(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn builder_keeps_params_aligned() {
        let table = Ident::new("load_table").unwrap();
        let mut b = SqlBuilder::new();
        b.push_str("SELECT * FROM ")
            .push_ident(&table)
            .push_str(" WHERE `时间` BETWEEN ")
            .push_param(SqlValue::Text("2024-03-20".into()))
            .push_str(" AND ")
            .push_param(SqlValue::Text("2024-03-20".into()));
        let q = b.build().unwrap();
        assert_eq!(
            q.text(),
            "SELECT * FROM `load_table` WHERE `时间` BETWEEN ? AND ?"
        );
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn placeholder_mismatch_is_an_error() {
        let err = SqlQuery::new("SELECT a FROM t WHERE a = ?", vec![]).unwrap_err();
        assert_eq!(
            err,
            SqlError::ParamCountMismatch {
                placeholders: 1,
                params: 0
            }
        );
    }

    #[test]
    fn quoted_question_marks_are_not_placeholders() {
        assert_eq!(count_placeholders("SELECT '?' FROM t WHERE a = ?"), 1);
    }
}
