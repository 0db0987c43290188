//! Typed errors for query construction and execution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("partition interval must be 'quarterly' or 'monthly', got '{0}'")]
    InvalidInterval(String),

    #[error("invalid timestamp '{value}': expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp { value: String },

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("start_dt '{start}' is after end_dt '{end}'")]
    InvalidRange { start: String, end: String },

    #[error("invalid SQL type for the row-level date column: '{0}'")]
    InvalidValueType(String),

    #[error("invalid {kind} '{value}': expected a plain SQL identifier")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("field list cannot be empty")]
    EmptyFields,

    #[error("table name cannot be empty")]
    EmptyTableName,

    #[error("column '{0}' not found in query result")]
    MissingColumn(String),

    #[error("query execution failed: {0}")]
    Engine(#[source] anyhow::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}
