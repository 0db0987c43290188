//! Typed errors for the connectors crate.

use std::fmt;

/// Errors that can occur in the warehouse backend.
#[derive(Debug)]
pub enum ConnectorError {
    /// Failed to reach or build the object store.
    ConnectionFailed(String),
    /// The requested table does not exist.
    TableNotFound(String),
    /// Data does not match the expected schema or column types.
    SchemaMismatch(String),
    /// The location is not a supported URI.
    UnsupportedUri(String),
    /// A query against the warehouse failed.
    QueryFailed(String),
    /// Writing or deleting partition files failed.
    WriteFailed(String),
    /// Invalid or missing configuration.
    ConfigError(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            ConnectorError::TableNotFound(msg) => write!(f, "table not found: {}", msg),
            ConnectorError::SchemaMismatch(msg) => write!(f, "schema mismatch: {}", msg),
            ConnectorError::UnsupportedUri(msg) => write!(f, "unsupported URI: {}", msg),
            ConnectorError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
            ConnectorError::WriteFailed(msg) => write!(f, "write failed: {}", msg),
            ConnectorError::ConfigError(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<datafusion::error::DataFusionError> for ConnectorError {
    fn from(e: datafusion::error::DataFusionError) -> Self {
        ConnectorError::QueryFailed(e.to_string())
    }
}

impl From<arrow::error::ArrowError> for ConnectorError {
    fn from(e: arrow::error::ArrowError) -> Self {
        ConnectorError::SchemaMismatch(e.to_string())
    }
}

impl From<object_store::Error> for ConnectorError {
    fn from(e: object_store::Error) -> Self {
        ConnectorError::WriteFailed(e.to_string())
    }
}

impl From<url::ParseError> for ConnectorError {
    fn from(e: url::ParseError) -> Self {
        ConnectorError::UnsupportedUri(e.to_string())
    }
}
