//! SELECT statement assembly for time-series reads.

use tracing::debug;

use crate::engine::ExecutionOptions;
use crate::error::QueryError;
use crate::partition::PartitionScheme;
use crate::predicate::{
    build_predicates, build_where_clause, symbol_predicate, validate_identifier, TimeRange,
};

pub const WILDCARD: &str = "*";

/// Columns every read selects whether or not the caller lists them.
pub const ALWAYS_SELECTED: [&str; 2] = ["dt", "symbol"];

/// A read against one partitioned table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub table_name: String,
    /// Explicit columns, or `["*"]` for everything.
    pub fields: Vec<String>,
    pub symbols: Option<Vec<String>>,
    pub range: TimeRange,
    pub max_cache_expires: Option<u64>,
    pub scheme: PartitionScheme,
    pub ctas_approach: bool,
}

impl QueryRequest {
    pub fn new<S: Into<String>>(table_name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            table_name: table_name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            symbols: None,
            range: TimeRange::default(),
            max_cache_expires: None,
            scheme: PartitionScheme::default(),
            ctas_approach: false,
        }
    }

    pub fn with_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_scheme(mut self, scheme: PartitionScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_max_cache_expires(mut self, seconds: u64) -> Self {
        self.max_cache_expires = Some(seconds);
        self
    }

    pub fn with_ctas_approach(mut self, enabled: bool) -> Self {
        self.ctas_approach = enabled;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.fields.len() == 1 && self.fields[0] == WILDCARD
    }

    /// Explicit fields minus `dt`/`symbol` and repeats, in first-seen order.
    /// Empty for a wildcard request.
    pub fn value_fields(&self) -> Vec<&str> {
        if self.is_wildcard() {
            return Vec::new();
        }
        let mut fields: Vec<&str> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let field = field.as_str();
            if !ALWAYS_SELECTED.contains(&field) && !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            ctas_approach: self.ctas_approach,
            max_cache_expires: self.max_cache_expires,
        }
    }
}

/// Render `SELECT dt, <fields>, symbol FROM <table> [WHERE ...]`.
///
/// All validation (identifiers, interval, timestamps, range order, value type)
/// happens here, so an invalid request never reaches the engine.
pub fn build_select(request: &QueryRequest) -> Result<String, QueryError> {
    if request.table_name.trim().is_empty() {
        return Err(QueryError::EmptyTableName);
    }
    if request.fields.is_empty() || request.fields.iter().any(|f| f.trim().is_empty()) {
        return Err(QueryError::EmptyFields);
    }
    // `db.table` is passed through for the engine to resolve.
    for part in request.table_name.split('.') {
        validate_identifier("table name", part)?;
    }
    if !request.is_wildcard() {
        for field in &request.fields {
            validate_identifier("field", field)?;
        }
    }

    let mut predicates = build_predicates(&request.range, &request.scheme)?;
    if let Some(pred) = symbol_predicate(request.symbols.as_deref()) {
        predicates.push(pred);
    }

    let columns = if request.is_wildcard() {
        format!("dt, {}, symbol", WILDCARD)
    } else {
        std::iter::once("dt")
            .chain(request.value_fields())
            .chain(std::iter::once("symbol"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let sql = format!(
        "SELECT {} FROM {}{}",
        columns,
        request.table_name,
        build_where_clause(&predicates)
    );
    debug!(sql = %sql, "assembled query");
    Ok(sql)
}
