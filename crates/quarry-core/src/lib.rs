//! Quarry Core - partition-aware predicates and SQL assembly
//!
//! Turns a logical time range, partition scheme and symbol filter into a
//! complete SELECT statement, and defines the engine/storage seams the rest
//! of the workspace plugs into.

pub mod boundary;
pub mod engine;
pub mod error;
pub mod partition;
pub mod predicate;
pub mod sql;

pub use engine::{
    ExecutionOptions, PartitionPath, PartitionedStorage, SqlEngine, WriteMode, WriteRequest,
    WriteResult,
};
pub use error::QueryError;
pub use partition::{PartitionInterval, PartitionScheme, DEFAULT_PARTITION_KEY, DEFAULT_VALUE_TYPE};
pub use predicate::{
    build_predicates, build_where_clause, symbol_predicate, validate_identifier, TimeRange,
};
pub use sql::{build_select, QueryRequest, ALWAYS_SELECTED, WILDCARD};

// Re-export for downstream consumers
pub use arrow::record_batch::RecordBatch;
