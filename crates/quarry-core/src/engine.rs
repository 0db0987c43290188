//! Seams to the warehouse: a SQL engine for reads and a partitioned storage
//! client for writes. Both are handed to every operation explicitly, so tests
//! can substitute fakes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

/// Execution hints forwarded to the engine. Neither has local semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Ask the engine for its CTAS-based execution strategy.
    pub ctas_approach: bool,
    /// Maximum age (seconds) of a cached result the engine may reuse.
    pub max_cache_expires: Option<u64>,
}

/// Executes a complete SQL statement against a database.
#[async_trait]
pub trait SqlEngine: Send + Sync {
    async fn execute_sql(
        &self,
        sql: &str,
        database: &str,
        options: &ExecutionOptions,
    ) -> anyhow::Result<RecordBatch>;
}

/// How existing data at the destination is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Add files next to whatever is there.
    Append,
    /// Replace the whole dataset.
    Overwrite,
    /// Replace only the partitions present in the incoming data.
    #[default]
    OverwritePartitions,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Append => "append",
            WriteMode::Overwrite => "overwrite",
            WriteMode::OverwritePartitions => "overwrite_partitions",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "append" => Ok(WriteMode::Append),
            "overwrite" => Ok(WriteMode::Overwrite),
            "overwrite_partitions" => Ok(WriteMode::OverwritePartitions),
            other => Err(format!(
                "unknown write mode '{}': expected append, overwrite or overwrite_partitions",
                other
            )),
        }
    }
}

/// Everything the storage client needs to persist one partitioned table.
#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    pub table: &'a RecordBatch,
    pub database: &'a str,
    pub table_name: &'a str,
    /// Dataset root, e.g. `s3://bucket/prefix/prices`.
    pub path: &'a str,
    pub partition_columns: &'a [String],
    pub mode: WriteMode,
    pub concurrent_partitioning: bool,
    pub compression: &'a str,
    /// Logical column types (`date`, `timestamp`, `string`, ...).
    pub dtypes: &'a BTreeMap<String, String>,
}

/// One hive partition, as ordered `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartitionPath(pub Vec<(String, String)>);

impl fmt::Display for PartitionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&parts.join("/"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    pub location: String,
    pub partitions: Vec<PartitionPath>,
    pub rows_written: u64,
}

#[async_trait]
pub trait PartitionedStorage: Send + Sync {
    async fn write_partitioned(&self, request: WriteRequest<'_>) -> anyhow::Result<WriteResult>;
}
