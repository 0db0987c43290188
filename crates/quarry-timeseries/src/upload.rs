//! Write path: validate a table and hand it to partitioned storage.

use std::collections::BTreeMap;
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use quarry_core::{PartitionedStorage, WriteMode, WriteRequest, WriteResult};
use thiserror::Error;
use tracing::debug;

use crate::observer::{UploadObserver, UploadReport};

/// Columns every uploaded table must carry, with their logical types.
pub const REQUIRED_COLUMNS: [(&str, &str); 3] = [
    ("partition_dt", "date"),
    ("dt", "timestamp"),
    ("symbol", "string"),
];

pub const COMPRESSION: &str = "snappy";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("column '{column}' must be given with dtype {dtype}")]
    MissingColumn { column: String, dtype: String },

    #[error("partitioned write failed: {0}")]
    Storage(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub database: String,
    /// Root under which every table gets its own directory.
    pub base_path: String,
    pub table_name: String,
    pub table: RecordBatch,
    /// Logical type overrides, applied on top of [`REQUIRED_COLUMNS`].
    pub dtype_overrides: BTreeMap<String, String>,
    pub mode: WriteMode,
}

impl UploadRequest {
    pub fn new(
        database: impl Into<String>,
        base_path: impl Into<String>,
        table_name: impl Into<String>,
        table: RecordBatch,
    ) -> Self {
        Self {
            database: database.into(),
            base_path: base_path.into(),
            table_name: table_name.into(),
            table,
            dtype_overrides: BTreeMap::new(),
            mode: WriteMode::default(),
        }
    }

    pub fn with_dtypes(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.dtype_overrides = overrides;
        self
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// `<base_path>/<table_name>`
    pub fn destination(&self) -> String {
        format!("{}/{}", self.base_path.trim_end_matches('/'), self.table_name)
    }

    /// Required defaults, overridden key by key.
    pub fn effective_dtypes(&self) -> BTreeMap<String, String> {
        let mut dtypes: BTreeMap<String, String> = REQUIRED_COLUMNS
            .iter()
            .map(|(column, dtype)| (column.to_string(), dtype.to_string()))
            .collect();
        dtypes.extend(
            self.dtype_overrides
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        dtypes
    }
}

fn validate_columns(table: &RecordBatch) -> Result<(), UploadError> {
    let schema = table.schema_ref();
    for (column, dtype) in REQUIRED_COLUMNS {
        if schema.column_with_name(column).is_none() {
            return Err(UploadError::MissingColumn {
                column: column.to_string(),
                dtype: dtype.to_string(),
            });
        }
    }
    Ok(())
}

/// Persist `request.table` partitioned by `partition_dt` and `symbol`.
///
/// Nothing is written and the observer hears nothing unless the table
/// carries every required column.
pub async fn write_table(
    storage: &dyn PartitionedStorage,
    observer: &dyn UploadObserver,
    request: &UploadRequest,
) -> Result<WriteResult, UploadError> {
    validate_columns(&request.table)?;

    let dtypes = request.effective_dtypes();
    let destination = request.destination();
    let partition_columns: Vec<String> = vec!["partition_dt".to_string(), "symbol".to_string()];
    let rows = request.table.num_rows();
    debug!(
        destination = %destination,
        mode = %request.mode,
        ?dtypes,
        "writing partitioned table"
    );

    observer.on_start(&request.table_name, rows);
    let started = Instant::now();

    let outcome = storage
        .write_partitioned(WriteRequest {
            table: &request.table,
            database: &request.database,
            table_name: &request.table_name,
            path: &destination,
            partition_columns: &partition_columns,
            mode: request.mode,
            concurrent_partitioning: true,
            compression: COMPRESSION,
            dtypes: &dtypes,
        })
        .await;

    match outcome {
        Ok(result) => {
            let report = UploadReport {
                rows,
                table_bytes: request.table.get_array_memory_size(),
                elapsed: started.elapsed(),
            };
            observer.on_complete(&report);
            Ok(result)
        }
        Err(e) => {
            let err = UploadError::Storage(e);
            observer.on_failure(&err);
            Err(err)
        }
    }
}
