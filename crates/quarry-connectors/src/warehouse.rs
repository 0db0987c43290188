//! Warehouse backend built on DataFusion.
//!
//! Databases map to DataFusion schemas in the default catalog, tables to
//! hive-partitioned parquet listing tables. Storage is whatever object store
//! is registered for the table location (local filesystem by default, S3 via
//! [`DataFusionWarehouse::register_s3`]).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, UInt64Type};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::common::config::TableParquetOptions;
use datafusion::common::TableReference;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::datasource::file_format::parquet::ParquetFormat;
use datafusion::datasource::listing::{
    ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl,
};
use datafusion::logical_expr::{cast, ident};
use datafusion::prelude::{DataFrame, SessionContext};
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectMeta;
use quarry_core::{
    ExecutionOptions, PartitionPath, PartitionedStorage, SqlEngine, WriteMode, WriteRequest,
    WriteResult, DEFAULT_PARTITION_KEY,
};
use tracing::{debug, info};
use url::Url;

use crate::dialect::rewrite_for_database;
use crate::error::ConnectorError;
use crate::s3::{build_store, parse_s3_location, S3Config};
use crate::types::parse_logical_type;

/// Partition columns of tables attached without an explicit layout.
pub const DEFAULT_PARTITION_COLUMNS: [&str; 2] = [DEFAULT_PARTITION_KEY, "symbol"];

/// DataFusion-backed implementation of both [`SqlEngine`] and
/// [`PartitionedStorage`].
pub struct DataFusionWarehouse {
    ctx: SessionContext,
}

impl DataFusionWarehouse {
    pub fn new() -> Self {
        let ctx = SessionContext::new();
        info!("DataFusionWarehouse initialized");
        Self { ctx }
    }

    /// Get a reference to the underlying SessionContext
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Register an S3 object store for every location under `uri`'s bucket.
    pub fn register_s3(&self, uri: &str, config: &S3Config) -> Result<(), ConnectorError> {
        let (bucket, _) = parse_s3_location(uri)
            .map_err(|e| ConnectorError::UnsupportedUri(e.to_string()))?;
        let store = build_store(config, &bucket)
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;
        let url = Url::parse(&format!("s3://{}", bucket))?;
        self.ctx.register_object_store(&url, Arc::new(store));
        info!("Registered S3 object store for bucket '{}'", bucket);
        Ok(())
    }

    async fn ensure_database(&self, database: &str) -> Result<(), ConnectorError> {
        let stmt = format!(
            "CREATE SCHEMA IF NOT EXISTS \"{}\"",
            database.replace('"', "\"\"")
        );
        self.ctx.sql(&stmt).await?.collect().await?;
        Ok(())
    }

    /// Register an existing hive-partitioned parquet dataset as
    /// `database.table_name`, replacing any previous registration.
    pub async fn attach_table(
        &self,
        database: &str,
        table_name: &str,
        location: &str,
    ) -> Result<(), ConnectorError> {
        let partition_columns: Vec<String> = DEFAULT_PARTITION_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        self.attach_with_partitions(database, table_name, location, &partition_columns)
            .await
    }

    async fn attach_with_partitions(
        &self,
        database: &str,
        table_name: &str,
        location: &str,
        partition_columns: &[String],
    ) -> Result<(), ConnectorError> {
        self.ensure_database(database).await?;

        let table_url = ListingTableUrl::parse(directory_location(location))?;
        let options = listing_options(partition_columns);
        let schema = options
            .infer_schema(&self.ctx.state(), &table_url)
            .await
            .map_err(|e| ConnectorError::TableNotFound(format!("{}: {}", location, e)))?;
        if schema.fields().is_empty() {
            return Err(ConnectorError::TableNotFound(format!(
                "no parquet files under '{}'",
                location
            )));
        }
        let config = ListingTableConfig::new(table_url)
            .with_listing_options(options)
            .with_schema(schema);
        let table = ListingTable::try_new(config)?;

        let reference = TableReference::partial(database, table_name);
        self.ctx.deregister_table(reference.clone())?;
        self.ctx.register_table(reference, Arc::new(table))?;
        info!(
            "Registered table '{}.{}' from '{}'",
            database, table_name, location
        );
        Ok(())
    }

    async fn run_sql(&self, sql: &str, database: &str) -> Result<RecordBatch, ConnectorError> {
        let rewritten = rewrite_for_database(sql, database)?;
        debug!(sql = %rewritten, "executing on DataFusion");

        let df = self.ctx.sql(&rewritten).await?;
        let planned_schema = df.schema().inner().clone();
        let batches = df.collect().await?;
        let schema = batches
            .first()
            .map(|b| b.schema())
            .unwrap_or(planned_schema);
        Ok(concat_batches(&schema, &batches)?)
    }

    async fn write_table(&self, request: WriteRequest<'_>) -> Result<WriteResult, ConnectorError> {
        let location = directory_location(request.path);
        let table_url = ListingTableUrl::parse(&location)?;

        let df = self.ctx.read_batch(request.table.clone())?;
        let df = apply_dtypes(df, request.dtypes, request.partition_columns)?;
        let partitions = distinct_partitions(&df, request.partition_columns).await?;

        let removed = self
            .clear_destination(&table_url, request.mode, &partitions)
            .await?;
        // DataFusion's demuxer always writes partitions concurrently.
        debug!(
            removed,
            mode = %request.mode,
            concurrent_partitioning = request.concurrent_partitioning,
            "cleared destination before write"
        );

        let mut parquet_options = TableParquetOptions::default();
        parquet_options.global.compression = Some(request.compression.to_string());
        let write_options =
            DataFrameWriteOptions::new().with_partition_by(request.partition_columns.to_vec());

        let counts = df
            .write_parquet(&location, write_options, Some(parquet_options))
            .await?;
        let rows_written: u64 = counts
            .iter()
            .filter_map(|b| b.column_by_name("count"))
            .filter_map(|c| c.as_primitive_opt::<UInt64Type>())
            .map(|a| a.iter().flatten().sum::<u64>())
            .sum();

        self.attach_with_partitions(
            request.database,
            request.table_name,
            &location,
            request.partition_columns,
        )
        .await?;

        info!(
            "Wrote {} rows across {} partitions to '{}'",
            rows_written,
            partitions.len(),
            request.path
        );
        Ok(WriteResult {
            location: request.path.to_string(),
            partitions,
            rows_written,
        })
    }

    /// Delete whatever the write mode says the incoming data replaces.
    /// Returns the number of objects removed.
    async fn clear_destination(
        &self,
        table_url: &ListingTableUrl,
        mode: WriteMode,
        partitions: &[PartitionPath],
    ) -> Result<usize, ConnectorError> {
        let prefixes: Vec<ObjectPath> = match mode {
            WriteMode::Append => return Ok(0),
            WriteMode::Overwrite => vec![table_url.prefix().clone()],
            WriteMode::OverwritePartitions => partitions
                .iter()
                .map(|p| partition_prefix(table_url.prefix(), p))
                .collect(),
        };

        let store = self.ctx.runtime_env().object_store(table_url)?;
        let mut removed = 0;
        for prefix in prefixes {
            let objects: Vec<ObjectMeta> = store.list(Some(&prefix)).try_collect().await?;
            for meta in objects {
                store.delete(&meta.location).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl Default for DataFusionWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SqlEngine for DataFusionWarehouse {
    async fn execute_sql(
        &self,
        sql: &str,
        database: &str,
        options: &ExecutionOptions,
    ) -> anyhow::Result<RecordBatch> {
        // Hints only mean something to remote warehouses.
        debug!(
            ctas_approach = options.ctas_approach,
            max_cache_expires = ?options.max_cache_expires,
            "ignoring execution hints"
        );
        Ok(self.run_sql(sql, database).await?)
    }
}

#[async_trait]
impl PartitionedStorage for DataFusionWarehouse {
    async fn write_partitioned(&self, request: WriteRequest<'_>) -> anyhow::Result<WriteResult> {
        Ok(self.write_table(request).await?)
    }
}

fn directory_location(location: &str) -> String {
    format!("{}/", location.trim_end_matches('/'))
}

fn listing_options(partition_columns: &[String]) -> ListingOptions {
    let partition_cols = partition_columns
        .iter()
        .map(|name| {
            let data_type = if name == DEFAULT_PARTITION_KEY {
                DataType::Date32
            } else {
                DataType::Utf8
            };
            (name.clone(), data_type)
        })
        .collect();
    ListingOptions::new(Arc::new(ParquetFormat::default()))
        .with_file_extension(".parquet")
        .with_table_partition_cols(partition_cols)
}

fn partition_prefix(root: &ObjectPath, partition: &PartitionPath) -> ObjectPath {
    partition
        .0
        .iter()
        .fold(root.clone(), |path, (column, value)| {
            path.child(format!("{}={}", column, value))
        })
}

/// Cast columns to their logical types. Partition columns are additionally
/// rendered as strings, which is how their values appear in directory names.
fn apply_dtypes(
    df: DataFrame,
    dtypes: &BTreeMap<String, String>,
    partition_columns: &[String],
) -> Result<DataFrame, ConnectorError> {
    let mut exprs = Vec::with_capacity(df.schema().fields().len());
    for field in df.schema().fields() {
        let name = field.name();
        let mut expr = ident(name);
        if let Some(logical) = dtypes.get(name) {
            expr = cast(expr, parse_logical_type(logical)?);
        }
        if partition_columns.contains(name) {
            expr = cast(expr, DataType::Utf8);
        }
        exprs.push(expr.alias(name));
    }

    for column in partition_columns {
        if df.schema().field_with_unqualified_name(column).is_err() {
            return Err(ConnectorError::SchemaMismatch(format!(
                "partition column '{}' not found",
                column
            )));
        }
    }
    for key in dtypes.keys() {
        if df.schema().field_with_unqualified_name(key).is_err() {
            debug!(column = %key, "type override for absent column ignored");
        }
    }

    Ok(df.select(exprs)?)
}

async fn distinct_partitions(
    df: &DataFrame,
    partition_columns: &[String],
) -> Result<Vec<PartitionPath>, ConnectorError> {
    let columns: Vec<&str> = partition_columns.iter().map(String::as_str).collect();
    let batches = df
        .clone()
        .select_columns(&columns)?
        .distinct()?
        .collect()
        .await?;

    let mut partitions = BTreeSet::new();
    for batch in &batches {
        let arrays = batch
            .columns()
            .iter()
            .map(|c| {
                c.as_string_opt::<i32>().ok_or_else(|| {
                    ConnectorError::SchemaMismatch("partition values must be strings".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            let mut values = Vec::with_capacity(arrays.len());
            for (name, array) in partition_columns.iter().zip(&arrays) {
                if array.is_null(row) {
                    return Err(ConnectorError::SchemaMismatch(format!(
                        "partition column '{}' contains nulls",
                        name
                    )));
                }
                let value = array.value(row);
                // A separator would split the value across directory levels.
                if value.contains('/') {
                    return Err(ConnectorError::SchemaMismatch(format!(
                        "partition column '{}' value '{}' contains '/'",
                        name, value
                    )));
                }
                values.push((name.clone(), value.to_string()));
            }
            partitions.insert(PartitionPath(values));
        }
    }
    Ok(partitions.into_iter().collect())
}
