//! High-level handle bundling a warehouse's engine, storage and location.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use quarry_core::{
    PartitionedStorage, QueryError, QueryRequest, SqlEngine, TimeRange, WriteMode, WriteResult,
};
use thiserror::Error;
use tracing::debug;

use crate::frame::TimeSeriesFrame;
use crate::observer::{TracingObserver, UploadObserver};
use crate::query::run_query;
use crate::upload::{write_table, UploadError, UploadRequest};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("no resampler configured for this client")]
    ResamplerMissing,

    #[error("resample query failed: {0}")]
    Resample(#[source] anyhow::Error),
}

/// Parameters of a resampling (aggregation) read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampleRequest {
    pub table_name: String,
    pub fields: Vec<String>,
    pub range: TimeRange,
    pub symbols: Option<Vec<String>>,
    /// Bucket width, e.g. `day` or `hour`.
    pub interval: String,
    /// Aggregations to apply per field, e.g. `last`, `sum`.
    pub ops: Vec<String>,
    pub where_clause: Option<String>,
    pub cast: Option<String>,
    pub fast: bool,
    pub offset_repr: Option<String>,
}

impl ResampleRequest {
    pub fn new<S: Into<String>>(
        table_name: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            range: TimeRange::default(),
            symbols: None,
            interval: "day".to_string(),
            ops: Vec::new(),
            where_clause: None,
            cast: None,
            fast: true,
            offset_repr: None,
        }
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn with_ops<S: Into<String>>(mut self, ops: impl IntoIterator<Item = S>) -> Self {
        self.ops = ops.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    pub fn with_cast(mut self, cast: impl Into<String>) -> Self {
        self.cast = Some(cast.into());
        self
    }

    pub fn with_fast(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    pub fn with_offset_repr(mut self, offset: impl Into<String>) -> Self {
        self.offset_repr = Some(offset.into());
        self
    }
}

/// Generates and runs resampling queries. Supplied by the caller.
#[async_trait]
pub trait Resampler: Send + Sync {
    async fn resample(
        &self,
        engine: &dyn SqlEngine,
        database: &str,
        request: &ResampleRequest,
    ) -> anyhow::Result<TimeSeriesFrame>;
}

pub struct TimeSeriesClient {
    engine: Arc<dyn SqlEngine>,
    storage: Arc<dyn PartitionedStorage>,
    database: String,
    base_path: String,
    observer: Arc<dyn UploadObserver>,
    resampler: Option<Arc<dyn Resampler>>,
}

impl TimeSeriesClient {
    pub fn new(
        engine: Arc<dyn SqlEngine>,
        storage: Arc<dyn PartitionedStorage>,
        database: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            storage,
            database: database.into(),
            base_path: base_path.into(),
            observer: Arc::new(TracingObserver),
            resampler: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_resampler(mut self, resampler: Arc<dyn Resampler>) -> Self {
        self.resampler = Some(resampler);
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<TimeSeriesFrame, ClientError> {
        Ok(run_query(self.engine.as_ref(), &self.database, request).await?)
    }

    /// Write `table` under `<base_path>/<table_name>`, partitioned by
    /// `partition_dt` and `symbol`.
    pub async fn upload(
        &self,
        table_name: &str,
        table: RecordBatch,
        dtype: Option<BTreeMap<String, String>>,
        mode: WriteMode,
    ) -> Result<WriteResult, ClientError> {
        let request = UploadRequest::new(&self.database, &self.base_path, table_name, table)
            .with_dtypes(dtype.unwrap_or_default())
            .with_mode(mode);
        Ok(write_table(self.storage.as_ref(), self.observer.as_ref(), &request).await?)
    }

    pub async fn resample_query(
        &self,
        request: &ResampleRequest,
    ) -> Result<TimeSeriesFrame, ClientError> {
        let resampler = self
            .resampler
            .as_ref()
            .ok_or(ClientError::ResamplerMissing)?;
        debug!(
            table = %request.table_name,
            interval = %request.interval,
            "delegating resample query"
        );
        resampler
            .resample(self.engine.as_ref(), &self.database, request)
            .await
            .map_err(ClientError::Resample)
    }
}
