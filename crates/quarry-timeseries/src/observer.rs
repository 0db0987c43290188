//! Hooks for reporting upload progress.

use std::time::Duration;

use tracing::{error, info};

use crate::upload::UploadError;

/// Summary of a finished upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReport {
    pub rows: usize,
    /// In-memory size of the uploaded table.
    pub table_bytes: usize,
    pub elapsed: Duration,
}

impl UploadReport {
    pub fn table_size_mb(&self) -> f64 {
        self.table_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Receives upload lifecycle events. Implementations must not affect the
/// outcome of the write.
pub trait UploadObserver: Send + Sync {
    fn on_start(&self, _table_name: &str, _rows: usize) {}

    fn on_complete(&self, _report: &UploadReport) {}

    fn on_failure(&self, _error: &UploadError) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

/// Reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl UploadObserver for TracingObserver {
    fn on_start(&self, table_name: &str, rows: usize) {
        info!("Uploading {} rows to '{}'", rows, table_name);
    }

    fn on_complete(&self, report: &UploadReport) {
        info!("Table size: {:.2} MB", report.table_size_mb());
        info!("Upload time: {:.2} seconds", report.elapsed_secs());
    }

    fn on_failure(&self, err: &UploadError) {
        error!("Upload failed: {}", err);
    }
}
