//! Terminal spinner for uploads.

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use quarry_timeseries::{UploadError, UploadObserver, UploadReport};

pub struct SpinnerObserver {
    spinner: ProgressBar,
}

impl SpinnerObserver {
    pub fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        Ok(Self { spinner })
    }
}

impl UploadObserver for SpinnerObserver {
    fn on_start(&self, _table_name: &str, _rows: usize) {
        self.spinner.set_message("Uploading data...");
        self.spinner.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_complete(&self, report: &UploadReport) {
        self.spinner.finish_with_message("Upload completed!");
        eprintln!("Table size: {:.2} MB", report.table_size_mb());
        eprintln!("Upload time: {:.2} seconds", report.elapsed_secs());
    }

    fn on_failure(&self, err: &UploadError) {
        self.spinner.abandon_with_message(format!("Upload failed: {}", err));
    }
}
