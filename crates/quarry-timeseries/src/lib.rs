//! Quarry Timeseries - time-indexed reads and partitioned writes
//!
//! Reads assemble a partition-pruned SELECT, run it on a [`SqlEngine`] and
//! return a [`TimeSeriesFrame`] sorted by `dt`. Writes validate the table and
//! hand it to [`PartitionedStorage`] laid out as
//! `<base>/<table>/partition_dt=<date>/symbol=<symbol>/`.
//!
//! [`SqlEngine`]: quarry_core::SqlEngine
//! [`PartitionedStorage`]: quarry_core::PartitionedStorage

pub mod client;
pub mod frame;
pub mod observer;
pub mod query;
pub mod upload;

pub use client::{ClientError, ResampleRequest, Resampler, TimeSeriesClient};
pub use frame::TimeSeriesFrame;
pub use observer::{NoopObserver, TracingObserver, UploadObserver, UploadReport};
pub use query::run_query;
pub use upload::{write_table, UploadError, UploadRequest, REQUIRED_COLUMNS};
