//! Quarry Connectors - warehouse backend
//!
//! This crate provides the default implementation of the engine and storage
//! seams from `quarry-core`:
//! - DataFusion as the SQL engine, one schema per database
//! - hive-partitioned parquet datasets on the local filesystem or S3
//!   (via object_store)

pub mod dialect;
pub mod error;
pub mod s3;
pub mod types;
pub mod warehouse;

pub use dialect::rewrite_for_database;
pub use error::ConnectorError;
pub use s3::{is_s3_location, parse_s3_location, S3Config};
pub use types::parse_logical_type;
pub use warehouse::{DataFusionWarehouse, DEFAULT_PARTITION_COLUMNS};
