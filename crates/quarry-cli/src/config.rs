//! CLI configuration from environment variables.

use anyhow::{Context, Result};
use quarry_core::{PartitionInterval, PartitionScheme, DEFAULT_PARTITION_KEY, DEFAULT_VALUE_TYPE};

#[derive(Debug, Clone)]
pub struct QuarryConfig {
    /// Database (DataFusion schema) tables are registered under.
    pub database: String,
    /// Root of the warehouse; local directory or `s3://bucket/prefix`.
    pub base_path: String,
    /// Default layout assumed for queried tables.
    pub scheme: PartitionScheme,
    pub max_cache_expires: Option<u64>,
}

impl QuarryConfig {
    pub fn from_env() -> Result<Self> {
        let interval = match std::env::var("QUARRY_PARTITION_INTERVAL") {
            Ok(value) => value
                .parse::<PartitionInterval>()
                .context("Invalid QUARRY_PARTITION_INTERVAL")?,
            Err(_) => PartitionInterval::default(),
        };
        let scheme = PartitionScheme::new(
            std::env::var("QUARRY_PARTITION_KEY")
                .unwrap_or_else(|_| DEFAULT_PARTITION_KEY.to_string()),
            interval,
            std::env::var("QUARRY_VALUE_TYPE").unwrap_or_else(|_| DEFAULT_VALUE_TYPE.to_string()),
        );
        scheme
            .validate()
            .context("Invalid QUARRY_PARTITION_KEY or QUARRY_VALUE_TYPE")?;

        Ok(Self {
            database: std::env::var("QUARRY_DATABASE").unwrap_or_else(|_| "default".to_string()),
            base_path: std::env::var("QUARRY_BASE_PATH")
                .unwrap_or_else(|_| "./warehouse".to_string()),
            scheme,
            max_cache_expires: std::env::var("QUARRY_MAX_CACHE_EXPIRES")
                .ok()
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("Invalid QUARRY_MAX_CACHE_EXPIRES")?,
        })
    }

    pub fn table_location(&self, table_name: &str) -> String {
        format!("{}/{}", self.base_path.trim_end_matches('/'), table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid races.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "QUARRY_DATABASE",
            "QUARRY_BASE_PATH",
            "QUARRY_PARTITION_KEY",
            "QUARRY_PARTITION_INTERVAL",
            "QUARRY_VALUE_TYPE",
            "QUARRY_MAX_CACHE_EXPIRES",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let config = QuarryConfig::from_env().unwrap();
        assert_eq!(config.database, "default");
        assert_eq!(config.base_path, "./warehouse");
        assert_eq!(config.scheme, PartitionScheme::default());
        assert_eq!(config.max_cache_expires, None);

        clear_env();
    }

    #[test]
    fn from_env_with_all_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe {
            std::env::set_var("QUARRY_DATABASE", "market");
            std::env::set_var("QUARRY_BASE_PATH", "s3://data/warehouse/");
            std::env::set_var("QUARRY_PARTITION_KEY", "pdate");
            std::env::set_var("QUARRY_PARTITION_INTERVAL", "monthly");
            std::env::set_var("QUARRY_VALUE_TYPE", "DATE");
            std::env::set_var("QUARRY_MAX_CACHE_EXPIRES", "600");
        }

        let config = QuarryConfig::from_env().unwrap();
        assert_eq!(config.database, "market");
        assert_eq!(config.scheme.partition_key, "pdate");
        assert_eq!(config.scheme.interval, PartitionInterval::Monthly);
        assert_eq!(config.scheme.value_type, "DATE");
        assert_eq!(config.max_cache_expires, Some(600));
        assert_eq!(config.table_location("prices"), "s3://data/warehouse/prices");

        clear_env();
    }

    #[test]
    fn from_env_invalid_interval() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe {
            std::env::set_var("QUARRY_PARTITION_INTERVAL", "weekly");
        }

        let err = QuarryConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("QUARRY_PARTITION_INTERVAL"));

        clear_env();
    }

    #[test]
    fn from_env_invalid_cache_expiry() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe {
            std::env::set_var("QUARRY_MAX_CACHE_EXPIRES", "soon");
        }

        assert!(QuarryConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    fn from_env_rejects_injected_value_type() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe {
            std::env::set_var("QUARRY_VALUE_TYPE", "DATE); DROP TABLE prices; --");
        }

        assert!(QuarryConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    fn from_env_rejects_injected_partition_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe {
            std::env::set_var("QUARRY_PARTITION_KEY", "partition_dt OR 1=1");
        }

        let err = QuarryConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("QUARRY_PARTITION_KEY"));

        clear_env();
    }
}
