//! Partition scheme: which column carries the coarse date key, at what
//! granularity the data is partitioned, and how the fine-grained `dt` column
//! is typed in SQL.

use std::fmt;
use std::str::FromStr;

use crate::boundary::{self, PeriodBoundary};
use crate::error::QueryError;
use crate::predicate::validate_identifier;

pub const DEFAULT_PARTITION_KEY: &str = "partition_dt";
pub const DEFAULT_VALUE_TYPE: &str = "Timestamp";

/// Granularity of the `partition_dt` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionInterval {
    #[default]
    Quarterly,
    Monthly,
}

impl PartitionInterval {
    /// Boundary functions used to widen a timestamp to its enclosing partition.
    pub fn boundary(self) -> PeriodBoundary {
        match self {
            PartitionInterval::Quarterly => PeriodBoundary {
                start: boundary::quarter_start,
                end: boundary::quarter_end,
            },
            PartitionInterval::Monthly => PeriodBoundary {
                start: boundary::month_start,
                end: boundary::month_end,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionInterval::Quarterly => "quarterly",
            PartitionInterval::Monthly => "monthly",
        }
    }
}

impl fmt::Display for PartitionInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionInterval {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quarterly" => Ok(PartitionInterval::Quarterly),
            "monthly" => Ok(PartitionInterval::Monthly),
            _ => Err(QueryError::InvalidInterval(s.to_string())),
        }
    }
}

/// How a table is physically partitioned and how its `dt` column is cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionScheme {
    pub partition_key: String,
    pub interval: PartitionInterval,
    /// SQL cast target for row-level `dt` literals (e.g. `Timestamp`, `DATE`).
    pub value_type: String,
}

impl Default for PartitionScheme {
    fn default() -> Self {
        Self {
            partition_key: DEFAULT_PARTITION_KEY.to_string(),
            interval: PartitionInterval::default(),
            value_type: DEFAULT_VALUE_TYPE.to_string(),
        }
    }
}

impl PartitionScheme {
    pub fn new(
        partition_key: impl Into<String>,
        interval: PartitionInterval,
        value_type: impl Into<String>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            interval,
            value_type: value_type.into(),
        }
    }

    pub fn with_interval(mut self, interval: PartitionInterval) -> Self {
        self.interval = interval;
        self
    }

    /// Reject a partition key that is not a plain identifier and cast
    /// targets that are not a plain SQL type name. Both are spliced into the
    /// generated SQL.
    pub fn validate(&self) -> Result<(), QueryError> {
        validate_identifier("partition key", &self.partition_key)?;
        let ok = !self.value_type.trim().is_empty()
            && self
                .value_type
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ','));
        if ok {
            Ok(())
        } else {
            Err(QueryError::InvalidValueType(self.value_type.clone()))
        }
    }
}
