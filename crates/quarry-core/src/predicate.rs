//! WHERE-clause construction for partition-pruned time-range scans.
//!
//! A logical time range turns into two predicates per bound: one on the coarse
//! partition key, widened to the enclosing partition boundary so no partition
//! holding matching rows is skipped, and one on the exact `dt` column.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::error::QueryError;
use crate::partition::PartitionScheme;

/// Accepted datetime layouts besides a bare `YYYY-MM-DD` date.
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Optional date/datetime bounds and the timezone they are expressed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start_dt: Option<String>,
    pub end_dt: Option<String>,
    /// IANA zone name. Bounds are naive UTC when absent.
    pub tz: Option<String>,
}

impl TimeRange {
    pub fn new(start_dt: Option<&str>, end_dt: Option<&str>) -> Self {
        Self {
            start_dt: start_dt.map(str::to_string),
            end_dt: end_dt.map(str::to_string),
            tz: None,
        }
    }

    pub fn between(start_dt: &str, end_dt: &str) -> Self {
        Self::new(Some(start_dt), Some(end_dt))
    }

    pub fn with_tz(mut self, tz: impl Into<String>) -> Self {
        self.tz = Some(tz.into());
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_dt.is_none() && self.end_dt.is_none()
    }
}

/// One side of a range after parsing and widening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedBound<'a> {
    /// The caller's literal, used verbatim for the row-level predicate.
    pub raw: &'a str,
    /// Naive UTC instant the literal denotes.
    pub instant: NaiveDateTime,
    /// Enclosing partition boundary date.
    pub partition: NaiveDate,
}

#[derive(Debug, Default)]
pub(crate) struct ResolvedRange<'a> {
    pub start: Option<ResolvedBound<'a>>,
    pub end: Option<ResolvedBound<'a>>,
}

fn parse_timezone(name: &str) -> Result<Tz, QueryError> {
    name.parse::<Tz>()
        .map_err(|_| QueryError::InvalidTimezone(name.to_string()))
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parse a bound, localize it to `tz` when given, and normalize to naive UTC.
pub fn parse_timestamp(value: &str, tz: Option<&Tz>) -> Result<NaiveDateTime, QueryError> {
    let invalid = || QueryError::InvalidTimestamp {
        value: value.to_string(),
    };
    let naive = parse_naive(value).ok_or_else(invalid)?;
    match tz {
        None => Ok(naive),
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.naive_utc())
            .ok_or_else(invalid),
    }
}

pub(crate) fn resolve_range<'a>(
    range: &'a TimeRange,
    scheme: &PartitionScheme,
) -> Result<ResolvedRange<'a>, QueryError> {
    let tz = range.tz.as_deref().map(parse_timezone).transpose()?;
    let boundary = scheme.interval.boundary();

    let resolve = |raw: &'a str, widen: fn(NaiveDateTime) -> NaiveDateTime| {
        parse_timestamp(raw, tz.as_ref()).map(|instant| ResolvedBound {
            raw,
            instant,
            partition: widen(instant).date(),
        })
    };

    let start = range
        .start_dt
        .as_deref()
        .map(|raw| resolve(raw, boundary.start))
        .transpose()?;
    let end = range
        .end_dt
        .as_deref()
        .map(|raw| resolve(raw, boundary.end))
        .transpose()?;

    if let (Some(s), Some(e)) = (&start, &end) {
        if s.instant > e.instant {
            return Err(QueryError::InvalidRange {
                start: s.raw.to_string(),
                end: e.raw.to_string(),
            });
        }
    }

    Ok(ResolvedRange { start, end })
}

/// Build the time-range predicates, in order: partition lower, row lower,
/// partition upper, row upper. An unbounded range yields no predicates.
pub fn build_predicates(
    range: &TimeRange,
    scheme: &PartitionScheme,
) -> Result<Vec<String>, QueryError> {
    scheme.validate()?;
    let resolved = resolve_range(range, scheme)?;
    let key = &scheme.partition_key;
    let value_type = &scheme.value_type;

    let mut predicates = Vec::with_capacity(4);
    if let Some(start) = resolved.start {
        predicates.push(format!(
            "{key} >= CAST('{}' AS DATE)",
            start.partition.format("%Y-%m-%d")
        ));
        predicates.push(format!("dt >= CAST('{}' AS {value_type})", start.raw));
    }
    if let Some(end) = resolved.end {
        predicates.push(format!(
            "{key} <= CAST('{}' AS DATE)",
            end.partition.format("%Y-%m-%d")
        ));
        predicates.push(format!("dt <= CAST('{}' AS {value_type})", end.raw));
    }
    Ok(predicates)
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*`. Table, column and partition key names are
/// spliced into the SQL unquoted.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), QueryError> {
    let mut chars = value.chars();
    let ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Escape a value for use inside a single-quoted SQL literal.
pub fn sanitize_sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// `symbol IN ('A','B')`, or `None` for a missing/empty symbol list.
pub fn symbol_predicate(symbols: Option<&[String]>) -> Option<String> {
    let symbols = symbols.filter(|s| !s.is_empty())?;
    let list = symbols
        .iter()
        .map(|s| format!("'{}'", sanitize_sql_string(s)))
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("symbol IN ({})", list))
}

pub fn build_where_clause(predicates: &[String]) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    format!(" WHERE {}", predicates.join(" AND "))
}
