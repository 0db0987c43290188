//! Mapping from catalog-style logical type names (`date`, `timestamp`,
//! `string`, ...) to Arrow data types.

use arrow::datatypes::{DataType, TimeUnit};

use crate::error::ConnectorError;

pub fn parse_logical_type(name: &str) -> Result<DataType, ConnectorError> {
    let normalized = name.trim().to_ascii_lowercase();
    let data_type = match normalized.as_str() {
        "date" => DataType::Date32,
        "timestamp" => DataType::Timestamp(TimeUnit::Microsecond, None),
        "string" | "varchar" => DataType::Utf8,
        "double" => DataType::Float64,
        "float" => DataType::Float32,
        "bigint" => DataType::Int64,
        "int" | "integer" => DataType::Int32,
        "smallint" => DataType::Int16,
        "tinyint" => DataType::Int8,
        "boolean" => DataType::Boolean,
        other => return parse_decimal(other).ok_or_else(|| {
            ConnectorError::ConfigError(format!("unsupported column type '{}'", name))
        }),
    };
    Ok(data_type)
}

/// `decimal(p,s)`
fn parse_decimal(s: &str) -> Option<DataType> {
    let args = s.strip_prefix("decimal(")?.strip_suffix(')')?;
    let (precision, scale) = args.split_once(',')?;
    let precision: u8 = precision.trim().parse().ok()?;
    let scale: i8 = scale.trim().parse().ok()?;
    if precision == 0 || precision > 38 || scale < 0 || scale as u8 > precision {
        return None;
    }
    Some(DataType::Decimal128(precision, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_column_types() {
        assert_eq!(parse_logical_type("date").unwrap(), DataType::Date32);
        assert_eq!(
            parse_logical_type("timestamp").unwrap(),
            DataType::Timestamp(TimeUnit::Microsecond, None)
        );
        assert_eq!(parse_logical_type("string").unwrap(), DataType::Utf8);
    }

    #[test]
    fn test_numeric_types_case_insensitive() {
        assert_eq!(parse_logical_type("DOUBLE").unwrap(), DataType::Float64);
        assert_eq!(parse_logical_type(" bigint ").unwrap(), DataType::Int64);
        assert_eq!(parse_logical_type("int").unwrap(), DataType::Int32);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(
            parse_logical_type("decimal(18, 4)").unwrap(),
            DataType::Decimal128(18, 4)
        );
        assert!(parse_logical_type("decimal(40,2)").is_err());
        assert!(parse_logical_type("decimal(4,6)").is_err());
    }

    #[test]
    fn test_unknown_type() {
        let err = parse_logical_type("uuid").unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigError(ref m) if m.contains("uuid")));
    }
}
