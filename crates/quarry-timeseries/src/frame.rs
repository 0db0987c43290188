//! Time-indexed result tables.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, TimestampNanosecondArray, UInt32Array};
use arrow::compute::{cast, take, take_record_batch};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit, TimestampNanosecondType};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use quarry_core::{QueryError, QueryRequest};

/// Name of the row timestamp column, which becomes the index.
pub const INDEX_COLUMN: &str = "dt";
pub const SYMBOL_COLUMN: &str = "symbol";

/// Duplicates some warehouses emit for `SELECT dt, *, symbol`.
const DUPLICATE_COLUMNS: [&str; 2] = ["dt.1", "symbol.1"];

/// A table sorted ascending by its nanosecond `dt` index.
#[derive(Debug, Clone)]
pub struct TimeSeriesFrame {
    index: TimestampNanosecondArray,
    data: RecordBatch,
}

impl TimeSeriesFrame {
    /// Shape an engine result for `request`: index on `dt`, sort, then keep
    /// either the requested fields or everything but duplicates and the
    /// partition key.
    pub fn from_query_result(batch: RecordBatch, request: &QueryRequest) -> Result<Self, QueryError> {
        let dt = batch
            .column_by_name(INDEX_COLUMN)
            .ok_or_else(|| QueryError::MissingColumn(INDEX_COLUMN.to_string()))?;
        let dt = cast(dt, &DataType::Timestamp(TimeUnit::Nanosecond, None))?;
        let dt = dt.as_primitive::<TimestampNanosecondType>();

        let order = stable_sort_order(dt)?;
        let index = take(dt, &order, None)?
            .as_primitive::<TimestampNanosecondType>()
            .clone();
        let sorted = take_record_batch(&batch, &order)?;

        let schema = sorted.schema();
        let projection = if request.is_wildcard() {
            let partition_key = request.scheme.partition_key.as_str();
            schema
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| {
                    let name = f.name().as_str();
                    name != INDEX_COLUMN && name != partition_key && !DUPLICATE_COLUMNS.contains(&name)
                })
                .map(|(i, _)| i)
                .collect::<Vec<_>>()
        } else {
            std::iter::once(SYMBOL_COLUMN)
                .chain(request.value_fields())
                .map(|name| {
                    schema
                        .index_of(name)
                        .map_err(|_| QueryError::MissingColumn(name.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let data = sorted.project(&projection)?;

        Ok(Self { index, data })
    }

    pub fn index(&self) -> &TimestampNanosecondArray {
        &self.index
    }

    pub fn data(&self) -> &RecordBatch {
        &self.data
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.data
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.data.column_by_name(name)
    }

    /// Flatten back into a single batch with the index as the leading `dt`
    /// column.
    pub fn into_record_batch(self) -> Result<RecordBatch, ArrowError> {
        let mut fields = vec![Arc::new(Field::new(
            INDEX_COLUMN,
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            true,
        ))];
        fields.extend(self.data.schema_ref().fields().iter().cloned());

        let mut columns: Vec<ArrayRef> = vec![Arc::new(self.index)];
        columns.extend(self.data.columns().iter().cloned());

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
    }
}

/// Ascending, nulls last, ties in input order.
fn stable_sort_order(index: &TimestampNanosecondArray) -> Result<UInt32Array, ArrowError> {
    let mut order: Vec<u32> = (0..take_index_len(index.len())?).collect();
    order.sort_by_key(|&i| {
        let i = i as usize;
        (index.is_null(i), index.is_valid(i).then(|| index.value(i)))
    });
    Ok(UInt32Array::from(order))
}

/// `take` indices are `u32`; larger results cannot be reordered.
fn take_index_len(rows: usize) -> Result<u32, ArrowError> {
    u32::try_from(rows).map_err(|_| {
        ArrowError::ComputeError(format!("cannot reorder {} rows with u32 indices", rows))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Float64Array, StringArray, TimestampMicrosecondArray};
    use arrow::datatypes::Float64Type;

    fn engine_batch(with_duplicates: bool) -> RecordBatch {
        let mut fields = vec![
            Field::new("dt", DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new("price", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
            Field::new("partition_dt", DataType::Date32, false),
            Field::new("symbol", DataType::Utf8, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(TimestampMicrosecondArray::from(vec![
                Some(3_000_000),
                None,
                Some(1_000_000),
                Some(3_000_000),
            ])),
            Arc::new(Float64Array::from(vec![3.0, 0.0, 1.0, 3.5])),
            Arc::new(Float64Array::from(vec![30.0, 0.0, 10.0, 35.0])),
            Arc::new(Date32Array::from(vec![19358; 4])),
            Arc::new(StringArray::from(vec!["AAA", "AAA", "BBB", "BBB"])),
        ];
        if with_duplicates {
            fields.push(Field::new(
                "dt.1",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                true,
            ));
            columns.push(columns[0].clone());
            fields.push(Field::new("symbol.1", DataType::Utf8, false));
            columns.push(columns[4].clone());
        }
        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
    }

    #[test]
    fn test_index_is_sorted_nanoseconds_with_nulls_last() {
        let request = QueryRequest::new("prices", ["price"]);
        let frame = TimeSeriesFrame::from_query_result(engine_batch(false), &request).unwrap();

        let index = frame.index();
        assert_eq!(frame.num_rows(), 4);
        assert_eq!(index.value(0), 1_000_000_000);
        assert_eq!(index.value(1), 3_000_000_000);
        assert_eq!(index.value(2), 3_000_000_000);
        assert!(index.is_null(3));
    }

    #[test]
    fn test_ties_keep_engine_order() {
        let request = QueryRequest::new("prices", ["price"]);
        let frame = TimeSeriesFrame::from_query_result(engine_batch(false), &request).unwrap();
        let price = frame.column("price").unwrap().as_primitive::<Float64Type>();
        assert_eq!(price.values().to_vec(), vec![1.0, 3.0, 3.5, 0.0]);
    }

    #[test]
    fn test_explicit_projection_leads_with_symbol() {
        let request = QueryRequest::new("prices", ["volume", "price"]);
        let frame = TimeSeriesFrame::from_query_result(engine_batch(false), &request).unwrap();
        assert_eq!(frame.column_names(), vec!["symbol", "volume", "price"]);
    }

    #[test]
    fn test_listed_symbol_and_dt_not_repeated() {
        let request = QueryRequest::new("prices", ["price", "symbol", "dt", "price"]);
        let frame = TimeSeriesFrame::from_query_result(engine_batch(false), &request).unwrap();
        assert_eq!(frame.column_names(), vec!["symbol", "price"]);
    }

    #[test]
    fn test_explicit_projection_missing_column() {
        let request = QueryRequest::new("prices", ["bid"]);
        let err = TimeSeriesFrame::from_query_result(engine_batch(false), &request).unwrap_err();
        assert!(matches!(err, QueryError::MissingColumn(ref c) if c == "bid"));
    }

    #[test]
    fn test_wildcard_drops_duplicates_and_partition_key() {
        let request = QueryRequest::new("prices", ["*"]);
        let frame = TimeSeriesFrame::from_query_result(engine_batch(true), &request).unwrap();
        assert_eq!(frame.column_names(), vec!["price", "volume", "symbol"]);
    }

    #[test]
    fn test_wildcard_tolerates_absent_duplicates() {
        let request = QueryRequest::new("prices", ["*"]);
        let frame = TimeSeriesFrame::from_query_result(engine_batch(false), &request).unwrap();
        assert_eq!(frame.column_names(), vec!["price", "volume", "symbol"]);
    }

    #[test]
    fn test_missing_dt_column() {
        let batch = engine_batch(false).project(&[1, 4]).unwrap();
        let request = QueryRequest::new("prices", ["price"]);
        let err = TimeSeriesFrame::from_query_result(batch, &request).unwrap_err();
        assert!(matches!(err, QueryError::MissingColumn(ref c) if c == "dt"));
    }

    #[test]
    fn test_into_record_batch_prepends_index() {
        let request = QueryRequest::new("prices", ["price"]);
        let frame = TimeSeriesFrame::from_query_result(engine_batch(false), &request).unwrap();
        let batch = frame.into_record_batch().unwrap();
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["dt", "symbol", "price"]);
        assert_eq!(
            batch.column(0).data_type(),
            &DataType::Timestamp(TimeUnit::Nanosecond, None)
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_row_count_beyond_u32_is_an_error() {
        assert_eq!(take_index_len(4).unwrap(), 4);
        assert_eq!(take_index_len(u32::MAX as usize).unwrap(), u32::MAX);

        let err = take_index_len(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, ArrowError::ComputeError(_)));
        assert!(matches!(QueryError::from(err), QueryError::Arrow(_)));
    }

    #[test]
    fn test_empty_result() {
        let batch = engine_batch(false).slice(0, 0);
        let request = QueryRequest::new("prices", ["*"]);
        let frame = TimeSeriesFrame::from_query_result(batch, &request).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.column_names(), vec!["price", "volume", "symbol"]);
    }
}
