//! Write through the client, read back through the client, on a local
//! DataFusion warehouse.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, Date32Array, Float64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use quarry_connectors::DataFusionWarehouse;
use quarry_core::{PartitionInterval, PartitionScheme, QueryRequest, TimeRange, WriteMode};
use quarry_timeseries::{NoopObserver, TimeSeriesClient};

const DAY_2023_01_01: i32 = 19358;
const DAY_2023_04_01: i32 = 19448;
const MICROS_PER_DAY: i64 = 86_400_000_000;

fn upload_table() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("partition_dt", DataType::Date32, false),
        Field::new("dt", DataType::Timestamp(TimeUnit::Microsecond, None), false),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("price", DataType::Float64, false),
    ]));
    // Rows deliberately out of time order.
    let days = [DAY_2023_04_01 + 2, DAY_2023_01_01 + 1, DAY_2023_01_01];
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(vec![
            DAY_2023_04_01,
            DAY_2023_01_01,
            DAY_2023_01_01,
        ])),
        Arc::new(TimestampMicrosecondArray::from(
            days.iter()
                .map(|d| *d as i64 * MICROS_PER_DAY)
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(vec!["BBB", "AAA", "AAA"])),
        Arc::new(Float64Array::from(vec![30.0, 20.0, 10.0])),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

async fn client_with_data(dir: &tempfile::TempDir) -> TimeSeriesClient {
    let warehouse = Arc::new(DataFusionWarehouse::new());
    let client = TimeSeriesClient::new(
        warehouse.clone(),
        warehouse,
        "market",
        dir.path().to_str().unwrap(),
    )
    .with_observer(Arc::new(NoopObserver));

    let mut dtype = BTreeMap::new();
    dtype.insert("price".to_string(), "double".to_string());
    let result = client
        .upload("prices", upload_table(), Some(dtype), WriteMode::OverwritePartitions)
        .await
        .unwrap();
    assert_eq!(result.rows_written, 3);
    assert_eq!(result.partitions.len(), 2);
    client
}

#[tokio::test]
async fn test_round_trip_returns_sorted_projection() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with_data(&dir).await;

    let request = QueryRequest::new("prices", ["price"])
        .with_symbols(["AAA", "BBB"])
        .with_range(TimeRange::between("2023-01-01", "2023-06-30"));
    let frame = client.query(&request).await.unwrap();

    assert_eq!(frame.num_rows(), 3);
    assert_eq!(frame.column_names(), vec!["symbol", "price"]);

    let index = frame.index();
    assert!(index.values().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        index.value(0),
        DAY_2023_01_01 as i64 * MICROS_PER_DAY * 1_000
    );

    let symbols = frame.column("symbol").unwrap().as_string::<i32>();
    let symbols: Vec<&str> = (0..symbols.len()).map(|i| symbols.value(i)).collect();
    assert_eq!(symbols, vec!["AAA", "AAA", "BBB"]);

    let prices = frame.column("price").unwrap().as_primitive::<Float64Type>();
    assert_eq!(prices.values().to_vec(), vec![10.0, 20.0, 30.0]);
}

#[tokio::test]
async fn test_range_prunes_later_quarter() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with_data(&dir).await;

    let request = QueryRequest::new("prices", ["price"])
        .with_range(TimeRange::between("2023-01-01", "2023-02-15"))
        .with_scheme(PartitionScheme::default().with_interval(PartitionInterval::Monthly));
    let frame = client.query(&request).await.unwrap();

    assert_eq!(frame.num_rows(), 2);
    let symbols = frame.column("symbol").unwrap().as_string::<i32>();
    assert!((0..symbols.len()).all(|i| symbols.value(i) == "AAA"));
}

#[tokio::test]
async fn test_row_bound_is_exact_within_partition() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with_data(&dir).await;

    // Same quarter partition, but the row-level bound excludes 2023-01-01.
    let request = QueryRequest::new("prices", ["price"])
        .with_range(TimeRange::new(Some("2023-01-02"), Some("2023-03-31")));
    let frame = client.query(&request).await.unwrap();

    assert_eq!(frame.num_rows(), 1);
    let prices = frame.column("price").unwrap().as_primitive::<Float64Type>();
    assert_eq!(prices.value(0), 20.0);
}

#[tokio::test]
async fn test_wildcard_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with_data(&dir).await;

    let frame = client
        .query(&QueryRequest::new("prices", ["*"]).with_symbols(["BBB"]))
        .await
        .unwrap();

    assert_eq!(frame.num_rows(), 1);
    let mut names = frame.column_names();
    names.sort();
    assert_eq!(names, vec!["price", "symbol"]);
    assert!(!frame.index().is_null(0));
}

#[tokio::test]
async fn test_symbol_with_quote_is_escaped() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with_data(&dir).await;

    let frame = client
        .query(&QueryRequest::new("prices", ["price"]).with_symbols(["A'A"]))
        .await
        .unwrap();
    assert!(frame.is_empty());
}

#[tokio::test]
async fn test_listed_symbol_column_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with_data(&dir).await;

    let frame = client
        .query(&QueryRequest::new("prices", ["price", "symbol"]))
        .await
        .unwrap();

    assert_eq!(frame.num_rows(), 3);
    assert_eq!(frame.column_names(), vec!["symbol", "price"]);
}

#[tokio::test]
async fn test_listed_dt_column_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let client = client_with_data(&dir).await;

    let frame = client
        .query(&QueryRequest::new("prices", ["dt", "price"]).with_symbols(["AAA"]))
        .await
        .unwrap();

    assert_eq!(frame.num_rows(), 2);
    assert_eq!(frame.column_names(), vec!["symbol", "price"]);
    let prices = frame.column("price").unwrap().as_primitive::<Float64Type>();
    assert_eq!(prices.values().to_vec(), vec![10.0, 20.0]);
}
