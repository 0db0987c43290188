//! Loading local files for upload.

use std::path::Path;

use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionContext};
use tracing::info;

/// Read a whole CSV or Parquet file into one batch.
pub async fn load_table(path: &Path) -> Result<RecordBatch> {
    let path_str = path
        .to_str()
        .with_context(|| format!("Path is not valid UTF-8: {:?}", path))?;
    let ctx = SessionContext::new();

    let df = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => ctx.read_csv(path_str, CsvReadOptions::new()).await?,
        Some("parquet") => ctx.read_parquet(path_str, ParquetReadOptions::default()).await?,
        _ => anyhow::bail!("Unsupported file format: {}", path_str),
    };

    let schema = df.schema().inner().clone();
    let batches = df.collect().await?;
    let batch = concat_batches(&schema, &batches)?;
    info!("Loaded {} rows from '{}'", batch.num_rows(), path_str);
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::DataType;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "partition_dt,dt,symbol,price").unwrap();
        writeln!(file, "2023-01-01,2023-01-02 09:30:00,AAA,10.5").unwrap();
        writeln!(file, "2023-04-01,2023-04-03 09:30:00,BBB,20.0").unwrap();
        drop(file);

        let batch = load_table(&path).await.unwrap();
        assert_eq!(batch.num_rows(), 2);
        let schema = batch.schema();
        assert!(schema.column_with_name("partition_dt").is_some());
        assert_eq!(
            schema.field_with_name("price").unwrap().data_type(),
            &DataType::Float64
        );
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.xlsx");
        std::fs::write(&path, b"not a table").unwrap();

        let err = load_table(&path).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }
}
