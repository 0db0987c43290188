//! Rendering query results.

use anyhow::Result;
use arrow::csv::WriterBuilder;
use arrow::json::ArrayWriter;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

pub fn render(batch: &RecordBatch, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(pretty_format_batches(&[batch.clone()])?.to_string()),
        OutputFormat::Csv => {
            let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
            writer.write(batch)?;
            Ok(String::from_utf8(writer.into_inner())?)
        }
        OutputFormat::Json => {
            let mut writer = ArrayWriter::new(Vec::new());
            writer.write(batch)?;
            writer.finish()?;
            let bytes = writer.into_inner();
            if bytes.is_empty() {
                return Ok("[]".to_string());
            }
            let value: serde_json::Value = serde_json::from_slice(&bytes)?;
            Ok(serde_json::to_string_pretty(&value)?)
        }
    }
}
