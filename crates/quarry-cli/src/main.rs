//! Quarry CLI - query and upload partitioned time-series tables

mod config;
mod input;
mod output;
mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use quarry_connectors::{is_s3_location, DataFusionWarehouse, S3Config};
use quarry_core::{build_select, PartitionInterval, QueryRequest, TimeRange, WriteMode, WILDCARD};
use quarry_timeseries::TimeSeriesClient;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::QuarryConfig;
use crate::output::OutputFormat;
use crate::progress::SpinnerObserver;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Time-indexed access to date/symbol partitioned warehouse tables")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a table and print the time-sorted result
    Query {
        #[command(flatten)]
        query: QueryArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the SQL a query would run, without running it
    Sql {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Upload a CSV or Parquet file as a partitioned table
    Upload {
        /// Target table name
        #[arg(short, long)]
        table: String,

        /// Path to a .csv or .parquet file
        #[arg(short, long)]
        file: PathBuf,

        /// Column type override, e.g. `price=double` (repeatable)
        #[arg(long = "dtype", value_parser = parse_dtype)]
        dtypes: Vec<(String, String)>,

        /// append, overwrite or overwrite-partitions
        #[arg(long, default_value = "overwrite-partitions")]
        mode: WriteMode,
    },
}

#[derive(Args, Debug, Clone)]
struct QueryArgs {
    /// Table to read
    #[arg(short, long)]
    table: String,

    /// Comma-separated columns, or `*` for all
    #[arg(short, long, value_delimiter = ',', default_value = WILDCARD)]
    fields: Vec<String>,

    /// Comma-separated symbols to keep
    #[arg(short, long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Inclusive lower bound, YYYY-MM-DD or YYYY-MM-DD HH:MM:SS
    #[arg(long)]
    start: Option<String>,

    /// Inclusive upper bound, YYYY-MM-DD or YYYY-MM-DD HH:MM:SS
    #[arg(long)]
    end: Option<String>,

    /// IANA timezone the bounds are expressed in
    #[arg(long)]
    tz: Option<String>,

    /// Partition interval: quarterly or monthly
    #[arg(long)]
    interval: Option<String>,

    /// Partition key column
    #[arg(long)]
    partition_key: Option<String>,

    /// SQL type the row-level `dt` bound is cast to
    #[arg(long)]
    value_type: Option<String>,

    /// Maximum age in seconds of a cached result the engine may reuse
    #[arg(long)]
    max_cache_expires: Option<u64>,

    /// Ask the engine for CTAS-based execution
    #[arg(long)]
    ctas: bool,
}

impl QueryArgs {
    /// Merge command-line options over the environment configuration.
    fn to_request(&self, config: &QuarryConfig) -> Result<QueryRequest> {
        let mut scheme = config.scheme.clone();
        if let Some(interval) = &self.interval {
            scheme.interval = interval.parse::<PartitionInterval>()?;
        }
        if let Some(key) = &self.partition_key {
            scheme.partition_key = key.clone();
        }
        if let Some(value_type) = &self.value_type {
            scheme.value_type = value_type.clone();
        }

        let mut range = TimeRange::new(self.start.as_deref(), self.end.as_deref());
        if let Some(tz) = &self.tz {
            range = range.with_tz(tz);
        }

        let mut request = QueryRequest::new(&self.table, &self.fields)
            .with_range(range)
            .with_scheme(scheme)
            .with_ctas_approach(self.ctas);
        if !self.symbols.is_empty() {
            request = request.with_symbols(&self.symbols);
        }
        if let Some(seconds) = self.max_cache_expires.or(config.max_cache_expires) {
            request = request.with_max_cache_expires(seconds);
        }
        Ok(request)
    }
}

fn parse_dtype(s: &str) -> Result<(String, String), String> {
    let (column, dtype) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=TYPE, got '{}'", s))?;
    if column.trim().is_empty() || dtype.trim().is_empty() {
        return Err(format!("expected COLUMN=TYPE, got '{}'", s));
    }
    Ok((column.trim().to_string(), dtype.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = QuarryConfig::from_env()?;

    match cli.command {
        Commands::Query { query, format } => {
            run_query(&config, &query, format).await?;
        }
        Commands::Sql { query } => {
            println!("{}", build_select(&query.to_request(&config)?)?);
        }
        Commands::Upload {
            table,
            file,
            dtypes,
            mode,
        } => {
            run_upload(&config, &table, &file, dtypes, mode).await?;
        }
    }

    Ok(())
}

fn open_warehouse(config: &QuarryConfig) -> Result<DataFusionWarehouse> {
    let warehouse = DataFusionWarehouse::new();
    if is_s3_location(&config.base_path) {
        let s3 = S3Config::from_env()?;
        warehouse.register_s3(&config.base_path, &s3)?;
    }
    Ok(warehouse)
}

async fn run_query(config: &QuarryConfig, args: &QueryArgs, format: OutputFormat) -> Result<()> {
    let request = args.to_request(config)?;
    let warehouse = Arc::new(open_warehouse(config)?);
    warehouse
        .attach_table(
            &config.database,
            &request.table_name,
            &config.table_location(&request.table_name),
        )
        .await?;

    let client = TimeSeriesClient::new(
        warehouse.clone(),
        warehouse,
        &config.database,
        &config.base_path,
    );
    let frame = client.query(&request).await?;
    info!("Fetched {} rows", frame.num_rows());

    let batch = frame.into_record_batch()?;
    println!("{}", output::render(&batch, format)?);
    Ok(())
}

async fn run_upload(
    config: &QuarryConfig,
    table: &str,
    file: &Path,
    dtypes: Vec<(String, String)>,
    mode: WriteMode,
) -> Result<()> {
    let batch = input::load_table(file).await?;
    let warehouse = Arc::new(open_warehouse(config)?);
    let client = TimeSeriesClient::new(
        warehouse.clone(),
        warehouse,
        &config.database,
        &config.base_path,
    )
    .with_observer(Arc::new(SpinnerObserver::new()?));

    let dtype = (!dtypes.is_empty()).then(|| dtypes.into_iter().collect());
    let result = client.upload(table, batch, dtype, mode).await?;

    println!("\n=== Upload Complete ===");
    println!("Location: {}", result.location);
    println!("Rows: {}", result.rows_written);
    println!("Partitions: {}", result.partitions.len());
    for partition in &result.partitions {
        println!("  - {}", partition);
    }
    Ok(())
}
