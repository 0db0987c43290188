//! Read path: assemble SQL, execute it, shape the result.

use quarry_core::{build_select, QueryError, QueryRequest, SqlEngine};
use tracing::{debug, info};

use crate::frame::TimeSeriesFrame;

/// Run `request` against `database` and return a time-sorted frame.
///
/// Every validation error surfaces before the engine is called. Engine
/// failures are passed through inside [`QueryError::Engine`].
pub async fn run_query(
    engine: &dyn SqlEngine,
    database: &str,
    request: &QueryRequest,
) -> Result<TimeSeriesFrame, QueryError> {
    let sql = build_select(request)?;
    let options = request.execution_options();
    debug!(database, ?options, "submitting query");

    let batch = engine
        .execute_sql(&sql, database, &options)
        .await
        .map_err(QueryError::Engine)?;

    let frame = TimeSeriesFrame::from_query_result(batch, request)?;
    info!(
        "Query on '{}.{}' returned {} rows",
        database,
        request.table_name,
        frame.num_rows()
    );
    Ok(frame)
}
