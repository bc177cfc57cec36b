use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::{Column, Describe, Row, TypeInfo, ValueRef};

use super::backend::Database;
use super::connection::{ConnectionParams, Connector};
use super::types::{
    ErrorResult, ModifiedResult, QueryExecutionResult, QueryResult, ResultCell,
    ResultColumnMetadata, ResultRow, RowSet,
};
use crate::error::DatabaseError;

pub const EXECUTED_MESSAGE: &str = "Query executed successfully.";

/// Opens a fresh connection, runs `sql`, and always closes the connection
/// before returning.
pub async fn execute_query<C: Connector>(
    connector: &C,
    params: &ConnectionParams,
    sql: &str,
) -> QueryExecutionResult {
    tracing::info!(sql = %sql, "Executing query");
    let start_time = std::time::Instant::now();

    let mut conn = match connector.connect(params).await {
        Ok(conn) => conn,
        Err(e) => return error_result(e, start_time.elapsed().as_millis()),
    };

    let outcome = run_statement(&mut conn, sql).await;

    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close connection: {}", e);
    }

    let execution_time_ms = start_time.elapsed().as_millis();
    match outcome {
        Ok(Statement::Read(row_set)) => {
            tracing::info!(rows = row_set.rows.len(), execution_time_ms, "Query returned rows");
            QueryExecutionResult::Select(QueryResult {
                row_count: row_set.rows.len(),
                columns: row_set.columns,
                rows: row_set.rows,
                execution_time_ms,
                original_query: sql.to_string(),
            })
        }
        Ok(Statement::Write) => {
            tracing::info!(execution_time_ms, "Statement executed");
            QueryExecutionResult::Modified(ModifiedResult {
                message: EXECUTED_MESSAGE.to_string(),
                execution_time_ms,
            })
        }
        Err(e) => error_result(e, execution_time_ms),
    }
}

/// Outcome of a statement on an already open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Read(RowSet),
    Write,
}

/// Runs `sql` on an open connection. Only statements starting with `select`
/// are fetched; the affected-row count of anything else is ignored.
pub async fn run_statement<D: Database>(db: &mut D, sql: &str) -> Result<Statement, DatabaseError> {
    if is_select_query(sql) {
        Ok(Statement::Read(db.fetch_all(sql).await?))
    } else {
        db.execute(sql).await?;
        Ok(Statement::Write)
    }
}

fn error_result(err: DatabaseError, execution_time_ms: u128) -> QueryExecutionResult {
    tracing::warn!(kind = %err.kind, "Query failed: {}", err);
    QueryExecutionResult::Error(ErrorResult {
        kind: err.kind,
        message: err.message,
        execution_time_ms,
    })
}

// ============================================================================
// Free functions for query processing
// ============================================================================

pub fn is_select_query(sql: &str) -> bool {
    sql.to_lowercase().starts_with("select")
}

/// Returns the `Display` text of the first type in the list that decodes.
macro_rules! first_decoded {
    ($row:expr, $index:expr, [$($ty:ty),+ $(,)?]) => {{
        let mut decoded: Option<String> = None;
        $(
            if decoded.is_none() {
                if let Ok(v) = $row.try_get::<$ty, _>($index) {
                    decoded = Some(v.to_string());
                }
            }
        )+
        decoded
    }};
}

#[cfg(test)]
pub(crate) use first_decoded;

pub(crate) fn pg_row_set(rows: &[PgRow]) -> RowSet {
    let Some(first_row) = rows.first() else {
        return RowSet::default();
    };

    RowSet {
        columns: build_column_metadata(first_row),
        rows: rows
            .iter()
            .map(|row| convert_row(row, decode_pg_cell))
            .collect(),
    }
}

pub(crate) fn mysql_row_set(rows: &[MySqlRow]) -> RowSet {
    let Some(first_row) = rows.first() else {
        return RowSet::default();
    };

    RowSet {
        columns: build_column_metadata(first_row),
        rows: rows
            .iter()
            .map(|row| convert_row(row, decode_mysql_cell))
            .collect(),
    }
}

/// Row set for a read that produced no rows. The column list comes from
/// describing the statement; text the server cannot prepare as a single
/// statement reports no columns.
pub(crate) fn described_row_set<DB: sqlx::Database>(
    described: Result<Describe<DB>, sqlx::Error>,
) -> RowSet {
    match described {
        Ok(describe) => RowSet {
            columns: column_metadata(describe.columns()),
            rows: Vec::new(),
        },
        Err(e) => {
            tracing::debug!("Could not describe empty result: {}", e);
            RowSet::default()
        }
    }
}

pub(crate) fn build_column_metadata<R: Row>(first_row: &R) -> Vec<ResultColumnMetadata> {
    column_metadata(first_row.columns())
}

fn column_metadata<C: Column>(columns: &[C]) -> Vec<ResultColumnMetadata> {
    columns
        .iter()
        .enumerate()
        .map(|(ordinal, col)| ResultColumnMetadata {
            name: col.name().to_string(),
            type_name: col.type_info().name().to_string(),
            ordinal,
        })
        .collect()
}

pub(crate) fn convert_row<R, F>(row: &R, decode: F) -> ResultRow
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    F: Fn(&R, usize) -> Option<String>,
{
    let cells = (0..row.columns().len())
        .map(|index| match row.try_get_raw(index) {
            Ok(raw_value) if raw_value.is_null() => ResultCell::null(),
            Ok(_) => match decode(row, index) {
                Some(value) => ResultCell::text(value),
                None => ResultCell::text(format!(
                    "<{}>",
                    row.columns()[index].type_info().name()
                )),
            },
            Err(_) => ResultCell::text("ERROR"),
        })
        .collect();

    ResultRow { cells }
}

fn decode_pg_cell(row: &PgRow, index: usize) -> Option<String> {
    first_decoded!(
        row,
        index,
        [
            String,
            i64,
            i32,
            i16,
            f64,
            f32,
            bool,
            rust_decimal::Decimal,
            chrono::DateTime<chrono::Utc>,
            chrono::NaiveDateTime,
            chrono::NaiveDate,
            chrono::NaiveTime,
            uuid::Uuid,
            serde_json::Value,
        ]
    )
    .or_else(|| decode_bytes(row, index))
    .or_else(|| decode_text(row, index))
}

fn decode_mysql_cell(row: &MySqlRow, index: usize) -> Option<String> {
    first_decoded!(
        row,
        index,
        [
            String,
            i64,
            u64,
            f64,
            f32,
            bool,
            rust_decimal::Decimal,
            chrono::DateTime<chrono::Utc>,
            chrono::NaiveDateTime,
            chrono::NaiveDate,
            chrono::NaiveTime,
            serde_json::Value,
        ]
    )
    .or_else(|| decode_bytes(row, index))
    .or_else(|| decode_text(row, index))
}

/// Server text form of a value no typed decoder accepts (intervals, network
/// addresses, money, arrays, MySQL `YEAR`/`BIT`). Non-UTF-8 values are shown
/// as hex.
pub(crate) fn decode_text<'r, R>(row: &'r R, index: usize) -> Option<String>
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database>,
    Vec<u8>: sqlx::Decode<'r, R::Database>,
{
    row.try_get_unchecked::<String, _>(index).ok().or_else(|| {
        row.try_get_unchecked::<Vec<u8>, _>(index)
            .ok()
            .map(|bytes| format!("0x{}", hex::encode(bytes)))
    })
}

pub(crate) fn decode_bytes<'r, R>(row: &'r R, index: usize) -> Option<String>
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    Vec<u8>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    row.try_get::<Vec<u8>, _>(index)
        .ok()
        .map(|bytes| format!("0x{}", hex::encode(bytes)))
}
