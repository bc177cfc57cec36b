use sqlx::{Connection, Executor};
use std::future::Future;

use super::connection::DatabaseConnection;
use super::query::{described_row_set, mysql_row_set, pg_row_set};
use super::schema::{mysql, postgres};
use super::types::{ColumnDetail, ForeignKeyInfo, RowSet};
use crate::error::DatabaseError;

/// Operations the reflector and executor need from an open connection.
pub trait Database: Send {
    /// Base tables of the connection's default schema
    fn table_names(&mut self) -> impl Future<Output = Result<Vec<String>, DatabaseError>> + Send;

    /// Columns of `table_name` in ordinal order
    fn columns(
        &mut self,
        table_name: &str,
    ) -> impl Future<Output = Result<Vec<ColumnDetail>, DatabaseError>> + Send;

    /// Foreign keys of `table_name`, one entry per constraint
    fn foreign_keys(
        &mut self,
        table_name: &str,
    ) -> impl Future<Output = Result<Vec<ForeignKeyInfo>, DatabaseError>> + Send;

    /// Runs a read query as plain text and buffers every row
    fn fetch_all(&mut self, sql: &str) -> impl Future<Output = Result<RowSet, DatabaseError>> + Send;

    /// Runs any other statement as plain text, returning the affected-row count
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<u64, DatabaseError>> + Send;

    fn close(self) -> impl Future<Output = Result<(), DatabaseError>> + Send
    where
        Self: Sized;
}

impl Database for DatabaseConnection {
    async fn table_names(&mut self) -> Result<Vec<String>, DatabaseError> {
        let names = match self {
            DatabaseConnection::Postgres(conn) => postgres::table_names(conn).await?,
            DatabaseConnection::MySql(conn) => mysql::table_names(conn).await?,
        };
        Ok(names)
    }

    async fn columns(&mut self, table_name: &str) -> Result<Vec<ColumnDetail>, DatabaseError> {
        let columns = match self {
            DatabaseConnection::Postgres(conn) => postgres::columns(conn, table_name).await?,
            DatabaseConnection::MySql(conn) => mysql::columns(conn, table_name).await?,
        };
        Ok(columns)
    }

    async fn foreign_keys(&mut self, table_name: &str) -> Result<Vec<ForeignKeyInfo>, DatabaseError> {
        let foreign_keys = match self {
            DatabaseConnection::Postgres(conn) => postgres::foreign_keys(conn, table_name).await?,
            DatabaseConnection::MySql(conn) => mysql::foreign_keys(conn, table_name).await?,
        };
        Ok(foreign_keys)
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<RowSet, DatabaseError> {
        let row_set = match self {
            DatabaseConnection::Postgres(conn) => {
                let rows = (&mut *conn).fetch_all(sqlx::raw_sql(sql)).await?;
                if rows.is_empty() {
                    described_row_set((&mut *conn).describe(sql).await)
                } else {
                    pg_row_set(&rows)
                }
            }
            DatabaseConnection::MySql(conn) => {
                let rows = (&mut *conn).fetch_all(sqlx::raw_sql(sql)).await?;
                if rows.is_empty() {
                    described_row_set((&mut *conn).describe(sql).await)
                } else {
                    mysql_row_set(&rows)
                }
            }
        };
        Ok(row_set)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        let rows_affected = match self {
            DatabaseConnection::Postgres(conn) => {
                (&mut *conn).execute(sqlx::raw_sql(sql)).await?.rows_affected()
            }
            DatabaseConnection::MySql(conn) => {
                (&mut *conn).execute(sqlx::raw_sql(sql)).await?.rows_affected()
            }
        };
        Ok(rows_affected)
    }

    async fn close(self) -> Result<(), DatabaseError> {
        match self {
            DatabaseConnection::Postgres(conn) => conn.close().await?,
            DatabaseConnection::MySql(conn) => conn.close().await?,
        }
        Ok(())
    }
}
