//! SQLite-backed fixtures for unit tests.
//!
//! SQLite is not a user-facing dialect; it only stands in for a live server
//! so that reflection and execution can be exercised against a real driver.

use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Connection, Executor, Row, SqliteConnection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use crate::error::{CompletionError, DatabaseError};
use crate::services::completion::CompletionService;
use crate::services::database::{
    ColumnDetail, ConnectionParams, Connector, Database, Dialect, ForeignKeyInfo, RowSet,
    build_column_metadata, convert_row, decode_bytes, decode_text, described_row_set, first_decoded,
};

const SHOP_SCHEMA: &str = r#"
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        total REAL
    );
    INSERT INTO customers (id, name) VALUES (1, 'Ada'), (2, 'Grace');
    INSERT INTO orders (id, customer_id, total) VALUES
        (1, 1, 10.5),
        (2, 1, 4.25),
        (3, 2, 99.0);
"#;

pub async fn open_sqlite(path: &Path) -> SqliteConnection {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .connect()
        .await
        .unwrap()
}

/// Creates the customers/orders database in a fresh temp dir. Keep the
/// returned `TempDir` alive for as long as the file is used.
pub async fn shop_database() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");

    let mut conn = open_sqlite(&path).await;
    sqlx::raw_sql(SHOP_SCHEMA).execute(&mut conn).await.unwrap();
    Connection::close(conn).await.unwrap();

    (dir, path)
}

/// Parameters whose `database` field names the SQLite file to open.
pub fn sqlite_params(path: &Path) -> ConnectionParams {
    ConnectionParams {
        dialect: Dialect::Postgres,
        host: "localhost".to_string(),
        port: None,
        username: "tester".to_string(),
        password: "secret".to_string(),
        database: path.display().to_string(),
    }
}

/// Opens the SQLite file named by `params.database`, counting every attempt.
#[derive(Debug, Clone, Default)]
pub struct SqliteConnector {
    pub attempts: Arc<AtomicUsize>,
}

impl SqliteConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    async fn connect(&self, params: &ConnectionParams) -> Result<SqliteConnection, DatabaseError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let conn = SqliteConnectOptions::new()
            .filename(&params.database)
            .foreign_keys(true)
            .connect()
            .await?;
        Ok(conn)
    }
}

impl Database for SqliteConnection {
    async fn table_names(&mut self) -> Result<Vec<String>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut *self)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.try_get("name"))
            .collect::<Result<Vec<String>, _>>()?)
    }

    async fn columns(&mut self, table_name: &str) -> Result<Vec<ColumnDetail>, DatabaseError> {
        let rows = sqlx::query("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
            .bind(table_name)
            .fetch_all(&mut *self)
            .await?;

        let columns = rows
            .iter()
            .map(|row| {
                Ok::<_, sqlx::Error>(ColumnDetail {
                    column_name: row.try_get("name")?,
                    data_type: row.try_get("type")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    async fn foreign_keys(&mut self, table_name: &str) -> Result<Vec<ForeignKeyInfo>, DatabaseError> {
        let rows = sqlx::query(
            r#"SELECT id, "table" AS referred_table, "from" AS column_name, "to" AS referred_column
               FROM pragma_foreign_key_list(?)
               ORDER BY id, seq"#,
        )
        .bind(table_name)
        .fetch_all(&mut *self)
        .await?;

        let mut foreign_keys: Vec<(i64, ForeignKeyInfo)> = Vec::new();
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let column: String = row.try_get("column_name")?;
            let referred: String = row.try_get("referred_column")?;

            match foreign_keys.last_mut() {
                Some((last_id, fk)) if *last_id == id => {
                    fk.constrained_columns.push(column);
                    fk.referred_columns.push(referred);
                }
                _ => foreign_keys.push((
                    id,
                    ForeignKeyInfo {
                        constrained_columns: vec![column],
                        referred_table: row.try_get("referred_table")?,
                        referred_columns: vec![referred],
                    },
                )),
            }
        }

        Ok(foreign_keys.into_iter().map(|(_, fk)| fk).collect())
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<RowSet, DatabaseError> {
        let rows = Executor::fetch_all(&mut *self, sqlx::raw_sql(sql)).await?;
        let Some(first_row) = rows.first() else {
            return Ok(described_row_set((&mut *self).describe(sql).await));
        };

        Ok(RowSet {
            columns: build_column_metadata(first_row),
            rows: rows
                .iter()
                .map(|row| convert_row(row, decode_sqlite_cell))
                .collect(),
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        Ok(Executor::execute(&mut *self, sqlx::raw_sql(sql)).await?.rows_affected())
    }

    async fn close(self) -> Result<(), DatabaseError> {
        Ok(Connection::close(self).await?)
    }
}

fn decode_sqlite_cell(row: &SqliteRow, index: usize) -> Option<String> {
    first_decoded!(row, index, [String, i64, f64, bool])
        .or_else(|| decode_bytes(row, index))
        .or_else(|| decode_text(row, index))
}

/// Completion service that replays a canned outcome and records prompts.
#[derive(Debug, Clone)]
pub struct MockCompletion {
    pub outcome: Result<String, CompletionError>,
    pub prompts: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockCompletion {
    pub fn replying(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing(err: CompletionError) -> Self {
        Self {
            outcome: Err(err),
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionService for MockCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.outcome.clone()
    }
}
