mod backend;
mod connection;
mod query;
mod schema;
mod types;

pub use backend::Database;
pub use connection::{
    ConnectForm, ConnectionParams, Connector, DatabaseConnection, Dialect, DialectConnector,
    connect,
};
pub use query::{EXECUTED_MESSAGE, Statement, execute_query, is_select_query, run_statement};
pub use schema::reflect;

pub use types::{
    ColumnDetail, ErrorResult, ForeignKeyInfo, ModifiedResult, QueryExecutionResult, QueryResult,
    ResultCell, ResultColumnMetadata, ResultRow, RowSet, SchemaMap, TableSchema,
};

// Row decoding helpers are shared with the SQLite test backend
#[cfg(test)]
pub(crate) use query::{
    build_column_metadata, convert_row, decode_bytes, decode_text, described_row_set, first_decoded,
};
