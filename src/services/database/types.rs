use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub column_name: String,
    pub data_type: String,
}

impl fmt::Display for ColumnDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.column_name, self.data_type)
    }
}

/// One foreign-key constraint. Composite keys keep their declared column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub constrained_columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

impl fmt::Display for ForeignKeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} references {}({})",
            self.constrained_columns.join(", "),
            self.referred_table,
            self.referred_columns.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDetail>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

impl TableSchema {
    /// Columns rendered as `name (type)`.
    pub fn column_lines(&self) -> Vec<String> {
        self.columns.iter().map(ToString::to_string).collect()
    }

    /// Foreign keys rendered as `cols references table(cols)`.
    pub fn relationship_lines(&self) -> Vec<String> {
        self.foreign_keys.iter().map(ToString::to_string).collect()
    }
}

/// Tables in the order the reflector enumerated them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMap {
    pub tables: Vec<TableSchema>,
}

impl SchemaMap {
    pub fn get(&self, table_name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.table_name == table_name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ============================================================================
// Query Result Structures
// ============================================================================

/// Metadata about a column from a query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumnMetadata {
    pub name: String,
    pub type_name: String,
    pub ordinal: usize,
}

/// A cell value rendered as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCell {
    pub value: String,
    pub is_null: bool,
}

impl ResultCell {
    pub fn null() -> Self {
        Self {
            value: "NULL".to_string(),
            is_null: true,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_null: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub cells: Vec<ResultCell>,
}

impl ResultRow {
    pub fn values(&self) -> Vec<&str> {
        self.cells.iter().map(|c| c.value.as_str()).collect()
    }
}

/// Rows fetched by a read query, before timing is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub columns: Vec<ResultColumnMetadata>,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ResultColumnMetadata>,
    pub rows: Vec<ResultRow>,
    pub row_count: usize,
    pub execution_time_ms: u128,
    pub original_query: String,
}

impl QueryResult {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedResult {
    pub message: String,
    pub execution_time_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub kind: ErrorKind,
    pub message: String,
    pub execution_time_ms: u128,
}

/// Result of a query execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExecutionResult {
    Select(QueryResult),
    Modified(ModifiedResult),
    Error(ErrorResult),
}
