//! Plain-text rendering of schemas and query results for the terminal.

use crate::services::database::{QueryExecutionResult, QueryResult, SchemaMap};

pub fn render_schema(schema: &SchemaMap) -> String {
    if schema.is_empty() {
        return "No tables found.\n".to_string();
    }

    let mut output = String::new();
    for table in &schema.tables {
        output.push_str(&format!("Table: {}\n", table.table_name));
        output.push_str("  Columns:\n");
        for column in table.column_lines() {
            output.push_str(&format!("    - {}\n", column));
        }

        if !table.foreign_keys.is_empty() {
            output.push_str("  Relationships:\n");
            for relationship in table.relationship_lines() {
                output.push_str(&format!("    - {}\n", relationship));
            }
        }
    }
    output
}

pub fn render_result(result: &QueryExecutionResult) -> String {
    match result {
        QueryExecutionResult::Select(query_result) => render_rows(query_result),
        QueryExecutionResult::Modified(modified) => {
            format!("{}\n\nTook: {} ms\n", modified.message, modified.execution_time_ms)
        }
        QueryExecutionResult::Error(error) => format!("Error: {}\n", error.message),
    }
}

fn render_rows(result: &QueryResult) -> String {
    let footer = format!(
        "({} row{})\n\nTook: {} ms\n",
        result.row_count,
        if result.row_count == 1 { "" } else { "s" },
        result.execution_time_ms
    );

    if result.columns.is_empty() {
        return footer;
    }

    let mut widths: Vec<usize> = result
        .columns
        .iter()
        .map(|c| c.name.chars().count())
        .collect();
    for row in &result.rows {
        for (i, cell) in row.cells.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.value.chars().count());
            }
        }
    }

    let format_line = |values: Vec<&str>| -> String {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect();
        format!(" {}", padded.join(" | ")).trim_end().to_string() + "\n"
    };

    let mut output = format_line(result.column_names());
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&format!("-{}-\n", separator.join("-+-")));

    for row in &result.rows {
        output.push_str(&format_line(row.values()));
    }

    output.push_str(&footer);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::database::{
        ColumnDetail, ErrorResult, ForeignKeyInfo, ModifiedResult, ResultCell,
        ResultColumnMetadata, ResultRow, TableSchema,
    };

    fn column(name: &str, ordinal: usize) -> ResultColumnMetadata {
        ResultColumnMetadata {
            name: name.to_string(),
            type_name: "TEXT".to_string(),
            ordinal,
        }
    }

    #[test]
    fn test_render_rows_aligns_columns() {
        let result = QueryExecutionResult::Select(QueryResult {
            columns: vec![column("customer_id", 0), column("COUNT(*)", 1)],
            rows: vec![
                ResultRow {
                    cells: vec![ResultCell::text("1"), ResultCell::text("2")],
                },
                ResultRow {
                    cells: vec![ResultCell::text("2"), ResultCell::null()],
                },
            ],
            row_count: 2,
            execution_time_ms: 3,
            original_query: "SELECT ...".to_string(),
        });

        let expected = " customer_id | COUNT(*)\n\
                        -------------+----------\n \
                        1           | 2\n \
                        2           | NULL\n\
                        (2 rows)\n\nTook: 3 ms\n";
        assert_eq!(render_result(&result), expected);
    }

    #[test]
    fn test_render_empty_select() {
        let result = QueryExecutionResult::Select(QueryResult {
            columns: vec![],
            rows: vec![],
            row_count: 0,
            execution_time_ms: 1,
            original_query: "SELECT * FROM empty".to_string(),
        });
        assert_eq!(render_result(&result), "(0 rows)\n\nTook: 1 ms\n");
    }

    #[test]
    fn test_render_modified_and_error() {
        let modified = QueryExecutionResult::Modified(ModifiedResult {
            message: "Query executed successfully.".to_string(),
            execution_time_ms: 7,
        });
        assert_eq!(
            render_result(&modified),
            "Query executed successfully.\n\nTook: 7 ms\n"
        );

        let error = QueryExecutionResult::Error(ErrorResult {
            kind: ErrorKind::Syntax,
            message: "near \"SELEC\": syntax error".to_string(),
            execution_time_ms: 0,
        });
        assert_eq!(render_result(&error), "Error: near \"SELEC\": syntax error\n");
    }

    #[test]
    fn test_render_schema() {
        let schema = SchemaMap {
            tables: vec![TableSchema {
                table_name: "orders".to_string(),
                columns: vec![ColumnDetail {
                    column_name: "customer_id".to_string(),
                    data_type: "INTEGER".to_string(),
                }],
                foreign_keys: vec![ForeignKeyInfo {
                    constrained_columns: vec!["customer_id".to_string()],
                    referred_table: "customers".to_string(),
                    referred_columns: vec!["id".to_string()],
                }],
            }],
        };

        assert_eq!(
            render_schema(&schema),
            "Table: orders\n  Columns:\n    - customer_id (INTEGER)\n  Relationships:\n    - customer_id references customers(id)\n"
        );
        assert_eq!(render_schema(&SchemaMap::default()), "No tables found.\n");
    }
}
