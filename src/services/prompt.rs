//! Turns a reflected schema into the text block sent to the language model.

use crate::services::database::{SchemaMap, TableSchema};

/// Generates the schema description for LLM consumption.
///
/// Every table gets a `Table:` line and a `Columns:` line; the
/// `Relationships:` line is written only for tables with foreign keys.
/// Names are not escaped and the output is never truncated.
pub fn format_schema_for_llm(schema: &SchemaMap) -> String {
    let mut output = String::from("Database Schema:\n");

    for table in &schema.tables {
        format_table_for_llm(table, &mut output);
    }

    output
}

fn format_table_for_llm(table: &TableSchema, output: &mut String) {
    output.push_str(&format!("Table: {}\n", table.table_name));
    output.push_str(&format!(" Columns: {}\n", table.column_lines().join(", ")));

    if !table.foreign_keys.is_empty() {
        output.push_str(&format!(
            " Relationships: {}\n",
            table.relationship_lines().join(", ")
        ));
    }
}

/// Appends the user's request to the schema block.
pub fn build_prompt(schema_text: &str, user_request: &str) -> String {
    format!("{}\nUser request: {}\nSQL query:", schema_text, user_request)
}
