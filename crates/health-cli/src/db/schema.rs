//! SQL for the source tables
//!
//! Column names come straight from the export (`@type`, `WorkoutStatistics.…`)
//! so every identifier is quoted.

use super::models::RawTable;

/// Quote an identifier for DuckDB
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` with one VARCHAR column per table column
pub fn create_table_sql(table: &RawTable) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| format!("{} VARCHAR", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&table.name),
        columns
    )
}

/// Parameterised insert covering every column
pub fn insert_sql(table: &RawTable) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; table.columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&table.name),
        columns,
        placeholders
    )
}

/// Select every column as text, in the given order
pub fn select_sql(name: &str, columns: &[String]) -> String {
    let projection = columns
        .iter()
        .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {}", projection, quote_ident(name))
}

pub const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables
     WHERE table_schema = 'main' AND table_name = ?";

pub const TABLE_COLUMNS_SQL: &str = "SELECT column_name FROM information_schema.columns
     WHERE table_schema = 'main' AND table_name = ?
     ORDER BY ordinal_position";
