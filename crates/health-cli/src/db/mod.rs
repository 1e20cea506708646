//! Flat table models and DuckDB schema helpers
//!
//! The three source tables are stored exactly as flattened from the export:
//! every column is text, named with the raw export key.

pub mod models;
pub mod schema;

pub use models::{RawTable, SourceTables, TableName};
