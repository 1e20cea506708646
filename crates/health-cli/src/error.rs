use std::path::PathBuf;

use thiserror::Error;

/// Main error type for health-cli
#[derive(Error, Debug)]
pub enum HealthError {
    #[error("Failed to parse export {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Export not found: {}. Pass --input or set HEALTH_EXPORT.", .0.display())]
    ExportNotFound(PathBuf),

    #[error("Invalid timestamp in field '{field}': '{value}'")]
    InvalidTimestamp { field: String, value: String },

    #[error("Missing required column '{column}' in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HealthError>;

impl HealthError {
    /// Create a parse error for the given document
    pub fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl From<duckdb::Error> for HealthError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Render an error as a single line for the terminal, with a hint where one helps
pub fn format_user_error(err: &HealthError) -> String {
    match err {
        HealthError::Database(msg) if msg.contains("lock") => {
            format!("{} (is another process using the database?)", err)
        }
        HealthError::InvalidTimestamp { .. } => {
            format!("{} (rerun with --skip-bad-timestamps to skip such records)", err)
        }
        _ => err.to_string(),
    }
}
