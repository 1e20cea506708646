//! Storage layer for Apple Health data
//!
//! The flattened source tables live in a single DuckDB file so later runs
//! can skip parsing the (large) XML export.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/apple-health/
//! ├── export.xml             # Apple Health export (default input)
//! └── health_data.duckdb     # records, workouts, activities
//! ```
//!
//! ## External Access
//!
//! All columns are VARCHAR and keep the export's attribute names, so the
//! tables can be queried directly:
//!
//! ```sql
//! SELECT "@type", COUNT(*) FROM records GROUP BY 1 ORDER BY 2 DESC;
//! ```

mod cache;
mod store;

pub use cache::{load_or_create, CacheState, LoadOutcome};
pub use store::{HealthStore, EMPTY_TABLE_MARKER};

use std::path::PathBuf;

/// Get the default database path
pub fn default_db_path() -> PathBuf {
    crate::config::default_data_dir().join("health_data.duckdb")
}
