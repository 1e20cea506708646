//! Apple Health export pipeline
//!
//! Parses `export.xml`, flattens records, workouts and activity summaries
//! into tables stored in DuckDB, then normalizes them into typed rows and
//! builds per-metric tables with daily and monthly sums.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod flatten;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod storage;

pub use config::PipelineConfig;
pub use error::{HealthError, Result};
pub use pipeline::{run, PipelineOutput};
