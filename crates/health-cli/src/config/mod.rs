//! Pipeline configuration
//!
//! Everything the pipeline needs is passed in through [`PipelineConfig`]:
//! input and database locations, the metric allow-list, the summable subset
//! and the columns dropped before typed conversion.

use std::path::PathBuf;

use crate::error::{HealthError, Result};

/// Default data directory name
const DATA_DIR_NAME: &str = "apple-health";

/// Metrics selected for analysis
pub const DEFAULT_METRICS: &[&str] = &[
    "BodyMass",
    "ActiveEnergyBurned",
    "BasalEnergyBurned",
    "DistanceWalkingRunning",
    "StepCount",
    "AppleStandTime",
    "WalkingSpeed",
    "DistanceCycling",
    "HeartRateVariabilitySDNN",
    "RestingHeartRate",
    "WalkingHeartRateAverage",
    "VO2Max",
    "HeartRateRecoveryOneMinute",
    "PhysicalEffort",
    "SleepAnalysis",
];

/// Flow quantities, for which daily and monthly sums are meaningful
pub const DEFAULT_SUMMABLE_METRICS: &[&str] = &[
    "ActiveEnergyBurned",
    "BasalEnergyBurned",
    "DistanceWalkingRunning",
    "StepCount",
    "AppleStandTime",
    "DistanceCycling",
];

/// Normalized column names removed from the source tables before typed conversion
pub const DEFAULT_DROPPED_COLUMNS: &[&str] = &[
    "source_version",
    "device",
    "metadata_entry",
    "heart_rate_variability_metadata_list",
];

/// How a record's type is matched against an allow-list metric name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The type contains the metric name anywhere. A type can land in
    /// several metric tables when one name is a substring of another.
    #[default]
    Substring,
    /// The type equals the metric name
    Exact,
}

impl MatchMode {
    pub fn matches(&self, metric_type: &str, metric: &str) -> bool {
        match self {
            MatchMode::Substring => metric_type.contains(metric),
            MatchMode::Exact => metric_type == metric,
        }
    }
}

/// What to do with a record whose timestamps do not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// Abort the run
    #[default]
    Strict,
    /// Exclude the record and report how many were excluded
    SkipAndCount,
}

/// Explicit configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Apple Health `export.xml`
    pub input_path: PathBuf,
    /// DuckDB database file
    pub db_path: PathBuf,
    pub metrics: Vec<String>,
    pub summable_metrics: Vec<String>,
    pub dropped_columns: Vec<String>,
    pub match_mode: MatchMode,
    pub timestamp_policy: TimestampPolicy,
    /// Drop and rebuild the stored tables even if they already exist
    pub force_refresh: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            db_path: crate::storage::default_db_path(),
            metrics: to_owned_list(DEFAULT_METRICS),
            summable_metrics: to_owned_list(DEFAULT_SUMMABLE_METRICS),
            dropped_columns: to_owned_list(DEFAULT_DROPPED_COLUMNS),
            match_mode: MatchMode::default(),
            timestamp_policy: TimestampPolicy::default(),
            force_refresh: false,
        }
    }
}

impl PipelineConfig {
    /// Create a config for the given input and database paths with default lists
    pub fn new(input_path: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_summable_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.summable_metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dropped_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dropped_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Whether daily and monthly sums are computed for this metric
    pub fn is_summable(&self, metric: &str) -> bool {
        self.summable_metrics.iter().any(|m| m == metric)
    }

    /// Check the lists are consistent with each other
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(HealthError::config("metric allow-list is empty"));
        }
        if let Some(m) = self
            .summable_metrics
            .iter()
            .find(|m| !self.metrics.contains(m))
        {
            return Err(HealthError::config(format!(
                "summable metric '{}' is not in the allow-list",
                m
            )));
        }
        Ok(())
    }
}

/// Get the data directory used for default paths
/// Returns ~/.local/share/apple-health on Unix, ~/Library/Application Support/apple-health on macOS
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Get the default export path
pub fn default_input_path() -> PathBuf {
    default_data_dir().join("export.xml")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &std::path::Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = PipelineConfig::default();
        assert!(config.input_path.ends_with("apple-health/export.xml"));
        assert!(config.db_path.ends_with("apple-health/health_data.duckdb"));
    }

    #[test]
    fn test_default_lists_are_consistent() {
        let config = PipelineConfig::default();
        assert_eq!(config.metrics.len(), 15);
        assert!(config.validate().is_ok());
        assert!(config.is_summable("StepCount"));
        assert!(!config.is_summable("BodyMass"));
        assert!(!config.is_summable("VO2Max"));
    }

    #[test]
    fn test_validate_rejects_unknown_summable() {
        let config = PipelineConfig::default()
            .with_metrics(["StepCount"])
            .with_summable_metrics(["StepCount", "DistanceCycling"]);
        assert!(matches!(config.validate(), Err(HealthError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_allow_list() {
        let config = PipelineConfig::default().with_metrics(Vec::<String>::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_match_mode() {
        assert!(MatchMode::Substring.matches("HeartRateVariabilitySDNN", "HeartRate"));
        assert!(!MatchMode::Exact.matches("HeartRateVariabilitySDNN", "HeartRate"));
        assert!(MatchMode::Exact.matches("StepCount", "StepCount"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::new("in.xml", "out.duckdb")
            .with_match_mode(MatchMode::Exact)
            .with_timestamp_policy(TimestampPolicy::SkipAndCount)
            .with_force_refresh(true);
        assert_eq!(config.input_path, PathBuf::from("in.xml"));
        assert_eq!(config.db_path, PathBuf::from("out.duckdb"));
        assert_eq!(config.match_mode, MatchMode::Exact);
        assert_eq!(config.timestamp_policy, TimestampPolicy::SkipAndCount);
        assert!(config.force_refresh);
    }
}
