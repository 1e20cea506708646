//! End-to-end pipeline: export -> stored tables -> typed rows -> metric report

use tracing::info;

use crate::config::PipelineConfig;
use crate::db::{SourceTables, TableName};
use crate::error::Result;
use crate::metrics::{self, MetricReport};
use crate::models::{ActivitySummary, CleanedRecord, Workout};
use crate::normalize;
use crate::storage::{load_or_create, CacheState, HealthStore, LoadOutcome};

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub state: CacheState,
    pub records: Vec<CleanedRecord>,
    pub workouts: Vec<Workout>,
    pub activities: Vec<ActivitySummary>,
    /// Rows left out for malformed timestamps (always 0 in strict mode)
    pub skipped: usize,
    pub report: MetricReport,
}

/// Run the whole pipeline
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let LoadOutcome { tables, state } = load(config)?;
    info!(state = %state, "source tables ready");
    analyze_tables(&tables, state, config)
}

/// Get the source tables, reusing stored ones when present.
///
/// The database is closed before returning, on success and on error.
pub fn load(config: &PipelineConfig) -> Result<LoadOutcome> {
    let mut store = HealthStore::open(&config.db_path)?;
    match load_or_create(&mut store, &config.input_path, config.force_refresh) {
        Ok(outcome) => {
            store.close()?;
            Ok(outcome)
        }
        Err(e) => {
            drop(store);
            Err(e)
        }
    }
}

/// Normalize the source tables and build the metric report
pub fn analyze_tables(
    tables: &SourceTables,
    state: CacheState,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let records = normalize::clean_records(&tables.records, config)?;
    let workouts = normalize::clean_workouts(&tables.workouts, config)?;
    let activities = normalize::clean_activity_summaries(&tables.activities, config)?;
    let skipped = records.skipped + workouts.skipped + activities.skipped;

    let report = metrics::analyze(&records.rows, config);
    info!(
        records = records.rows.len(),
        workouts = workouts.rows.len(),
        activities = activities.rows.len(),
        skipped,
        "normalized source tables"
    );

    Ok(PipelineOutput {
        state,
        records: records.rows,
        workouts: workouts.rows,
        activities: activities.rows,
        skipped,
        report,
    })
}

/// Row counts of the stored tables, `None` for a missing table
pub fn table_counts(config: &PipelineConfig) -> Result<Vec<(TableName, Option<i64>)>> {
    let store = HealthStore::open(&config.db_path)?;
    let counts = TableName::ALL
        .into_iter()
        .map(|name| store.table_row_count(name).map(|count| (name, count)))
        .collect::<Result<Vec<_>>>();
    match counts {
        Ok(counts) => {
            store.close()?;
            Ok(counts)
        }
        Err(e) => {
            drop(store);
            Err(e)
        }
    }
}
