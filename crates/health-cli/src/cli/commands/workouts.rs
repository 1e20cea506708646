//! Workout commands for health-cli

use crate::cli::output::{emit, fmt_value, OutputFormat, TextTable};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::workout_totals;
use crate::pipeline;

/// Total workout duration per activity type
pub fn totals(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let output = pipeline::run(config)?;
    let totals = workout_totals(&output.workouts);

    let mut table = TextTable::new(["Activity", "Sessions", "Duration", "Unit"]);
    for t in &totals {
        table.push(vec![
            t.activity_type.clone(),
            t.sessions.to_string(),
            fmt_value(t.total_duration),
            t.unit.clone().unwrap_or_default(),
        ]);
    }

    emit(format, &table, &totals)
}
