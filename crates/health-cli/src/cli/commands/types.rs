//! Record type commands for health-cli

use crate::cli::output::{emit, OutputFormat, TextTable};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::type_counts;
use crate::pipeline;

/// Record count per type, including types outside the metric allow-list
pub fn list(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let output = pipeline::run(config)?;
    let counts = type_counts(&output.records);

    let mut table = TextTable::new(["Type", "Records", "Metric"]);
    for c in &counts {
        let listed = config.metrics.iter().any(|m| m == &c.metric_type);
        table.push(vec![
            c.metric_type.clone(),
            c.records.to_string(),
            if listed { "yes" } else { "no" }.to_string(),
        ]);
    }

    emit(format, &table, &counts)
}
