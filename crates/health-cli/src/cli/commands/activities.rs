//! Activity summary commands for health-cli

use crate::cli::output::{emit, fmt_value, OutputFormat, TextTable};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::active_energy_days;
use crate::pipeline;

/// Active energy burned per day, leaving out days with nothing recorded
pub fn list(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let output = pipeline::run(config)?;
    let days = active_energy_days(&output.activities);

    let mut table = TextTable::new(["Date", "Active Energy", "Unit"]);
    for d in &days {
        table.push(vec![
            d.date.to_string(),
            fmt_value(d.active_energy_burned),
            d.unit.clone().unwrap_or_default(),
        ]);
    }

    if format == OutputFormat::Table && !days.is_empty() {
        let total: f64 = days.iter().map(|d| d.active_energy_burned).sum();
        emit(format, &table, &days)?;
        println!("\n{} days, {} total", days.len(), fmt_value(total));
        return Ok(());
    }
    emit(format, &table, &days)
}
