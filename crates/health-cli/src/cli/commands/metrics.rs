//! Metric commands for health-cli

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::output::{emit, fmt_value, OutputFormat, TextTable};
use crate::config::PipelineConfig;
use crate::error::{HealthError, Result};
use crate::metrics::{MetricReport, MetricTable};
use crate::pipeline;

/// Which view of a metric to print
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Period {
    /// Every record, sorted by date
    #[default]
    Raw,
    /// Sum per date
    Daily,
    /// Sum per month
    Monthly,
}

#[derive(Serialize)]
struct MetricSummary<'a> {
    metric: &'a str,
    records: usize,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
    summable: bool,
}

/// Print one metric, or an overview of every allow-listed metric
pub fn show(
    config: &PipelineConfig,
    format: OutputFormat,
    metric: Option<&str>,
    period: Period,
) -> Result<()> {
    if let Some(name) = metric {
        check_metric(config, name, period)?;
    }

    let output = pipeline::run(config)?;
    if output.skipped > 0 {
        eprintln!(
            "Skipped {} records with malformed timestamps",
            output.skipped
        );
    }

    match metric {
        None => overview(&output.report, config, format),
        Some(name) => match period {
            Period::Raw => raw(&output.report, name, format),
            Period::Daily => daily(&output.report, name, format),
            Period::Monthly => monthly(&output.report, name, format),
        },
    }
}

/// Reject metrics outside the allow-list, and sums of non-summable metrics
fn check_metric(config: &PipelineConfig, name: &str, period: Period) -> Result<()> {
    if !config.metrics.iter().any(|m| m == name) {
        return Err(HealthError::UnknownMetric(name.to_string()));
    }
    if period != Period::Raw && !config.is_summable(name) {
        return Err(HealthError::config(format!(
            "{} is not summable; only raw values are available",
            name
        )));
    }
    Ok(())
}

fn overview(report: &MetricReport, config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let mut table = TextTable::new(["Metric", "Records", "First", "Last", "Summable"]);
    let mut summary = Vec::new();

    for metric in &report.tables {
        let first = metric.rows.first().map(|r| r.date());
        let last = metric.rows.last().map(|r| r.date());
        let summable = config.is_summable(&metric.metric);
        table.push(vec![
            metric.metric.clone(),
            metric.len().to_string(),
            first.map_or_else(|| "-".to_string(), |d| d.to_string()),
            last.map_or_else(|| "-".to_string(), |d| d.to_string()),
            if summable { "yes" } else { "no" }.to_string(),
        ]);
        summary.push(MetricSummary {
            metric: &metric.metric,
            records: metric.len(),
            first,
            last,
            summable,
        });
    }

    emit(format, &table, &summary)
}

fn metric_table<'a>(report: &'a MetricReport, name: &str) -> Result<&'a MetricTable> {
    report
        .table(name)
        .ok_or_else(|| HealthError::UnknownMetric(name.to_string()))
}

fn raw(report: &MetricReport, name: &str, format: OutputFormat) -> Result<()> {
    let metric = metric_table(report, name)?;
    let mut table = TextTable::new(["Date", "Day", "Month", metric.value_column(), "Unit"]);
    for row in &metric.rows {
        table.push(vec![
            row.date_label(),
            row.day_label(),
            row.month_label(),
            fmt_value(row.value),
            row.unit.clone().unwrap_or_default(),
        ]);
    }
    emit(format, &table, &metric.json_rows()?)
}

fn daily(report: &MetricReport, name: &str, format: OutputFormat) -> Result<()> {
    let days = report.daily(name).unwrap_or_default();
    let mut table = TextTable::new(["Date", "Day", name]);
    for d in days {
        table.push(vec![d.date.clone(), d.day.clone(), fmt_value(d.value)]);
    }
    emit(format, &table, &days)
}

fn monthly(report: &MetricReport, name: &str, format: OutputFormat) -> Result<()> {
    let months = report.monthly(name).unwrap_or_default();
    let mut table = TextTable::new(["Month", "Name", name]);
    for m in months {
        table.push(vec![m.month_key.clone(), m.month.clone(), fmt_value(m.value)]);
    }
    emit(format, &table, &months)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_metric() {
        let config = PipelineConfig::default();
        assert!(check_metric(&config, "StepCount", Period::Daily).is_ok());
        assert!(check_metric(&config, "BodyMass", Period::Raw).is_ok());
        assert!(matches!(
            check_metric(&config, "BodyMass", Period::Monthly),
            Err(HealthError::Config(_))
        ));
        assert!(matches!(
            check_metric(&config, "Flights", Period::Raw),
            Err(HealthError::UnknownMetric(_))
        ));
    }
}
