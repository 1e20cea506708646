//! Metric selection and daily/monthly aggregation
//!
//! Each allow-listed metric gets its own table of cleaned records. Flow
//! quantities (energy, distance, steps, stand time) are also summed per day
//! and per month; state quantities such as body mass or heart rate are never
//! summed.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::{MatchMode, PipelineConfig};
use crate::models::{ActivitySummary, CleanedRecord, Workout};

/// Records of one metric, sorted by date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTable {
    /// Metric name; also the label of the value column
    pub metric: String,
    pub rows: Vec<CleanedRecord>,
}

impl MetricTable {
    /// Header of the value column
    pub fn value_column(&self) -> &str {
        &self.metric
    }

    /// Rows as JSON objects, with `value` renamed to the metric name
    pub fn json_rows(&self) -> serde_json::Result<Vec<serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut json = serde_json::to_value(row)?;
                if let Some(obj) = json.as_object_mut() {
                    if let Some(v) = obj.remove("value") {
                        obj.insert(self.metric.clone(), v);
                    }
                }
                Ok(json)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sum of one metric on one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Most frequent weekday label in the group
    pub day: String,
    pub value: f64,
}

/// Sum of one metric in one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    /// `YYYY-MM`
    pub month_key: String,
    /// Most frequent month label in the group
    pub month: String,
    pub value: f64,
}

/// Tables and aggregates for every allow-listed metric
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricReport {
    pub tables: Vec<MetricTable>,
    /// Keyed by metric name; only summable metrics appear
    pub daily: BTreeMap<String, Vec<DailyAggregate>>,
    pub monthly: BTreeMap<String, Vec<MonthlyAggregate>>,
}

impl MetricReport {
    pub fn table(&self, metric: &str) -> Option<&MetricTable> {
        self.tables.iter().find(|t| t.metric == metric)
    }

    pub fn daily(&self, metric: &str) -> Option<&[DailyAggregate]> {
        self.daily.get(metric).map(Vec::as_slice)
    }

    pub fn monthly(&self, metric: &str) -> Option<&[MonthlyAggregate]> {
        self.monthly.get(metric).map(Vec::as_slice)
    }
}

/// Records whose type matches `metric`, stable-sorted by date
pub fn select_metric(records: &[CleanedRecord], metric: &str, mode: MatchMode) -> MetricTable {
    let mut rows: Vec<CleanedRecord> = records
        .iter()
        .filter(|r| mode.matches(&r.metric_type, metric))
        .cloned()
        .collect();
    rows.sort_by_key(|r| r.date());
    MetricTable {
        metric: metric.to_string(),
        rows,
    }
}

/// Group by exact date label, sum values, take the modal weekday label
pub fn daily_aggregate(table: &MetricTable) -> Vec<DailyAggregate> {
    group_sum(table, |r| r.date_label(), |r| r.day_label())
        .into_iter()
        .map(|(date, day, value)| DailyAggregate { date, day, value })
        .collect()
}

/// Group by the date label minus its day-of-month suffix, sum values, take
/// the modal month label
pub fn monthly_aggregate(table: &MetricTable) -> Vec<MonthlyAggregate> {
    group_sum(table, |r| month_key(&r.date_label()), |r| r.month_label())
        .into_iter()
        .map(|(month_key, month, value)| MonthlyAggregate {
            month_key,
            month,
            value,
        })
        .collect()
}

/// Build tables for every allow-listed metric and aggregates for the summable ones
pub fn analyze(records: &[CleanedRecord], config: &PipelineConfig) -> MetricReport {
    let mut report = MetricReport::default();

    for metric in &config.metrics {
        let table = select_metric(records, metric, config.match_mode);
        debug!(metric = %metric, rows = table.len(), "selected metric");

        if config.is_summable(metric) {
            report.daily.insert(metric.clone(), daily_aggregate(&table));
            report.monthly.insert(metric.clone(), monthly_aggregate(&table));
        }
        report.tables.push(table);
    }

    report
}

/// Number of records of one type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub records: usize,
}

/// Records per type, most frequent first; equal counts keep first-seen order
pub fn type_counts(records: &[CleanedRecord]) -> Vec<TypeCount> {
    let mut counts: Vec<TypeCount> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|c| c.metric_type == record.metric_type) {
            Some(c) => c.records += 1,
            None => counts.push(TypeCount {
                metric_type: record.metric_type.clone(),
                records: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.records.cmp(&a.records));
    counts
}

/// Total workout time for one activity type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutTotal {
    pub activity_type: String,
    pub sessions: usize,
    pub total_duration: f64,
    /// Duration unit of the first session that had one
    pub unit: Option<String>,
}

/// Sum durations per activity type, longest total first
pub fn workout_totals(workouts: &[Workout]) -> Vec<WorkoutTotal> {
    let mut totals: Vec<WorkoutTotal> = Vec::new();
    for workout in workouts {
        let idx = match totals
            .iter()
            .position(|t| t.activity_type == workout.activity_type)
        {
            Some(idx) => idx,
            None => {
                totals.push(WorkoutTotal {
                    activity_type: workout.activity_type.clone(),
                    sessions: 0,
                    total_duration: 0.0,
                    unit: None,
                });
                totals.len() - 1
            }
        };
        let total = &mut totals[idx];
        total.sessions += 1;
        total.total_duration += workout.duration.unwrap_or(0.0);
        if total.unit.is_none() {
            total.unit = workout.duration_unit.clone();
        }
    }

    totals.sort_by(|a, b| b.total_duration.total_cmp(&a.total_duration));
    totals
}

/// Active energy burned on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyDay {
    pub date: chrono::NaiveDate,
    pub active_energy_burned: f64,
    pub unit: Option<String>,
}

/// Days with a recorded, non-zero active energy value, in input order
pub fn active_energy_days(summaries: &[ActivitySummary]) -> Vec<EnergyDay> {
    summaries
        .iter()
        .filter_map(|s| match s.active_energy_burned {
            Some(v) if v != 0.0 => Some(EnergyDay {
                date: s.date,
                active_energy_burned: v,
                unit: s.active_energy_burned_unit.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// `2023-01-15` -> `2023-01`
fn month_key(date_label: &str) -> String {
    let cut = date_label.len().saturating_sub(3);
    date_label.get(..cut).unwrap_or(date_label).to_string()
}

/// Sum values per key (keys in ascending order) and pick each group's modal label
fn group_sum(
    table: &MetricTable,
    key: impl Fn(&CleanedRecord) -> String,
    label: impl Fn(&CleanedRecord) -> String,
) -> Vec<(String, String, f64)> {
    let mut groups: BTreeMap<String, (f64, Vec<String>)> = BTreeMap::new();
    for row in &table.rows {
        let entry = groups.entry(key(row)).or_insert_with(|| (0.0, Vec::new()));
        entry.0 += row.value;
        entry.1.push(label(row));
    }

    groups
        .into_iter()
        .map(|(k, (sum, labels))| (k, mode(&labels).unwrap_or_default(), sum))
        .collect()
}

/// Most frequent label; ties go to the label seen first
pub fn mode(labels: &[String]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string())
}
