//! Field normalization and typed conversion
//!
//! Raw tables keep the export's names (`@sourceName`) and prefixed values
//! (`HKQuantityTypeIdentifierStepCount`). This module turns them into
//! snake_case columns and strongly-typed rows.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::config::{PipelineConfig, TimestampPolicy};
use crate::db::RawTable;
use crate::error::{HealthError, Result};
use crate::models::{ActivitySummary, CleanedRecord, Workout};

/// Marker the export puts in front of attribute names
pub const FIELD_MARKER: char = '@';

/// Prefixes the exporter puts in front of type identifiers
pub const VENDOR_PREFIXES: &[&str] = &[
    "HKCategoryTypeIdentifier",
    "HKQuantityTypeIdentifier",
    "HKWorkoutActivityType",
];

/// Value given to a record with no numeric value: it marks one occurrence
pub const OCCURRENCE_VALUE: f64 = 1.0;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const WORKOUT_STATISTICS_PREFIX: &str = "workout_statistics.";

/// `@sourceName` -> `source_name`, `VO2Max` -> `vo2_max`.
///
/// Drops the `@` marker, puts `_` before each internal upper-case boundary
/// and lower-cases the result. Applying it twice changes nothing.
pub fn normalize_field_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().filter(|c| *c != FIELD_MARKER).collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Remove a known vendor prefix, leaving other values untouched
pub fn strip_vendor_prefix(value: &str) -> &str {
    VENDOR_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value)
}

/// Numeric coercion; anything unparseable is missing rather than an error
pub fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

/// Parse an export timestamp (`2023-01-01 08:00:00 +0100`).
///
/// RFC 3339 is accepted too, and a timestamp without offset is read as UTC.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<FixedOffset>> {
    let trimmed = value.trim();
    DateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, NAIVE_TIMESTAMP_FORMAT)
                .map(|naive| naive.and_utc().fixed_offset())
        })
        .map_err(|_| HealthError::invalid_timestamp(field, value))
}

/// Parse a calendar date (`2023-01-01`)
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| HealthError::invalid_timestamp(field, value))
}

/// Normalize column names, then remove the dropped columns
pub fn normalize_table(table: &RawTable, dropped: &[String]) -> RawTable {
    table
        .map_columns(normalize_field_name)
        .without_columns(dropped)
}

/// Typed rows plus the number of rows skipped for bad timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

/// Convert the raw `records` table into cleaned records
pub fn clean_records(table: &RawTable, config: &PipelineConfig) -> Result<Cleaned<CleanedRecord>> {
    let table = normalize_table(table, &config.dropped_columns);
    require_columns(&table, &["type", "start_date", "end_date"])?;

    let rows = (0..table.len()).map(|i| -> Result<CleanedRecord> {
        let start_date = required_timestamp(&table, i, "start_date")?;
        let end_date = required_timestamp(&table, i, "end_date")?;
        let creation_date = optional_timestamp(&table, i, "creation_date")?;
        let value = parse_number(table.cell(i, "value")).unwrap_or(OCCURRENCE_VALUE);

        Ok(CleanedRecord {
            metric_type: strip_vendor_prefix(table.cell(i, "type").unwrap_or_default()).to_string(),
            source_name: owned(&table, i, "source_name"),
            source_version: owned(&table, i, "source_version"),
            device: owned(&table, i, "device"),
            unit: owned(&table, i, "unit"),
            creation_date,
            start_date,
            end_date,
            value,
            duration: end_date - start_date,
        })
    });

    collect_rows(&table.name, rows, config.timestamp_policy)
}

/// Convert the raw `workouts` table into typed workouts
pub fn clean_workouts(table: &RawTable, config: &PipelineConfig) -> Result<Cleaned<Workout>> {
    let table = normalize_table(table, &config.dropped_columns);
    require_columns(&table, &["workout_activity_type"])?;

    let statistic_columns: Vec<&String> = table
        .columns
        .iter()
        .filter(|c| c.starts_with(WORKOUT_STATISTICS_PREFIX) && c.ends_with(".sum"))
        .collect();

    let rows = (0..table.len()).map(|i| -> Result<Workout> {
        let statistics = statistic_columns
            .iter()
            .filter_map(|c| parse_number(table.cell(i, c)).map(|v| (c.to_string(), v)))
            .collect();

        Ok(Workout {
            activity_type: strip_vendor_prefix(
                table.cell(i, "workout_activity_type").unwrap_or_default(),
            )
            .to_string(),
            duration: parse_number(table.cell(i, "duration")),
            duration_unit: owned(&table, i, "duration_unit"),
            source_name: owned(&table, i, "source_name"),
            start_date: optional_timestamp(&table, i, "start_date")?,
            end_date: optional_timestamp(&table, i, "end_date")?,
            statistics,
        })
    });

    collect_rows(&table.name, rows, config.timestamp_policy)
}

/// Convert the raw `activities` table into daily summaries
pub fn clean_activity_summaries(
    table: &RawTable,
    config: &PipelineConfig,
) -> Result<Cleaned<ActivitySummary>> {
    let table = normalize_table(table, &config.dropped_columns);
    require_columns(&table, &["date_components"])?;

    let rows = (0..table.len()).map(|i| -> Result<ActivitySummary> {
        let raw_date = table.cell(i, "date_components").unwrap_or_default();
        Ok(ActivitySummary {
            date: parse_date("date_components", raw_date)?,
            active_energy_burned: parse_number(table.cell(i, "active_energy_burned")),
            active_energy_burned_goal: parse_number(table.cell(i, "active_energy_burned_goal")),
            active_energy_burned_unit: owned(&table, i, "active_energy_burned_unit"),
            apple_exercise_time: parse_number(table.cell(i, "apple_exercise_time")),
            apple_exercise_time_goal: parse_number(table.cell(i, "apple_exercise_time_goal")),
            apple_stand_hours: parse_number(table.cell(i, "apple_stand_hours")),
            apple_stand_hours_goal: parse_number(table.cell(i, "apple_stand_hours_goal")),
        })
    });

    collect_rows(&table.name, rows, config.timestamp_policy)
}

fn require_columns(table: &RawTable, columns: &[&str]) -> Result<()> {
    // an empty collection has no columns at all
    if table.is_empty() {
        return Ok(());
    }
    match columns.iter().find(|c| table.column_index(c).is_none()) {
        Some(missing) => Err(HealthError::missing_column(&table.name, *missing)),
        None => Ok(()),
    }
}

fn owned(table: &RawTable, row: usize, column: &str) -> Option<String> {
    table.cell(row, column).map(str::to_string)
}

fn required_timestamp(table: &RawTable, row: usize, column: &str) -> Result<DateTime<FixedOffset>> {
    parse_timestamp(column, table.cell(row, column).unwrap_or_default())
}

fn optional_timestamp(
    table: &RawTable,
    row: usize,
    column: &str,
) -> Result<Option<DateTime<FixedOffset>>> {
    table
        .cell(row, column)
        .map(|v| parse_timestamp(column, v))
        .transpose()
}

fn collect_rows<T>(
    table: &str,
    rows: impl Iterator<Item = Result<T>>,
    policy: TimestampPolicy,
) -> Result<Cleaned<T>> {
    let mut cleaned = Cleaned {
        rows: Vec::new(),
        skipped: 0,
    };

    for (idx, row) in rows.enumerate() {
        match row {
            Ok(row) => cleaned.rows.push(row),
            Err(e @ HealthError::InvalidTimestamp { .. }) => match policy {
                TimestampPolicy::Strict => return Err(e),
                TimestampPolicy::SkipAndCount => {
                    debug!(table, row = idx, error = %e, "skipping row");
                    cleaned.skipped += 1;
                }
            },
            Err(e) => return Err(e),
        }
    }

    if cleaned.skipped > 0 {
        warn!(table, skipped = cleaned.skipped, "skipped rows with malformed timestamps");
    }
    Ok(cleaned)
}
