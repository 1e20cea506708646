//! Typed rows produced by the normalizer

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

/// One health observation after cleaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    /// Metric type with the vendor prefix removed (e.g. "StepCount")
    #[serde(rename = "type")]
    pub metric_type: String,
    pub source_name: Option<String>,
    pub source_version: Option<String>,
    pub device: Option<String>,
    pub unit: Option<String>,
    pub creation_date: Option<DateTime<FixedOffset>>,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    /// Measured value; 1.0 when the record only marks an occurrence
    pub value: f64,
    /// `end_date - start_date`
    #[serde(with = "duration_seconds")]
    pub duration: TimeDelta,
}

impl CleanedRecord {
    /// Calendar date of the start timestamp, in the timestamp's own offset
    pub fn date(&self) -> NaiveDate {
        self.start_date.date_naive()
    }

    /// `YYYY-MM-DD` label used for daily grouping
    pub fn date_label(&self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }

    /// Weekday name, e.g. "Sunday"
    pub fn day_label(&self) -> String {
        self.date().format("%A").to_string()
    }

    /// Month name, e.g. "January"
    pub fn month_label(&self) -> String {
        self.date().format("%B").to_string()
    }
}

/// One exercise session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    /// Activity type with the vendor prefix removed (e.g. "Running")
    pub activity_type: String,
    pub duration: Option<f64>,
    pub duration_unit: Option<String>,
    pub source_name: Option<String>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    /// Flattened statistic sums, keyed by normalized column name
    pub statistics: Vec<(String, f64)>,
}

impl Workout {
    /// Sum recorded for a statistic, matched by name fragment (e.g. "distance")
    pub fn statistic(&self, name: &str) -> Option<f64> {
        let needle = name.to_lowercase();
        self.statistics
            .iter()
            .find(|(k, _)| k.contains(&needle))
            .map(|(_, v)| *v)
    }
}

/// One day's activity rings rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub date: NaiveDate,
    pub active_energy_burned: Option<f64>,
    pub active_energy_burned_goal: Option<f64>,
    pub active_energy_burned_unit: Option<String>,
    pub apple_exercise_time: Option<f64>,
    pub apple_exercise_time_goal: Option<f64>,
    pub apple_stand_hours: Option<f64>,
    pub apple_stand_hours_goal: Option<f64>,
}

mod duration_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<TimeDelta, D::Error> {
        let secs = i64::deserialize(d)?;
        Ok(TimeDelta::seconds(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z").unwrap()
    }

    fn record(start: &str, end: &str) -> CleanedRecord {
        let start_date = ts(start);
        let end_date = ts(end);
        CleanedRecord {
            metric_type: "StepCount".to_string(),
            source_name: Some("iPhone".to_string()),
            source_version: None,
            device: None,
            unit: Some("count".to_string()),
            creation_date: None,
            start_date,
            end_date,
            value: 10.0,
            duration: end_date - start_date,
        }
    }

    #[test]
    fn test_labels() {
        let r = record("2023-01-01 08:00:00 +0100", "2023-01-01 08:10:00 +0100");
        assert_eq!(r.date_label(), "2023-01-01");
        assert_eq!(r.day_label(), "Sunday");
        assert_eq!(r.month_label(), "January");
    }

    #[test]
    fn test_date_uses_local_offset() {
        // 23:30 on Dec 31 at +0100 is still Dec 31 locally
        let r = record("2022-12-31 23:30:00 +0100", "2022-12-31 23:45:00 +0100");
        assert_eq!(r.date_label(), "2022-12-31");
    }

    #[test]
    fn test_serialized_duration_in_seconds() {
        let r = record("2023-01-01 08:00:00 +0100", "2023-01-01 08:10:00 +0100");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["duration"], 600);
        assert_eq!(json["type"], "StepCount");
    }

    #[test]
    fn test_workout_statistic_lookup() {
        let w = Workout {
            activity_type: "Running".to_string(),
            duration: Some(30.0),
            duration_unit: Some("min".to_string()),
            source_name: None,
            start_date: None,
            end_date: None,
            statistics: vec![
                ("workout_statistics.distance_walking_running.sum".to_string(), 5.2),
                ("workout_statistics.active_energy_burned.sum".to_string(), 320.0),
            ],
        };
        assert_eq!(w.statistic("distance"), Some(5.2));
        assert_eq!(w.statistic("active_energy"), Some(320.0));
        assert_eq!(w.statistic("heart_rate"), None);
    }
}
