//! Flatten parsed export nodes into flat tables
//!
//! Only workout statistics are spread out: each `WorkoutStatistics` entry
//! becomes its own group of columns under `WorkoutStatistics.<type>.`, keyed
//! by its statistic type with the vendor prefix removed. A workout with a
//! single statistic gets the same columns as one with several. Rows are
//! never multiplied, so a table always has one row per input node.
//!
//! Every other nested value (`WorkoutEvent`, `MetadataEntry`, ...) is kept
//! as JSON in a single cell, and records and activity summaries are treated
//! as flat.

use crate::db::{RawTable, SourceTables, TableName};
use crate::export::{HealthExport, TEXT_KEY};
use crate::models::Node;
use crate::normalize::strip_vendor_prefix;

const TYPE_KEY: &str = "@type";

/// Workout child whose entries are spread into columns
pub const STATISTICS_KEY: &str = "WorkoutStatistics";

/// Flatten all three collections of an export
pub fn flatten_export(export: &HealthExport) -> SourceTables {
    SourceTables {
        records: tabulate(TableName::Records.as_str(), &export.records),
        workouts: flatten_workouts(TableName::Workouts.as_str(), &export.workouts),
        activities: tabulate(TableName::Activities.as_str(), &export.activity_summaries),
    }
}

/// One row per workout, statistics spread into `WorkoutStatistics.<type>.<attr>` columns
pub fn flatten_workouts(name: &str, nodes: &[Node]) -> RawTable {
    let rows = nodes
        .iter()
        .map(|node| match node {
            Node::Map(fields) => {
                let mut row = Vec::new();
                for (key, value) in fields.iter() {
                    if key == STATISTICS_KEY {
                        flatten_statistics(value, &mut row);
                    } else {
                        row.push((key.to_string(), cell_text(value)));
                    }
                }
                row
            }
            other => vec![(TEXT_KEY.to_string(), cell_text(other))],
        })
        .collect();
    RawTable::from_keyed_rows(name, rows)
}

/// One row per node, top-level keys only
pub fn tabulate(name: &str, nodes: &[Node]) -> RawTable {
    let rows = nodes
        .iter()
        .map(|node| match node {
            Node::Map(fields) => fields
                .iter()
                .map(|(key, value)| (key.to_string(), cell_text(value)))
                .collect(),
            other => vec![(TEXT_KEY.to_string(), cell_text(other))],
        })
        .collect();
    RawTable::from_keyed_rows(name, rows)
}

fn cell_text(node: &Node) -> String {
    match node.as_text() {
        Some(text) => text.into_owned(),
        None => node.to_json().to_string(),
    }
}

fn flatten_statistics(node: &Node, row: &mut Vec<(String, String)>) {
    // a lone child comes out of the parser as a mapping, not a sequence
    let entries: Vec<&Node> = match node {
        Node::Seq(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut used: Vec<String> = Vec::new();
    for (idx, entry) in entries.into_iter().enumerate() {
        let kind = entry
            .get(TYPE_KEY)
            .and_then(Node::as_text)
            .map(|t| strip_vendor_prefix(&t).to_string())
            .filter(|k| !used.contains(k));
        let keyed_by_type = kind.is_some();
        let entry_key = kind.unwrap_or_else(|| idx.to_string());
        let entry_path = format!("{}.{}", STATISTICS_KEY, entry_key);

        match entry {
            Node::Map(fields) => {
                for (key, value) in fields.iter() {
                    if keyed_by_type && key == TYPE_KEY {
                        continue;
                    }
                    row.push((format!("{}.{}", entry_path, key), cell_text(value)));
                }
            }
            other => row.push((entry_path, cell_text(other))),
        }
        used.push(entry_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fields;

    fn map(pairs: &[(&str, Node)]) -> Node {
        Node::Map(pairs.iter().cloned().collect::<Fields>())
    }

    fn stat(kind: &str, sum: &str) -> Node {
        map(&[
            ("@type", Node::from(kind)),
            ("@sum", Node::from(sum)),
            ("@unit", Node::from("km")),
        ])
    }

    #[test]
    fn test_workout_statistic_becomes_top_level_column() {
        let workout = map(&[
            ("@workoutActivityType", Node::from("HKWorkoutActivityTypeRunning")),
            (
                "WorkoutStatistics",
                Node::Seq(vec![stat("HKQuantityTypeIdentifierDistance", "5.2")]),
            ),
        ]);
        let table = flatten_workouts("workouts", &[workout]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, "WorkoutStatistics.Distance.@sum"), Some("5.2"));
        assert_eq!(table.cell(0, "WorkoutStatistics.Distance.@unit"), Some("km"));
        assert_eq!(table.column_index("WorkoutStatistics.Distance.@type"), None);
    }

    #[test]
    fn test_lone_statistic_keyed_by_type() {
        let xml = r#"<HealthData>
 <Workout workoutActivityType="HKWorkoutActivityTypeWalking" duration="20">
  <WorkoutStatistics type="HKQuantityTypeIdentifierDistanceWalkingRunning" sum="1.8" unit="km"/>
 </Workout>
 <Workout workoutActivityType="HKWorkoutActivityTypeRunning" duration="30">
  <WorkoutStatistics type="HKQuantityTypeIdentifierDistanceWalkingRunning" sum="5.2" unit="km"/>
  <WorkoutStatistics type="HKQuantityTypeIdentifierActiveEnergyBurned" sum="320" unit="kcal"/>
 </Workout>
</HealthData>"#;
        let export = crate::export::parse_str(xml, "single.xml").unwrap();
        let table = flatten_workouts("workouts", &export.workouts);

        let sum = "WorkoutStatistics.DistanceWalkingRunning.@sum";
        assert_eq!(table.cell(0, sum), Some("1.8"));
        assert_eq!(table.cell(1, sum), Some("5.2"));
        assert_eq!(table.cell(1, "WorkoutStatistics.ActiveEnergyBurned.@sum"), Some("320"));
        assert_eq!(table.column_index("WorkoutStatistics.@sum"), None);
        assert_eq!(table.column_index("WorkoutStatistics.@type"), None);
    }

    #[test]
    fn test_other_workout_children_stay_in_one_cell() {
        let events: Vec<Node> = (0..20)
            .map(|i| {
                map(&[
                    ("@type", Node::from("HKWorkoutEventTypeSegment")),
                    ("@date", Node::from(format!("2023-01-01 10:{:02}:00 +0100", i))),
                ])
            })
            .collect();
        let busy = map(&[
            ("@duration", Node::from("30")),
            ("WorkoutEvent", Node::Seq(events)),
            ("MetadataEntry", map(&[("@key", Node::from("HKIndoorWorkout")), ("@value", Node::from("0"))])),
        ]);
        let quiet = map(&[
            ("@duration", Node::from("10")),
            ("WorkoutEvent", map(&[("@type", Node::from("HKWorkoutEventTypePause"))])),
        ]);

        let table = flatten_workouts("workouts", &[busy, quiet]);
        assert_eq!(table.columns, vec!["@duration", "WorkoutEvent", "MetadataEntry"]);
        let events: serde_json::Value =
            serde_json::from_str(table.cell(0, "WorkoutEvent").unwrap()).unwrap();
        assert_eq!(events.as_array().map(Vec::len), Some(20));
        assert_eq!(table.cell(1, "MetadataEntry"), None);
    }

    #[test]
    fn test_inconsistent_keys_yield_null_cells() {
        let a = map(&[
            ("@duration", Node::from("30")),
            (
                "WorkoutStatistics",
                Node::Seq(vec![
                    stat("HKQuantityTypeIdentifierDistanceWalkingRunning", "5"),
                    stat("HKQuantityTypeIdentifierActiveEnergyBurned", "300"),
                ]),
            ),
        ]);
        let b = map(&[("@duration", Node::from("45"))]);
        let table = flatten_workouts("workouts", &[a, b]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "WorkoutStatistics.DistanceWalkingRunning.@sum"), None);
        assert_eq!(table.cell(1, "@duration"), Some("45"));
        assert_eq!(table.cell(0, "WorkoutStatistics.ActiveEnergyBurned.@sum"), Some("300"));
    }

    #[test]
    fn test_duplicate_or_untyped_statistics_fall_back_to_position() {
        let workout = map(&[(
            "WorkoutStatistics",
            Node::Seq(vec![
                map(&[("@sum", Node::from("9"))]),
                stat("HKQuantityTypeIdentifierDistance", "1"),
                stat("HKQuantityTypeIdentifierDistance", "2"),
            ]),
        )]);
        let table = flatten_workouts("workouts", &[workout]);
        assert_eq!(table.cell(0, "WorkoutStatistics.0.@sum"), Some("9"));
        assert_eq!(table.cell(0, "WorkoutStatistics.Distance.@sum"), Some("1"));
        assert_eq!(table.cell(0, "WorkoutStatistics.2.@sum"), Some("2"));
        assert_eq!(
            table.cell(0, "WorkoutStatistics.2.@type"),
            Some("HKQuantityTypeIdentifierDistance")
        );
    }

    #[test]
    fn test_row_count_preserved() {
        let records: Vec<Node> = (0..5)
            .map(|i| map(&[("@type", Node::from("x")), ("@value", Node::from(i as f64))]))
            .collect();
        assert_eq!(tabulate("records", &records).len(), 5);
        assert_eq!(flatten_workouts("workouts", &records).len(), 5);
    }

    #[test]
    fn test_tabulate_keeps_nested_values_as_json() {
        let record = map(&[
            ("@type", Node::from("HKQuantityTypeIdentifierHeartRate")),
            (
                "MetadataEntry",
                map(&[("@key", Node::from("k")), ("@value", Node::from("0"))]),
            ),
        ]);
        let table = tabulate("records", &[record]);
        assert_eq!(table.columns, vec!["@type", "MetadataEntry"]);
        let json: serde_json::Value =
            serde_json::from_str(table.cell(0, "MetadataEntry").unwrap()).unwrap();
        assert_eq!(json["@key"], "k");
    }

    #[test]
    fn test_flatten_export_names_tables() {
        let export = HealthExport {
            records: vec![map(&[("@type", Node::from("a"))])],
            workouts: vec![],
            activity_summaries: vec![map(&[("@dateComponents", Node::from("2023-01-01"))])],
            skipped_elements: 0,
        };
        let tables = flatten_export(&export);
        assert_eq!(tables.records.name, "records");
        assert_eq!(tables.workouts.name, "workouts");
        assert!(tables.workouts.is_empty());
        assert_eq!(tables.activities.cell(0, "@dateComponents"), Some("2023-01-01"));
    }
}
