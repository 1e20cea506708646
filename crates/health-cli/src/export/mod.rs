//! Apple Health `export.xml` parser
//!
//! Streams the document with quick-xml and builds a [`Node`] per child of
//! the `HealthData` root. Children are routed into their collection as soon
//! as they close, so the root itself is never materialised.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info};

use crate::error::{HealthError, Result};
use crate::models::{Fields, Node};

const ROOT_ELEMENT: &str = "HealthData";
const RECORD_ELEMENT: &str = "Record";
const WORKOUT_ELEMENT: &str = "Workout";
const ACTIVITY_SUMMARY_ELEMENT: &str = "ActivitySummary";

/// Key for element text that sits next to attributes or children
pub const TEXT_KEY: &str = "#text";

/// The three collections of a parsed export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthExport {
    pub records: Vec<Node>,
    pub workouts: Vec<Node>,
    pub activity_summaries: Vec<Node>,
    /// Root children that belong to none of the collections (`Me`, `ExportDate`, ...)
    pub skipped_elements: usize,
}

impl HealthExport {
    fn route(&mut self, name: &str, node: Node) {
        match name {
            RECORD_ELEMENT => self.records.push(node),
            WORKOUT_ELEMENT => self.workouts.push(node),
            ACTIVITY_SUMMARY_ELEMENT => self.activity_summaries.push(node),
            other => {
                debug!(element = other, "skipping root child");
                self.skipped_elements += 1;
            }
        }
    }
}

/// Parse an export file from disk
pub fn parse_file(path: impl AsRef<Path>) -> Result<HealthExport> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(HealthError::ExportNotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| HealthError::parse(path, e.to_string()))?;
    let export = parse_reader(BufReader::new(file), path)?;
    info!(
        path = %path.display(),
        records = export.records.len(),
        workouts = export.workouts.len(),
        activity_summaries = export.activity_summaries.len(),
        "parsed export"
    );
    Ok(export)
}

/// Parse an export held in memory; `origin` names it in error messages
pub fn parse_str(xml: &str, origin: impl AsRef<Path>) -> Result<HealthExport> {
    parse_reader(xml.as_bytes(), origin.as_ref())
}

struct Frame {
    name: String,
    fields: Fields,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>, origin: &Path) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Fields::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| HealthError::parse(origin, format!("<{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref());
            let value = attr
                .unescape_value()
                .map_err(|e| HealthError::parse(origin, format!("<{}>: {}", name, e)))?;
            fields.insert(format!("@{}", key), Node::Text(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Node) {
        let Frame {
            name,
            mut fields,
            text,
        } = self;
        let node = if fields.is_empty() {
            Node::Text(text)
        } else {
            if !text.is_empty() {
                fields.insert(TEXT_KEY, Node::Text(text));
            }
            Node::Map(fields)
        };
        (name, node)
    }
}

fn parse_reader<R: BufRead>(source: R, origin: &Path) -> Result<HealthExport> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut export = HealthExport::default();
    let mut stack: Vec<Frame> = Vec::new();
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            HealthError::parse(
                origin,
                format!("at byte {}: {}", reader.error_position(), e),
            )
        })?;

        match event {
            Event::Start(start) => {
                let frame = Frame::open(&start, origin)?;
                if stack.is_empty() {
                    check_root(&frame.name, &mut seen_root, origin)?;
                }
                stack.push(frame);
            }
            Event::Empty(start) => {
                let frame = Frame::open(&start, origin)?;
                if stack.is_empty() {
                    check_root(&frame.name, &mut seen_root, origin)?;
                } else {
                    let (name, node) = frame.close();
                    attach(&mut stack, &mut export, name, node);
                }
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(HealthError::parse(origin, "unbalanced closing tag"));
                };
                // the root itself is never attached anywhere
                if !stack.is_empty() {
                    let (name, node) = frame.close();
                    attach(&mut stack, &mut export, name, node);
                }
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| HealthError::parse(origin, e.to_string()))?;
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            // declaration, doctype, comments, processing instructions
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(HealthError::parse(
            origin,
            format!("unexpected end of document inside <{}>", stack[stack.len() - 1].name),
        ));
    }
    if !seen_root {
        return Err(HealthError::parse(
            origin,
            format!("missing <{}> root element", ROOT_ELEMENT),
        ));
    }

    Ok(export)
}

fn check_root(name: &str, seen_root: &mut bool, origin: &Path) -> Result<()> {
    if name != ROOT_ELEMENT || *seen_root {
        return Err(HealthError::parse(
            origin,
            format!("expected a single <{}> root, found <{}>", ROOT_ELEMENT, name),
        ));
    }
    *seen_root = true;
    Ok(())
}

/// Attach a closed element to its parent, or route it when the parent is the root
fn attach(stack: &mut [Frame], export: &mut HealthExport, name: String, node: Node) {
    match stack {
        [_root] => export.route(&name, node),
        [.., parent] => parent.fields.push_child(name, node),
        [] => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE HealthData [
<!ELEMENT HealthData (ExportDate,Me,(Record|Workout|ActivitySummary)*)>
]>
<HealthData locale="en_US">
 <ExportDate value="2023-02-01 10:00:00 +0100"/>
 <Me HKCharacteristicTypeIdentifierDateOfBirth="1990-01-01"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="iPhone" unit="count" startDate="2023-01-01 08:00:00 +0100" endDate="2023-01-01 08:10:00 +0100" value="10"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2023-01-01 09:00:00 +0100" endDate="2023-01-01 09:00:00 +0100" value="62">
  <MetadataEntry key="HKMetadataKeyHeartRateMotionContext" value="0"/>
 </Record>
 <Workout workoutActivityType="HKWorkoutActivityTypeRunning" duration="30.5" durationUnit="min">
  <WorkoutStatistics type="HKQuantityTypeIdentifierDistanceWalkingRunning" sum="5.2" unit="km"/>
  <WorkoutStatistics type="HKQuantityTypeIdentifierActiveEnergyBurned" sum="320" unit="kcal"/>
 </Workout>
 <ActivitySummary dateComponents="2023-01-01" activeEnergyBurned="450.5" activeEnergyBurnedGoal="500"/>
</HealthData>
"#;

    #[test]
    fn test_parse_collections() {
        let export = parse_str(SAMPLE, "sample.xml").unwrap();
        assert_eq!(export.records.len(), 2);
        assert_eq!(export.workouts.len(), 1);
        assert_eq!(export.activity_summaries.len(), 1);
        assert_eq!(export.skipped_elements, 2);
    }

    #[test]
    fn test_attributes_are_prefixed() {
        let export = parse_str(SAMPLE, "sample.xml").unwrap();
        let record = &export.records[0];
        assert_eq!(
            record.get("@type"),
            Some(&Node::from("HKQuantityTypeIdentifierStepCount"))
        );
        assert_eq!(record.get("@value"), Some(&Node::from("10")));
    }

    #[test]
    fn test_single_child_stays_mapping_and_repeats_become_sequence() {
        let export = parse_str(SAMPLE, "sample.xml").unwrap();

        let metadata = export.records[1].get("MetadataEntry").unwrap();
        assert!(matches!(metadata, Node::Map(_)));

        let stats = export.workouts[0].get("WorkoutStatistics").unwrap();
        match stats {
            Node::Seq(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].get("@sum"), Some(&Node::from("5.2")));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_collections() {
        let export = parse_str("<HealthData></HealthData>", "empty.xml").unwrap();
        assert!(export.records.is_empty());
        assert!(export.workouts.is_empty());
        assert!(export.activity_summaries.is_empty());

        let export = parse_str("<HealthData/>", "empty.xml").unwrap();
        assert!(export.records.is_empty());
    }

    #[test]
    fn test_unescapes_attribute_values() {
        let xml = r#"<HealthData><Record type="x" sourceName="Bob&apos;s Watch &amp; Phone"/></HealthData>"#;
        let export = parse_str(xml, "escaped.xml").unwrap();
        assert_eq!(
            export.records[0].get("@sourceName"),
            Some(&Node::from("Bob's Watch & Phone"))
        );
    }

    #[test]
    fn test_truncated_document_is_parse_error() {
        let xml = r#"<HealthData><Record type="x"/><Workout duration="3">"#;
        let err = parse_str(xml, "truncated.xml").unwrap_err();
        match err {
            HealthError::Parse { path, .. } => assert!(path.ends_with("truncated.xml")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_root_is_parse_error() {
        let err = parse_str("<Other/>", "wrong.xml").unwrap_err();
        assert!(err.to_string().contains("HealthData"));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_file("/definitely/not/here/export.xml").unwrap_err();
        assert!(matches!(err, HealthError::ExportNotFound(_)));
    }
}
