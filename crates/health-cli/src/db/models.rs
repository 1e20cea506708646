//! Table models matching the stored tables

use serde::{Deserialize, Serialize};

/// The three tables kept in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Records,
    Workouts,
    Activities,
}

impl TableName {
    pub const ALL: [TableName; 3] = [TableName::Records, TableName::Workouts, TableName::Activities];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Records => "records",
            TableName::Workouts => "workouts",
            TableName::Activities => "activities",
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flat table of optional text cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows of key/value pairs.
    ///
    /// Columns are the union of all keys in first-seen order; a row that
    /// lacks a key gets a null cell.
    pub fn from_keyed_rows(name: impl Into<String>, keyed: Vec<Vec<(String, String)>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &keyed {
            for (key, _) in row {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = keyed
            .into_iter()
            .map(|row| {
                let mut cells = vec![None; columns.len()];
                for (key, value) in row {
                    if let Some(idx) = columns.iter().position(|c| *c == key) {
                        cells[idx] = Some(value);
                    }
                }
                cells
            })
            .collect();

        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell at `row` in `column`, `None` for a null cell or unknown column
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Copy of this table with every column name passed through `f`.
    /// When two names collapse into one, the first column wins.
    pub fn map_columns(&self, f: impl Fn(&str) -> String) -> RawTable {
        let mut columns: Vec<String> = Vec::new();
        let mut keep: Vec<usize> = Vec::new();
        for (idx, column) in self.columns.iter().enumerate() {
            let mapped = f(column);
            if !columns.contains(&mapped) {
                columns.push(mapped);
                keep.push(idx);
            }
        }
        self.project(columns, &keep)
    }

    /// Copy of this table without the named columns
    pub fn without_columns(&self, dropped: &[String]) -> RawTable {
        let (columns, keep): (Vec<String>, Vec<usize>) = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !dropped.contains(c))
            .map(|(idx, c)| (c.clone(), idx))
            .unzip();
        self.project(columns, &keep)
    }

    fn project(&self, columns: Vec<String>, keep: &[usize]) -> RawTable {
        let rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&idx| row.get(idx).cloned().flatten()).collect())
            .collect();
        RawTable {
            name: self.name.clone(),
            columns,
            rows,
        }
    }
}

/// The three flattened source tables of one export
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTables {
    pub records: RawTable,
    pub workouts: RawTable,
    pub activities: RawTable,
}

impl SourceTables {
    pub fn get(&self, name: TableName) -> &RawTable {
        match name {
            TableName::Records => &self.records,
            TableName::Workouts => &self.workouts,
            TableName::Activities => &self.activities,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableName, &RawTable)> {
        TableName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_keyed_rows_unions_columns() {
        let table = RawTable::from_keyed_rows(
            "workouts",
            vec![
                kv(&[("@type", "Running"), ("@duration", "30")]),
                kv(&[("@type", "Cycling"), ("@distance", "12")]),
            ],
        );
        assert_eq!(table.columns, vec!["@type", "@duration", "@distance"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "@distance"), None);
        assert_eq!(table.cell(1, "@distance"), Some("12"));
        assert_eq!(table.cell(1, "@duration"), None);
        assert_eq!(table.cell(5, "@type"), None);
    }

    #[test]
    fn test_map_columns_keeps_first_on_collision() {
        let table = RawTable::from_keyed_rows(
            "records",
            vec![kv(&[("@type", "a"), ("type", "b"), ("@unit", "count")])],
        );
        let mapped = table.map_columns(|c| c.trim_start_matches('@').to_string());
        assert_eq!(mapped.columns, vec!["type", "unit"]);
        assert_eq!(mapped.cell(0, "type"), Some("a"));
        assert_eq!(mapped.cell(0, "unit"), Some("count"));
    }

    #[test]
    fn test_without_columns() {
        let table = RawTable::from_keyed_rows(
            "records",
            vec![kv(&[("type", "StepCount"), ("device", "watch"), ("value", "3")])],
        );
        let trimmed = table.without_columns(&["device".to_string()]);
        assert_eq!(trimmed.columns, vec!["type", "value"]);
        assert_eq!(trimmed.rows[0], vec![Some("StepCount".to_string()), Some("3".to_string())]);
    }

    #[test]
    fn test_table_names() {
        let names: Vec<&str> = TableName::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["records", "workouts", "activities"]);
        assert_eq!(TableName::Workouts.to_string(), "workouts");
    }
}
