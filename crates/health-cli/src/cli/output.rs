//! Terminal rendering for command results

use serde::Serialize;

use crate::error::Result;

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Rows of text cells with a header line
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Aligned columns: the first left-aligned, the rest right-aligned
    pub fn render_table(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let format_row = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    if i == 0 {
                        format!("{:<w$}", cell, w = *w)
                    } else {
                        format!("{:>w$}", cell, w = *w)
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        let mut out = String::new();
        out.push_str(&format_row(&self.headers));
        out.push('\n');
        out.push_str(&"-".repeat(total));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format_row(row));
            out.push('\n');
        }
        out
    }

    /// Write the header and rows as CSV
    pub fn write_csv<W: std::io::Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Print `table` as text or CSV, or `data` as JSON
pub fn emit<T: Serialize>(format: OutputFormat, table: &TextTable, data: &T) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if table.is_empty() {
                println!("No rows.");
            } else {
                print!("{}", table.render_table());
            }
        }
        OutputFormat::Csv => table.write_csv(std::io::stdout().lock())?,
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
    }
    Ok(())
}

/// Whole numbers without decimals, everything else with two
pub fn fmt_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TextTable {
        let mut table = TextTable::new(["Date", "StepCount"]);
        table.push(vec!["2023-01-01".to_string(), "30".to_string()]);
        table.push(vec!["2023-01-02".to_string(), "5".to_string()]);
        table
    }

    #[test]
    fn test_render_table_alignment() {
        let text = sample().render_table();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date        StepCount");
        assert_eq!(lines[1], "-".repeat(21));
        assert_eq!(lines[2], "2023-01-01         30");
        assert_eq!(lines[3], "2023-01-02          5");
    }

    fn csv_text(table: &TextTable) -> String {
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_csv_quotes() {
        let mut table = TextTable::new(["name", "value"]);
        table.push(vec!["a,b".to_string(), "say \"hi\"".to_string()]);
        assert_eq!(csv_text(&table), "name,value\n\"a,b\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_write_csv_quotes_line_breaks() {
        let mut table = TextTable::new(["name"]);
        table.push(vec!["a\rb".to_string()]);
        table.push(vec!["c\nd".to_string()]);
        assert_eq!(csv_text(&table), "name\n\"a\rb\"\n\"c\nd\"\n");
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(30.0), "30");
        assert_eq!(fmt_value(5.25), "5.25");
        assert_eq!(fmt_value(1.0 / 3.0), "0.33");
    }
}
