//! Tabular snapshots handed to the presentation layer.

use core::fmt;

use serde::Serialize;

/// Headers plus stringly-typed rows, ready to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }
        widths
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    writeln!(f, "{}", line.trim_end())
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        let widths = self.widths();
        write_line(f, &self.headers, &widths)?;
        let rule = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{rule}")?;
        if self.rows.is_empty() {
            return writeln!(f, "(no rows)");
        }
        for row in &self.rows {
            write_line(f, row, &widths)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_aligned_columns() {
        let mut table = Table::new("Categories", &["ID", "Name"]);
        table.push_row(vec!["1".to_string(), "Tools".to_string()]);
        table.push_row(vec!["12".to_string(), "Garden".to_string()]);

        let rendered = table.to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "Categories");
        assert_eq!(lines[1], "ID | Name");
        assert_eq!(lines[2], "---+-------");
        assert_eq!(lines[3], "1  | Tools");
        assert_eq!(lines[4], "12 | Garden");
    }

    #[test]
    fn renders_placeholder_when_empty() {
        let table = Table::new("Products", &["ID"]);
        assert!(table.is_empty());
        assert!(table.to_string().ends_with("(no rows)\n"));
    }
}
