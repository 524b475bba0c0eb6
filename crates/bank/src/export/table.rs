//! Flattening JSON records into CSV tables

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Flatten a record into `(column, cell)` pairs.
///
/// Nested objects expand into dotted column names. Strings are written
/// raw, nulls as empty cells, and everything else as JSON text.
pub fn flatten_record(record: &Map<String, Value>) -> Vec<(String, String)> {
    let mut cells = Vec::new();
    flatten_into(None, record, &mut cells);
    cells
}

fn flatten_into(prefix: Option<&str>, object: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, value) in object {
        let column = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            // An empty object still gets a column so the key isn't silently lost
            Value::Object(nested) if !nested.is_empty() => flatten_into(Some(&column), nested, out),
            Value::Object(_) => out.push((column, String::new())),
            other => out.push((column, render_cell(other))),
        }
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rows of flattened records sharing one header
///
/// Leading columns come first in the given order; every other column
/// follows in the order it was first seen.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    columns: Vec<String>,
    rows: Vec<HashMap<String, String>>,
}

impl CsvTable {
    pub fn new(leading: &[&str]) -> Self {
        Self {
            columns: leading.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, record: &Map<String, Value>) {
        let mut row = HashMap::new();
        for (column, cell) in flatten_record(record) {
            if !self.columns.contains(&column) {
                self.columns.push(column.clone());
            }
            row.insert(column, cell);
        }
        self.rows.push(row);
    }

    /// Write header and rows; missing cells are left empty
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns)?;
        for row in &self.rows {
            csv.write_record(
                self.columns
                    .iter()
                    .map(|c| row.get(c).map(String::as_str).unwrap_or("")),
            )?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write to a new file; an existing export is never overwritten
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_to(file)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
