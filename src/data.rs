use std::io::{Read, Write};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::error::{ConfigError, DecodeError};

/// Row-aligned result table. Cells are JSON scalars.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from column vectors, e.g. `[("Region", [..]), ("Units", [..])]`
    pub fn from_columns(columns: Vec<(&str, Vec<Value>)>) -> Self {
        let headers = columns.iter().map(|(name, _)| name.to_string()).collect();
        let height = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        let rows = (0..height)
            .map(|i| {
                columns
                    .iter()
                    .map(|(_, c)| c.get(i).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    /// Create a Table from a JSON array of objects.
    ///
    /// Columns appear in the order their keys are first seen; rows missing a
    /// key hold `null` for it.
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let array = value.as_array().ok_or(DecodeError::NotTabular)?;
        if array.is_empty() {
            return Err(DecodeError::Empty);
        }

        let objects: Vec<&Map<String, Value>> = array
            .iter()
            .map(|item| item.as_object().ok_or(DecodeError::NotTabular))
            .collect::<Result<_, _>>()?;

        let mut headers: Vec<String> = Vec::new();
        for obj in &objects {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .map(|obj| {
                headers
                    .iter()
                    .map(|h| obj.get(h).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { headers, rows })
    }

    /// Read CSV with a header row. Numeric cells become numbers, empty cells null.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
            rows.push(record.iter().map(infer_cell).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Write the table as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers).context("Failed to write CSV header")?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(cell_text))
                .context("Failed to write CSV row")?;
        }
        wtr.flush().context("Failed to flush CSV output")?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Project a single column by exact name
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, ConfigError> {
        let idx = find_col_index(&self.headers, name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).unwrap_or(&Value::Null))
            .collect())
    }
}

fn find_col_index(headers: &[String], name: &str) -> Result<usize, ConfigError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ConfigError::MissingColumn {
            column: name.to_string(),
        })
}

fn infer_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(raw.to_string()),
    }
}

/// Display text of a cell: strings unquoted, null empty
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric reading of a cell, if it has one
pub fn cell_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
