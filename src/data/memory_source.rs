//! In-memory data source
//!
//! Serves pages out of a `Vec<RowRecord>` the way a paging backend would:
//! filter, then sort, then slice `[start_row, start_row + num_rows)`. Used by
//! the demo binary (CSV/JSON files or generated rows) and by tests.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::data::data_source::{DataSource, FetchRequest, SortDirection};
use crate::data::row::{compare_optional_values, RowRecord};

#[derive(Debug, Clone)]
pub struct MemoryDataSource {
    rows: Vec<RowRecord>,
    /// Column names in source order
    columns: Vec<String>,
    /// Simulated round trip per call
    latency: Duration,
}

impl MemoryDataSource {
    pub fn new(columns: Vec<String>, rows: Vec<RowRecord>) -> Self {
        Self {
            rows,
            columns,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
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

    /// Generated rows with `id`, `name` ("Item <n>"), `category`, `value`
    /// and `description` columns
    pub fn sample(count: usize) -> Self {
        const CATEGORIES: [&str; 3] = ["A", "B", "C"];
        let rows = (0..count)
            .map(|i| {
                RowRecord::new()
                    .with("id", i as u64 + 1)
                    .with("name", format!("Item {}", i + 1))
                    .with("category", CATEGORIES[i % CATEGORIES.len()])
                    .with("value", (i as u64 + 1) * 10)
                    .with("description", format!("Generated row number {}", i + 1))
            })
            .collect();
        let columns = ["id", "name", "category", "value", "description"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        Self::new(columns, rows)
    }

    /// Load a CSV file with a header row. Numeric cells become numbers and
    /// empty cells become nulls.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = RowRecord::new();
            for (column, cell) in columns.iter().zip(record.iter()) {
                row.insert(column.clone(), parse_cell(cell));
            }
            rows.push(row);
        }

        info!(target: "grid", "Loaded {} rows with {} columns from {}",
            rows.len(), columns.len(), path.display());
        Ok(Self::new(columns, rows))
    }

    /// Load a JSON file holding an array of objects. Columns are the keys of
    /// the first object.
    pub fn from_json(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open JSON file {}", path.display()))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;

        let items = match value {
            Value::Array(items) => items,
            _ => return Err(anyhow!("JSON data must be an array of objects")),
        };

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(map) => {
                    if columns.is_empty() {
                        columns = map.keys().cloned().collect();
                    }
                    rows.push(RowRecord::from(map));
                }
                other => {
                    return Err(anyhow!("Expected a JSON object per row, found {}", other))
                }
            }
        }

        info!(target: "grid", "Loaded {} rows with {} columns from {}",
            rows.len(), columns.len(), path.display());
        Ok(Self::new(columns, rows))
    }

    /// Load by extension (`.csv` or `.json`)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => Self::from_csv(path),
            Some("json") => Self::from_json(path),
            _ => Err(anyhow!(
                "Unsupported file type: {} (expected .csv or .json)",
                path.display()
            )),
        }
    }

    /// Rows for one request: filtered, sorted and sliced
    pub fn page(&self, request: &FetchRequest) -> Vec<RowRecord> {
        let needle = request
            .filter
            .as_deref()
            .map(str::to_lowercase)
            .filter(|needle| !needle.is_empty());

        let mut matching: Vec<&RowRecord> = match &needle {
            Some(needle) => self
                .rows
                .iter()
                .filter(|row| row.contains_text(&request.column_keys, needle))
                .collect(),
            None => self.rows.iter().collect(),
        };

        if let Some(sort) = request.sort_keys.first() {
            // Stable, so ties keep source order
            matching.sort_by(|a, b| {
                directed(
                    sort.direction,
                    compare_optional_values(a.get(&sort.key), b.get(&sort.key)),
                )
            });
        }

        matching
            .into_iter()
            .skip(request.start_row)
            .take(request.num_rows)
            .map(|row| project(row, &request.column_keys))
            .collect()
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn fetch(&self, request: FetchRequest) -> Result<Vec<RowRecord>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let rows = self.page(&request);
        debug!(target: "fetch", "Memory source served {} rows from {}", rows.len(), request.start_row);
        Ok(rows)
    }
}

/// Keep only the requested columns; duplicates in the list collapse
fn project(row: &RowRecord, columns: &[String]) -> RowRecord {
    let mut projected = RowRecord::new();
    for column in columns {
        if let Some(value) = row.get(column) {
            projected.insert(column.clone(), value.clone());
        }
    }
    projected
}

fn parse_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

fn directed(direction: SortDirection, ordering: Ordering) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}
