//! Dataset normalization.
//!
//! Turns a named array of JSON records into a uniform table. Column order is
//! the key order of the first record and is shared by every encoder.

use std::collections::HashSet;
use std::fmt;

use report_core::{Dataset, DatasetRegistry, EmptyDatasetError, SkippedItem};
use serde_json::Value;
use tracing::{debug, warn};

/// A single normalized cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    Empty,
}

impl CellValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Text(s.clone()),
            // Nested structures are not expected; keep them readable instead of dropping them.
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Text(nested.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Empty => Ok(()),
        }
    }
}

/// Headers plus rows; every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Rows rendered as display strings.
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }
}

/// Normalize one dataset. Zero records is an [`EmptyDatasetError`].
pub fn normalize(dataset: Dataset<'_>) -> Result<Table, EmptyDatasetError> {
    let first = dataset.records.first().ok_or_else(|| EmptyDatasetError {
        name: dataset.name.to_string(),
    })?;

    let headers: Vec<String> = first.keys().cloned().collect();

    let rows = dataset
        .records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|key| record.get(key).map_or(CellValue::Empty, CellValue::from_json))
                .collect()
        })
        .collect();

    debug!(
        "Normalized dataset '{}': {} columns, {} rows",
        dataset.name,
        headers.len(),
        dataset.records.len()
    );

    Ok(Table {
        name: dataset.name.to_string(),
        headers,
        rows,
    })
}

/// Tables for a job's selection, in request order, plus what was left out.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub tables: Vec<Table>,
    pub skipped: Vec<SkippedItem>,
}

/// Resolve `names` against `registry`, skipping unknown and empty datasets.
///
/// Repeated names are exported once.
pub fn normalize_selection(registry: &DatasetRegistry, names: &[String]) -> Selection {
    let mut selection = Selection::default();
    let mut seen = HashSet::new();

    for name in names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let Some(dataset) = registry.get(name) else {
            warn!("Dataset '{name}' is not registered, skipping");
            selection.skipped.push(SkippedItem {
                name: name.clone(),
                reason: "not found".into(),
            });
            continue;
        };
        match normalize(dataset) {
            Ok(table) => selection.tables.push(table),
            Err(err) => {
                warn!("{err}, skipping");
                selection.skipped.push(SkippedItem {
                    name: name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    selection
}
