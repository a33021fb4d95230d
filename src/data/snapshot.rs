use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::model::{CellValue, Column, NormalizedTable, DATE_COLUMN, TIME_COLUMN};
use crate::error::{EngineError, Result};

/// Split-oriented JSON layout: column names, the index, and row-major data.
///
/// ```json
/// { "columns": ["Time", "Speed", "Date"],
///   "index": ["2023-01-01T00:00:00"],
///   "data": [["00:00:00", 12.5, "2023-01-01"]] }
/// ```
#[derive(Debug, Serialize, Deserialize)]
struct SplitTable {
    columns: Vec<String>,
    index: Vec<NaiveDateTime>,
    data: Vec<Vec<CellValue>>,
}

impl NormalizedTable {
    /// Serialize for whatever session store the host uses.
    ///
    /// Non-finite numbers are written as text (`inf`, `-inf`, `NaN`), the
    /// same cell the delimited decoder infers for that input.
    pub fn to_json(&self) -> Result<String> {
        let split = SplitTable {
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            index: self.index.clone(),
            data: (0..self.len())
                .map(|r| self.columns.iter().map(|c| json_cell(&c.cells[r])).collect())
                .collect(),
        };
        serde_json::to_string(&split).map_err(|e| EngineError::decode("snapshot", e))
    }

    /// Restore a table written by [`NormalizedTable::to_json`].
    ///
    /// The result must still satisfy the normalized-table invariants: one
    /// index entry per row, rows as wide as the header, a non-decreasing
    /// index, and the derived date/time columns present.
    pub fn from_json(json: &str) -> Result<Self> {
        let split: SplitTable =
            serde_json::from_str(json).map_err(|e| EngineError::decode("snapshot", e))?;

        if split.index.len() != split.data.len() {
            return Err(EngineError::decode(
                "snapshot",
                format!("{} index entries for {} rows", split.index.len(), split.data.len()),
            ));
        }
        if split.index.windows(2).any(|w| w[0] > w[1]) {
            return Err(EngineError::decode("snapshot", "index is not sorted"));
        }
        for required in [DATE_COLUMN, TIME_COLUMN] {
            if !split.columns.iter().any(|c| c == required) {
                return Err(EngineError::decode(
                    "snapshot",
                    format!("missing '{required}' column"),
                ));
            }
        }

        let width = split.columns.len();
        let mut columns: Vec<Column> = split
            .columns
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(split.data.len())))
            .collect();
        for (r, row) in split.data.into_iter().enumerate() {
            if row.len() != width {
                return Err(EngineError::decode(
                    "snapshot",
                    format!("row {r} has {} value(s), expected {width}", row.len()),
                ));
            }
            for (col, cell) in columns.iter_mut().zip(row) {
                col.cells.push(cell);
            }
        }

        Ok(NormalizedTable {
            index: split.index,
            columns,
        })
    }
}

fn json_cell(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Number(v) if !v.is_finite() => CellValue::Text(v.to_string()),
        other => other.clone(),
    }
}
