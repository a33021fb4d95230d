use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Name of the derived calendar-date column.
pub const DATE_COLUMN: &str = "Date";
/// Name of the derived time-of-day column.
pub const TIME_COLUMN: &str = "Time";

// ---------------------------------------------------------------------------
// CellValue – a single cell in any column
// ---------------------------------------------------------------------------

/// A decoded cell. Type is inferred once at decode time; everything
/// downstream converts through [`CellValue::as_f64`] / [`CellValue::as_text`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{v:.0}")
            }
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl CellValue {
    /// Infer a cell from raw delimited text: empty, number, or text.
    ///
    /// `inf`, `-inf` and `infinity` stay text: JSON has no encoding for them.
    pub fn infer(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_nan() => CellValue::Empty,
            Ok(v) if v.is_infinite() => CellValue::Text(s.to_string()),
            Ok(v) => CellValue::Number(v),
            Err(_) => CellValue::Text(s.to_string()),
        }
    }

    /// Numeric view; text, empty and non-finite cells are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Text view; `None` for empty cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(v) => v.is_nan(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

// ---------------------------------------------------------------------------
// Column / RawTable – the decoder's output
// ---------------------------------------------------------------------------

/// A named, ordered run of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// Untyped table exactly as decoded: header order preserved, no index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<Column>,
    rows: usize,
}

impl RawTable {
    /// Build from a header row and row-major cells.
    ///
    /// Every row must be exactly as wide as the header. Repeated header
    /// names get a `.1`, `.2`, … suffix so every column stays addressable.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let headers = dedupe_headers(headers);
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        let n_rows = rows.len();
        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(EngineError::decode(
                    "table",
                    format!(
                        "row {row_no} has {} field(s), header has {}",
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            for (col, cell) in columns.iter_mut().zip(row) {
                col.cells.push(cell);
            }
        }

        Ok(Self {
            columns,
            rows: n_rows,
        })
    }

    /// Build from whole columns, which must all have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map_or(0, |c| c.cells.len());
        if let Some(bad) = columns.iter().find(|c| c.cells.len() != rows) {
            return Err(EngineError::decode(
                "table",
                format!(
                    "column '{}' has {} cell(s), expected {rows}",
                    bad.name,
                    bad.cells.len()
                ),
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for h in headers {
        let mut name = h.clone();
        let mut n = 0;
        while seen.contains(&name) {
            n += 1;
            name = format!("{h}.{n}");
        }
        seen.push(name);
    }
    seen
}

// ---------------------------------------------------------------------------
// NormalizedTable – time-indexed, sorted, immutable
// ---------------------------------------------------------------------------

/// A table indexed by a parsed timestamp and sorted ascending by it.
///
/// Built by [`crate::data::time_index::normalize`]; every query returns a new
/// value, so a `NormalizedTable` can be shared freely between readers.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub(crate) index: Vec<NaiveDateTime>,
    pub(crate) columns: Vec<Column>,
}

impl NormalizedTable {
    /// The temporal key, one entry per row, non-decreasing.
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Declared column order, as offered to selectors.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Look up a column or fail with [`EngineError::UnknownColumn`].
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Earliest and latest timestamp, `None` when there are no rows.
    pub fn date_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.index.first()?, *self.index.last()?))
    }

    /// Calendar span of the table, for constraining date pickers.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.date_bounds().map(|(lo, hi)| (lo.date(), hi.date()))
    }

    /// New table holding the given rows, in the given order.
    pub(crate) fn take(&self, rows: &[usize]) -> Self {
        Self {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| {
                    let cells = rows.iter().map(|&r| c.cells[r].clone()).collect();
                    Column::new(c.name.clone(), cells)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_cells() {
        assert_eq!(CellValue::infer(""), CellValue::Empty);
        assert_eq!(CellValue::infer("   "), CellValue::Empty);
        assert_eq!(CellValue::infer("12.5"), CellValue::Number(12.5));
        assert_eq!(CellValue::infer(" 7 "), CellValue::Number(7.0));
        assert_eq!(CellValue::infer("NaN"), CellValue::Empty);
        assert_eq!(CellValue::infer("MV Atlas"), CellValue::Text("MV Atlas".into()));
    }

    #[test]
    fn test_infer_keeps_infinities_as_text() {
        for raw in ["inf", "-inf", "Infinity", "+INF"] {
            assert_eq!(CellValue::infer(raw), CellValue::Text(raw.into()));
        }
    }

    #[test]
    fn test_display_integral_numbers_without_fraction() {
        assert_eq!(CellValue::Number(9_123_456.0).to_string(), "9123456");
        assert_eq!(CellValue::Number(1.25).to_string(), "1.25");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_as_f64_rejects_text() {
        assert_eq!(CellValue::Text("3".into()).as_f64(), None);
        assert_eq!(CellValue::Number(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::Number(f64::INFINITY).as_f64(), None);
        assert_eq!(CellValue::Number(f64::NEG_INFINITY).as_f64(), None);
        assert_eq!(CellValue::Number(3.0).as_f64(), Some(3.0));
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = RawTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Empty]],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::DecodeError { .. }));
    }

    #[test]
    fn test_duplicate_headers_are_suffixed() {
        let table = RawTable::from_rows(vec!["x".into(), "x".into(), "x".into()], vec![]).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["x", "x.1", "x.2"]);
    }

    #[test]
    fn test_untagged_serde_shape() {
        let cells = vec![CellValue::Number(1.5), CellValue::Text("a".into()), CellValue::Empty];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[1.5,"a",null]"#);
        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cells);
    }
}
