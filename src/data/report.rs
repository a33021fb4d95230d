use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::filter::{slice, DateInterval};
use super::model::{CellValue, NormalizedTable};
use super::series::collapse_duplicates;
use crate::error::{EngineError, Result};

/// Which columns a report shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    /// These ids, in this order.
    List(Vec<String>),
    /// Everything from `first` through `last` in declared column order.
    Range { first: String, last: String },
}

impl ColumnSelection {
    pub fn list<S: AsRef<str>>(ids: &[S]) -> Self {
        ColumnSelection::List(collapse_duplicates(ids))
    }

    pub fn range(first: impl Into<String>, last: impl Into<String>) -> Self {
        ColumnSelection::Range {
            first: first.into(),
            last: last.into(),
        }
    }

    /// Resolve to column positions in `table`.
    fn resolve(&self, table: &NormalizedTable) -> Result<Vec<usize>> {
        match self {
            ColumnSelection::List(ids) => collapse_duplicates(ids)
                .iter()
                .map(|id| {
                    table
                        .position(id)
                        .ok_or_else(|| EngineError::UnknownColumn(id.clone()))
                })
                .collect(),
            ColumnSelection::Range { first, last } => {
                let invalid = || EngineError::InvalidColumnRange {
                    first: first.clone(),
                    last: last.clone(),
                };
                let lo = table.position(first).ok_or_else(invalid)?;
                let hi = table.position(last).ok_or_else(invalid)?;
                if lo > hi {
                    return Err(invalid());
                }
                Ok((lo..=hi).collect())
            }
        }
    }
}

/// Row-oriented projection for table widgets and export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    /// One entry per row, values aligned with `columns`.
    pub rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col)
    }

    /// Records form: one JSON object per row, keys in column order.
    pub fn to_records(&self) -> Vec<JsonValue> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, JsonValue> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| (name.clone(), cell_to_json(cell)))
                    .collect();
                JsonValue::Object(obj)
            })
            .collect()
    }
}

fn cell_to_json(cell: &CellValue) -> JsonValue {
    match cell {
        CellValue::Number(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CellValue::Text(s) => JsonValue::String(s.clone()),
        CellValue::Empty => JsonValue::Null,
    }
}

/// Slice by `interval`, then keep only the selected columns.
pub fn report(
    table: &NormalizedTable,
    interval: &DateInterval,
    selection: &ColumnSelection,
) -> Result<RowSet> {
    let positions = selection.resolve(table)?;
    let sliced = slice(table, interval)?;

    let columns = positions
        .iter()
        .map(|&p| sliced.columns()[p].name.clone())
        .collect();
    let rows = (0..sliced.len())
        .map(|r| {
            positions
                .iter()
                .map(|&p| sliced.columns()[p].cells[r].clone())
                .collect()
        })
        .collect();

    Ok(RowSet { columns, rows })
}

// ---------------------------------------------------------------------------
// TableQuery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub interval: DateInterval,
    pub selection: ColumnSelection,
}

impl TableQuery {
    pub fn new(interval: DateInterval, selection: ColumnSelection) -> Self {
        Self {
            interval,
            selection,
        }
    }

    pub fn run(&self, table: &NormalizedTable) -> Result<RowSet> {
        report(table, &self.interval, &self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RawTable;
    use crate::data::time_index::normalize;
    use chrono::NaiveDate;

    /// Declared order after normalizing: Time, A, B, C, D, Date.
    fn sample() -> NormalizedTable {
        let raw = RawTable::from_rows(
            ["Time", "A", "B", "C", "D"].iter().map(|s| s.to_string()).collect(),
            vec![
                vec!["2023-01-02 06:00:00".into(), 1.0.into(), 2.0.into(), "x".into(), 4.0.into()],
                vec!["2023-01-01 06:00:00".into(), 5.0.into(), 6.0.into(), "y".into(), 8.0.into()],
                vec![
                    "2023-01-04 06:00:00".into(),
                    9.0.into(),
                    CellValue::Empty,
                    "z".into(),
                    1.0.into(),
                ],
            ],
        )
        .unwrap();
        normalize(raw).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn test_column_range() {
        let rs = report(
            &sample(),
            &DateInterval::between(day(1), day(2)).unwrap(),
            &ColumnSelection::range("B", "C"),
        )
        .unwrap();
        assert_eq!(rs.columns, ["B", "C"]);
        assert_eq!(rs.len(), 2);
        assert!(rs.rows.iter().all(|r| r.len() == 2));
        assert_eq!(rs.get(0, "B"), Some(&CellValue::Number(6.0)));
        assert_eq!(rs.get(1, "C"), Some(&CellValue::Text("x".into())));
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(matches!(
            report(&sample(), &DateInterval::unbounded(), &ColumnSelection::range("C", "B")),
            Err(EngineError::InvalidColumnRange { .. })
        ));
    }

    #[test]
    fn test_range_with_unknown_end_rejected() {
        assert!(matches!(
            report(&sample(), &DateInterval::unbounded(), &ColumnSelection::range("A", "Z")),
            Err(EngineError::InvalidColumnRange { .. })
        ));
    }

    #[test]
    fn test_explicit_list_keeps_caller_order() {
        let rs = report(
            &sample(),
            &DateInterval::unbounded(),
            &ColumnSelection::list(&["D", "A", "D"]),
        )
        .unwrap();
        assert_eq!(rs.columns, ["D", "A"]);
        assert_eq!(rs.rows[0], [CellValue::Number(8.0), CellValue::Number(5.0)]);
    }

    #[test]
    fn test_unknown_list_column_rejected() {
        assert!(matches!(
            report(&sample(), &DateInterval::unbounded(), &ColumnSelection::list(&["A", "Q"])),
            Err(EngineError::UnknownColumn(c)) if c == "Q"
        ));
    }

    #[test]
    fn test_empty_range_is_well_formed() {
        let rs = TableQuery::new(
            DateInterval::between(day(20), day(21)).unwrap(),
            ColumnSelection::range("A", "D"),
        )
        .run(&sample())
        .unwrap();
        assert!(rs.is_empty());
        assert_eq!(rs.columns, ["A", "B", "C", "D"]);
        assert!(rs.to_records().is_empty());
    }

    #[test]
    fn test_records_keep_column_order() {
        let rs = report(
            &sample(),
            &DateInterval::new(Some(day(4)), None).unwrap(),
            &ColumnSelection::list(&["C", "B"]),
        )
        .unwrap();
        let records = rs.to_records();
        assert_eq!(
            serde_json::to_string(&records).unwrap(),
            r#"[{"C":"z","B":null}]"#
        );
    }
}
