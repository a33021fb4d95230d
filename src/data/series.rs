use chrono::NaiveDateTime;
use serde::Serialize;

use super::filter::{slice, DateInterval};
use super::model::{CellValue, NormalizedTable};
use crate::error::{EngineError, Result};

/// One requested column as (timestamp, value) pairs in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub id: String,
    pub points: Vec<(NaiveDateTime, CellValue)>,
}

impl Series {
    /// Points with a numeric value, for plotting.
    pub fn numeric_points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|(ts, v)| v.as_f64().map(|y| (*ts, y)))
    }
}

/// Extract each requested column against the temporal key.
///
/// Ordering is the table's own; nothing is re-sorted. Any id missing from
/// the schema fails the whole request.
pub fn project<S: AsRef<str>>(table: &NormalizedTable, ids: &[S]) -> Result<Vec<Series>> {
    let ids = collapse_duplicates(ids);
    let columns = ids
        .iter()
        .map(|id| table.require(id))
        .collect::<Result<Vec<_>>>()?;

    Ok(columns
        .into_iter()
        .map(|col| Series {
            id: col.name.clone(),
            points: table
                .index()
                .iter()
                .copied()
                .zip(col.cells.iter().cloned())
                .collect(),
        })
        .collect())
}

/// First-seen order, repeats dropped.
pub(crate) fn collapse_duplicates<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.as_ref();
        if !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// SeriesQuery
// ---------------------------------------------------------------------------

/// Parameters-vs-time request: a date range plus at least one column.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub interval: DateInterval,
    columns: Vec<String>,
}

impl SeriesQuery {
    pub fn new<S: AsRef<str>>(interval: DateInterval, columns: &[S]) -> Result<Self> {
        let columns = collapse_duplicates(columns);
        if columns.is_empty() {
            return Err(EngineError::InvalidQuery(
                "series query needs at least one column".to_string(),
            ));
        }
        Ok(Self { interval, columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn run(&self, table: &NormalizedTable) -> Result<Vec<Series>> {
        project(&slice(table, &self.interval)?, &self.columns)
    }
}
