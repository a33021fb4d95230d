use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};

use super::model::NormalizedTable;
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// DateInterval – which calendar days a query covers
// ---------------------------------------------------------------------------

/// Closed interval of calendar days; a missing bound is unbounded.
///
/// Construct through [`DateInterval::new`] so `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateInterval {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateInterval {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(EngineError::InvalidInterval { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// Both bounds present.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Self::new(Some(start), Some(end))
    }

    /// Every row.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Whether a timestamp's calendar day lies inside the interval.
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        let day = ts.date();
        self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |e| day <= e)
    }
}

// ---------------------------------------------------------------------------
// Range slicing
// ---------------------------------------------------------------------------

/// Rows whose timestamp falls inside `interval`, same schema, same order.
///
/// An interval matching nothing yields an empty table, not an error.
pub fn slice(table: &NormalizedTable, interval: &DateInterval) -> Result<NormalizedTable> {
    // Deserialized intervals bypass `new`.
    let interval = DateInterval::new(interval.start, interval.end)?;
    let rows = matching_rows(table, &interval);
    debug!(
        "slice {:?}..={:?}: {} of {} row(s)",
        interval.start,
        interval.end,
        rows.len(),
        table.len()
    );
    Ok(table.take(&rows))
}

/// Indices of the matching rows. The index is sorted, so this is one
/// contiguous run found by binary search.
pub fn matching_rows(table: &NormalizedTable, interval: &DateInterval) -> Vec<usize> {
    let index = table.index();
    let lo = match interval.start {
        Some(s) => index.partition_point(|ts| ts.date() < s),
        None => 0,
    };
    let hi = match interval.end {
        Some(e) => index.partition_point(|ts| ts.date() <= e),
        None => index.len(),
    };
    (lo..hi.max(lo)).collect()
}
