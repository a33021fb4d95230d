use log::{debug, warn};
use serde::Serialize;

use super::model::{CellValue, Column, NormalizedTable};
use crate::error::{EngineError, Result};

/// Placeholder reported for identity fields that cannot be found.
pub const NOT_FOUND: &str = "Not Found";

/// Vessel name and IMO number as recorded by the datalogger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VesselIdentity {
    pub name: String,
    pub imo: String,
}

impl Default for VesselIdentity {
    fn default() -> Self {
        Self {
            name: NOT_FOUND.to_string(),
            imo: NOT_FOUND.to_string(),
        }
    }
}

/// Pull vessel identity out of whatever columns carry it.
///
/// Loggers name these columns inconsistently, so the first column (in
/// declared order) whose name contains `name` / `imo`, case-insensitively,
/// is used. Identity is only reliably written near the end of a session, so
/// the value is read from the last row. Never fails: anything missing or
/// malformed becomes [`NOT_FOUND`].
pub fn extract_identity(table: &NormalizedTable) -> VesselIdentity {
    let name = first_matching(table, "name")
        .and_then(last_cell)
        .and_then(CellValue::as_text)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| NOT_FOUND.to_string());

    let imo = match first_matching(table, "imo").map(imo_from_column) {
        Some(Ok(Some(imo))) => imo,
        Some(Err(e)) => {
            warn!("{e}; reporting IMO as {NOT_FOUND}");
            NOT_FOUND.to_string()
        }
        _ => NOT_FOUND.to_string(),
    };

    debug!("vessel identity: name={name:?} imo={imo:?}");
    VesselIdentity { name, imo }
}

/// First column whose name contains `needle`, ignoring ASCII case.
pub fn first_matching<'a>(table: &'a NormalizedTable, needle: &str) -> Option<&'a Column> {
    let needle = needle.to_ascii_lowercase();
    table
        .columns()
        .iter()
        .find(|c| c.name.to_ascii_lowercase().contains(&needle))
}

fn last_cell(col: &Column) -> Option<&CellValue> {
    col.cells.last()
}

/// `Ok(None)` for an absent or falsy value, `Err` when it will not coerce.
fn imo_from_column(col: &Column) -> Result<Option<String>> {
    let Some(cell) = last_cell(col) else {
        return Ok(None);
    };
    let malformed = || EngineError::MalformedIdentity {
        column: col.name.clone(),
        value: cell.to_string(),
    };

    let number = match cell {
        CellValue::Empty => return Ok(None),
        CellValue::Number(v) if *v == 0.0 || v.is_nan() => return Ok(None),
        CellValue::Number(v) => *v,
        CellValue::Text(s) if s.trim().is_empty() => return Ok(None),
        CellValue::Text(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => return Ok(Some(i.to_string())),
                Err(_) => s.parse::<f64>().map_err(|_| malformed())?,
            }
        }
    };

    if !number.is_finite() || number.abs() >= i64::MAX as f64 {
        return Err(malformed());
    }
    Ok(Some((number.trunc() as i64).to_string()))
}
