use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info};

use super::model::{CellValue, Column, NormalizedTable, RawTable, DATE_COLUMN, TIME_COLUMN};
use crate::config::IngestOptions;
use crate::error::{EngineError, Result};

/// Combined date-and-time layouts tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Date-only layouts; the timestamp lands on midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Normalize with default options (source column preferably named `Time`).
pub fn normalize(raw: RawTable) -> Result<NormalizedTable> {
    normalize_with(raw, &IngestOptions::default())
}

/// Turn a [`RawTable`] into a time-indexed table sorted by timestamp.
///
/// The source timestamp column is the one named `opts.time_column`
/// (case-insensitive) if present, otherwise the first column whose every cell
/// parses. A single unparsable value fails the whole ingestion. The text of
/// each timestamp is split on its first whitespace into [`DATE_COLUMN`] and
/// [`TIME_COLUMN`], overwriting same-named columns. Rows are stably sorted by
/// the parsed timestamp.
pub fn normalize_with(raw: RawTable, opts: &IngestOptions) -> Result<NormalizedTable> {
    let n_rows = raw.len();
    let extra: Vec<&str> = opts.datetime_formats.iter().map(String::as_str).collect();

    let (source, index) = match locate_source(&raw, &opts.time_column, &extra)? {
        Some(found) => found,
        None if n_rows == 0 => {
            debug!("empty table without a timestamp column");
            let mut columns = raw.into_columns();
            upsert(&mut columns, DATE_COLUMN, Vec::new());
            upsert(&mut columns, TIME_COLUMN, Vec::new());
            return Ok(NormalizedTable {
                index: Vec::new(),
                columns,
            });
        }
        None => {
            return Err(EngineError::MissingTimeColumn(format!(
                "no column named '{}' and no column parses fully as timestamps",
                opts.time_column
            )))
        }
    };

    let (dates, times): (Vec<CellValue>, Vec<CellValue>) = raw.columns()[source]
        .cells
        .iter()
        .map(split_timestamp_text)
        .unzip();

    let source_name = raw.columns()[source].name.clone();
    let mut columns = raw.into_columns();
    upsert(&mut columns, DATE_COLUMN, dates);
    upsert(&mut columns, TIME_COLUMN, times);

    let mut order: Vec<usize> = (0..n_rows).collect();
    order.sort_by_key(|&r| index[r]);

    let unsorted = NormalizedTable { index, columns };
    let table = unsorted.take(&order);
    info!(
        "normalized {} row(s) on '{}' spanning {:?}",
        table.len(),
        source_name,
        table.date_bounds()
    );
    Ok(table)
}

/// Find the source column and its parsed timestamps.
///
/// `Ok(None)` means no candidate exists at all; a named column that fails to
/// parse is an error rather than a fall-through.
fn locate_source(
    raw: &RawTable,
    preferred: &str,
    extra: &[&str],
) -> Result<Option<(usize, Vec<NaiveDateTime>)>> {
    if let Some(pos) = raw
        .columns()
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(preferred))
    {
        let col = &raw.columns()[pos];
        return parse_column(col, extra).map(|index| Some((pos, index)));
    }

    if raw.is_empty() {
        return Ok(None);
    }
    Ok(raw
        .columns()
        .iter()
        .enumerate()
        .find_map(|(pos, col)| parse_column(col, extra).ok().map(|index| (pos, index))))
}

fn parse_column(col: &Column, extra: &[&str]) -> Result<Vec<NaiveDateTime>> {
    col.cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let text = match cell {
                CellValue::Text(s) => s.as_str(),
                other => {
                    return Err(EngineError::MissingTimeColumn(format!(
                        "'{}' row {row}: {other:?} is not a timestamp",
                        col.name
                    )))
                }
            };
            parse_timestamp(text, extra).ok_or_else(|| {
                EngineError::MissingTimeColumn(format!(
                    "'{}' row {row}: cannot parse '{text}' as a timestamp",
                    col.name
                ))
            })
        })
        .collect()
}

/// Parse timestamp text: built-in and `extra` layouts, then RFC 3339, then
/// date-only layouts (midnight).
pub fn parse_timestamp(text: &str, extra: &[&str]) -> Option<NaiveDateTime> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .chain(extra)
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .chain(extra)
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Split on the first whitespace run: `"2023-01-05 10:00:00"` → date, time.
fn split_timestamp_text(cell: &CellValue) -> (CellValue, CellValue) {
    let text = cell.to_string();
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((date, time)) => (
            CellValue::Text(date.to_string()),
            CellValue::Text(time.trim_start().to_string()),
        ),
        None => (CellValue::Text(text.to_string()), CellValue::Empty),
    }
}

/// Replace a column's cells in place, or append a new column.
fn upsert(columns: &mut Vec<Column>, name: &str, cells: Vec<CellValue>) {
    match columns.iter_mut().find(|c| c.name == name) {
        Some(col) => col.cells = cells,
        None => columns.push(Column::new(name, cells)),
    }
}
