use std::io::Cursor;
use std::path::Path;

use anyhow::Context;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use log::debug;

use super::model::{CellValue, RawTable};
use super::time_index::parse_timestamp;
use crate::config::IngestOptions;
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// The two format families an upload can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Comma (or configured delimiter) separated text with a header row.
    Delimited,
    /// Workbook; only the first sheet is read, its first row is the header.
    Spreadsheet,
}

impl Format {
    /// Dispatch on the filename: anything containing `csv` is delimited text,
    /// anything containing `xls` (xls, xlsx, xlsm, xlsb) is a spreadsheet.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.contains("csv") {
            Ok(Format::Delimited)
        } else if lower.contains("xls") {
            Ok(Format::Spreadsheet)
        } else {
            Err(EngineError::UnsupportedFormat(filename.to_string()))
        }
    }
}

/// Decode an uploaded byte blob with default options.
pub fn decode(bytes: &[u8], filename: &str) -> Result<RawTable> {
    decode_with(bytes, filename, &IngestOptions::default())
}

/// Decode an uploaded byte blob into a [`RawTable`].
pub fn decode_with(bytes: &[u8], filename: &str, opts: &IngestOptions) -> Result<RawTable> {
    let table = match Format::from_filename(filename)? {
        Format::Delimited => decode_csv(bytes, opts)?,
        Format::Spreadsheet => decode_spreadsheet(bytes)?,
    };
    debug!(
        "decoded {filename}: {} column(s), {} row(s)",
        table.columns().len(),
        table.len()
    );
    Ok(table)
}

/// Read a file from disk and decode it, dispatching on its name.
pub fn load_file(path: &Path, opts: &IngestOptions) -> anyhow::Result<RawTable> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    decode_with(&bytes, name, opts).with_context(|| format!("decoding {}", path.display()))
}

// ---------------------------------------------------------------------------
// CSV decoder
// ---------------------------------------------------------------------------

/// Header row required. Rows with a different field count than the header
/// and invalid UTF-8 are decode errors.
fn decode_csv(bytes: &[u8], opts: &IngestOptions) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(opts.delimiter_byte())
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::decode("csv", e))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(EngineError::decode("csv", "missing header row"));
    }

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| EngineError::decode("csv", format!("row {row_no}: {e}")))?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    RawTable::from_rows(headers, rows)
}

// ---------------------------------------------------------------------------
// Spreadsheet decoder
// ---------------------------------------------------------------------------

fn decode_spreadsheet(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| EngineError::decode("spreadsheet", e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EngineError::decode("spreadsheet", "workbook has no worksheets"))?
        .map_err(|e| EngineError::decode("spreadsheet", e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| EngineError::decode("spreadsheet", "missing header row"))?
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell.as_string() {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ if !cell.is_empty() => cell.to_string(),
            _ => format!("Unnamed: {i}"),
        })
        .collect();

    let body: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();
    RawTable::from_rows(headers, body)
}

/// Workbook timestamps are rendered like delimited ones so the time index
/// splits them into date and time-of-day.
const SPREADSHEET_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Map a workbook cell onto the engine's three cell kinds.
fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) if f.is_nan() => CellValue::Empty,
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => CellValue::Text(dt.format(SPREADSHEET_TIMESTAMP).to_string()),
            None => CellValue::Empty,
        },
        Data::DateTimeIso(s) => match parse_timestamp(s, &[]) {
            Some(dt) => CellValue::Text(dt.format(SPREADSHEET_TIMESTAMP).to_string()),
            None => CellValue::Text(s.clone()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}
