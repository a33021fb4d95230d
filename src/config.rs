use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Knobs for decoding and time-indexing an upload.
///
/// Every field has a default, so a JSON config only needs the keys it
/// overrides:
///
/// ```json
/// { "time_column": "Timestamp", "datetime_formats": ["%d-%b-%Y %H:%M"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Preferred source timestamp column, matched case-insensitively.
    pub time_column: String,
    /// Extra `chrono` formats tried after the built-in list.
    pub datetime_formats: Vec<String>,
    /// Field delimiter for delimited text.
    pub delimiter: char,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            time_column: "Time".to_string(),
            datetime_formats: Vec::new(),
            delimiter: ',',
        }
    }
}

impl IngestOptions {
    /// Read options from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing config JSON")
    }

    /// The delimiter as a single byte, falling back to `,` for non-ASCII.
    pub(crate) fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            log::warn!("non-ASCII delimiter {:?} ignored, using ','", self.delimiter);
            b','
        }
    }
}
