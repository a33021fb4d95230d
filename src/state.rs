use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};

use crate::config::IngestOptions;
use crate::data::filter::DateInterval;
use crate::data::identity::{extract_identity, VesselIdentity};
use crate::data::loader::decode_with;
use crate::data::model::NormalizedTable;
use crate::data::regression::{RegressionFit, RegressionQuery};
use crate::data::report::{RowSet, TableQuery};
use crate::data::series::{Series, SeriesQuery};
use crate::data::time_index::normalize_with;
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// A normalized upload and the identity read from it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: NormalizedTable,
    pub identity: VesselIdentity,
}

/// What one viewer currently has loaded, independent of rendering.
///
/// Hosts keep one `Session` per client however they like; nothing here is
/// shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Current table (None until the first successful upload).
    loaded: Option<LoadedTable>,

    pub options: IngestOptions,

    /// Last ingestion error, cleared by the next successful upload.
    pub status_message: Option<String>,
}

impl Session {
    pub fn new(options: IngestOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Decode, normalize and adopt an upload.
    ///
    /// On failure the previously loaded table stays current.
    pub fn upload(&mut self, bytes: &[u8], filename: &str) -> Result<&VesselIdentity> {
        let ingested = decode_with(bytes, filename, &self.options)
            .and_then(|raw| normalize_with(raw, &self.options));
        match ingested {
            Ok(table) => {
                info!("{filename}: loaded {} row(s)", table.len());
                Ok(self.set_table(table))
            }
            Err(e) => {
                warn!("{filename}: upload rejected: {e}");
                self.status_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the current table wholesale and recompute identity.
    pub fn set_table(&mut self, table: NormalizedTable) -> &VesselIdentity {
        let identity = extract_identity(&table);
        self.status_message = None;
        &self.loaded.insert(LoadedTable { table, identity }).identity
    }

    pub fn has_data(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn loaded(&self) -> Result<&LoadedTable> {
        self.loaded.as_ref().ok_or(EngineError::NoData)
    }

    pub fn table(&self) -> Result<&NormalizedTable> {
        self.loaded().map(|l| &l.table)
    }

    pub fn identity(&self) -> Result<&VesselIdentity> {
        self.loaded().map(|l| &l.identity)
    }

    /// Columns offered to parameter selectors.
    pub fn column_options(&self) -> Result<Vec<String>> {
        Ok(self
            .table()?
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Allowed date-picker range; `Ok(None)` for a loaded but empty table.
    pub fn date_span(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        Ok(self.table()?.date_span())
    }

    pub fn series(&self, query: &SeriesQuery) -> Result<Vec<Series>> {
        query.run(self.table()?)
    }

    pub fn regression(&self, query: &RegressionQuery) -> Result<RegressionFit> {
        query.run(self.table()?)
    }

    pub fn report(&self, query: &TableQuery) -> Result<RowSet> {
        query.run(self.table()?)
    }

    /// Banner text for the current identity at wall-clock time `now`.
    pub fn banner(&self, now: NaiveDateTime) -> Result<Banner> {
        Ok(Banner::new(self.identity()?, now))
    }
}

// ---------------------------------------------------------------------------
// Presentation helpers
// ---------------------------------------------------------------------------

/// Parse a `YYYY-MM-DD` date-picker value.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::InvalidQuery(format!("'{s}' is not a YYYY-MM-DD date: {e}")))
}

/// Build an interval from optional date-picker strings.
pub fn parse_interval(start: Option<&str>, end: Option<&str>) -> Result<DateInterval> {
    DateInterval::new(start.map(parse_date).transpose()?, end.map(parse_date).transpose()?)
}

/// The three header lines shown above the charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub vessel_name: String,
    pub vessel_imo: String,
    pub printed_on: String,
}

impl Banner {
    pub fn new(identity: &VesselIdentity, now: NaiveDateTime) -> Self {
        Self {
            vessel_name: format!("Vessel Name: {}", identity.name),
            vessel_imo: format!("Vessel IMO: {}", identity.imo),
            printed_on: format!("Printed On: {}", now.format("%d/%m/%Y %H:%M:%S")),
        }
    }
}

impl std::fmt::Display for Banner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.vessel_name)?;
        writeln!(f, "{}", self.vessel_imo)?;
        write!(f, "{}", self.printed_on)
    }
}
