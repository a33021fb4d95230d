//! Ingestion and query engine for vessel datalogger exports.
//!
//! Upload bytes go through [`data::loader::decode`] and
//! [`data::time_index::normalize`]; the resulting [`NormalizedTable`] answers
//! range, series, regression, and table queries. [`state::Session`] holds the
//! current table for a presentation layer.

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use config::IngestOptions;
pub use data::filter::DateInterval;
pub use data::identity::VesselIdentity;
pub use data::model::{CellValue, NormalizedTable, RawTable};
pub use data::regression::{RegressionFit, RegressionQuery};
pub use data::report::{ColumnSelection, RowSet, TableQuery};
pub use data::series::{Series, SeriesQuery};
pub use error::{EngineError, Result};
pub use state::Session;
