/// Data layer: decoding, time indexing, and the queries run against it.
///
/// Architecture:
/// ```text
///  .csv / .xls(x) bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  dispatch on filename → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ time_index  │  parse + split timestamp, stable sort → NormalizedTable
///   └────────────┘
///        │
///        ├──────────────► identity   (vessel name / IMO, once per table)
///        ▼
///   ┌──────────┐
///   │  filter   │  DateInterval → row subset
///   └──────────┘
///        │
///        ├──► series      parameters vs time
///        ├──► regression  Y vs X least squares
///        └──► report      column projection for tables
/// ```

pub mod filter;
pub mod identity;
pub mod loader;
pub mod model;
pub mod regression;
pub mod report;
pub mod series;
pub mod snapshot;
pub mod time_index;
