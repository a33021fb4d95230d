use thiserror::Error;

/// Every failure the ingestion and query engine can report.
///
/// All variants are terminal for the operation that raised them, except
/// [`EngineError::MalformedIdentity`], which the identity extractor recovers
/// from internally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("could not decode {format} content: {reason}")]
    DecodeError { format: &'static str, reason: String },

    #[error("no parseable timestamp column: {0}")]
    MissingTimeColumn(String),

    #[error("malformed identity value in column '{column}': {value}")]
    MalformedIdentity { column: String, value: String },

    #[error("invalid date interval: start {start} is after end {end}")]
    InvalidInterval {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("insufficient data: {retained} usable point(s), at least 2 required")]
    InsufficientData { retained: usize },

    #[error("degenerate regression: every x value equals {0}")]
    DegenerateRegression(f64),

    #[error("invalid column range '{first}'..='{last}'")]
    InvalidColumnRange { first: String, last: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("no data loaded")]
    NoData,
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub(crate) fn decode(format: &'static str, reason: impl ToString) -> Self {
        EngineError::DecodeError {
            format,
            reason: reason.to_string(),
        }
    }
}
