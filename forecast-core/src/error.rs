use thiserror::Error;

/// Failures of the outbound forecast request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error while requesting {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Open-Meteo request failed with status {status}: {reason}")]
    Api { status: u16, reason: String },

    #[error("Failed to parse Open-Meteo JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Shape problems found while turning a raw response into a table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Sampling interval must be positive, got {0} s")]
    NonPositiveInterval(i64),

    #[error("Time axis ends ({end}) before it starts ({start})")]
    EndBeforeStart { start: i64, end: i64 },

    #[error("Span {start}..{end} is not a whole number of {interval} s intervals")]
    PartialInterval { start: i64, end: i64, interval: i64 },

    #[error("Time axis is not evenly spaced at index {index}")]
    UnevenTimeAxis { index: usize },

    #[error("Timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("Requested variable '{0}' is missing from the response")]
    MissingVariable(String),

    #[error("Variable '{variable}' has {actual} samples, expected {expected}")]
    LengthMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("A dual-axis chart needs two columns, the table has {0}")]
    NotEnoughColumns(usize),

    #[error("Tick spacing must be at least one hour")]
    InvalidTickSpacing,
}
