use thiserror::Error;

/// Failure while evaluating or dispatching a single symbol.
///
/// Every variant is scoped to one symbol in one scan cycle; the scan driver
/// logs it and moves on.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("empty {interval} candle series")]
    EmptySeries { interval: String },

    #[error("{interval} candles out of order at index {index}")]
    UnorderedSeries { interval: String, index: usize },

    #[error("journal error: {0}")]
    Journal(String),

    #[error("notify error: {0}")]
    Notify(String),
}

impl From<csv::Error> for ScanError {
    fn from(e: csv::Error) -> Self {
        Self::Journal(e.to_string())
    }
}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        Self::Journal(e.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
