use thiserror::Error;

/// Failure while looking up or deriving market data for a symbol.
#[derive(Debug, Error, PartialEq)]
pub enum FetchError {
    #[error("no data available for {symbol}{}", detail_suffix(.detail))]
    NoData {
        symbol: String,
        detail: Option<String>,
    },

    #[error("need at least 2 samples to compute change, got {samples}")]
    InsufficientHistory { samples: usize },

    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),

    #[error("invalid close price `{value}` at {timestamp}")]
    InvalidPrice { timestamp: String, value: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
