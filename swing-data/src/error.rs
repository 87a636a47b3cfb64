use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors generated while fetching a ticker snapshot.
///
/// Every variant is recoverable: a failed fetch produces an empty cycle and the
/// refresh loop carries on at its next tick.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum FetchError {
    #[error("ticker request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("ticker request failed: {0}")]
    Transport(String),

    #[error("ticker endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("ticker response could not be decoded: {0}")]
    Decode(String),
}

impl FetchError {
    /// Determine if the fetch was abandoned because it exceeded its bounded timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    /// Map a [`reqwest::Error`] onto the matching [`FetchError`] variant.
    pub fn from_reqwest(error: reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            FetchError::Timeout { timeout_ms }
        } else if let Some(status) = error.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else if error.is_decode() {
            FetchError::Decode(error.to_string())
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}

/// Reasons a single [`TickerRecord`](crate::ticker::TickerRecord) is skipped.
///
/// These never escape the evaluator as errors, they are only counted.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Error)]
pub enum RecordParseError {
    #[error("market symbol {symbol:?} does not split into base and quote on {delimiter:?}")]
    MalformedSymbol { symbol: String, delimiter: char },

    #[error("field {field} is missing")]
    MissingField { field: &'static str },

    #[error("field {field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

impl RecordParseError {
    /// Name of the ticker field that failed, if the failure is field specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            RecordParseError::MalformedSymbol { .. } => None,
            RecordParseError::MissingField { field }
            | RecordParseError::InvalidNumber { field, .. } => Some(*field),
        }
    }
}
