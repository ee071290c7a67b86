//! Error taxonomy shared by the fetch, parse and aggregation layers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregationError {
    /// Malformed caller input. Detected before any upstream call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The context broker was unreachable, timed out, or answered with an
    /// error status. The upstream message is carried through unchanged.
    #[error("Upstream error: {message}")]
    Upstream { message: String, retryable: bool },
}

impl AggregationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AggregationError::InvalidArgument(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        AggregationError::Upstream {
            message: message.into(),
            retryable: false,
        }
    }

    /// `true` for errors the caller caused (maps to a 4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, AggregationError::InvalidArgument(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AggregationError::Upstream { retryable: true, .. })
    }
}

impl From<reqwest::Error> for AggregationError {
    fn from(e: reqwest::Error) -> Self {
        AggregationError::Upstream {
            retryable: e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode(),
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregationError>;
