//! Error types for the request client.
//!
//! # Design
//! `Http` and `Timeout` are the client's own typed failures and carry a
//! status code. Everything else (transport faults, bad configuration, body
//! encoding or decoding) is a plain error whose message is all callers get
//! after normalization.

use serde_json::Value;
use thiserror::Error;

/// Status reported for an attempt that ran out of time.
pub const TIMEOUT_STATUS: u16 = 408;

/// Failure reported by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The attempt's cancellation token fired before the exchange finished.
    #[error("request was cancelled")]
    Cancelled,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        message: String,
        status: u16,
        info: Option<Value>,
    },

    #[error("Request timed out")]
    Timeout,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be built; raised before any network call.
    #[error("{0}")]
    Config(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Timeout => Some(TIMEOUT_STATUS),
            _ => None,
        }
    }

    pub fn info(&self) -> Option<&Value> {
        match self {
            ApiError::Http { info, .. } => info.as_ref(),
            _ => None,
        }
    }

    /// True for the errors the client raises itself, as opposed to wrapped
    /// transport or configuration failures.
    pub fn is_typed(&self) -> bool {
        matches!(self, ApiError::Http { .. } | ApiError::Timeout)
    }
}
