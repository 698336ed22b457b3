//! The single error shape surfaced to callers.
//!
//! `normalize_api_error` accepts any error. The client's typed errors keep
//! message, status and info; an already normalized error is returned as is;
//! anything else keeps only its message, or the generic one if it has none.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;

pub const UNEXPECTED_ERROR_MESSAGE: &str = "Unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct NormalizedError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl NormalizedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            info: None,
        }
    }

    /// For failures with nothing to say about themselves.
    pub fn unexpected() -> Self {
        Self::new(UNEXPECTED_ERROR_MESSAGE)
    }

    fn from_message(message: String) -> Self {
        if message.is_empty() {
            Self::unexpected()
        } else {
            Self::new(message)
        }
    }
}

impl From<&ApiError> for NormalizedError {
    fn from(err: &ApiError) -> Self {
        if err.is_typed() {
            NormalizedError {
                message: err.to_string(),
                status: err.status(),
                info: err.info().cloned(),
            }
        } else {
            NormalizedError::from_message(err.to_string())
        }
    }
}

impl From<ApiError> for NormalizedError {
    fn from(err: ApiError) -> Self {
        NormalizedError::from(&err)
    }
}

pub fn normalize_api_error(error: &(dyn std::error::Error + 'static)) -> NormalizedError {
    if let Some(api) = error.downcast_ref::<ApiError>() {
        return NormalizedError::from(api);
    }
    if let Some(normalized) = error.downcast_ref::<NormalizedError>() {
        return normalized.clone();
    }
    NormalizedError::from_message(error.to_string())
}
