//! Error taxonomy for catalog operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Not found: {entity} '{id}'")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Prediction unavailable: {0}")]
    PredictionUnavailable(String),

    #[error("Prediction timed out after {0:?}")]
    PredictionTimeout(Duration),

    #[error("Cache load failure: {0}")]
    CacheLoad(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Coarse error classification handed to callers alongside the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ValidationError,
    PredictionUnavailable,
    PredictionTimeout,
    CacheLoadFailure,
    StoreUnavailable,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::PredictionUnavailable => "prediction_unavailable",
            ErrorKind::PredictionTimeout => "prediction_timeout",
            ErrorKind::CacheLoadFailure => "cache_load_failure",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl CatalogError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CatalogError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
            CatalogError::Validation(_) => ErrorKind::ValidationError,
            CatalogError::PredictionUnavailable(_) => ErrorKind::PredictionUnavailable,
            CatalogError::PredictionTimeout(_) => ErrorKind::PredictionTimeout,
            CatalogError::CacheLoad(_) => ErrorKind::CacheLoadFailure,
            CatalogError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            CatalogError::Io(_) | CatalogError::Serialization(_) | CatalogError::Configuration(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Store outages may succeed on retry; everything else is deterministic
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::StoreUnavailable(_))
    }

    /// Predictor failures are absorbed by the pipeline instead of failing a request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CatalogError::PredictionUnavailable(_) | CatalogError::PredictionTimeout(_)
        )
    }
}

/// Structured error result for the routing layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&CatalogError> for ErrorReport {
    fn from(err: &CatalogError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<CatalogError> for ErrorReport {
    fn from(err: CatalogError) -> Self {
        ErrorReport::from(&err)
    }
}

// Conversion implementations for common error types
impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        CatalogError::Configuration(err.to_string())
    }
}
