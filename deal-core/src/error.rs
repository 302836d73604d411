//! Error types for the deal hunter

use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug)]
pub enum DealError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DealError {
    pub fn api(msg: impl Into<String>) -> Self {
        DealError::Api(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        DealError::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DealError::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        DealError::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        DealError::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DealError::Internal(msg.into())
    }
}

/// Result type alias for deal hunter operations
pub type DealResult<T> = Result<T, DealError>;
