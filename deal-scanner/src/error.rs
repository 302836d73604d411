//! Error types for the deal scanner

use thiserror::Error;

/// Errors that can occur while scanning for deals
#[derive(Debug, Error)]
pub enum ScannerError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Server returned an error response
    #[error("HTTP error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// What was being fetched
        message: String,
    },

    /// Feed or model reply could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The selection model failed
    #[error("Selection failed: {0}")]
    Selection(#[from] deal_pricing::PricingError),
}

pub type Result<T> = std::result::Result<T, ScannerError>;
