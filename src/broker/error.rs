//! Broker error types

use super::OrderId;
use thiserror::Error;

/// Errors raised by a broker adapter
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrokerError {
    /// Credentials missing, malformed or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API rejected the request
    #[error("API error (HTTP {status}): {code} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Exchange error code
        code: i64,
        /// Exchange error message
        message: String,
    },

    /// Network failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be parsed
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The broker has no record of the order
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        BrokerError::Transport(err.to_string())
    }
}
