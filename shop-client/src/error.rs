//! Client error types

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::message::MessageError;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Illegal order status change
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Any other error reported by the server
    #[error("Server error: {0}")]
    Api(AppError),

    /// Event channel failure
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        match err.code {
            ErrorCode::NotFound | ErrorCode::OrderNotFound | ErrorCode::ProductNotFound => {
                ClientError::NotFound(err.message)
            }
            ErrorCode::InvalidTransition => ClientError::InvalidTransition(err.message),
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidRequest
            | ErrorCode::RequiredField
            | ErrorCode::ValueOutOfRange
            | ErrorCode::OrderEmpty
            | ErrorCode::ProductInvalidPrice => ClientError::Validation(err.message),
            _ => ClientError::Api(err),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_codes_map_to_variants() {
        let err: ClientError = AppError::order_not_found("o-1").into();
        assert!(matches!(err, ClientError::NotFound(_)));

        let err: ClientError = AppError::invalid_transition("Pending -> Shipped").into();
        assert!(matches!(err, ClientError::InvalidTransition(_)));

        let err: ClientError = AppError::validation("stock must be a number").into();
        assert!(matches!(err, ClientError::Validation(_)));

        let err: ClientError = AppError::internal("boom").into();
        assert!(matches!(err, ClientError::Api(e) if e.code == ErrorCode::InternalError));
    }
}
