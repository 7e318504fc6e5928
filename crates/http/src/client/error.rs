//! Client error types

use bloomkart_core::CoreError;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any request was sent
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Bad credentials on login or registration; never retried
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The session could not be renewed; the user must sign in again
    #[error("Session refresh failed: {0}")]
    Refresh(String),

    /// Network or request error
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Client-local storage failed
    #[error("Storage error: {0}")]
    Storage(CoreError),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::Authentication(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the user has to sign in again
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Refresh(_))
    }

    /// Whether the failure is transient (network trouble or a 5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, message } => Self::Validation(format!("{field}: {message}")),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            ClientError::Authentication(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::FORBIDDEN, String::new()),
            ClientError::Forbidden(_)
        ));
        let server = ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream".into());
        assert!(server.is_retryable());
        assert!(!ClientError::NotFound(String::new()).is_retryable());
    }

    #[test]
    fn test_core_validation_becomes_client_validation() {
        let err: ClientError = CoreError::validation("quantity", "must be at least 1").into();
        assert!(matches!(err, ClientError::Validation(msg) if msg == "quantity: must be at least 1"));
    }
}
