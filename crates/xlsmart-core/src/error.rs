//! Error types for the XLSMART analysis backend.

use thiserror::Error;

/// Result type alias using the backend's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for XLSMART operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Employee not found
    #[error("Employee not found: {0}")]
    EmployeeNotFound(uuid::Uuid),

    /// Upload session not found
    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// LLM gateway call failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Bulk job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Illegal session status transition or terminal-state write
    #[error("Session state error: {0}")]
    SessionState(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("standard role".to_string());
        assert_eq!(err.to_string(), "Not found: standard role");
    }

    #[test]
    fn test_error_display_employee_not_found() {
        let id = Uuid::nil();
        let err = Error::EmployeeNotFound(id);
        assert_eq!(err.to_string(), format!("Employee not found: {}", id));
    }

    #[test]
    fn test_error_display_session_not_found() {
        let id = Uuid::new_v4();
        let err = Error::SessionNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_inference() {
        let err = Error::Inference("gateway timeout".to_string());
        assert_eq!(err.to_string(), "Inference error: gateway timeout");
    }

    #[test]
    fn test_error_display_session_state() {
        let err = Error::SessionState("terminal session".to_string());
        assert_eq!(err.to_string(), "Session state error: terminal session");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing API key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
