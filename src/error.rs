use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Session initialization failed for {session}: {reason}")]
    SessionInit { session: String, reason: String },

    #[error("Timeout after {}s", .0.as_secs())]
    ResponseTimeout(Duration),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Service initializing...")]
    NotReady,

    #[error("Session expired - login marker cleared, restart to log in again")]
    AuthExpired,

    #[error("Login timeout after {}s", .0.as_secs())]
    LoginTimeout(Duration),

    #[error("Startup cancelled")]
    Cancelled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Agent surface error: {0}")]
    Surface(String),

    #[error("WebDriver error ({kind}): {message}")]
    WebDriver { kind: String, message: String },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// HTTP status used when this error reaches the request boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RelayError::NotReady.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            RelayError::InvalidRequest("Messages required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::SessionNotFound("abc".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::ResponseTimeout(Duration::from_secs(5)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = RelayError::ResponseTimeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Timeout after 300s");
    }
}
