use thiserror::Error;

/// Errors surfaced by the auth session core and the request gateway.
///
/// Every variant renders a human-readable message so callers can display
/// failures directly (form validation, banners, CLI output).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    EmailAlreadyRegistered,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Refresh token expired. Please login again.")]
    RefreshTokenExpired,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Build a `RequestFailed` from a response status and body.
    ///
    /// Uses the server-provided `message` field when the body carries one,
    /// otherwise falls back to a generic status-based message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        AuthError::RequestFailed { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_uses_server_message() {
        let err = AuthError::from_response(404, r#"{"message": "Report not found"}"#);
        assert_eq!(
            err,
            AuthError::RequestFailed {
                status: 404,
                message: "Report not found".to_string()
            }
        );
        assert_eq!(err.to_string(), "Report not found");
    }

    #[test]
    fn test_from_response_falls_back_to_status() {
        let err = AuthError::from_response(500, "not json");
        assert_eq!(err.to_string(), "Request failed with status 500");

        let err = AuthError::from_response(503, "{}");
        assert_eq!(err.to_string(), "Request failed with status 503");
    }
}
