use reqwest::StatusCode;
use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("{message}")]
    Validation { status: Option<u16>, message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Human-readable message for a failed response: the service's
    /// `{"error": ...}` envelope when present, the raw body otherwise.
    fn response_message(status: StatusCode, body: &str) -> String {
        if let Ok(envelope) = serde_json::from_str::<ErrorBody>(body) {
            return envelope.error;
        }
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        } else {
            Self::truncate_body(trimmed)
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::response_message(status, body);
        let code = status.as_u16();
        match code {
            401 | 403 => ApiError::Unauthorized { status: code, message },
            400..=499 => ApiError::Validation {
                status: Some(code),
                message,
            },
            _ => ApiError::ServerError { status: code, message },
        }
    }

    /// Client-side validation failure (no request was sent)
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Validation {
            status: None,
            message: message.into(),
        }
    }

    /// Credential rejected by the identity service (HTTP 401/403)
    pub fn is_authorization(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NetworkError(_) => None,
            ApiError::Unauthorized { status, .. } | ApiError::ServerError { status, .. } => {
                Some(*status)
            }
            ApiError::Validation { status, .. } => *status,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::NetworkError(format!("Malformed response: {}", err))
    }
}

/// Failures of a session operation.
///
/// Wraps `ApiError` for anything the identity service reported, plus the
/// case where a token was issued but could not be persisted locally.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Credential storage failed: {0}")]
    Storage(String),

    /// The operation finished after a sign-out or shutdown; its result was dropped
    #[error("Session changed while the request was in flight")]
    Superseded,
}

impl SessionError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, SessionError::Api(e) if e.is_authorization())
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            SessionError::Api(e) => Some(e),
            SessionError::Storage(_) | SessionError::Superseded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid credentials"}"#);
        assert!(err.is_authorization());
        assert_eq!(err.to_string(), "Unauthorized (401): Invalid credentials");

        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert!(err.is_authorization());
        assert_eq!(err.status(), Some(403));

        let err = ApiError::from_status(StatusCode::CONFLICT, r#"{"error":"Email already registered"}"#);
        assert!(matches!(err, ApiError::Validation { status: Some(409), .. }));
        assert_eq!(err.to_string(), "Email already registered");

        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"error":"User not found"}"#);
        assert!(matches!(err, ApiError::Validation { status: Some(404), .. }));

        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, ApiError::ServerError { status: 500, .. }));
        assert!(!err.is_authorization());
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(err.to_string(), "Server error (502): Bad Gateway");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(400); // 800 bytes
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.starts_with("éé"));
        assert!(truncated.ends_with("(truncated, 800 total bytes)"));

        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_session_error_authorization() {
        let err: SessionError = ApiError::from_status(StatusCode::UNAUTHORIZED, "").into();
        assert!(err.is_authorization());
        assert!(err.api().is_some());

        let err = SessionError::Storage("disk full".to_string());
        assert!(!err.is_authorization());
        assert!(err.api().is_none());
    }
}
