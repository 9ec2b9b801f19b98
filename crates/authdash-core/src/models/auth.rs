use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Minimum display name length accepted by the identity service
const MIN_NAME_CHARS: usize = 2;

/// Maximum display name length accepted by the identity service
const MAX_NAME_CHARS: usize = 100;

/// Minimum password length accepted at registration
const MIN_PASSWORD_CHARS: usize = 6;

/// Body of `POST /api/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    /// Reject input the identity service would refuse anyway.
    pub fn validate(&self) -> Result<(), ApiError> {
        let name_len = self.name.trim().chars().count();
        if name_len < MIN_NAME_CHARS {
            return Err(ApiError::invalid(format!(
                "Name must be at least {} characters",
                MIN_NAME_CHARS
            )));
        }
        if name_len > MAX_NAME_CHARS {
            return Err(ApiError::invalid(format!(
                "Name must be at most {} characters",
                MAX_NAME_CHARS
            )));
        }
        if !is_plausible_email(&self.email) {
            return Err(ApiError::invalid("A valid email address is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::invalid(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }
        Ok(())
    }
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(ApiError::invalid("Email and password required"));
        }
        Ok(())
    }
}

/// Successful login response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TokenResponse {
    pub token: String,
}

/// Successful registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MessageResponse {
    pub message: String,
}

/// Error envelope used by the identity service for every failure status
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Loose `local@domain.tld` check. The server stays the authority on
/// deliverability; this only catches typos before a round trip.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
