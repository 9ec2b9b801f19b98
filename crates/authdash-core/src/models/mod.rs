//! Wire models for the remote identity service.
//!
//! - `Identity`: the authenticated principal (`/api/user/me`)
//! - Request bodies: `RegisterRequest`, `LoginRequest` (with client-side validation)
//! - Response bodies: `TokenResponse`, `MessageResponse`, `ErrorBody`

pub mod auth;
pub mod user;

pub use auth::{ErrorBody, LoginRequest, MessageResponse, RegisterRequest, TokenResponse};
pub use user::Identity;
