//! Client-side session authentication for the Auth Dashboard.
//!
//! The pieces, leaves first:
//! - [`auth::CredentialStore`]: durable single-slot storage for the bearer token
//! - [`api::ApiClient`]: HTTP transport that attaches the stored token to every request
//! - [`auth::SessionManager`]: the session state machine (bootstrap, login, register, logout)
//! - [`guard`]: route guard deciding whether a view renders, waits or redirects

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod models;

pub use api::{ApiClient, ApiError, IdentityService, SessionError};
pub use auth::{CredentialStore, Session, SessionManager};
pub use config::Config;
pub use guard::{Access, GuardDecision, Route};
pub use models::Identity;

use std::sync::Arc;

/// Wire the transport and session manager to a shared credential store.
pub fn connect(base_url: &str, store: Arc<dyn CredentialStore>) -> Result<SessionManager, ApiError> {
    let client = ApiClient::new(base_url, store.clone())?;
    Ok(SessionManager::new(Arc::new(client), store))
}
