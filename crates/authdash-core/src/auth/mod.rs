//! Session authentication: where the token lives and who owns the session.
//!
//! This module provides:
//! - `CredentialStore`: single-slot token persistence (file, OS keychain, memory)
//! - `SessionManager`: the session state machine driving login, logout and
//!   startup validation of a stored token
//!
//! Tokens are opaque bearer credentials; there is no client-side expiry.

pub mod credentials;
pub mod session;

pub use credentials::{
    origin_key, CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore,
};
pub use session::{Session, SessionManager};
