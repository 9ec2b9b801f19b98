//! REST client module for the remote identity service.
//!
//! This module provides the `ApiClient` transport, which attaches the stored
//! bearer token to every outgoing request, and the `ApiError` taxonomy used
//! to tell authorization failures apart from everything else.

pub mod client;
pub mod error;

pub use client::{ApiClient, BearerTokenHook, IdentityService, RequestHook};
pub use error::{ApiError, SessionError};
