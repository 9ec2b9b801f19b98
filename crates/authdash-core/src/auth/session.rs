use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, IdentityService, SessionError};
use crate::models::{Identity, LoginRequest, RegisterRequest};

use super::CredentialStore;

/// The client's belief about who, if anyone, is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Startup in progress; nothing is known yet. Only `bootstrap` enters it
    #[default]
    Unresolved,
    Anonymous,
    Established(Identity),
}

impl Session {
    pub fn is_loading(&self) -> bool {
        matches!(self, Session::Unresolved)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Established(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Established(identity) => Some(identity),
            _ => None,
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::Unresolved => write!(f, "unresolved"),
            Session::Anonymous => write!(f, "anonymous"),
            Session::Established(identity) => write!(f, "established({})", identity.id),
        }
    }
}

/// Owner of the process-wide [`Session`] and the only writer of the
/// credential store.
///
/// Observers read snapshots with [`session`](Self::session) or follow
/// changes through [`subscribe`](Self::subscribe). All mutation goes
/// through `bootstrap`, `login`, `logout` and authorization failures
/// passed to [`report`](Self::report).
pub struct SessionManager {
    service: Arc<dyn IdentityService>,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
    /// Advanced by every logout; results of older operations are discarded
    epoch: AtomicU64,
    detached: AtomicBool,
}

impl SessionManager {
    pub fn new(service: Arc<dyn IdentityService>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(Session::Unresolved);
        Self {
            service,
            store,
            state,
            epoch: AtomicU64::new(0),
            detached: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// The signed-in principal, only while the session is established
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Receiver notified on every session transition
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Wait until the session leaves `Unresolved` and return it
    pub async fn resolved(&self) -> Session {
        let mut rx = self.subscribe();
        let session = match rx.wait_for(|session| !session.is_loading()).await {
            Ok(session) => session.clone(),
            // The sender lives in `self`, so this only happens mid-drop
            Err(_) => self.session(),
        };
        session
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resolve the session from the stored token, if any.
    ///
    /// A rejected token (401/403) clears the store and resolves to
    /// `Anonymous` without reporting an error. Any other failure also
    /// resolves to `Anonymous`, but the error is returned.
    ///
    /// Does nothing once the manager has been shut down.
    pub async fn bootstrap(&self) -> Result<(), SessionError> {
        if self.detached.load(Ordering::SeqCst) {
            debug!("Session manager detached, skipping bootstrap");
            return Ok(());
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.transition(Session::Unresolved);

        let token = match self.store.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Stored token unreadable, discarding it");
                self.clear_store();
                None
            }
        };

        if token.is_none() {
            debug!("No stored token");
            self.transition(Session::Anonymous);
            return Ok(());
        }

        match self.validate_token(epoch).await {
            Ok(_) => Ok(()),
            Err(SessionError::Superseded) => Ok(()),
            Err(e) if e.is_authorization() => {
                info!("Stored token rejected, signed out");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sign in, store the issued token and fetch the matching identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let request = LoginRequest::new(email, password);
        request.validate()?;

        let epoch = self.epoch.load(Ordering::SeqCst);
        let response = match self.service.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                if self.is_current(epoch) && e.is_authorization() {
                    self.invalidate();
                }
                warn!(error = %e, "Login failed");
                return Err(e.into());
            }
        };

        if !self.is_current(epoch) {
            debug!("Login finished after sign-out, discarding token");
            return Err(SessionError::Superseded);
        }

        let was_established = self.state.borrow().is_authenticated();
        self.store
            .put(&response.token)
            .map_err(|e| SessionError::Storage(format!("{:#}", e)))?;
        // The previous identity no longer matches the stored token
        if was_established {
            self.transition(Session::Anonymous);
        }

        let identity = self.validate_token(epoch).await?;
        info!(user_id = %identity.id, "Login successful");
        Ok(identity)
    }

    /// Create an account. Never touches the session or the stored token;
    /// callers sign in separately afterwards.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String, SessionError> {
        let request = RegisterRequest::new(name, email, password);
        request.validate()?;

        let response = self.service.register(&request).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            SessionError::from(e)
        })?;
        info!("Registration successful");
        Ok(response.message)
    }

    /// Forget the stored token and become `Anonymous`. Always succeeds.
    pub fn logout(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.invalidate();
        info!("Signed out");
    }

    /// Run an authenticated call made outside the manager, such as
    /// [`ApiClient::get`](crate::ApiClient::get) on a protected route.
    /// An authorization failure signs the user out before the error is
    /// returned; any other outcome leaves the session alone.
    pub async fn authorized<T, F>(&self, call: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = call.await;
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if self.is_current(epoch) {
                    self.report(&e);
                } else {
                    debug!(error = %e, "Authenticated call finished after sign-out");
                }
                Err(e.into())
            }
        }
    }

    /// Feed back the failure of an authenticated call. A 401/403 means
    /// the stored token is no longer accepted: it is cleared and the
    /// session becomes `Anonymous`.
    pub fn report(&self, error: &ApiError) {
        if !error.is_authorization() || self.detached.load(Ordering::SeqCst) {
            return;
        }
        info!(error = %error, "Token rejected by the server, signed out");
        self.invalidate();
    }

    /// Detach from observers: results of operations still in flight are
    /// discarded instead of applied. Terminal; later `bootstrap` calls
    /// are ignored.
    pub fn shutdown(&self) {
        self.detached.store(true, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        debug!("Session manager detached");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Fetch the identity for the stored token and settle the session.
    /// Any failure invalidates the token.
    async fn validate_token(&self, epoch: u64) -> Result<Identity, SessionError> {
        let result = self.service.fetch_me().await;

        if !self.is_current(epoch) {
            debug!("Identity fetch finished after sign-out, discarding result");
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(identity) => {
                self.transition(Session::Established(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Identity fetch failed");
                self.invalidate();
                Err(e.into())
            }
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.detached.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn invalidate(&self) {
        self.clear_store();
        self.transition(Session::Anonymous);
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
    }

    fn transition(&self, next: Session) {
        let to = next.to_string();
        let previous = self.state.send_replace(next);
        if previous.to_string() != to {
            debug!(from = %previous, to = %to, "Session transition");
        }
    }
}
