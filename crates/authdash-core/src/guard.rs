//! Route guard deciding what a view may show for the current session.
//!
//! | Session     | Public | Protected          | GuestOnly            |
//! |-------------|--------|--------------------|----------------------|
//! | Unresolved  | Loading| Loading            | Loading              |
//! | Anonymous   | Render | Redirect(Login)    | Render               |
//! | Established | Render | Render             | Redirect(Dashboard)  |

use crate::auth::Session;

/// Who may see a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not
    Public,
    /// Only an established session
    Protected,
    /// Sign-in and sign-up pages; established users are sent on
    GuestOnly,
}

/// Navigable views of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Home, Route::Login, Route::Register, Route::Dashboard];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Match a request path, ignoring query string and trailing slash
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Home => Access::Public,
            Route::Login | Route::Register => Access::GuestOnly,
            Route::Dashboard => Access::Protected,
        }
    }
}

/// What the view layer should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    /// Neutral spinner; the session is still being resolved
    Loading,
    Redirect(Route),
}

/// Where anonymous visitors of protected views are sent
pub const SIGN_IN_ROUTE: Route = Route::Login;

/// Where signed-in visitors of guest-only views are sent
pub const HOME_ROUTE: Route = Route::Dashboard;

/// Decide how to handle a view with the given access class.
///
/// Nothing is rendered while the session is unresolved, so content is
/// never shown and then revoked once startup validation fails.
pub fn decide(session: &Session, access: Access) -> GuardDecision {
    match (session, access) {
        (Session::Unresolved, _) => GuardDecision::Loading,
        (Session::Anonymous, Access::Protected) => GuardDecision::Redirect(SIGN_IN_ROUTE),
        (Session::Established(_), Access::GuestOnly) => GuardDecision::Redirect(HOME_ROUTE),
        _ => GuardDecision::Render,
    }
}

pub fn guard(session: &Session, route: Route) -> GuardDecision {
    decide(session, route.access())
}
