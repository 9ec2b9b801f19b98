//! Terminal front end state: one session manager plus the views that read it.

use std::io::{self, Write};

use anyhow::{Context, Result};
use authdash_core::guard::{self, GuardDecision, Route};
use authdash_core::{ApiError, Config, Identity, Session, SessionError, SessionManager};
use tracing::{debug, warn};

/// Maximum length of a name or email typed at a prompt
const MAX_FIELD_LENGTH: usize = 100;

pub struct App {
    session: SessionManager,
    base_url: String,
}

impl App {
    /// Build the session manager from config and resolve the stored session
    pub async fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let base_url = config.api_base_url();
        debug!(base_url = %base_url, "Identity service configured");

        let store = config.credential_store(&base_url)?;
        let session = authdash_core::connect(&base_url, store)
            .context("Failed to create HTTP client")?;

        let app = Self { session, base_url };
        if let Err(e) = app.session.bootstrap().await {
            eprintln!("Could not restore your session: {}", user_message(&e));
        }
        Ok(app)
    }

    pub fn session(&self) -> Session {
        self.session.session()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn register(&self, name: Option<String>, email: Option<String>) -> Result<()> {
        if self.session().is_authenticated() {
            return self.navigate(Route::Register);
        }

        let name = prompt_field("Name", name)?;
        let email = prompt_field("Email", email)?;
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            anyhow::bail!("Passwords do not match");
        }

        match self.session.register(&name, &email, &password).await {
            Ok(message) => {
                println!("{}", message);
                println!("Sign in with `authdash login {}`.", email);
                Ok(())
            }
            Err(e) => anyhow::bail!(user_message(&e)),
        }
    }

    pub async fn login(&self, email: Option<String>) -> Result<()> {
        if self.session().is_authenticated() {
            return self.navigate(Route::Login);
        }

        let email = prompt_field("Email", email)?;
        let password = rpassword::prompt_password("Password: ")?;

        println!("\nSigning in...");
        match self.session.login(&email, &password).await {
            Ok(identity) => {
                println!("Welcome back, {}!\n", identity.first_name());
                self.navigate(Route::Dashboard)
            }
            Err(e) => anyhow::bail!(user_message(&e)),
        }
    }

    pub fn logout(&self) {
        let was_signed_in = self.session().is_authenticated();
        self.session.logout();
        if was_signed_in {
            println!("Signed out.");
        } else {
            println!("Not signed in.");
        }
    }

    pub fn whoami(&self) {
        match self.session() {
            Session::Established(identity) => println!("{} <{}>", identity.name, identity.email),
            Session::Anonymous => println!("Not signed in ({}).", self.base_url),
            Session::Unresolved => println!("Session still loading."),
        }
    }

    /// Run the route guard for `path` and show whatever it allows
    pub fn open(&self, path: &str) -> Result<()> {
        let route = Route::from_path(path)
            .ok_or_else(|| anyhow::anyhow!("No such page: {}", path))?;
        self.navigate(route)
    }

    fn navigate(&self, route: Route) -> Result<()> {
        let session = self.session();
        let mut route = route;
        // Redirect chains are at most one hop: login <-> dashboard never loops
        for _ in 0..2 {
            match guard::guard(&session, route) {
                GuardDecision::Render => {
                    render(route, &session);
                    return Ok(());
                }
                GuardDecision::Loading => {
                    println!("Loading...");
                    return Ok(());
                }
                GuardDecision::Redirect(target) => {
                    debug!(from = route.path(), to = target.path(), "Redirect");
                    println!("Redirecting to {}", target.path());
                    route = target;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Views
// ============================================================================

fn render(route: Route, session: &Session) {
    match (route, session.identity()) {
        (Route::Dashboard, Some(identity)) => render_dashboard(identity),
        (Route::Home, _) => render_home(session),
        (Route::Login, _) => println!("Sign in with `authdash login [email]`."),
        (Route::Register, _) => println!("Create an account with `authdash register [name] [email]`."),
        (Route::Dashboard, None) => println!("Loading..."),
    }
}

fn render_home(session: &Session) {
    println!("Auth Dashboard");
    println!("Secure Authentication System\n");
    match session.identity() {
        Some(identity) => println!("Signed in as {}. Open /dashboard to continue.", identity.name),
        None => println!("Get started: `authdash register`   Sign in: `authdash login`"),
    }
}

fn render_dashboard(identity: &Identity) {
    println!("Welcome, {}!", identity.name);
    println!("You're successfully logged in to your dashboard\n");
    println!("  [{}] Profile", identity.initials());
    println!("      Name:    {}", identity.name);
    println!("      Email:   {}", identity.email);
    println!("      User ID: {}", identity.id);
    println!("\n  Account status: Active");
}

// ============================================================================
// Input helpers
// ============================================================================

fn prompt_field(label: &str, provided: Option<String>) -> Result<String> {
    let value = match provided {
        Some(value) => value,
        None => {
            print!("{}: ", label);
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input
        }
    };

    let value = value.trim().to_string();
    if value.chars().count() > MAX_FIELD_LENGTH || value.chars().any(char::is_control) {
        anyhow::bail!("{} is not valid", label);
    }
    Ok(value)
}

/// Message suitable for showing to the person at the keyboard
pub fn user_message(err: &SessionError) -> String {
    match err {
        SessionError::Api(ApiError::Unauthorized { .. }) => "Invalid email or password".to_string(),
        SessionError::Api(ApiError::NetworkError(_)) => {
            "Unable to connect to server. Check your connection and AUTHDASH_API_URL.".to_string()
        }
        SessionError::Api(ApiError::Validation { message, .. }) => message.clone(),
        SessionError::Api(ApiError::ServerError { status, .. }) => {
            format!("The server had a problem ({}). Please try again.", status)
        }
        SessionError::Storage(detail) => format!("Could not save your session: {}", detail),
        SessionError::Superseded => "Signed out while the request was running".to_string(),
    }
}
