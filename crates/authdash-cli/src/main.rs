//! Auth Dashboard - terminal front end for the identity service.
//!
//! Every command restores the stored session first, then acts on it:
//! sign in, sign up, sign out, or open a page through the route guard.

mod app;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

const USAGE: &str = "\
Usage: authdash <command>

Commands:
  register [name] [email]   Create an account (sign in separately afterwards)
  login [email]             Sign in
  logout                    Sign out and forget the stored token
  whoami                    Show the signed-in user
  open <path>               Open a page: /, /login, /register, /dashboard

Environment:
  AUTHDASH_API_URL          Identity service base URL (default http://localhost:8080)
  RUST_LOG                  Log filter, e.g. authdash_core=debug";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    if matches!(command.as_str(), "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    info!(command = %command, "authdash starting");
    let app = App::new().await?;

    let result = match command.as_str() {
        "register" => app.register(args.next(), args.next()).await,
        "login" => app.login(args.next()).await,
        "logout" => {
            app.logout();
            Ok(())
        }
        "whoami" => {
            app.whoami();
            Ok(())
        }
        "open" => app.open(&args.next().unwrap_or_else(|| "/".to_string())),
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
