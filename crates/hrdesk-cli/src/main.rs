//! hrdesk - terminal console for the hrdesk session layer.
//!
//! Each invocation is one "page load": the session for the selected
//! tab-group is restored from its encrypted storage, the command runs
//! against it, and the process exits.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hrdesk_core::config::DEFAULT_TAB;
use hrdesk_core::{Config, SessionEvent, SessionManager, SessionScope, UserRecord};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hrdesk")]
#[command(version)]
#[command(about = "Session console for the hrdesk HR/attendance administration client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Tab-group whose session storage to use
    #[arg(long, global = true, default_value = DEFAULT_TAB)]
    tab: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Establish a session from a login endpoint response (JSON)
    Login {
        /// File holding the response body; reads stdin when omitted or "-"
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show whether the tab-group has an active session
    Status,
    /// Print the signed-in identity
    Whoami,
    /// Merge fields into the signed-in identity (key=value, value may be JSON)
    Update {
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// End the session
    Logout,
}

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

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env();
    debug!(?config, tab = %cli.tab, "Loaded configuration");

    let store = config
        .open_store(&cli.tab)
        .with_context(|| format!("Failed to open session storage for tab '{}'", cli.tab))?;
    let mut scope = SessionScope::provided(SessionManager::open(store));

    match cli.command {
        Commands::Login { file } => login(&mut scope, file),
        Commands::Status => status(&mut scope),
        Commands::Whoami => whoami(&mut scope),
        Commands::Update { fields } => update(&mut scope, &fields),
        Commands::Logout => logout(&mut scope),
    }
}

fn login(scope: &mut SessionScope, file: Option<PathBuf>) -> Result<()> {
    let body = match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read login response from stdin")?;
            body
        }
    };
    let response: Value = serde_json::from_str(&body).context("Login response is not valid JSON")?;

    let session = scope.session();
    if !session.login_value(&response) {
        bail!("Login rejected: response is not a successful login");
    }

    let message = session.get_login_message();
    if message.is_empty() {
        println!("Signed in.");
    } else {
        println!("{}", message);
    }
    Ok(())
}

fn status(scope: &mut SessionScope) -> Result<()> {
    let session = scope.session();
    if !session.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }

    println!("Signed in as {}", display_name(session.user()));
    if let Some(id) = session.session_id() {
        println!("Session:  {}", id);
    }
    let minutes = session.minutes_until_expiry();
    println!("Expires:  in {}h {}m", minutes / 60, minutes % 60);
    Ok(())
}

fn whoami(scope: &mut SessionScope) -> Result<()> {
    let session = scope.session();
    if !session.is_authenticated() {
        bail!("Not signed in - run `hrdesk login` first");
    }
    let user = session.user().context("Session has no identity")?;
    println!("{}", serde_json::to_string_pretty(user)?);
    Ok(())
}

fn update(scope: &mut SessionScope, fields: &[String]) -> Result<()> {
    let updates = parse_fields(fields)?;

    let session = scope.session();
    if !session.is_authenticated() {
        bail!("Not signed in - run `hrdesk login` first");
    }
    if !session.update_user(Some(updates)) {
        bail!("User update was not applied");
    }
    println!("Updated {} field(s).", fields.len());
    Ok(())
}

fn logout(scope: &mut SessionScope) -> Result<()> {
    let session = scope.session();
    let mut events = session.subscribe();
    session.logout();

    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Invalidated { reason, redirect_to } = event {
            info!(?reason, redirect_to = %redirect_to, "Session invalidated");
            println!("Signed out. Continue at {}", redirect_to);
        }
    }
    Ok(())
}

fn display_name(user: Option<&UserRecord>) -> String {
    let Some(user) = user else {
        return "unknown".to_string();
    };
    ["full_name", "name", "email", "id"]
        .iter()
        .find_map(|field| match user.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parse `key=value` arguments. Values that are valid JSON keep their type;
/// anything else is a string.
fn parse_fields(fields: &[String]) -> Result<UserRecord> {
    let mut updates = UserRecord::new();
    for field in fields {
        let Some((key, raw)) = field.split_once('=') else {
            bail!("Expected key=value, got '{}'", field);
        };
        if key.is_empty() {
            bail!("Empty field name in '{}'", field);
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        updates.insert(key.to_string(), value);
    }
    Ok(updates)
}
