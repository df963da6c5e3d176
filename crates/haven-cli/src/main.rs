//! Haven demo CLI.
//!
//! Drives the session store and request gateway the way the original web
//! pages did, with file-backed storage so the session survives between
//! invocations like it survived page reloads:
//!
//! ```text
//! haven login <email> <password>
//! haven signup <name> <email> <password>
//! haven logout
//! haven status
//! haven reports
//! haven report <id>
//! ```

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use haven_core::models::{ReportResponse, ReportsResponse};
use haven_core::{
    ApiConfig, CredentialStore, FileStorage, MockAuthService, MockTransport, RequestGateway,
    SessionStore,
};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() -> ! {
    eprintln!("Usage: haven <login|signup|logout|status|reports|report> [args]");
    eprintln!("  login <email> <password>");
    eprintln!("  signup <name> <email> <password>");
    eprintln!("  report <id>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = ApiConfig::from_env();
    let storage = Arc::new(FileStorage::default_dir()?);
    let credentials = CredentialStore::new(storage.clone());
    let service = MockAuthService::new(credentials, config.clone());
    let session = SessionStore::new(service, storage);
    let transport = Arc::new(MockTransport::new(&config));
    let gateway = RequestGateway::new(transport, session.clone(), config);

    info!("Haven CLI starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("");

    match (command, args.len()) {
        ("login", 3) => {
            match session.login(&args[1], &args[2]).await {
                Ok(user) => println!("Logged in as {} <{}>", user.name, user.email),
                Err(e) => {
                    eprintln!("Login failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        ("signup", 4) => {
            match session.signup(&args[1], &args[2], &args[3]).await {
                Ok(user) => println!("Account created: {} <{}>", user.name, user.email),
                Err(e) => {
                    eprintln!("Signup failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        ("logout", 1) => {
            session.logout();
            println!("Logged out");
        }
        ("status", 1) => {
            let state = session.snapshot();
            match state.identity {
                Some(ref user) => {
                    println!("Logged in as {} <{}>", user.name, user.email);
                    if state.access_token_expired() {
                        println!("Access token expired (will refresh on next call)");
                    }
                }
                None => println!("Not logged in"),
            }
            if let Some(error) = state.last_error {
                println!("Last error: {}", error);
            }
        }
        ("reports", 1) => {
            let list: ReportsResponse = gateway.get("/reports").await?;
            for report in list.reports {
                println!(
                    "{:>2}  {:<28} {:<10} {:<10} {}",
                    report.id, report.title, report.report_type, report.status, report.date
                );
            }
        }
        ("report", 2) => {
            let details: ReportResponse = gateway.get(&format!("/reports/{}", args[1])).await?;
            let report = details.report;
            println!("{} ({}, {})", report.title, report.report_type, report.date);
            println!("Status: {}", report.status);
            println!("{}", serde_json::to_string_pretty(&report.data)?);
        }
        _ => usage(),
    }

    Ok(())
}
