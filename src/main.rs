//! Headless driver for the admin console.
//! Usage:
//!   moviemind_console login <email> <password>
//!   moviemind_console logout
//!   moviemind_console page <page-id>
//!   moviemind_console import <csv|json|manual> <path>
//!   moviemind_console export <movies|users|quizzes>

use anyhow::{Context, Result};
use dotenvy::dotenv;
use moviemind_console::config::Config;
use moviemind_console::export::{Delivery, ReportKind};
use moviemind_console::gateway::ReqwestTransport;
use moviemind_console::import::ImportMode;
use moviemind_console::store::FileStore;
use moviemind_console::surface::{HeadlessSurface, Region};
use moviemind_console::{Console, ConsoleError};
use std::env;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn usage() -> ExitCode {
    eprintln!("Usage: moviemind_console login <email> <password>");
    eprintln!("       moviemind_console logout");
    eprintln!("       moviemind_console page <page-id>");
    eprintln!("       moviemind_console import <csv|json|manual> <path>");
    eprintln!("       moviemind_console export <movies|users|quizzes>");
    ExitCode::from(2)
}

/// Prints what a browser would have shown.
fn print_surface(surface: &HeadlessSurface) {
    if let Some(title) = surface.region(Region::PageTitle) {
        println!("== {} ==", title);
    }
    for region in [
        Region::Content,
        Region::TableBody("movies"),
        Region::TableBody("users"),
        Region::Pagination("movies"),
        Region::Pagination("users"),
        Region::ImportPreview,
    ] {
        if let Some(html) = surface.region(region).filter(|h| !h.is_empty()) {
            println!("{}", html);
        }
    }
    for toast in surface.toasts() {
        println!("{}", toast);
    }
    for url in surface.redirects() {
        println!("-> redirect {}", url);
    }
}

async fn run(console: &Console, args: &[String]) -> Result<bool> {
    let command = args.get(1).map(String::as_str);
    match (command, args.len()) {
        (Some("login"), 4) => {
            let user = console.login(&args[2], &args[3]).await?;
            info!("Logged in as {}", user.email);
        }
        (Some("logout"), 2) => console.logout().await,
        (Some("page"), 3) => {
            console.start().await?;
            if args[2] != "dashboard" {
                console.navigate(&args[2]).await;
            }
        }
        (Some("import"), 4) => {
            let mode = ImportMode::parse(&args[2])
                .with_context(|| format!("Unknown import mode '{}'", args[2]))?;
            console.session().require_authenticated()?;
            console.open_bulk_upload().await;
            console.select_import_mode(mode).await;
            let path = &args[3];
            match mode {
                ImportMode::Manual => {
                    let text = fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path))?;
                    console.load_import_text(&text).await?;
                }
                _ => {
                    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path))?;
                    let name = std::path::Path::new(path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.clone());
                    console.load_import_file(&name, &bytes).await?;
                }
            }
            let added = console.submit_import().await?;
            info!("Imported {} movies", added);
        }
        (Some("export"), 3) => {
            let report = ReportKind::parse(&args[2])
                .with_context(|| format!("Unknown report '{}'", args[2]))?;
            console.session().require_authenticated()?;
            match console.export(report).await? {
                Delivery::Downloaded { filename, bytes } => {
                    info!("Saved {} ({} bytes)", filename, bytes)
                }
                Delivery::Assumed { .. } => {
                    warn!("Primary export failed; fallback request sent, delivery unconfirmed")
                }
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    if let Err(e) = dotenv() {
        // Tracing is not up yet.
        eprintln!("No .env file loaded ({}) - relying on environment", e);
    }
    init_tracing();

    let config = Config::from_env()?;
    info!("Using backend {}", config.api_base_url);

    let store = Arc::new(FileStore::new(config.store_path.clone()));
    let surface = Arc::new(HeadlessSurface::with_download_dir(config.download_dir.clone()));
    let transport = Arc::new(ReqwestTransport::new()?);
    let console = Console::new(config, transport, store, surface.clone());

    let args: Vec<String> = env::args().collect();
    let outcome = run(&console, &args).await;
    print_surface(&surface);

    match outcome {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(usage()),
        Err(e) => match e.downcast_ref::<ConsoleError>() {
            Some(ConsoleError::Unauthorized) => {
                warn!("Not logged in. Run `moviemind_console login <email> <password>` first");
                Ok(ExitCode::from(1))
            }
            _ => Err(e),
        },
    }
}
