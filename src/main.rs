//! figexport - Export backend for a scientific figure editor.
//!
//! `figexport serve` runs the HTTP API; `figexport check` validates the
//! journal rules and optionally probes a TIFF conversion.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use figexport::{
    config::{CheckConfig, Cli, Command, ServeConfig},
    convert::TiffConverter,
    format::detect_container,
    rules::JournalRules,
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Journal rules: {}", config.journal_rules.display());
    info!("  Base path: {}", config.base_path.as_deref().unwrap_or("/"));
    info!("  Upload limit: {}MB", config.max_upload_mb);
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }
    if TiffConverter::has_tag_reader() {
        info!("  TIFF fallback: primary decoder, then tag reader");
    } else {
        warn!("  TIFF fallback: primary decoder only (built without tag-reader)");
    }

    let rules = match JournalRules::load(&config.journal_rules) {
        Ok(rules) => rules,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(rules, build_router_config(&config));

    let addr = config.bind_address();
    let base = config.base_path.as_deref().unwrap_or("");

    info!("");
    info!("  Listening on http://{}", addr);
    info!("    health:        http://{}/health", addr);
    info!("    journal rules: http://{}{}/api/journal-rules", addr, base);
    info!("  Export a figure with:");
    info!(
        "    curl -F image=@figure.png -F dpi=300 http://{}{}/api/export-tiff -o figure.tiff",
        addr, base
    );
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server stopped: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Startup banner with the crate version.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("███████╗██╗ ██████╗ ███████╗██╗  ██╗██████╗  ██████╗ ██████╗ ████████╗");
    info!("██╔════╝██║██╔════╝ ██╔════╝╚██╗██╔╝██╔══██╗██╔═══██╗██╔══██╗╚══██╔══╝");
    info!("█████╗  ██║██║  ███╗█████╗   ╚███╔╝ ██████╔╝██║   ██║██████╔╝   ██║   ");
    info!("██╔══╝  ██║██║   ██║██╔══╝   ██╔██╗ ██╔═══╝ ██║   ██║██╔══██╗   ██║   ");
    info!("██║     ██║╚██████╔╝███████╗██╔╝ ██╗██║     ╚██████╔╝██║  ██║   ██║   ");
    info!("╚═╝     ╚═╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝╚═╝      ╚═════╝ ╚═╝  ╚═╝   ╚═╝   ");
    info!("");
    info!("                            v{}", version);
}

/// Install the `tracing` subscriber. `RUST_LOG` wins over `verbose`.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "figexport=debug,tower_http=debug"
    } else {
        "figexport=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Map serve options onto the router's middleware settings.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_max_upload_bytes(config.max_upload_bytes());

    if let Some(ref base_path) = config.base_path {
        router_config = router_config.with_base_path(base_path.clone());
    }

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("figexport check");
    println!("───────────────");
    println!();

    match JournalRules::load(&config.journal_rules) {
        Ok(rules) => {
            println!("✓ Journal rules: {}", config.journal_rules.display());
            println!("  Entries: {}", rules.entry_count());
            println!("  Size: {} bytes", rules.document().len());
        }
        Err(e) => {
            println!("✗ Journal rules: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!("✓ TIFF decode tier: primary");
    if TiffConverter::has_tag_reader() {
        println!("✓ TIFF decode tier: tag-reader");
    } else {
        println!("✗ TIFF decode tier: tag-reader (not compiled in)");
    }

    if let Some(ref path) = config.probe {
        println!();
        print!("Converting '{}'... ", path.display());

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                println!("✗ unreadable");
                println!();
                println!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let container = detect_container(&bytes);
        match TiffConverter::new().convert(&bytes) {
            Ok(png) => {
                println!("✓ converted");
                println!("  Container: {}", container.name());
                println!("  Decoder: {}", png.tier.name());
                println!("  Size: {}x{}", png.width, png.height);
                println!("  PNG: {} bytes", png.data.len());
            }
            Err(e) => {
                println!("✗ failed");
                println!();
                println!("  Container: {}", container.name());
                println!("  Error: {}", e);
                if !container.is_tiff() {
                    println!("  The file does not start with a TIFF header");
                }
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("✓ Ready to serve");

    ExitCode::SUCCESS
}
