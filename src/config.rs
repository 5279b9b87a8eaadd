//! Configuration management for figexport.
//!
//! This module provides the CLI and server configuration:
//! - Command-line arguments via clap
//! - Environment variables with `FIGEXPORT_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use figexport::config::{Cli, Command};
//!
//! // Parse from command line and environment
//! let cli = Cli::parse();
//!
//! match cli.into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Check(config) => println!("Checking {}", config.journal_rules.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! Server options can be set via environment variables with the `FIGEXPORT_` prefix:
//!
//! - `FIGEXPORT_HOST` - Server bind address (default: 0.0.0.0)
//! - `FIGEXPORT_PORT` - Server port (default: 3000)
//! - `FIGEXPORT_JOURNAL_RULES` - Path to the journal rules JSON (default: journal_rules.json)
//! - `FIGEXPORT_BASE_PATH` - URL prefix the API is mounted under (default: none)
//! - `FIGEXPORT_MAX_UPLOAD_MB` - Request body limit in megabytes (default: 64)
//! - `FIGEXPORT_CORS_ORIGINS` - Allowed CORS origins, comma separated (default: any)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default location of the journal rules document.
pub const DEFAULT_JOURNAL_RULES: &str = "journal_rules.json";

/// Default request body limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 64;

/// Largest accepted request body limit in megabytes.
pub const MAX_UPLOAD_MB_LIMIT: usize = 2048;

// =============================================================================
// CLI Arguments
// =============================================================================

/// figexport - Export backend for a scientific figure editor.
///
/// Serves journal formatting rules, exports figures as PNG, JPEG, TIFF or PDF
/// at a chosen DPI and converts TIFFs browsers cannot decode into PNG.
#[derive(Parser, Debug, Clone)]
#[command(name = "figexport")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options, used when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run; no subcommand means `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve(ServeConfig),

    /// Validate the journal rules and optionally probe a TIFF conversion.
    Check(CheckConfig),
}

// =============================================================================
// Serve Configuration
// =============================================================================

/// Options of the HTTP server.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FIGEXPORT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FIGEXPORT_PORT")]
    pub port: u16,

    /// URL prefix the API is mounted under, e.g. `/easyfig`.
    #[arg(long, env = "FIGEXPORT_BASE_PATH")]
    pub base_path: Option<String>,

    // =========================================================================
    // Content Configuration
    // =========================================================================
    /// Path to the journal rules JSON document.
    #[arg(long, default_value = DEFAULT_JOURNAL_RULES, env = "FIGEXPORT_JOURNAL_RULES")]
    pub journal_rules: PathBuf,

    /// Maximum request body size in megabytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_MB, env = "FIGEXPORT_MAX_UPLOAD_MB")]
    pub max_upload_mb: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "FIGEXPORT_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host must not be empty. Set --host or FIGEXPORT_HOST".to_string());
        }

        if self.max_upload_mb == 0 || self.max_upload_mb > MAX_UPLOAD_MB_LIMIT {
            return Err(format!(
                "max_upload_mb must be between 1 and {}",
                MAX_UPLOAD_MB_LIMIT
            ));
        }

        if let Some(ref base_path) = self.base_path {
            if !base_path.starts_with('/') {
                return Err("base_path must start with '/'".to_string());
            }
            if base_path.len() > 1 && base_path.ends_with('/') {
                return Err("base_path must not end with '/'".to_string());
            }
            if base_path == "/" {
                return Err("base_path must not be '/'; omit it to serve from the root".to_string());
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request body limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

// =============================================================================
// Check Configuration
// =============================================================================

/// Options of the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Path to the journal rules JSON document.
    #[arg(long, default_value = DEFAULT_JOURNAL_RULES, env = "FIGEXPORT_JOURNAL_RULES")]
    pub journal_rules: PathBuf,

    /// Run the TIFF fallback conversion on this file and report the result.
    #[arg(long)]
    pub probe: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
