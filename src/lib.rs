//! # figexport
//!
//! Export backend for a scientific figure editor.
//!
//! The editor renders figures in the browser and hands them to this service
//! to produce publication files. The service also serves the journal
//! formatting rules the editor checks figures against, and converts TIFFs
//! the browser cannot decode into PNG.
//!
//! ## Features
//!
//! - **Figure export**: PNG, JPEG, TIFF (LZW) and single-page PDF with the
//!   requested DPI embedded in each format's native resolution field
//! - **Two input shapes**: multipart uploads or a JSON `canvasDataUrl`
//! - **TIFF fallback**: a general-purpose decoder first, then an in-crate
//!   tag-based reader for BigTIFF, odd bit depths and float samples
//! - **Journal rules**: a static JSON document loaded once at startup
//!
//! ## Architecture
//!
//! - [`export`] - Export requests, format preparation and encoders
//! - [`convert`] - Two-tier TIFF to PNG conversion
//! - [`mod@format`] - Container sniffing and the tag-based TIFF reader
//! - [`imaging`] - Shared decode and PNG helpers
//! - [`rules`] - Journal rules document
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use figexport::{create_router, JournalRules, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let rules = JournalRules::load("journal_rules.json").expect("rules");
//!     let router = create_router(rules, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod format;
pub mod imaging;
pub mod rules;
pub mod server;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use convert::{ConvertedPng, DecodeTier, TiffConverter};
pub use error::{ConversionError, ExportError, RulesError, TiffError};
pub use export::{
    ExportEncoder, ExportFormat, ExportOutput, ExportRequest, ResponseMode, DEFAULT_DPI,
    DEFAULT_JPEG_QUALITY, MAX_DPI, MAX_JPEG_QUALITY, MIN_DPI, MIN_JPEG_QUALITY,
};
pub use format::{detect_container, ContainerKind};
pub use imaging::ColorMode;
pub use rules::JournalRules;
pub use server::{create_router, ApiError, AppState, ErrorResponse, RouterConfig};
