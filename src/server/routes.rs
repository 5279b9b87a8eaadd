//! Router configuration for figexport.
//!
//! This module defines the HTTP routes and applies middleware for CORS,
//! body limits, panic recovery and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                         - Health check
//! {base}/api/journal-rules        - Journal rules (GET)
//! {base}/api/convert-tiff         - TIFF to PNG fallback (POST)
//! {base}/api/submit-feedback      - Feedback (POST)
//! {base}/api/export-{format}      - Figure export (POST)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use figexport::rules::JournalRules;
//! use figexport::server::{create_router, RouterConfig};
//!
//! let rules = JournalRules::load("journal_rules.json")?;
//! let config = RouterConfig::new()
//!     .with_base_path("/easyfig")
//!     .with_cors_origins(vec!["https://figures.example.org".to_string()]);
//!
//! let router = create_router(rules, config);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::any::Any;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use super::handlers::{
    convert_tiff_handler, export_handler, health_handler, journal_rules_handler,
    submit_feedback_handler, AppState, ErrorResponse,
};
use crate::config::DEFAULT_MAX_UPLOAD_MB;
use crate::rules::JournalRules;

// =============================================================================
// Router Configuration
// =============================================================================

/// Middleware and mounting options for [`create_router`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Origins permitted by CORS; `None` permits every origin
    pub cors_origins: Option<Vec<String>>,

    /// Attach `TraceLayer` to the router
    pub enable_tracing: bool,

    /// Request body limit in bytes
    pub max_upload_bytes: usize,

    /// URL prefix the API routes are nested under
    pub base_path: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Defaults: every origin is permitted, tracing is on,
    /// bodies up to 64 MB are accepted and the API sits at the root.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            base_path: None,
        }
    }

    /// Restrict CORS to the given origins.
    ///
    /// An empty list refuses every cross-origin request. Unparseable
    /// origins are skipped.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Toggle per-request tracing spans.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the request body limit in bytes.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Nest the API routes under a URL prefix such as `/easyfig`.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Build the application router.
///
/// API routes are nested under `config.base_path` when one is set, while
/// `/health` always answers at the root. Every route shares the body limit,
/// panic recovery and CORS layers.
pub fn create_router(rules: JournalRules, config: RouterConfig) -> Router {
    let app_state = AppState::new(rules);

    let api = Router::new()
        .route("/api/journal-rules", get(journal_rules_handler))
        .route("/api/convert-tiff", post(convert_tiff_handler))
        .route("/api/submit-feedback", post(submit_feedback_handler))
        .route("/api/{action}", post(export_handler))
        .with_state(app_state);

    let router = match config.base_path.as_deref() {
        Some(base) if !base.is_empty() && base != "/" => Router::new().nest(base, api),
        _ => api,
    };

    let router = router
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Answer a panicking handler with a fixed opaque error.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(status = 500, "Handler panicked: {}", message);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("unhandled")),
    )
        .into_response()
}

/// CORS for the editor front end: GET/POST with a JSON or multipart body.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(24 * 60 * 60));

    match &config.cors_origins {
        None => cors.allow_origin(AnyOrigin),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let allowed: Vec<_> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            cors.allow_origin(allowed)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
