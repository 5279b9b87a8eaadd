//! HTTP server layer for figexport.
//!
//! This module provides the HTTP API of the figure editor backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │      POST /api/export-{format}     POST /api/convert-tiff       │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    input    │  │        routes           │  │
//! │  │ (requests)  │  │ (uploads)   │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                                    │
//!            ▼                                    ▼
//!    ┌───────────────┐                   ┌─────────────────┐
//!    │ ExportEncoder │                   │  TiffConverter  │
//!    └───────────────┘                   └─────────────────┘
//! ```

pub mod handlers;
pub mod input;
pub mod routes;

pub use handlers::{
    convert_tiff_handler, export_handler, health_handler, journal_rules_handler,
    submit_feedback_handler, ApiError, AppState, EncodedFileResponse, ErrorResponse,
    FeedbackResponse, HealthResponse, TIFF_DECODER_HEADER,
};
pub use input::{decode_data_url, is_multipart, parse_json_object, UploadForm};
pub use routes::{create_router, RouterConfig};
