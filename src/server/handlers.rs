//! HTTP request handlers for the figure export API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /api/journal-rules` - Journal formatting rules document
//! - `POST /api/export-{format}` - Export an image as PNG, JPEG, TIFF or PDF
//! - `POST /api/convert-tiff` - Convert a TIFF to PNG
//! - `POST /api/submit-feedback` - Log user feedback

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        FromRequest, Multipart, Path, Query, Request, State,
    },
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::convert::TiffConverter;
use crate::error::{ConversionError, ExportError};
use crate::export::{ExportEncoder, ExportFormat, ExportQueryParams, ExportRequest, ResponseMode};
use crate::rules::JournalRules;

use super::input::{is_multipart, read_data_url_export, UploadForm};

/// Response header naming the tier that converted a TIFF.
pub static TIFF_DECODER_HEADER: HeaderName = HeaderName::from_static("x-tiff-decoder");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor. Nothing in it
/// is mutable: the rules are loaded once and the encoders are stateless.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Journal rules loaded at startup
    pub rules: Arc<JournalRules>,

    /// Export encoder
    pub encoder: ExportEncoder,

    /// TIFF fallback converter
    pub converter: TiffConverter,
}

impl AppState {
    /// Create a new application state around the loaded rules.
    pub fn new(rules: JournalRules) -> Self {
        Self {
            rules: Arc::new(rules),
            encoder: ExportEncoder::new(),
            converter: TiffConverter::new(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error identifier (e.g., "Export failed", "missing_file")
    pub error: String,

    /// Short detail code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create an error response without details.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Create an error response with a detail code.
    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Encoded file wrapped in JSON (`?mode=json` exports and TIFF conversions).
#[derive(Debug, Serialize)]
pub struct EncodedFileResponse {
    pub ok: bool,
    pub format: String,
    pub base64: String,
}

/// Feedback acknowledgement.
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log an error response by severity.
///
/// - 5xx errors are logged at ERROR level with the full internal message
/// - 404s are logged at DEBUG level
/// - other 4xx errors are logged at WARN level
fn log_error(status: StatusCode, code: &str, message: &str) {
    if status.is_server_error() {
        error!(code, status = status.as_u16(), "Server error: {}", message);
    } else if status == StatusCode::NOT_FOUND {
        debug!(code, status = status.as_u16(), "Not found: {}", message);
    } else {
        warn!(code, status = status.as_u16(), "Client error: {}", message);
    }
}

/// Convert ExportError to HTTP response.
///
/// The body is always `{"error": "Export failed", "details": <code>}`.
impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let details = self.details();
        log_error(status, &details, &self.to_string());

        (status, Json(ErrorResponse::with_details("Export failed", details))).into_response()
    }
}

/// Convert ConversionError to HTTP response.
impl IntoResponse for ConversionError {
    fn into_response(self) -> Response {
        let status = match self {
            ConversionError::MissingFile | ConversionError::UnidentifiedImage => {
                StatusCode::BAD_REQUEST
            }
            ConversionError::MissingDependency
            | ConversionError::DecodeFailed(_)
            | ConversionError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = self.code();
        log_error(status, code, &self.to_string());

        let body = match self {
            ConversionError::MissingDependency => {
                ErrorResponse::with_details(code, "server_missing_dependency")
            }
            _ => ErrorResponse::new(code),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors of the HTTP layer itself.
#[derive(Debug)]
pub enum ApiError {
    Export(ExportError),
    Conversion(ConversionError),
    /// Unknown `/api/{action}`
    NotFound(String),
    /// Body refused before the handler could read it (e.g. over the size limit)
    BodyRejected { status: StatusCode, message: String },
    /// Feedback body unusable
    Feedback(String),
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::Export(err)
    }
}

impl From<ConversionError> for ApiError {
    fn from(err: ConversionError) -> Self {
        ApiError::Conversion(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Export(err) => err.into_response(),
            ApiError::Conversion(err) => err.into_response(),
            ApiError::NotFound(action) => {
                log_error(StatusCode::NOT_FOUND, "not_found", &action);
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new("not_found"))).into_response()
            }
            ApiError::BodyRejected { status, message } => {
                log_error(status, "request_rejected", &message);
                (
                    status,
                    Json(ErrorResponse::with_details("request_rejected", message)),
                )
                    .into_response()
            }
            ApiError::Feedback(message) => {
                log_error(StatusCode::BAD_REQUEST, "feedback", &message);
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::with_details("Failed to submit feedback", message)),
                )
                    .into_response()
            }
        }
    }
}

/// Size-limit failures keep their own status; everything else is the
/// endpoint's own input error.
fn multipart_failure(err: MultipartError, otherwise: impl FnOnce(String) -> ApiError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::BodyRejected {
            status: err.status(),
            message: err.body_text(),
        }
    } else {
        otherwise(err.body_text())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Serve the journal rules document.
///
/// # Endpoint
///
/// `GET /api/journal-rules`
///
/// The body is the same bytes on every call.
pub async fn journal_rules_handler(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.rules.document(),
    )
        .into_response()
}

/// Handle export requests.
///
/// # Endpoint
///
/// `POST /api/export-{format}` where format is png, jpeg, jpg, tiff or pdf
///
/// # Request
///
/// Either `multipart/form-data` with an `image` file part and optional `dpi`
/// and `quality` fields, or a JSON body with `canvasDataUrl` and optional
/// `dpi`.
///
/// # Query Parameters
///
/// - `mode=json`: return `{"ok": true, "format": ..., "base64": ...}`
///   instead of a file download. A query string that does not parse means
///   a file download.
///
/// # Errors
///
/// `{"error": "Export failed", "details": <code>}` with 400 for bad input
/// and 500 when encoding fails.
pub async fn export_handler(
    State(state): State<AppState>,
    Path(action): Path<String>,
    query: Result<Query<ExportQueryParams>, QueryRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let format_name = action
        .strip_prefix("export-")
        .ok_or_else(|| ApiError::NotFound(action.clone()))?;
    let format = ExportFormat::parse(format_name)?;
    let query = query.map(|Query(query)| query).unwrap_or_else(|e| {
        debug!(error = %e, "Ignoring malformed export query");
        ExportQueryParams::default()
    });
    let mode = ResponseMode::from_query(query.mode.as_deref());

    let (image, export) = if is_multipart(request.headers()) {
        let mut multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ExportError::Multipart(e.body_text()))?;
        let mut form = UploadForm::read(&mut multipart)
            .await
            .map_err(|e| multipart_failure(e, |m| ExportError::Multipart(m).into()))?;
        let image = form.take_image()?;
        (image, form.export_request(format, mode))
    } else {
        let body = Bytes::from_request(request, &state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::BodyRejected {
                    status: e.status(),
                    message: e.body_text(),
                }
            } else {
                ExportError::BadJson(e.body_text()).into()
            }
        })?;
        let (image, export) = read_data_url_export(&body, format, mode)?;
        (Bytes::from(image), export)
    };

    let encoder = state.encoder;
    let output = tokio::task::spawn_blocking(move || encoder.export(&image, &export))
        .await
        .map_err(|e| ExportError::Unhandled(e.to_string()))??;

    info!(
        format = %output.format,
        dpi = export.dpi(),
        bytes = output.data.len(),
        "Export complete"
    );

    Ok(export_response(output, &export))
}

fn export_response(output: crate::export::ExportOutput, export: &ExportRequest) -> Response {
    match export.mode() {
        ResponseMode::Json => Json(EncodedFileResponse {
            ok: true,
            format: output.format.extension().to_string(),
            base64: output.to_base64(),
        })
        .into_response(),
        ResponseMode::Attachment => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, output.format.mime_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", output.format.download_name()),
                ),
                (header::CACHE_CONTROL, "no-transform".to_string()),
            ],
            output.data,
        )
            .into_response(),
    }
}

/// Convert an uploaded TIFF to PNG.
///
/// # Endpoint
///
/// `POST /api/convert-tiff` with a multipart `image` file part
///
/// # Response
///
/// `200 OK` with `{"ok": true, "format": "png", "base64": ...}` and an
/// `X-Tiff-Decoder` header naming the tier that decoded the file.
///
/// # Errors
///
/// - `400` `missing_file`: no `image` file part
/// - `400` `unidentified_image`: neither decoder recognises the bytes
/// - `500` `tiff_decode_failed`: both tiers failed, or the tag reader is not built in
pub async fn convert_tiff_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|_| ConversionError::MissingFile)?;
    let mut form = UploadForm::read(&mut multipart)
        .await
        .map_err(|e| multipart_failure(e, |_| ConversionError::MissingFile.into()))?;
    let source = form.image.take().ok_or(ConversionError::MissingFile)?;

    let converter = state.converter;
    let converted = tokio::task::spawn_blocking(move || converter.convert(&source))
        .await
        .map_err(|e| ConversionError::Unhandled(e.to_string()))??;

    info!(
        tier = converted.tier.name(),
        width = converted.width,
        height = converted.height,
        "TIFF converted"
    );

    Ok((
        [(TIFF_DECODER_HEADER.clone(), converted.tier.name())],
        Json(EncodedFileResponse {
            ok: true,
            format: "png".to_string(),
            base64: converted.to_base64(),
        }),
    )
        .into_response())
}

/// Log a feedback submission.
///
/// # Endpoint
///
/// `POST /api/submit-feedback` with `{"rating": ..., "feedback": "..."}`
///
/// Nothing is stored; the rating and the length of the text are logged.
pub async fn submit_feedback_handler(body: Bytes) -> Result<Json<FeedbackResponse>, ApiError> {
    let value: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::Feedback(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ApiError::Feedback("expected a JSON object".to_string()))?;

    let rating = object.get("rating").cloned().unwrap_or(Value::Null);
    let feedback_len = object
        .get("feedback")
        .and_then(Value::as_str)
        .map(|text| text.chars().count())
        .unwrap_or(0);
    info!(rating = %rating, feedback_len, "Feedback received");

    Ok(Json(FeedbackResponse { success: true }))
}

// =============================================================================
// Tests
// =============================================================================
