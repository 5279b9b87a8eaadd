//! Request input acquisition.
//!
//! Export requests arrive in one of two shapes, told apart by content type:
//!
//! - **Multipart upload**: a file part named `image` plus optional `dpi` and
//!   `quality` form fields.
//! - **JSON body**: `{"canvasDataUrl": "data:...;base64,<payload>", "dpi": ...}`.
//!   Any supplied quality is ignored and JPEG is written at a fixed quality.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::export::{
    dpi_from_field, dpi_from_json, quality_from_field, ExportFormat, ExportRequest, ResponseMode,
    LEGACY_JPEG_QUALITY,
};

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// JSON member carrying the data URL.
pub const DATA_URL_FIELD: &str = "canvasDataUrl";

/// Whether the request body is `multipart/form-data`.
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
}

// =============================================================================
// Multipart Uploads
// =============================================================================

/// The parts of a multipart upload the endpoints look at.
///
/// The first file part named `image` is the upload; `dpi` and `quality`
/// are the first plain (non-file) fields of those names.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub image: Option<Bytes>,
    pub dpi: Option<String>,
    pub quality: Option<String>,
}

impl UploadForm {
    /// Read every part of a multipart body.
    pub async fn read(multipart: &mut Multipart) -> Result<Self, MultipartError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if is_file_part(&field) {
                if name == IMAGE_FIELD && form.image.is_none() {
                    form.image = Some(field.bytes().await?);
                }
                continue;
            }

            let slot = match name.as_str() {
                "dpi" => &mut form.dpi,
                "quality" => &mut form.quality,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(field.text().await?);
            }
        }

        Ok(form)
    }

    /// Take the uploaded image, failing with `missing_file` when absent.
    pub fn take_image(&mut self) -> Result<Bytes, ExportError> {
        self.image.take().ok_or(ExportError::MissingFile)
    }

    /// Build the export request from the form fields.
    ///
    /// Quality is only read for JPEG.
    pub fn export_request(&self, format: ExportFormat, mode: ResponseMode) -> ExportRequest {
        let request = ExportRequest::new(format)
            .with_dpi(dpi_from_field(self.dpi.as_deref()))
            .with_mode(mode);

        if format == ExportFormat::Jpeg {
            request.with_quality(quality_from_field(self.quality.as_deref()))
        } else {
            request
        }
    }
}

/// A file part has a non-empty file name.
fn is_file_part(field: &Field<'_>) -> bool {
    field.file_name().is_some_and(|name| !name.is_empty())
}

// =============================================================================
// JSON Data URLs
// =============================================================================

/// Parse a JSON request body.
///
/// Anything other than an object (including `null`) is treated as an empty
/// object.
pub fn parse_json_object(body: &[u8]) -> Result<Map<String, Value>, ExportError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ExportError::BadJson(e.to_string()))?;
    Ok(match value {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Decode the base64 payload of a data URL.
///
/// The URL is split on its first comma; ASCII whitespace in the payload is
/// ignored.
pub fn decode_data_url(value: Option<&Value>) -> Result<Vec<u8>, ExportError> {
    let url = value
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or(ExportError::MissingDataUrl)?;
    let (_, payload) = url.split_once(',').ok_or(ExportError::MissingDataUrl)?;

    let compact: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ExportError::Base64(e.to_string()))
}

/// Extract the image bytes and export request from a JSON body.
pub fn read_data_url_export(
    body: &[u8],
    format: ExportFormat,
    mode: ResponseMode,
) -> Result<(Vec<u8>, ExportRequest), ExportError> {
    let object = parse_json_object(body)?;
    let image = decode_data_url(object.get(DATA_URL_FIELD))?;

    let request = ExportRequest::new(format)
        .with_dpi(dpi_from_json(object.get("dpi")))
        .with_fixed_quality(LEGACY_JPEG_QUALITY)
        .with_mode(mode);

    Ok((image, request))
}

// =============================================================================
// Tests
// =============================================================================
