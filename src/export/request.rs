//! Export request types.
//!
//! An [`ExportRequest`] is built from the URL and the request body and is
//! immutable once built: every numeric parameter is clamped on the way in.

use std::num::IntErrorKind;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ExportError;

/// DPI used when none (or an unparseable one) is supplied.
pub const DEFAULT_DPI: u32 = 600;

/// Minimum accepted DPI.
pub const MIN_DPI: u32 = 50;

/// Maximum accepted DPI.
pub const MAX_DPI: u32 = 2400;

/// JPEG quality used on the upload path when none (or an unparseable one) is supplied.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum accepted JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 40;

/// Maximum accepted JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 95;

/// Fixed JPEG quality of the data-URL path, which ignores any supplied quality.
pub const LEGACY_JPEG_QUALITY: u8 = 95;

// =============================================================================
// Export Format
// =============================================================================

/// Target format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Png,
    Jpeg,
    Tiff,
    Pdf,
}

impl ExportFormat {
    /// Parse a format name.
    ///
    /// Case-insensitive; `jpg` is an alias of `jpeg`.
    pub fn parse(name: &str) -> Result<Self, ExportError> {
        let normalized = name.to_ascii_lowercase().replace("jpg", "jpeg");
        match normalized.as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" => Ok(ExportFormat::Jpeg),
            "tiff" => Ok(ExportFormat::Tiff),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ExportError::UnsupportedFormat(normalized)),
        }
    }

    /// Canonical name, also used as the file extension.
    pub const fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Tiff => "tiff",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// MIME type of the encoded output.
    pub const fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Tiff => "image/tiff",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Whether the encoder keeps an alpha channel.
    pub const fn supports_alpha(self) -> bool {
        matches!(self, ExportFormat::Png)
    }

    /// Suggested download file name.
    pub fn download_name(self) -> String {
        format!("figure.{}", self.extension())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// =============================================================================
// Response Mode
// =============================================================================

/// How the encoded bytes are handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Raw bytes as a file download
    #[default]
    Attachment,
    /// `{ok, format, base64}` JSON body
    Json,
}

impl ResponseMode {
    /// `json` selects the JSON body; anything else is a download.
    pub fn from_query(mode: Option<&str>) -> Self {
        match mode {
            Some("json") => ResponseMode::Json,
            _ => ResponseMode::Attachment,
        }
    }
}

/// Query parameters accepted by the export endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQueryParams {
    pub mode: Option<String>,
}

// =============================================================================
// Export Request
// =============================================================================

/// Validated export parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    format: ExportFormat,
    dpi: u32,
    quality: u8,
    mode: ResponseMode,
}

impl ExportRequest {
    /// Request with default DPI and the upload-path default quality.
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            dpi: DEFAULT_DPI,
            quality: DEFAULT_JPEG_QUALITY,
            mode: ResponseMode::Attachment,
        }
    }

    /// Set the DPI, clamped to the accepted range.
    pub fn with_dpi(mut self, dpi: i64) -> Self {
        self.dpi = clamp_dpi(dpi);
        self
    }

    /// Set the JPEG quality, clamped to the accepted range.
    pub fn with_quality(mut self, quality: i64) -> Self {
        self.quality = clamp_quality(quality);
        self
    }

    /// Set the JPEG quality without clamping.
    ///
    /// Only used for the fixed quality of the data-URL path.
    pub(crate) fn with_fixed_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// JPEG quality; ignored by the other encoders.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }
}

// =============================================================================
// Parameter Parsing
// =============================================================================

/// Clamp a DPI value into `[MIN_DPI, MAX_DPI]`.
#[inline]
pub fn clamp_dpi(dpi: i64) -> u32 {
    dpi.clamp(MIN_DPI as i64, MAX_DPI as i64) as u32
}

/// Clamp a JPEG quality into `[MIN_JPEG_QUALITY, MAX_JPEG_QUALITY]`.
#[inline]
pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY as i64, MAX_JPEG_QUALITY as i64) as u8
}

/// Parse a form field as an integer.
///
/// Surrounding whitespace and a leading sign are accepted. Values beyond
/// the `i64` range saturate instead of failing, so they still clamp to
/// the nearest bound.
pub fn parse_int_lenient(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(value) => Some(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// DPI from a form field; missing or unparseable falls back to the default.
pub fn dpi_from_field(raw: Option<&str>) -> i64 {
    raw.and_then(parse_int_lenient)
        .unwrap_or(DEFAULT_DPI as i64)
}

/// Quality from a form field; missing or unparseable falls back to the default.
pub fn quality_from_field(raw: Option<&str>) -> i64 {
    raw.and_then(parse_int_lenient)
        .unwrap_or(DEFAULT_JPEG_QUALITY as i64)
}

/// DPI from a JSON body value.
///
/// Integers are taken as-is, floats truncated toward zero, booleans count
/// as 1 or 0 and numeric strings are parsed like form fields. Anything
/// else falls back to the default.
pub fn dpi_from_json(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::Bool(b)) => Some(*b as i64),
        Some(Value::String(s)) => parse_int_lenient(s),
        _ => None,
    };
    parsed.unwrap_or(DEFAULT_DPI as i64)
}

// =============================================================================
// Tests
// =============================================================================
