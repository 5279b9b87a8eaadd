//! Export pipeline.
//!
//! Converts an uploaded or canvas-rendered image into a publication export
//! (PNG, JPEG, TIFF or PDF) with the requested DPI and, for JPEG, quality.

mod encoder;
mod pdf;
mod request;

pub use encoder::{prepare, ExportEncoder, ExportOutput};
pub use pdf::{page_extent, write_pdf};
pub use request::{
    clamp_dpi, clamp_quality, dpi_from_field, dpi_from_json, parse_int_lenient,
    quality_from_field, ExportFormat, ExportQueryParams, ExportRequest, ResponseMode, DEFAULT_DPI,
    DEFAULT_JPEG_QUALITY, LEGACY_JPEG_QUALITY, MAX_DPI, MAX_JPEG_QUALITY, MIN_DPI,
    MIN_JPEG_QUALITY,
};
