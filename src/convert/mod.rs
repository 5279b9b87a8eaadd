//! TIFF to PNG fallback conversion.
//!
//! Used when a browser cannot decode a TIFF itself (BigTIFF, unusual
//! compression, 16/32-bit or float samples). Two decode tiers are tried in
//! order and the first success wins:
//!
//! 1. **Primary**: the general-purpose decoder. Its first frame is forced to
//!    8-bit RGB or RGBA and written as PNG. Any decode failure falls through.
//! 2. **Tag reader**: the in-crate TIFF reader extracts the raw sample array,
//!    which is rescaled to 8 bits, arranged into gray, RGB or RGBA and
//!    written as PNG. Needs the `tag-reader` feature.

#[cfg(feature = "tag-reader")]
mod array;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use tracing::{debug, error, info};

use crate::error::ConversionError;
use crate::imaging::{decode_image, to_rgb_family_8bit, write_png, DecodeFailure};

#[cfg(feature = "tag-reader")]
pub use array::{arrange_channels, array_to_image, normalize_to_u8};

// =============================================================================
// Results
// =============================================================================

/// Which tier produced a converted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeTier {
    Primary,
    TagReader,
}

impl DecodeTier {
    /// Name reported in the `X-Tiff-Decoder` response header.
    pub const fn name(self) -> &'static str {
        match self {
            DecodeTier::Primary => "primary",
            DecodeTier::TagReader => "tag-reader",
        }
    }
}

/// A successful conversion.
#[derive(Debug, Clone)]
pub struct ConvertedPng {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub tier: DecodeTier,
}

impl ConvertedPng {
    /// Standard padded base64 of the PNG bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// Why the primary decoder could not handle the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// The input is not a format the primary decoder recognises
    Unrecognized,
    /// The primary decoder recognised the input but rejected it
    Rejected(String),
}

/// Outcome of the primary tier.
///
/// Only [`PrimaryOutcome::Unsupported`] moves on to the tag reader.
#[derive(Debug, Clone)]
pub enum PrimaryOutcome {
    Converted(ConvertedPng),
    Unsupported(UnsupportedReason),
    Failed(String),
}

// =============================================================================
// Converter
// =============================================================================

/// Stateless TIFF to PNG converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffConverter;

impl TiffConverter {
    pub fn new() -> Self {
        Self
    }

    /// Whether the tag-reader tier is compiled in.
    pub const fn has_tag_reader() -> bool {
        cfg!(feature = "tag-reader")
    }

    /// Convert TIFF bytes to PNG, trying the primary decoder first.
    pub fn convert(&self, source: &[u8]) -> Result<ConvertedPng, ConversionError> {
        match self.decode_primary(source) {
            PrimaryOutcome::Converted(png) => Ok(png),
            PrimaryOutcome::Failed(message) => Err(ConversionError::DecodeFailed(message)),
            PrimaryOutcome::Unsupported(reason) => {
                match &reason {
                    UnsupportedReason::Unrecognized => {
                        debug!("Primary decoder does not recognise input, trying tag reader")
                    }
                    UnsupportedReason::Rejected(message) => {
                        info!(error = %message, "Primary TIFF decode failed, trying tag reader")
                    }
                }
                self.decode_tag_reader(source, &reason)
            }
        }
    }

    /// Tier 1: the general-purpose decoder.
    pub fn decode_primary(&self, source: &[u8]) -> PrimaryOutcome {
        let image = match decode_image(source) {
            Ok(image) => image,
            Err(DecodeFailure::Unrecognized) => {
                return PrimaryOutcome::Unsupported(UnsupportedReason::Unrecognized)
            }
            Err(DecodeFailure::Invalid(message)) => {
                return PrimaryOutcome::Unsupported(UnsupportedReason::Rejected(message))
            }
        };

        let image = to_rgb_family_8bit(image);
        match write_png(&image, None) {
            Ok(png) => PrimaryOutcome::Converted(ConvertedPng {
                data: Bytes::from(png),
                width: image.width(),
                height: image.height(),
                tier: DecodeTier::Primary,
            }),
            Err(message) => PrimaryOutcome::Failed(format!("png encode: {}", message)),
        }
    }

    /// Tier 2: the tag-based reader.
    #[cfg(feature = "tag-reader")]
    pub fn decode_tag_reader(
        &self,
        source: &[u8],
        primary: &UnsupportedReason,
    ) -> Result<ConvertedPng, ConversionError> {
        use crate::format::tiff::RasterReader;

        let samples = RasterReader::new(source)
            .and_then(|reader| {
                debug!(pages = reader.page_count(), "Tag reader parsed TIFF structure");
                reader.read_samples()
            })
            .map_err(|e| {
                if e.is_not_tiff() && *primary == UnsupportedReason::Unrecognized {
                    ConversionError::UnidentifiedImage
                } else {
                    error!(error = %e, "Tag reader TIFF decode failed");
                    ConversionError::DecodeFailed(e.to_string())
                }
            })?;

        let shape = samples.shape().to_vec();
        let converted = arrange_channels(normalize_to_u8(samples))
            .and_then(|(array, mode)| array_to_image(array, mode))
            .map(to_rgb_family_8bit)
            .and_then(|image| {
                let png = write_png(&image, None)?;
                Ok(ConvertedPng {
                    data: Bytes::from(png),
                    width: image.width(),
                    height: image.height(),
                    tier: DecodeTier::TagReader,
                })
            })
            .map_err(|message| {
                error!(shape = ?shape, error = %message, "Tag reader image assembly failed");
                ConversionError::DecodeFailed(message)
            })?;

        debug!(
            shape = ?shape,
            width = converted.width,
            height = converted.height,
            "Tag reader converted TIFF"
        );
        Ok(converted)
    }

    /// Tier 2 is not compiled in.
    #[cfg(not(feature = "tag-reader"))]
    pub fn decode_tag_reader(
        &self,
        _source: &[u8],
        _primary: &UnsupportedReason,
    ) -> Result<ConvertedPng, ConversionError> {
        error!("TIFF fallback needs the tag-reader feature, which is not compiled in");
        Err(ConversionError::MissingDependency)
    }
}

// =============================================================================
// Tests
// =============================================================================
