//! Shared image helpers.
//!
//! Colour-mode classification and normalisation used by both the export
//! encoder and the TIFF fallback, plus the common decode entry point and the
//! PNG writer both of them produce output with.

use std::borrow::Cow;
use std::io::Cursor;

use image::error::{ImageError, UnsupportedErrorKind};
use image::{ColorType, DynamicImage, ImageReader};

// =============================================================================
// Colour Modes
// =============================================================================

/// Coarse colour mode of a decoded image, independent of bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Single luminance channel
    Gray,
    /// Luminance plus alpha
    GrayAlpha,
    /// Three colour channels
    Rgb,
    /// Three colour channels plus alpha
    Rgba,
}

impl ColorMode {
    /// Classify a decoded image.
    pub fn of(image: &DynamicImage) -> Self {
        match image.color() {
            ColorType::L8 | ColorType::L16 => ColorMode::Gray,
            ColorType::La8 | ColorType::La16 => ColorMode::GrayAlpha,
            ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => ColorMode::Rgba,
            _ => ColorMode::Rgb,
        }
    }

    /// Whether the mode carries an alpha channel.
    pub const fn has_alpha(self) -> bool {
        matches!(self, ColorMode::GrayAlpha | ColorMode::Rgba)
    }

    /// Short mode name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            ColorMode::Gray => "L",
            ColorMode::GrayAlpha => "LA",
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGBA",
        }
    }
}

/// Drop the alpha channel of an RGBA image, keeping its bit depth.
///
/// Images in any other mode are returned unchanged.
pub fn strip_rgba_alpha(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgba8(_) => DynamicImage::ImageRgb8(image.into_rgb8()),
        DynamicImage::ImageRgba16(_) => DynamicImage::ImageRgb16(image.into_rgb16()),
        DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgb32F(image.into_rgb32f()),
        other => other,
    }
}

/// Force an image into 8-bit RGB or RGBA.
///
/// RGBA input stays RGBA; every other mode (gray, gray+alpha, wide or
/// float samples) becomes RGB.
pub fn to_rgb_family_8bit(image: DynamicImage) -> DynamicImage {
    match ColorMode::of(&image) {
        ColorMode::Rgba => DynamicImage::ImageRgba8(image.into_rgba8()),
        _ => DynamicImage::ImageRgb8(image.into_rgb8()),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Why the general-purpose decoder could not open some bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// No decoder recognises the bytes
    Unrecognized,
    /// A decoder recognised the format but failed to decode it
    Invalid(String),
}

/// Decode an in-memory image, guessing its format from the content.
///
/// Multi-frame formats yield their first frame.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DecodeFailure> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeFailure::Invalid(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeFailure::Unrecognized);
    }

    reader.decode().map_err(|e| match e {
        ImageError::Unsupported(ref unsupported)
            if matches!(unsupported.kind(), UnsupportedErrorKind::Format(_)) =>
        {
            DecodeFailure::Unrecognized
        }
        other => DecodeFailure::Invalid(other.to_string()),
    })
}

// =============================================================================
// PNG Output
// =============================================================================

/// Inches per metre, for converting DPI to the pHYs chunk unit.
const METERS_PER_INCH: f64 = 0.0254;

/// Encode an image as PNG.
///
/// Supports 8 and 16-bit gray, gray+alpha, RGB and RGBA. When `dpi` is
/// given it is recorded in a `pHYs` chunk as pixels per metre.
pub fn write_png(image: &DynamicImage, dpi: Option<u32>) -> Result<Vec<u8>, String> {
    use png::{BitDepth, ColorType as PngColor};

    let (color, depth) = match image.color() {
        ColorType::L8 => (PngColor::Grayscale, BitDepth::Eight),
        ColorType::La8 => (PngColor::GrayscaleAlpha, BitDepth::Eight),
        ColorType::Rgb8 => (PngColor::Rgb, BitDepth::Eight),
        ColorType::Rgba8 => (PngColor::Rgba, BitDepth::Eight),
        ColorType::L16 => (PngColor::Grayscale, BitDepth::Sixteen),
        ColorType::La16 => (PngColor::GrayscaleAlpha, BitDepth::Sixteen),
        ColorType::Rgb16 => (PngColor::Rgb, BitDepth::Sixteen),
        ColorType::Rgba16 => (PngColor::Rgba, BitDepth::Sixteen),
        other => return Err(format!("unsupported PNG pixel layout {:?}", other)),
    };

    let data: Cow<'_, [u8]> = match image {
        DynamicImage::ImageLuma16(buf) => big_endian(buf.as_raw()),
        DynamicImage::ImageLumaA16(buf) => big_endian(buf.as_raw()),
        DynamicImage::ImageRgb16(buf) => big_endian(buf.as_raw()),
        DynamicImage::ImageRgba16(buf) => big_endian(buf.as_raw()),
        _ => Cow::Borrowed(image.as_bytes()),
    };

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width(), image.height());
        encoder.set_color(color);
        encoder.set_depth(depth);
        if let Some(dpi) = dpi {
            let ppm = (dpi as f64 / METERS_PER_INCH).round() as u32;
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
        }

        let mut writer = encoder.write_header().map_err(|e| e.to_string())?;
        writer.write_image_data(&data).map_err(|e| e.to_string())?;
        writer.finish().map_err(|e| e.to_string())?;
    }

    Ok(out)
}

/// PNG stores 16-bit samples big-endian.
fn big_endian(samples: &[u16]) -> Cow<'static, [u8]> {
    Cow::Owned(samples.iter().flat_map(|s| s.to_be_bytes()).collect())
}

// =============================================================================
// Tests
// =============================================================================
