//! Export encoder.
//!
//! Turns uploaded image bytes into a publication export. The work happens in
//! three steps:
//!
//! 1. **Decode** the bytes with the general-purpose decoder.
//! 2. **Prepare** the pixels for the target format. RGBA is always reduced
//!    to RGB for formats without alpha, then the colour type is lowered to
//!    one the target encoder writes.
//! 3. **Encode** with the per-format options: DPI for every format, quality
//!    for JPEG and LZW compression for TIFF.

use std::io::{Cursor, Seek, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::codecs::jpeg::{JpegEncoder, PixelDensity, PixelDensityUnit};
use image::{ColorType, DynamicImage, ExtendedColorType, ImageBuffer, Pixel};
use tiff::encoder::colortype::{self, ColorType as TiffColorType};
use tiff::encoder::{Compression as TiffCompression, Rational, TiffEncoder, TiffValue};
use tiff::tags::ResolutionUnit;
use tracing::debug;

use crate::error::ExportError;
use crate::imaging::{decode_image, strip_rgba_alpha, write_png, ColorMode, DecodeFailure};

use super::pdf::write_pdf;
use super::request::{ExportFormat, ExportRequest};

// =============================================================================
// Export Output
// =============================================================================

/// Encoded export file.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub data: Bytes,
}

impl ExportOutput {
    /// Standard padded base64 of the encoded bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

// =============================================================================
// Export Encoder
// =============================================================================

/// Stateless encoder shared by all export requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportEncoder;

impl ExportEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode the uploaded bytes.
    ///
    /// # Errors
    ///
    /// - [`ExportError::UnidentifiedImage`] when no decoder recognises the bytes
    /// - [`ExportError::ImageOpen`] when a decoder recognises but fails to open them
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ExportError> {
        decode_image(bytes).map_err(|failure| match failure {
            DecodeFailure::Unrecognized => ExportError::UnidentifiedImage,
            DecodeFailure::Invalid(message) => ExportError::ImageOpen(message),
        })
    }

    /// Encode a decoded image according to the request.
    pub fn encode(
        &self,
        image: DynamicImage,
        request: &ExportRequest,
    ) -> Result<ExportOutput, ExportError> {
        let format = request.format();
        let image = prepare(image, format);
        let dpi = request.dpi();

        let encoded = match format {
            ExportFormat::Png => write_png(&image, Some(dpi)),
            ExportFormat::Jpeg => write_jpeg(&image, dpi, request.quality()),
            ExportFormat::Tiff => write_tiff(&image, dpi),
            ExportFormat::Pdf => write_pdf(&image, dpi),
        }
        .map_err(ExportError::SaveFailed)?;

        debug!(
            format = %format,
            dpi,
            quality = request.quality(),
            width = image.width(),
            height = image.height(),
            bytes = encoded.len(),
            "Encoded export"
        );

        Ok(ExportOutput {
            format,
            data: Bytes::from(encoded),
        })
    }

    /// Decode then encode.
    pub fn export(
        &self,
        bytes: &[u8],
        request: &ExportRequest,
    ) -> Result<ExportOutput, ExportError> {
        let image = self.decode(bytes)?;
        self.encode(image, request)
    }
}

// =============================================================================
// Mode Preparation
// =============================================================================

/// Lower an image to a colour type the target encoder writes.
pub fn prepare(image: DynamicImage, format: ExportFormat) -> DynamicImage {
    let image = if format.supports_alpha() {
        image
    } else {
        let mode = ColorMode::of(&image);
        if mode.has_alpha() {
            debug!(format = %format, mode = mode.name(), "Dropping alpha channel for export");
        }
        strip_rgba_alpha(image)
    };

    match format {
        ExportFormat::Png => prepare_png(image),
        ExportFormat::Tiff => prepare_tiff(image),
        ExportFormat::Jpeg | ExportFormat::Pdf => prepare_8bit(image),
    }
}

fn prepare_png(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => image,
        _ if ColorMode::of(&image).has_alpha() => DynamicImage::ImageRgba16(image.into_rgba16()),
        _ => DynamicImage::ImageRgb16(image.into_rgb16()),
    }
}

fn prepare_tiff(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::L16 | ColorType::Rgb8 | ColorType::Rgb16 => image,
        ColorType::La8 => DynamicImage::ImageLuma8(image.into_luma8()),
        ColorType::La16 => DynamicImage::ImageLuma16(image.into_luma16()),
        ColorType::Rgb32F => DynamicImage::ImageRgb16(image.into_rgb16()),
        _ => DynamicImage::ImageRgb8(image.into_rgb8()),
    }
}

fn prepare_8bit(image: DynamicImage) -> DynamicImage {
    match ColorMode::of(&image) {
        ColorMode::Gray | ColorMode::GrayAlpha => DynamicImage::ImageLuma8(image.into_luma8()),
        _ => DynamicImage::ImageRgb8(image.into_rgb8()),
    }
}

// =============================================================================
// Format Writers
// =============================================================================

/// JPEG with a JFIF density in dots per inch.
fn write_jpeg(image: &DynamicImage, dpi: u32, quality: u8) -> Result<Vec<u8>, String> {
    let (data, color) = match image {
        DynamicImage::ImageLuma8(buf) => (buf.as_raw(), ExtendedColorType::L8),
        DynamicImage::ImageRgb8(buf) => (buf.as_raw(), ExtendedColorType::Rgb8),
        other => return Err(format!("unsupported JPEG pixel layout {:?}", other.color())),
    };

    let density = u16::try_from(dpi).map_err(|_| format!("DPI {} out of JFIF range", dpi))?;
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.set_pixel_density(PixelDensity {
        density: (density, density),
        unit: PixelDensityUnit::Inches,
    });
    encoder
        .encode(data, image.width(), image.height(), color)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// LZW-compressed TIFF with X/Y resolution in inches.
fn write_tiff(image: &DynamicImage, dpi: u32) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    {
        let mut encoder = TiffEncoder::new(Cursor::new(&mut out))
            .map_err(|e| e.to_string())?
            .with_compression(TiffCompression::Lzw);

        match image {
            DynamicImage::ImageLuma8(buf) => {
                write_tiff_page::<_, colortype::Gray8, _>(&mut encoder, dpi, buf)
            }
            DynamicImage::ImageLuma16(buf) => {
                write_tiff_page::<_, colortype::Gray16, _>(&mut encoder, dpi, buf)
            }
            DynamicImage::ImageRgb8(buf) => {
                write_tiff_page::<_, colortype::RGB8, _>(&mut encoder, dpi, buf)
            }
            DynamicImage::ImageRgb16(buf) => {
                write_tiff_page::<_, colortype::RGB16, _>(&mut encoder, dpi, buf)
            }
            other => return Err(format!("unsupported TIFF pixel layout {:?}", other.color())),
        }
        .map_err(|e| e.to_string())?;
    }
    Ok(out)
}

fn write_tiff_page<W, C, P>(
    encoder: &mut TiffEncoder<W>,
    dpi: u32,
    buf: &ImageBuffer<P, Vec<C::Inner>>,
) -> tiff::TiffResult<()>
where
    W: Write + Seek,
    C: TiffColorType,
    P: Pixel<Subpixel = C::Inner>,
    [C::Inner]: TiffValue,
{
    let (width, height) = buf.dimensions();
    let mut page = encoder.new_image::<C>(width, height)?;
    page.resolution_unit(ResolutionUnit::Inch);
    page.x_resolution(Rational { n: dpi, d: 1 });
    page.y_resolution(Rational { n: dpi, d: 1 });
    page.write_data(buf.as_raw())
}

// =============================================================================
// Tests
// =============================================================================
