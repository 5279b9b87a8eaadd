//! Test utilities for integration tests.
//!
//! This module provides a router factory, a multipart body writer, image
//! fixtures and a builder for TIFF files with various configurations.

use std::io::Cursor;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use tower::ServiceExt;

use figexport::{create_router, JournalRules, RouterConfig};

// =============================================================================
// Router and Requests
// =============================================================================

/// Path of the sample journal rules shipped with the crate.
pub const RULES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/journal_rules.json");

/// Load the sample journal rules.
pub fn sample_rules() -> JournalRules {
    JournalRules::load(RULES_PATH).unwrap()
}

/// Router with the sample rules and tracing off.
pub fn test_router() -> Router {
    test_router_with(RouterConfig::new())
}

/// Router with the sample rules and a custom configuration.
pub fn test_router_with(config: RouterConfig) -> Router {
    create_router(sample_rules(), config.with_tracing(false))
}

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// A header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Send a request through the router and collect the response.
pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// POST a multipart body.
pub fn multipart_request(uri: &str, body: MultipartBody) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, body.content_type())
        .body(Body::from(body.finish()))
        .unwrap()
}

/// POST a JSON body.
pub fn json_request(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// GET a path.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =============================================================================
// Multipart Bodies
// =============================================================================

const BOUNDARY: &str = "figexport-test-boundary";

/// Writer for `multipart/form-data` bodies.
#[derive(Default)]
pub struct MultipartBody {
    data: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file part.
    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.data.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.data.extend_from_slice(content);
        self.data.extend_from_slice(b"\r\n");
        self
    }

    /// Add a plain text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.data.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.data
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.data
    }
}

// =============================================================================
// Image Fixtures
// =============================================================================

/// Encode an image with the general-purpose encoder.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A semi-transparent RGBA gradient.
pub fn rgba_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7) as u8, (y * 11) as u8, 128, if x % 2 == 0 { 255 } else { 64 }])
    }))
}

/// An opaque RGB gradient.
pub fn rgb_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 5) as u8, (y * 3) as u8, ((x + y) % 256) as u8])
    }))
}

/// A grayscale gradient.
pub fn gray_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        Luma([((x + y) % 256) as u8])
    }))
}

/// PNG bytes of [`rgba_image`].
pub fn rgba_png(width: u32, height: u32) -> Vec<u8> {
    encode(&rgba_image(width, height), ImageFormat::Png)
}

/// Decode response bytes with the general-purpose decoder.
pub fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).unwrap()
}

/// Payload of a PNG chunk.
pub fn png_chunk<'a>(png: &'a [u8], name: &[u8; 4]) -> Option<&'a [u8]> {
    let mut pos = 8;
    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let kind = &png[pos + 4..pos + 8];
        if kind == name {
            return png.get(pos + 8..pos + 8 + len);
        }
        pos += 12 + len;
    }
    None
}

/// Units and densities of a JPEG's JFIF segment.
pub fn jfif_density(jpeg: &[u8]) -> Option<(u8, u16, u16)> {
    let start = jpeg.windows(5).position(|w| w == b"JFIF\0")?;
    let fields = jpeg.get(start + 7..start + 12)?;
    Some((
        fields[0],
        u16::from_be_bytes([fields[1], fields[2]]),
        u16::from_be_bytes([fields[3], fields[4]]),
    ))
}

// =============================================================================
// TIFF File Builders
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// One single-strip (or single-tile) page of a test TIFF.
#[derive(Clone)]
pub struct TiffPage {
    width: u32,
    height: u32,
    bits_per_sample: u16,
    samples_per_pixel: u16,
    sample_format: u16,
    photometric: Option<u16>,
    packbits: bool,
    tile: Option<(u32, u32)>,
    samples: Vec<u64>,
}

impl TiffPage {
    /// Unsigned samples of the given width, in pixel-interleaved order.
    pub fn new(width: u32, height: u32, bits_per_sample: u16, samples: Vec<u64>) -> Self {
        Self {
            width,
            height,
            bits_per_sample,
            samples_per_pixel: 1,
            sample_format: 1,
            photometric: None,
            packbits: false,
            tile: None,
            samples,
        }
    }

    /// 8-bit grayscale.
    pub fn gray8(width: u32, height: u32, values: &[u8]) -> Self {
        Self::new(width, height, 8, values.iter().map(|&v| v as u64).collect())
    }

    /// 16-bit grayscale.
    pub fn gray16(width: u32, height: u32, values: &[u16]) -> Self {
        Self::new(width, height, 16, values.iter().map(|&v| v as u64).collect())
    }

    /// 32-bit float samples.
    pub fn float32(width: u32, height: u32, samples_per_pixel: u16, values: &[f32]) -> Self {
        Self::new(
            width,
            height,
            32,
            values.iter().map(|v| v.to_bits() as u64).collect(),
        )
        .with_samples_per_pixel(samples_per_pixel)
        .with_sample_format(3)
    }

    pub fn with_samples_per_pixel(mut self, samples_per_pixel: u16) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    pub fn with_sample_format(mut self, sample_format: u16) -> Self {
        self.sample_format = sample_format;
        self
    }

    /// Record a PhotometricInterpretation tag. Pages without one are only
    /// readable by the tag reader.
    pub fn with_photometric(mut self, photometric: u16) -> Self {
        self.photometric = Some(photometric);
        self
    }

    pub fn with_packbits(mut self) -> Self {
        self.packbits = true;
        self
    }

    /// Store the samples as the page's only tile instead of a strip.
    pub fn with_tile(mut self, tile_width: u32, tile_length: u32) -> Self {
        self.tile = Some((tile_width, tile_length));
        self
    }

    fn strip(&self, order: ByteOrderType) -> Vec<u8> {
        let size = (self.bits_per_sample / 8) as usize;
        let mut raw = Vec::with_capacity(self.samples.len() * size);
        for &sample in &self.samples {
            write_value(&mut raw, order, sample, size);
        }
        if self.packbits {
            pack_bits_literal(&raw)
        } else {
            raw
        }
    }

    fn entries(&self, strip_offset: u64, strip_len: u64) -> Vec<(u16, u16, Vec<u64>)> {
        let spp = self.samples_per_pixel as usize;
        let mut entries = vec![
            (256, 4, vec![self.width as u64]),
            (257, 4, vec![self.height as u64]),
            (258, 3, vec![self.bits_per_sample as u64; spp]),
            (259, 3, vec![if self.packbits { 32773 } else { 1 }]),
            (277, 3, vec![spp as u64]),
            (339, 3, vec![self.sample_format as u64; spp]),
        ];
        match self.tile {
            Some((tile_width, tile_length)) => entries.extend([
                (322, 4, vec![tile_width as u64]),
                (323, 4, vec![tile_length as u64]),
                (324, 4, vec![strip_offset]),
                (325, 4, vec![strip_len]),
            ]),
            None => entries.extend([
                (273, 4, vec![strip_offset]),
                (278, 4, vec![self.height as u64]),
                (279, 4, vec![strip_len]),
            ]),
        }
        if let Some(photometric) = self.photometric {
            entries.push((262, 3, vec![photometric as u64]));
        }
        entries.sort_by_key(|e| e.0);
        entries
    }
}

/// Builder for creating test TIFF files.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    pages: Vec<TiffPage>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            pages: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_page(mut self, page: TiffPage) -> Self {
        self.pages.push(page);
        self
    }

    /// Build the TIFF file data.
    pub fn build(self) -> Vec<u8> {
        let order = self.byte_order;
        let offset_size = if self.is_bigtiff { 8 } else { 4 };
        let count_size = if self.is_bigtiff { 8 } else { 2 };

        let mut data = Vec::new();
        data.extend_from_slice(match order {
            ByteOrderType::LittleEndian => b"II",
            ByteOrderType::BigEndian => b"MM",
        });
        if self.is_bigtiff {
            write_value(&mut data, order, 43, 2); // BigTIFF version
            write_value(&mut data, order, 8, 2); // Offset size
            write_value(&mut data, order, 0, 2); // Reserved
        } else {
            write_value(&mut data, order, 42, 2); // Classic TIFF version
        }

        // Offset field that points at the next IFD
        let mut link_pos = data.len();
        write_value(&mut data, order, 0, offset_size);

        for page in &self.pages {
            pad_even(&mut data);
            let strip = page.strip(order);
            let strip_offset = data.len() as u64;
            data.extend_from_slice(&strip);

            // Values too large for the entry go before the IFD
            let mut fields = Vec::new();
            let entries = page.entries(strip_offset, strip.len() as u64);
            for (_, field_type, values) in &entries {
                let size = if *field_type == 3 { 2 } else { 4 };
                let mut bytes = Vec::new();
                for &value in values {
                    write_value(&mut bytes, order, value, size);
                }
                if bytes.len() <= offset_size {
                    bytes.resize(offset_size, 0);
                    fields.push(bytes);
                } else {
                    pad_even(&mut data);
                    let offset = data.len() as u64;
                    data.extend_from_slice(&bytes);
                    let mut field = Vec::new();
                    write_value(&mut field, order, offset, offset_size);
                    fields.push(field);
                }
            }

            pad_even(&mut data);
            let ifd_offset = data.len() as u64;
            let mut link = Vec::new();
            write_value(&mut link, order, ifd_offset, offset_size);
            data[link_pos..link_pos + offset_size].copy_from_slice(&link);

            write_value(&mut data, order, entries.len() as u64, count_size);
            for ((tag, field_type, values), field) in entries.iter().zip(fields) {
                write_value(&mut data, order, *tag as u64, 2);
                write_value(&mut data, order, *field_type as u64, 2);
                write_value(&mut data, order, values.len() as u64, offset_size);
                data.extend_from_slice(&field);
            }

            link_pos = data.len();
            write_value(&mut data, order, 0, offset_size);
        }

        data
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn pad_even(data: &mut Vec<u8>) {
    if data.len() % 2 == 1 {
        data.push(0);
    }
}

/// PackBits stream made only of literal runs.
fn pack_bits_literal(raw: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(raw.len() + raw.len() / 128 + 1);
    for run in raw.chunks(128) {
        packed.push((run.len() - 1) as u8);
        packed.extend_from_slice(run);
    }
    packed
}

fn write_value(data: &mut Vec<u8>, byte_order: ByteOrderType, value: u64, size: usize) {
    match byte_order {
        ByteOrderType::LittleEndian => match size {
            1 => data.push(value as u8),
            2 => data.extend(&(value as u16).to_le_bytes()),
            4 => data.extend(&(value as u32).to_le_bytes()),
            8 => data.extend(&value.to_le_bytes()),
            _ => {}
        },
        ByteOrderType::BigEndian => match size {
            1 => data.push(value as u8),
            2 => data.extend(&(value as u16).to_be_bytes()),
            4 => data.extend(&(value as u32).to_be_bytes()),
            8 => data.extend(&value.to_be_bytes()),
            _ => {}
        },
    }
}
