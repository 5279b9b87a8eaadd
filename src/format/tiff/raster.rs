//! Pixel extraction for the tag reader.
//!
//! Reads the raw samples of a TIFF directly from its tags, without any
//! interpretation of photometric meaning. This is what lets the fallback path
//! open files general-purpose decoders refuse: missing or exotic
//! PhotometricInterpretation, BigTIFF, signed or floating point samples.
//!
//! # Array shapes
//!
//! | Page layout              | Shape       |
//! |--------------------------|-------------|
//! | one sample per pixel     | `(H, W)`    |
//! | chunky, S samples        | `(H, W, S)` |
//! | planar, S samples        | `(S, H, W)` |
//! | N pages of equal layout  | `(N, ...)`  |

use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::error::TiffError;

use super::compression::decompress;
use super::file::TiffFile;
use super::parser::{slice_at, ByteOrder, Ifd};
use super::tags::{Compression, Predictor, SampleFormat, TiffTag};
use super::values::ValueReader;

/// Upper bound on the decoded size of all stacked pages.
pub const MAX_DECODED_BYTES: usize = 1 << 30;

// =============================================================================
// Page Layout
// =============================================================================

/// How the pixel data of a page is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    /// Horizontal bands of `rows_per_strip` rows
    Strips { rows_per_strip: u32 },
    /// Rectangular tiles, padded at the right and bottom edges
    Tiles { tile_width: u32, tile_length: u32 },
}

/// Everything needed to decode one page, read from its IFD.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
    /// PlanarConfiguration = 2
    pub planar: bool,
    pub compression: Compression,
    pub predictor: Predictor,
    pub chunks: ChunkLayout,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

impl PageLayout {
    /// Read and validate the layout of the page described by `ifd`.
    pub fn from_ifd(ifd: &Ifd, values: &ValueReader<'_>) -> Result<Self, TiffError> {
        let required = |tag: TiffTag| -> Result<u64, TiffError> {
            let entry = ifd
                .get_entry_by_tag(tag)
                .ok_or(TiffError::MissingTag(tag.name()))?;
            values.read_u64(entry)
        };
        let optional = |tag: TiffTag, default: u64| -> Result<u64, TiffError> {
            match ifd.get_entry_by_tag(tag) {
                Some(entry) => values.read_u64(entry),
                None => Ok(default),
            }
        };
        let uniform = |tag: TiffTag, default: u64| -> Result<u64, TiffError> {
            let Some(entry) = ifd.get_entry_by_tag(tag) else {
                return Ok(default);
            };
            let all = values.read_u64_array(entry)?;
            let first = all.first().copied().unwrap_or(default);
            if all.iter().any(|&v| v != first) {
                return Err(TiffError::UnsupportedSampleLayout(format!(
                    "mixed {} values {:?}",
                    tag.name(),
                    all
                )));
            }
            Ok(first)
        };

        let width = to_u32(required(TiffTag::ImageWidth)?, TiffTag::ImageWidth)?;
        let height = to_u32(required(TiffTag::ImageLength)?, TiffTag::ImageLength)?;
        if width == 0 || height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "ImageWidth",
                message: format!("empty image {}x{}", width, height),
            });
        }

        let samples_per_pixel = optional(TiffTag::SamplesPerPixel, 1)?;
        if samples_per_pixel == 0 || samples_per_pixel > u16::MAX as u64 {
            return Err(TiffError::InvalidTagValue {
                tag: "SamplesPerPixel",
                message: samples_per_pixel.to_string(),
            });
        }

        let bits_per_sample = uniform(TiffTag::BitsPerSample, 1)?;
        let format_code = uniform(TiffTag::SampleFormat, 1)?;
        let sample_format = SampleFormat::from_u16(format_code as u16).ok_or_else(|| {
            TiffError::UnsupportedSampleLayout(format!("sample format {}", format_code))
        })?;
        match (sample_format, bits_per_sample) {
            (SampleFormat::Float, 32 | 64) => {}
            (SampleFormat::Unsigned | SampleFormat::Signed, 8 | 16 | 32 | 64) => {}
            (format, bits) => {
                return Err(TiffError::UnsupportedSampleLayout(format!(
                    "{} bit {:?} samples",
                    bits, format
                )))
            }
        }

        let planar = match optional(TiffTag::PlanarConfiguration, 1)? {
            1 => false,
            2 => true,
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag: "PlanarConfiguration",
                    message: other.to_string(),
                })
            }
        };

        let compression_code = optional(TiffTag::Compression, 1)?;
        let compression = Compression::from_u16(compression_code as u16).ok_or_else(|| {
            TiffError::UnsupportedCompression(format!("code {}", compression_code))
        })?;
        if !compression.is_supported() {
            return Err(TiffError::UnsupportedCompression(
                compression.name().to_string(),
            ));
        }

        let predictor_code = optional(TiffTag::Predictor, 1)?;
        let predictor = match Predictor::from_u16(predictor_code as u16) {
            Some(p @ (Predictor::None | Predictor::Horizontal)) => p,
            _ => {
                return Err(TiffError::UnsupportedSampleLayout(format!(
                    "predictor {}",
                    predictor_code
                )))
            }
        };

        let (chunks, offsets, byte_counts) = if ifd.is_tiled() {
            let tile_width = to_u32(required(TiffTag::TileWidth)?, TiffTag::TileWidth)?;
            let tile_length = to_u32(required(TiffTag::TileLength)?, TiffTag::TileLength)?;
            if tile_width == 0 || tile_length == 0 {
                return Err(TiffError::InvalidTagValue {
                    tag: "TileWidth",
                    message: format!("empty tile {}x{}", tile_width, tile_length),
                });
            }
            let offsets = read_array(ifd, values, TiffTag::TileOffsets)?;
            let byte_counts = read_array(ifd, values, TiffTag::TileByteCounts)?;
            (
                ChunkLayout::Tiles {
                    tile_width,
                    tile_length,
                },
                offsets,
                byte_counts,
            )
        } else {
            let rows_per_strip = optional(TiffTag::RowsPerStrip, u32::MAX as u64)?
                .clamp(1, height as u64) as u32;
            let offsets = read_array(ifd, values, TiffTag::StripOffsets)?;
            let byte_counts = match ifd.get_entry_by_tag(TiffTag::StripByteCounts) {
                Some(entry) => values.read_u64_array(entry)?,
                None => Vec::new(),
            };
            (ChunkLayout::Strips { rows_per_strip }, offsets, byte_counts)
        };

        let layout = Self {
            width,
            height,
            samples_per_pixel: samples_per_pixel as u16,
            bits_per_sample: bits_per_sample as u16,
            sample_format,
            planar,
            compression,
            predictor,
            chunks,
            offsets,
            byte_counts,
        };

        if !layout
            .chunk_bytes()
            .is_some_and(|bytes| bytes <= MAX_DECODED_BYTES)
        {
            return Err(TiffError::UnsupportedSampleLayout(format!(
                "{:?} of {}-bit samples exceed the {} byte decode limit",
                layout.chunks, layout.bits_per_sample, MAX_DECODED_BYTES
            )));
        }

        let expected = layout.chunk_count();
        if layout.offsets.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: if ifd.is_tiled() { "TileOffsets" } else { "StripOffsets" },
                message: format!("{} chunks listed, {} needed", layout.offsets.len(), expected),
            });
        }
        if layout.byte_counts.is_empty() && layout.compression != Compression::None {
            return Err(TiffError::MissingTag("StripByteCounts"));
        }

        Ok(layout)
    }

    /// Bytes per sample.
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Whether samples are plain bytes that need no conversion.
    pub fn is_u8(&self) -> bool {
        self.bits_per_sample == 8 && self.sample_format == SampleFormat::Unsigned
    }

    /// Array shape of this page.
    pub fn shape(&self) -> Vec<usize> {
        let (h, w, s) = (
            self.height as usize,
            self.width as usize,
            self.samples_per_pixel as usize,
        );
        match (s, self.planar) {
            (1, _) => vec![h, w],
            (_, false) => vec![h, w, s],
            (_, true) => vec![s, h, w],
        }
    }

    /// Number of samples in the page.
    pub fn sample_count(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.samples_per_pixel as usize)
    }

    /// Whether two pages can be stacked into one array.
    pub fn stacks_with(&self, other: &PageLayout) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.samples_per_pixel == other.samples_per_pixel
            && self.bits_per_sample == other.bits_per_sample
            && self.sample_format == other.sample_format
            && self.planar == other.planar
    }

    fn planes(&self) -> usize {
        if self.planar {
            self.samples_per_pixel as usize
        } else {
            1
        }
    }

    /// Samples per pixel inside one chunk.
    fn chunk_samples(&self) -> usize {
        if self.planar {
            1
        } else {
            self.samples_per_pixel as usize
        }
    }

    /// Decoded size of one strip or tile, `None` on overflow.
    fn chunk_bytes(&self) -> Option<usize> {
        let (cols, rows) = match self.chunks {
            ChunkLayout::Strips { rows_per_strip } => (self.width, rows_per_strip),
            ChunkLayout::Tiles {
                tile_width,
                tile_length,
            } => (tile_width, tile_length),
        };
        (cols as usize)
            .checked_mul(rows as usize)?
            .checked_mul(self.chunk_samples())?
            .checked_mul(self.bytes_per_sample())
    }

    fn chunk_count(&self) -> usize {
        let per_plane = match self.chunks {
            ChunkLayout::Strips { rows_per_strip } => self.height.div_ceil(rows_per_strip) as usize,
            ChunkLayout::Tiles {
                tile_width,
                tile_length,
            } => {
                let across = self.width.div_ceil(tile_width) as usize;
                across * self.height.div_ceil(tile_length) as usize
            }
        };
        per_plane * self.planes()
    }

    /// Decode the page into raw sample bytes in file byte order.
    ///
    /// Samples are laid out as described by [`PageLayout::shape`].
    pub fn read_page(&self, data: &[u8], order: ByteOrder) -> Result<Vec<u8>, TiffError> {
        let bps = self.bytes_per_sample();
        let pixel_bytes = self.chunk_samples() * bps;
        let (w, h) = (self.width as usize, self.height as usize);
        let plane_bytes = w * h * pixel_bytes;
        let mut page = vec![0u8; plane_bytes * self.planes()];

        match self.chunks {
            ChunkLayout::Strips { rows_per_strip } => {
                let rps = rows_per_strip as usize;
                let strips_per_plane = h.div_ceil(rps);
                let row_bytes = w * pixel_bytes;

                for plane in 0..self.planes() {
                    for strip in 0..strips_per_plane {
                        let first_row = strip * rps;
                        let rows = rps.min(h - first_row);
                        let expected = rows * row_bytes;
                        let index = plane * strips_per_plane + strip;
                        let decoded = self.read_chunk(data, order, index, expected, w)?;

                        let dst = plane * plane_bytes + first_row * row_bytes;
                        page[dst..dst + expected].copy_from_slice(&decoded[..expected]);
                    }
                }
            }
            ChunkLayout::Tiles {
                tile_width,
                tile_length,
            } => {
                let (tw, tl) = (tile_width as usize, tile_length as usize);
                let across = w.div_ceil(tw);
                let down = h.div_ceil(tl);
                let tile_row_bytes = tw * pixel_bytes;
                let expected = tl * tile_row_bytes;

                for plane in 0..self.planes() {
                    for ty in 0..down {
                        for tx in 0..across {
                            let index = plane * across * down + ty * across + tx;
                            let decoded = self.read_chunk(data, order, index, expected, tw)?;

                            let cols = tw.min(w - tx * tw);
                            let copy_len = cols * pixel_bytes;
                            for r in 0..tl.min(h - ty * tl) {
                                let y = ty * tl + r;
                                let src = r * tile_row_bytes;
                                let dst = plane * plane_bytes + (y * w + tx * tw) * pixel_bytes;
                                page[dst..dst + copy_len]
                                    .copy_from_slice(&decoded[src..src + copy_len]);
                            }
                        }
                    }
                }
            }
        }

        Ok(page)
    }

    /// Fetch, decompress and un-predict one chunk, padded to `expected` bytes.
    fn read_chunk(
        &self,
        data: &[u8],
        order: ByteOrder,
        index: usize,
        expected: usize,
        row_pixels: usize,
    ) -> Result<Vec<u8>, TiffError> {
        let offset = self.offsets[index];
        let byte_count = match self.byte_counts.get(index) {
            Some(&count) => count,
            // Only reachable for uncompressed strips without StripByteCounts
            None => expected as u64,
        };

        // Sparse chunks are written with a zero byte count
        if byte_count == 0 {
            return Ok(vec![0u8; expected]);
        }

        // Uncompressed writers sometimes claim more bytes than the file holds
        let available = (data.len() as u64).saturating_sub(offset);
        let byte_count = if self.compression == Compression::None {
            byte_count.min(available).min(expected as u64)
        } else {
            byte_count
        };

        let raw = slice_at(data, offset, byte_count)?;
        let mut decoded = decompress(self.compression, raw, expected)?;
        if decoded.len() < expected {
            debug!(
                index,
                got = decoded.len(),
                expected,
                "Short chunk, padding with zeros"
            );
        }
        decoded.resize(expected, 0);

        if self.predictor == Predictor::Horizontal {
            undo_horizontal_differencing(
                &mut decoded,
                row_pixels * self.chunk_samples(),
                self.chunk_samples(),
                self.bytes_per_sample(),
                order,
            );
        }

        Ok(decoded)
    }
}

fn to_u32(value: u64, tag: TiffTag) -> Result<u32, TiffError> {
    u32::try_from(value).map_err(|_| TiffError::InvalidTagValue {
        tag: tag.name(),
        message: format!("{} does not fit in 32 bits", value),
    })
}

fn read_array(ifd: &Ifd, values: &ValueReader<'_>, tag: TiffTag) -> Result<Vec<u64>, TiffError> {
    let entry = ifd
        .get_entry_by_tag(tag)
        .ok_or(TiffError::MissingTag(tag.name()))?;
    values.read_u64_array(entry)
}

// =============================================================================
// Sample Decoding
// =============================================================================

fn read_uint(bytes: &[u8], size: usize, order: ByteOrder) -> u64 {
    match size {
        1 => bytes[0] as u64,
        2 => order.read_u16(bytes) as u64,
        4 => order.read_u32(bytes) as u64,
        _ => order.read_u64(bytes),
    }
}

fn write_uint(bytes: &mut [u8], size: usize, order: ByteOrder, value: u64) {
    let full = match order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    };
    let part = match order {
        ByteOrder::LittleEndian => &full[..size],
        ByteOrder::BigEndian => &full[8 - size..],
    };
    bytes[..size].copy_from_slice(part);
}

/// Reverse predictor 2: each sample was stored as the difference to the
/// sample `stride` positions to its left in the same row.
fn undo_horizontal_differencing(
    buf: &mut [u8],
    row_samples: usize,
    stride: usize,
    sample_size: usize,
    order: ByteOrder,
) {
    let mask = if sample_size >= 8 {
        u64::MAX
    } else {
        (1u64 << (sample_size * 8)) - 1
    };

    for row in buf.chunks_exact_mut(row_samples * sample_size) {
        for i in stride..row_samples {
            let prev = read_uint(&row[(i - stride) * sample_size..], sample_size, order);
            let at = i * sample_size;
            let cur = read_uint(&row[at..], sample_size, order);
            write_uint(&mut row[at..], sample_size, order, cur.wrapping_add(prev) & mask);
        }
    }
}

/// Convert raw sample bytes to floating point values.
fn samples_to_f64(raw: &[u8], layout: &PageLayout, order: ByteOrder) -> Vec<f64> {
    let size = layout.bytes_per_sample();
    let chunks = raw.chunks_exact(size);
    match (layout.sample_format, size) {
        (SampleFormat::Float, 4) => chunks
            .map(|c| f32::from_bits(order.read_u32(c)) as f64)
            .collect(),
        (SampleFormat::Float, _) => chunks.map(|c| f64::from_bits(order.read_u64(c))).collect(),
        (SampleFormat::Signed, _) => chunks
            .map(|c| {
                let value = read_uint(c, size, order);
                let shift = 64 - size * 8;
                (((value << shift) as i64) >> shift) as f64
            })
            .collect(),
        (SampleFormat::Unsigned, _) => chunks.map(|c| read_uint(c, size, order) as f64).collect(),
    }
}

// =============================================================================
// Sample Array
// =============================================================================

/// Samples of the decoded pages.
///
/// 8-bit unsigned data is kept as bytes; every other sample type is widened
/// to `f64` so it can be rescaled.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleArray {
    U8(ArrayD<u8>),
    Wide(ArrayD<f64>),
}

impl SampleArray {
    /// Shape of the array.
    pub fn shape(&self) -> &[usize] {
        match self {
            SampleArray::U8(array) => array.shape(),
            SampleArray::Wide(array) => array.shape(),
        }
    }
}

// =============================================================================
// RasterReader
// =============================================================================

/// Reads the full sample array of a TIFF file.
#[derive(Debug, Clone)]
pub struct RasterReader<'a> {
    file: TiffFile<'a>,
}

impl<'a> RasterReader<'a> {
    /// Parse the file structure.
    pub fn new(data: &'a [u8]) -> Result<Self, TiffError> {
        Ok(Self {
            file: TiffFile::parse(data)?,
        })
    }

    /// Number of IFDs in the file.
    pub fn page_count(&self) -> usize {
        self.file.ifds().len()
    }

    /// Layouts of the pages that make up the array: the first page and
    /// every directly following page with the same shape and sample type.
    pub fn series(&self) -> Result<Vec<PageLayout>, TiffError> {
        let values = self.file.values();
        let mut ifds = self.file.ifds().iter();
        let first = ifds
            .next()
            .ok_or(TiffError::InvalidIfdOffset(self.file.header().first_ifd_offset))?;

        let mut pages = vec![PageLayout::from_ifd(first, &values)?];
        for ifd in ifds {
            match PageLayout::from_ifd(ifd, &values) {
                Ok(layout) if layout.stacks_with(&pages[0]) => pages.push(layout),
                _ => break,
            }
        }
        Ok(pages)
    }

    /// Decode every page of the series and stack them.
    pub fn read_samples(&self) -> Result<SampleArray, TiffError> {
        let pages = self.series()?;
        let first = &pages[0];

        let page_samples = first.sample_count().ok_or(TiffError::InvalidTagValue {
            tag: "ImageWidth",
            message: "image too large".to_string(),
        })?;
        let element_size = if first.is_u8() { 1 } else { 8 };
        let total_samples = page_samples.checked_mul(pages.len());
        let within_limit = total_samples
            .and_then(|n| n.checked_mul(element_size.max(first.bytes_per_sample())))
            .is_some_and(|bytes| bytes <= MAX_DECODED_BYTES);
        if !within_limit {
            return Err(TiffError::UnsupportedSampleLayout(format!(
                "{} page(s) of {}x{}x{} exceed the {} byte decode limit",
                pages.len(),
                first.width,
                first.height,
                first.samples_per_pixel,
                MAX_DECODED_BYTES
            )));
        }

        let order = self.file.header().byte_order;
        let data = self.file.data();
        let mut raw = Vec::with_capacity(page_samples * pages.len() * first.bytes_per_sample());
        for page in &pages {
            raw.extend_from_slice(&page.read_page(data, order)?);
        }

        let mut shape = first.shape();
        if pages.len() > 1 {
            shape.insert(0, pages.len());
        }
        let shape_error = |e: ndarray::ShapeError| TiffError::InvalidTagValue {
            tag: "ImageWidth",
            message: e.to_string(),
        };

        debug!(
            shape = ?shape,
            bits = first.bits_per_sample,
            format = ?first.sample_format,
            compression = first.compression.name(),
            "Tag reader decoded samples"
        );

        if first.is_u8() {
            ArrayD::from_shape_vec(IxDyn(&shape), raw)
                .map(SampleArray::U8)
                .map_err(shape_error)
        } else {
            let samples = samples_to_f64(&raw, first, order);
            ArrayD::from_shape_vec(IxDyn(&shape), samples)
                .map(SampleArray::Wide)
                .map_err(shape_error)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
