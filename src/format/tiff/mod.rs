//! Tag-based TIFF reader.
//!
//! Parses TIFF and BigTIFF structure directly from the IFD tags and extracts
//! raw sample arrays, without going through a general-purpose image decoder.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. All multi-byte values respect this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets, BigTIFF
//!   64-bit offsets. The parser handles both transparently.
//!
//! - **IFD (Image File Directory)**: One per page, holding the tags that
//!   describe the page and point at its pixel chunks.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD
//!   entry, larger values at an offset pointed to by the entry.
//!
//! The structural parser is always available. Pixel decoding needs the
//! `tag-reader` feature.

#[cfg(feature = "tag-reader")]
mod compression;
mod file;
mod parser;
#[cfg(feature = "tag-reader")]
mod raster;
mod tags;
mod values;

#[cfg(feature = "tag-reader")]
pub use compression::{decompress, unpack_bits};
pub use file::TiffFile;
pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
#[cfg(feature = "tag-reader")]
pub use raster::{ChunkLayout, PageLayout, RasterReader, SampleArray, MAX_DECODED_BYTES};
pub use tags::{Compression, FieldType, Predictor, SampleFormat, TiffTag};
pub use values::ValueReader;
