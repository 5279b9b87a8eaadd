//! TIFF tag value reading.
//!
//! Values are stored either inline in the IFD entry (small values) or at an
//! offset in the file (arrays such as StripOffsets). [`ValueReader`] hides the
//! difference and widens integer types so callers only deal with `u64`.

use crate::error::TiffError;

use super::parser::{slice_at, ByteOrder, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from an in-memory TIFF file.
#[derive(Debug, Clone, Copy)]
pub struct ValueReader<'a> {
    data: &'a [u8],
    header: &'a TiffHeader,
}

impl<'a> ValueReader<'a> {
    /// Create a new ValueReader over the complete file contents.
    pub fn new(data: &'a [u8], header: &'a TiffHeader) -> Self {
        Self { data, header }
    }

    /// Get the byte order from the header.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes of an entry's value, inline or from the file.
    pub fn read_bytes<'b>(&'b self, entry: &'b IfdEntry) -> Result<&'b [u8], TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            Ok(&entry.value_offset_bytes[..size as usize])
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            slice_at(self.data, offset, size)
        }
    }

    /// Read a single unsigned integer value.
    ///
    /// Accepts Byte, Short, Long and Long8 field types.
    pub fn read_u64(&self, entry: &IfdEntry) -> Result<u64, TiffError> {
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }

        if entry.count != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected count 1, got {}", entry.count),
            });
        }

        let mut values = self.read_u64_array(entry)?;
        values.pop().ok_or(TiffError::InvalidTagValue {
            tag: tag_name(entry),
            message: "empty value".to_string(),
        })
    }

    /// Read an array of unsigned integers, widened to u64.
    ///
    /// Used for strip/tile offsets and byte counts as well as per-sample tags
    /// like BitsPerSample.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry)?;
        let order = self.header.byte_order;

        let values = match field_type {
            FieldType::Byte => bytes.iter().map(|&b| b as u64).collect(),
            FieldType::Short => bytes
                .chunks_exact(2)
                .map(|c| order.read_u16(c) as u64)
                .collect(),
            FieldType::Long | FieldType::Ifd => bytes
                .chunks_exact(4)
                .map(|c| order.read_u32(c) as u64)
                .collect(),
            FieldType::Long8 | FieldType::Ifd8 => {
                bytes.chunks_exact(8).map(|c| order.read_u64(c)).collect()
            }
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag: tag_name(entry),
                    message: format!("expected an unsigned integer type, got {:?}", other),
                })
            }
        };

        Ok(values)
    }

    /// Read a single Rational as a float.
    pub fn read_rational(&self, entry: &IfdEntry) -> Result<f64, TiffError> {
        if entry.field_type != Some(FieldType::Rational) || entry.count < 1 {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!(
                    "expected Rational, got type {} x{}",
                    entry.field_type_raw, entry.count
                ),
            });
        }

        let bytes = self.read_bytes(entry)?;
        let order = self.header.byte_order;
        let numerator = order.read_u32(&bytes[0..4]);
        let denominator = order.read_u32(&bytes[4..8]);
        if denominator == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: "zero denominator".to_string(),
            });
        }
        Ok(numerator as f64 / denominator as f64)
    }
}

fn tag_name(entry: &IfdEntry) -> &'static str {
    entry.tag().map(TiffTag::name).unwrap_or("unknown")
}

// =============================================================================
// Tests
// =============================================================================
