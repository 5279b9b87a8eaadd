//! TIFF header and IFD parsing over an in-memory file.
//!
//! ```text
//! classic  II|MM  42  ifd:u32                         (8 bytes)
//! BigTIFF  II|MM  43  8:u16  0:u16  ifd:u64           (16 bytes)
//!
//! entry    tag:u16 type:u16 count:u32 value:u32       (12 bytes)
//!          tag:u16 type:u16 count:u64 value:u64       (20 bytes, BigTIFF)
//! ```

use crate::error::TiffError;

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// "II"
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// "MM"
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

const VERSION_TIFF: u16 = 42;

const VERSION_BIGTIFF: u16 = 43;

pub const TIFF_HEADER_SIZE: usize = 8;

pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Upper bound on entries in one IFD. Real files carry a few dozen.
const MAX_IFD_ENTRIES: u64 = 4096;

// =============================================================================
// ByteOrder
// =============================================================================

/// Endianness declared by the first two header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the first 2 bytes of a slice.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Read a u32 from the first 4 bytes of a slice.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Read a u64 from the first 8 bytes of a slice.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }
}

/// Borrow `len` bytes at `offset`, failing if the range leaves the buffer.
pub(crate) fn slice_at(data: &[u8], offset: u64, len: u64) -> Result<&[u8], TiffError> {
    let out_of_bounds = || TiffError::OutOfBounds {
        offset,
        requested: len,
        size: data.len() as u64,
    };
    let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
    if end > data.len() as u64 {
        return Err(out_of_bounds());
    }
    Ok(&data[offset as usize..end as usize])
}

// =============================================================================
// TiffHeader
// =============================================================================

/// The fixed-size header at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,

    /// 64-bit counts and offsets
    pub is_bigtiff: bool,

    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header from the first bytes of a file of `file_size` bytes.
    ///
    /// See [`TiffError::is_not_tiff`] for the errors that mean the bytes are
    /// not a TIFF at all.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // The magic is a palindrome in both orders, read it as little-endian
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Size of an IFD entry in bytes (12 classic, 20 BigTIFF).
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD (2 classic, 8 BigTIFF).
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the next IFD offset field, and of the inline value field.
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// One tag entry of an IFD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Numeric tag ID
    pub tag_id: u16,

    /// Decoded field type, `None` if unknown
    pub field_type: Option<FieldType>,

    /// Raw field type value as stored in the file
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// Raw value/offset field, zero padded to 8 bytes
    pub value_offset_bytes: [u8; 8],

    /// Whether the value lives in `value_offset_bytes` rather than at an offset
    pub is_inline: bool,

    is_bigtiff: bool,
}

impl IfdEntry {
    /// Parse an entry from its raw bytes (12 or 20 bytes).
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Self {
        let order = header.byte_order;
        let tag_id = order.read_u16(&bytes[0..2]);
        let field_type_raw = order.read_u16(&bytes[2..4]);
        let field_type = FieldType::from_u16(field_type_raw);

        let (count, value_range) = if header.is_bigtiff {
            (order.read_u64(&bytes[4..12]), 12..20)
        } else {
            (order.read_u32(&bytes[4..8]) as u64, 8..12)
        };

        let mut value_offset_bytes = [0u8; 8];
        let value = &bytes[value_range];
        value_offset_bytes[..value.len()].copy_from_slice(value);

        let is_inline = field_type
            .map(|ft| ft.fits_inline(count, header.is_bigtiff))
            .unwrap_or(false);

        Self {
            tag_id,
            field_type,
            field_type_raw,
            count,
            value_offset_bytes,
            is_inline,
            is_bigtiff: header.is_bigtiff,
        }
    }

    /// The known tag for this entry, if any.
    pub fn tag(&self) -> Option<TiffTag> {
        TiffTag::from_u16(self.tag_id)
    }

    /// Total size of the value in bytes, `None` for unknown field types or overflow.
    pub fn value_byte_size(&self) -> Option<u64> {
        let field_type = self.field_type?;
        (field_type.size_in_bytes() as u64).checked_mul(self.count)
    }

    /// Interpret the value field as an offset into the file.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.is_bigtiff {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }

    /// A single inline integer value, widened to u64.
    pub fn inline_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        if !self.is_inline || self.count != 1 {
            return None;
        }
        match self.field_type? {
            FieldType::Byte => Some(self.value_offset_bytes[0] as u64),
            FieldType::Short => Some(byte_order.read_u16(&self.value_offset_bytes) as u64),
            FieldType::Long => Some(byte_order.read_u32(&self.value_offset_bytes) as u64),
            FieldType::Long8 => Some(byte_order.read_u64(&self.value_offset_bytes)),
            _ => None,
        }
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// Offset of this IFD in the file
    pub offset: u64,

    /// Entries in file order
    pub entries: Vec<IfdEntry>,

    /// Offset of the next IFD, 0 at the end of the chain
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Parse the IFD located at `offset`.
    pub fn parse(data: &[u8], offset: u64, header: &TiffHeader) -> Result<Self, TiffError> {
        let order = header.byte_order;
        let count_size = header.ifd_count_size() as u64;
        let count_bytes = slice_at(data, offset, count_size)
            .map_err(|_| TiffError::InvalidIfdOffset(offset))?;
        let entry_count = if header.is_bigtiff {
            order.read_u64(count_bytes)
        } else {
            order.read_u16(count_bytes) as u64
        };

        if entry_count > MAX_IFD_ENTRIES {
            return Err(TiffError::InvalidTagValue {
                tag: "IFD",
                message: format!("{} entries at offset {}", entry_count, offset),
            });
        }

        let entry_size = header.ifd_entry_size() as u64;
        let body_len = entry_count * entry_size + header.value_offset_size() as u64;
        let body = slice_at(data, offset + count_size, body_len)?;

        let entries = body
            .chunks_exact(entry_size as usize)
            .take(entry_count as usize)
            .map(|raw| IfdEntry::parse(raw, header))
            .collect();

        let next_raw = &body[(entry_count * entry_size) as usize..];
        let next_ifd_offset = if header.is_bigtiff {
            order.read_u64(next_raw)
        } else {
            order.read_u32(next_raw) as u64
        };

        Ok(Self {
            offset,
            entries,
            next_ifd_offset,
        })
    }

    /// Find the entry for a tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        let id = tag.as_u16();
        self.entries.iter().find(|entry| entry.tag_id == id)
    }

    /// Whether the page is organised in tiles rather than strips.
    pub fn is_tiled(&self) -> bool {
        self.get_entry_by_tag(TiffTag::TileOffsets).is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
