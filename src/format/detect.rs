//! Container sniffing for uploaded bytes.
//!
//! Only the first bytes are examined. Full validation happens when the
//! header is parsed.

use super::tiff::ByteOrder;

/// TIFF container variant recognised from the magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Classic TIFF (version 42, 32-bit offsets)
    Tiff(ByteOrder),

    /// BigTIFF (version 43, 64-bit offsets)
    BigTiff(ByteOrder),

    /// Anything else
    Other,
}

impl ContainerKind {
    /// Get a human-readable name for the container.
    pub const fn name(&self) -> &'static str {
        match self {
            ContainerKind::Tiff(_) => "TIFF",
            ContainerKind::BigTiff(_) => "BigTIFF",
            ContainerKind::Other => "not a TIFF",
        }
    }

    /// Whether the bytes start like a TIFF of either variant.
    pub const fn is_tiff(&self) -> bool {
        !matches!(self, ContainerKind::Other)
    }
}

/// Classify bytes by their TIFF magic.
pub fn detect_container(bytes: &[u8]) -> ContainerKind {
    if bytes.len() < 4 {
        return ContainerKind::Other;
    }

    let order = match &bytes[0..2] {
        b"II" => ByteOrder::LittleEndian,
        b"MM" => ByteOrder::BigEndian,
        _ => return ContainerKind::Other,
    };

    match order.read_u16(&bytes[2..4]) {
        42 => ContainerKind::Tiff(order),
        43 => ContainerKind::BigTiff(order),
        _ => ContainerKind::Other,
    }
}
