//! Numeric codes the tag reader recognises: field types, the tags that
//! describe a page's raster layout, and compression, sample format and
//! predictor values. Classic TIFF and BigTIFF share them.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// Encoding of an IFD entry's values.
///
/// The element size decides whether a value is stored inline in the
/// IFD entry or at an offset in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    /// Numerator and denominator, both LONG
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
    // BigTIFF only
    Long8 = 16,
    SLong8 = 17,
    Ifd8 = 18,
}

impl FieldType {
    /// Bytes per element.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// `None` for type codes outside the TIFF 6 and BigTIFF sets.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }

    /// Whether `count` elements fit in the entry's value field.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let threshold = if is_bigtiff { 8 } else { 4 };
        (self.size_in_bytes() as u64).saturating_mul(count) <= threshold
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs needed to lay out the pixels of a page.
///
/// Tags not listed here are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Basic Image Structure
    // -------------------------------------------------------------------------
    /// Bit flags describing the page (reduced resolution, mask, ...)
    NewSubfileType = 254,

    /// Columns
    ImageWidth = 256,

    /// Rows
    ImageLength = 257,

    /// Bits per sample, one value per sample or a single shared value
    BitsPerSample = 258,

    /// See [`Compression`]
    Compression = 259,

    /// Photometric interpretation. Read for diagnostics only.
    PhotometricInterpretation = 262,

    /// Samples per pixel, including extra samples
    SamplesPerPixel = 277,

    /// How components are organized (1 = chunky, 2 = planar)
    PlanarConfiguration = 284,

    /// Differencing applied before compression
    Predictor = 317,

    /// Meaning of extra (alpha) samples
    ExtraSamples = 338,

    /// Sample number format (1 = uint, 2 = int, 3 = IEEE float)
    SampleFormat = 339,

    // -------------------------------------------------------------------------
    // Strip Organization
    // -------------------------------------------------------------------------
    /// File offset of every strip
    StripOffsets = 273,

    /// Row count per strip
    RowsPerStrip = 278,

    /// Compressed length of every strip
    StripByteCounts = 279,

    // -------------------------------------------------------------------------
    // Tile Organization
    // -------------------------------------------------------------------------
    /// Tile columns, a multiple of 16
    TileWidth = 322,

    /// Tile rows, a multiple of 16
    TileLength = 323,

    /// File offset of every tile, row-major
    TileOffsets = 324,

    /// Compressed length of every tile
    TileByteCounts = 325,

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------
    /// Horizontal resolution (RATIONAL)
    XResolution = 282,

    /// Vertical resolution (RATIONAL)
    YResolution = 283,

    /// 1 = no unit, 2 = inch, 3 = centimetre
    ResolutionUnit = 296,
}

impl TiffTag {
    /// `None` for tags the reader ignores.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            254 => Some(TiffTag::NewSubfileType),
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            258 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            262 => Some(TiffTag::PhotometricInterpretation),
            273 => Some(TiffTag::StripOffsets),
            277 => Some(TiffTag::SamplesPerPixel),
            278 => Some(TiffTag::RowsPerStrip),
            279 => Some(TiffTag::StripByteCounts),
            282 => Some(TiffTag::XResolution),
            283 => Some(TiffTag::YResolution),
            284 => Some(TiffTag::PlanarConfiguration),
            296 => Some(TiffTag::ResolutionUnit),
            317 => Some(TiffTag::Predictor),
            322 => Some(TiffTag::TileWidth),
            323 => Some(TiffTag::TileLength),
            324 => Some(TiffTag::TileOffsets),
            325 => Some(TiffTag::TileByteCounts),
            338 => Some(TiffTag::ExtraSamples),
            339 => Some(TiffTag::SampleFormat),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::NewSubfileType => "NewSubfileType",
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::BitsPerSample => "BitsPerSample",
            TiffTag::Compression => "Compression",
            TiffTag::PhotometricInterpretation => "PhotometricInterpretation",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::PlanarConfiguration => "PlanarConfiguration",
            TiffTag::Predictor => "Predictor",
            TiffTag::ExtraSamples => "ExtraSamples",
            TiffTag::SampleFormat => "SampleFormat",
            TiffTag::StripOffsets => "StripOffsets",
            TiffTag::RowsPerStrip => "RowsPerStrip",
            TiffTag::StripByteCounts => "StripByteCounts",
            TiffTag::TileWidth => "TileWidth",
            TiffTag::TileLength => "TileLength",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::TileByteCounts => "TileByteCounts",
            TiffTag::XResolution => "XResolution",
            TiffTag::YResolution => "YResolution",
            TiffTag::ResolutionUnit => "ResolutionUnit",
        }
    }
}

// =============================================================================
// Compression Values
// =============================================================================

/// Values of the Compression tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    None = 1,

    /// CCITT modified Huffman (bilevel fax)
    CcittRle = 2,

    Lzw = 5,

    /// "Old-style" JPEG
    OldJpeg = 6,

    Jpeg = 7,

    /// Deflate/zlib compression
    Deflate = 8,

    /// PackBits run-length compression
    PackBits = 32773,

    /// Adobe Deflate (same stream format as Deflate)
    AdobeDeflate = 32946,

    Jpeg2000 = 33003,

    Zstd = 50000,
}

impl Compression {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            2 => Some(Compression::CcittRle),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32773 => Some(Compression::PackBits),
            32946 => Some(Compression::AdobeDeflate),
            33003 => Some(Compression::Jpeg2000),
            50000 => Some(Compression::Zstd),
            _ => None,
        }
    }

    /// Check if the tag reader can decompress this scheme.
    #[inline]
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Compression::None
                | Compression::Lzw
                | Compression::Deflate
                | Compression::AdobeDeflate
                | Compression::PackBits
        )
    }

    /// Label used in unsupported-compression errors.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "uncompressed",
            Compression::CcittRle => "CCITT RLE",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "JPEG (6.0 style)",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::PackBits => "PackBits",
            Compression::AdobeDeflate => "Deflate (Adobe)",
            Compression::Jpeg2000 => "JPEG2000",
            Compression::Zstd => "Zstandard",
        }
    }
}

// =============================================================================
// Sample Format
// =============================================================================

/// How the bits of one sample are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Unsigned integer (the TIFF default)
    Unsigned,
    /// Two's complement signed integer
    Signed,
    /// IEEE floating point
    Float,
}

impl SampleFormat {
    /// Create a SampleFormat from its numeric value.
    ///
    /// Value 4 ("undefined") is read as unsigned, like most readers do.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 | 4 => Some(SampleFormat::Unsigned),
            2 => Some(SampleFormat::Signed),
            3 => Some(SampleFormat::Float),
            _ => None,
        }
    }
}

// =============================================================================
// Predictor
// =============================================================================

/// Differencing scheme applied to samples before compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predictor {
    /// No prediction
    None,
    /// Horizontal differencing of integer samples
    Horizontal,
    /// Floating point byte-plane differencing
    FloatingPoint,
}

impl Predictor {
    /// Create a Predictor from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Predictor::None),
            2 => Some(Predictor::Horizontal),
            3 => Some(Predictor::FloatingPoint),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
