use thiserror::Error;

/// Failures of the tag-based TIFF reader.
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// First two bytes are neither "II" nor "MM"
    #[error("not a TIFF: byte order mark 0x{0:04X}")]
    InvalidMagic(u16),

    #[error("not a TIFF: version {0} is neither 42 nor 43")]
    InvalidVersion(u16),

    #[error("BigTIFF header declares {0}-byte offsets")]
    InvalidBigTiffOffsetSize(u16),

    /// Fewer bytes than the header needs
    #[error("truncated header: {actual} of {required} bytes")]
    FileTooSmall { required: u64, actual: u64 },

    /// IFD offset points past the end of the file
    #[error("IFD offset {0} is outside the file")]
    InvalidIfdOffset(u64),

    /// A value or pixel chunk lies (partly) outside the file
    #[error("{requested} bytes at offset {offset} run past the end of a {size}-byte file")]
    OutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    #[error("page has no {0} tag")]
    MissingTag(&'static str),

    /// Tag present with an unusable type, count or value
    #[error("bad {tag} value: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Sample encoding the reader cannot turn into numbers
    #[error("unsupported sample layout: {0}")]
    UnsupportedSampleLayout(String),

    /// A compressed chunk could not be inflated
    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("unknown IFD field type {0}")]
    UnknownFieldType(u16),
}

impl TiffError {
    /// Whether the input failed before any TIFF structure was recognised.
    ///
    /// Used to tell "not a TIFF at all" apart from "a TIFF we failed to decode".
    pub fn is_not_tiff(&self) -> bool {
        matches!(
            self,
            TiffError::InvalidMagic(_)
                | TiffError::InvalidVersion(_)
                | TiffError::FileTooSmall { .. }
        )
    }
}

/// Errors raised while turning an upload into an export file.
///
/// The `Display` output is the full diagnostic used in logs; [`ExportError::details`]
/// is the short code handed back to the caller.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Requested export format is not one of png, jpeg, tiff or pdf
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Multipart request without a usable `image` file part
    #[error("missing_file")]
    MissingFile,

    /// Multipart body could not be read
    #[error("bad_multipart:{0}")]
    Multipart(String),

    /// JSON body could not be read or parsed
    #[error("bad_json:{0}")]
    BadJson(String),

    /// `canvasDataUrl` absent, not a string, or without a comma
    #[error("missing_or_invalid_canvasDataUrl")]
    MissingDataUrl,

    /// Data URL payload is not valid base64
    #[error("base64_decode:{0}")]
    Base64(String),

    /// No decoder recognises the image bytes
    #[error("unidentified_image")]
    UnidentifiedImage,

    /// A decoder recognised the bytes but failed to open them
    #[error("image_open:{0}")]
    ImageOpen(String),

    /// The target encoder failed
    #[error("save_failed: {0}")]
    SaveFailed(String),

    /// The worker running the export did not complete
    #[error("export_unhandled: {0}")]
    Unhandled(String),
}

impl ExportError {
    /// Whether this error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExportError::SaveFailed(_) | ExportError::Unhandled(_))
    }

    /// Short, stable code returned to the caller in the `details` field.
    ///
    /// Server-side failures only expose their code; the underlying message
    /// stays in the logs.
    pub fn details(&self) -> String {
        match self {
            ExportError::SaveFailed(_) => "save_failed".to_string(),
            ExportError::Unhandled(_) => "export_unhandled".to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors raised by the TIFF to PNG fallback conversion.
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// Request without a usable `image` file part
    #[error("missing_file")]
    MissingFile,

    /// Neither the primary decoder nor the tag reader recognise the bytes
    #[error("unidentified_image")]
    UnidentifiedImage,

    /// The tag reader is not compiled into this build
    #[error("server_missing_dependency")]
    MissingDependency,

    /// Both decode tiers were exhausted, or PNG encoding failed
    #[error("tiff_decode_failed: {0}")]
    DecodeFailed(String),

    /// The worker running the conversion did not complete
    #[error("unhandled: {0}")]
    Unhandled(String),
}

impl ConversionError {
    /// Short error code returned to the caller in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ConversionError::MissingFile => "missing_file",
            ConversionError::UnidentifiedImage => "unidentified_image",
            ConversionError::MissingDependency | ConversionError::DecodeFailed(_) => {
                "tiff_decode_failed"
            }
            ConversionError::Unhandled(_) => "unhandled",
        }
    }
}

/// Errors raised while loading the journal rules document.
#[derive(Debug, Clone, Error)]
pub enum RulesError {
    /// The rules file could not be read
    #[error("Failed to read journal rules from {path}: {message}")]
    Read { path: String, message: String },

    /// The rules file is not valid JSON
    #[error("Journal rules are not valid JSON: {0}")]
    Parse(String),

    /// The document parsed but is neither an object nor an array
    #[error("Journal rules must be a JSON object or array, got {0}")]
    UnexpectedShape(&'static str),
}
