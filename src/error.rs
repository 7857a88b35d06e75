// src/error.rs
//
// Unified error handling for lunarz
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - Decode: the input file could not be turned into an ImageBuffer
// - Encode: the result could not be written out
// - InvalidParameter: operator parameter outside its declared domain
// - UnsupportedInput: unknown operator/method, or an image shape we can't handle
// - NoImageLoaded: session used before load()
// - Io: structural filesystem failures (output directory, scan root)
// - Internal: library bugs (should not happen)

use std::borrow::Cow;
use thiserror::Error;

/// Classification of every error the crate can produce.
///
/// Hosting layers switch on this rather than on individual variants.
/// Undo/redo past the ends of history is deliberately absent: those are
/// no-ops, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    Encode,
    InvalidParameter,
    UnsupportedInput,
    NoImageLoaded,
    Io,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Encode => "EncodeError",
            ErrorKind::InvalidParameter => "InvalidParameter",
            ErrorKind::UnsupportedInput => "UnsupportedInput",
            ErrorKind::NoImageLoaded => "NoImageLoaded",
            ErrorKind::Io => "IoError",
            ErrorKind::Internal => "InternalBug",
        }
    }

    /// Stable LUNARZ_* code string for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "LUNARZ_DECODE_ERROR",
            ErrorKind::Encode => "LUNARZ_ENCODE_ERROR",
            ErrorKind::InvalidParameter => "LUNARZ_INVALID_PARAMETER",
            ErrorKind::UnsupportedInput => "LUNARZ_UNSUPPORTED_INPUT",
            ErrorKind::NoImageLoaded => "LUNARZ_NO_IMAGE_LOADED",
            ErrorKind::Io => "LUNARZ_IO_ERROR",
            ErrorKind::Internal => "LUNARZ_INTERNAL_BUG",
        }
    }
}

/// lunarz error types
#[derive(Debug, Error)]
pub enum LunarzError {
    // Decode Errors
    #[error("File not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Unsupported output format '{extension}'. Expected png, jpg, jpeg or bmp")]
    UnsupportedOutputFormat { extension: Cow<'static, str> },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Parameter Errors
    #[error("Invalid value for {operation}.{name}: {value}. {reason}")]
    InvalidParameter {
        operation: Cow<'static, str>,
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    // Unsupported Input
    #[error("Unknown operator: '{name}'")]
    UnknownOperator { name: Cow<'static, str> },

    #[error("Unsupported edge detection method: '{name}'. Expected Canny, Sobel or Laplacian")]
    UnknownEdgeMethod { name: Cow<'static, str> },

    #[error("Unsupported channel layout: {channels} channels (expected 1 or 3)")]
    UnsupportedLayout { channels: usize },

    #[error("Invalid image buffer: {reason}")]
    InvalidBuffer { reason: Cow<'static, str> },

    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // State Errors
    #[error("No image loaded. Call load() first")]
    NoImageLoaded,

    // Structural I/O Errors
    #[error("Output directory '{path}' is unavailable: {source}")]
    OutputDirUnavailable {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan directory '{path}': {message}")]
    ScanFailed {
        path: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

fn clone_io(source: &std::io::Error) -> std::io::Error {
    std::io::Error::new(source.kind(), source.to_string())
}

impl Clone for LunarzError {
    fn clone(&self) -> Self {
        match self {
            Self::FileNotFound { path } => Self::FileNotFound { path: path.clone() },
            Self::FileReadFailed { path, source } => Self::FileReadFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::UnsupportedFormat { format } => Self::UnsupportedFormat {
                format: format.clone(),
            },
            Self::DecodeFailed { message } => Self::DecodeFailed {
                message: message.clone(),
            },
            Self::EncodeFailed { format, message } => Self::EncodeFailed {
                format: format.clone(),
                message: message.clone(),
            },
            Self::UnsupportedOutputFormat { extension } => Self::UnsupportedOutputFormat {
                extension: extension.clone(),
            },
            Self::FileWriteFailed { path, source } => Self::FileWriteFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::InvalidParameter {
                operation,
                name,
                value,
                reason,
            } => Self::InvalidParameter {
                operation: operation.clone(),
                name: name.clone(),
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::UnknownOperator { name } => Self::UnknownOperator { name: name.clone() },
            Self::UnknownEdgeMethod { name } => Self::UnknownEdgeMethod { name: name.clone() },
            Self::UnsupportedLayout { channels } => Self::UnsupportedLayout {
                channels: *channels,
            },
            Self::InvalidBuffer { reason } => Self::InvalidBuffer {
                reason: reason.clone(),
            },
            Self::DimensionExceedsLimit { dimension, max } => Self::DimensionExceedsLimit {
                dimension: *dimension,
                max: *max,
            },
            Self::PixelCountExceedsLimit { pixels, max } => Self::PixelCountExceedsLimit {
                pixels: *pixels,
                max: *max,
            },
            Self::NoImageLoaded => Self::NoImageLoaded,
            Self::OutputDirUnavailable { path, source } => Self::OutputDirUnavailable {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::ScanFailed { path, message } => Self::ScanFailed {
                path: path.clone(),
                message: message.clone(),
            },
            Self::InternalPanic { message } => Self::InternalPanic {
                message: message.clone(),
            },
        }
    }
}

// Constructor Helpers
impl LunarzError {
    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_output_format(extension: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedOutputFormat {
            extension: extension.into(),
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_parameter(
        operation: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidParameter {
            operation: operation.into(),
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_operator(name: impl Into<Cow<'static, str>>) -> Self {
        Self::UnknownOperator { name: name.into() }
    }

    pub fn unknown_edge_method(name: impl Into<Cow<'static, str>>) -> Self {
        Self::UnknownEdgeMethod { name: name.into() }
    }

    pub fn unsupported_layout(channels: usize) -> Self {
        Self::UnsupportedLayout { channels }
    }

    pub fn invalid_buffer(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidBuffer {
            reason: reason.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn no_image_loaded() -> Self {
        Self::NoImageLoaded
    }

    pub fn output_dir_unavailable(
        path: impl Into<Cow<'static, str>>,
        source: std::io::Error,
    ) -> Self {
        Self::OutputDirUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn scan_failed(
        path: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ScanFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (caller can fix it)
    ///
    /// Everything except library bugs is recoverable: bad parameters,
    /// bad files and bad paths can all be corrected and retried.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }

    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. }
            | Self::FileReadFailed { .. }
            | Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. } => ErrorKind::Decode,

            Self::EncodeFailed { .. }
            | Self::UnsupportedOutputFormat { .. }
            | Self::FileWriteFailed { .. } => ErrorKind::Encode,

            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,

            // Dimension limits are a shape the pipeline refuses to handle,
            // not a codec problem.
            Self::UnknownOperator { .. }
            | Self::UnknownEdgeMethod { .. }
            | Self::UnsupportedLayout { .. }
            | Self::InvalidBuffer { .. }
            | Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. } => ErrorKind::UnsupportedInput,

            Self::NoImageLoaded => ErrorKind::NoImageLoaded,

            Self::OutputDirUnavailable { .. } | Self::ScanFailed { .. } => ErrorKind::Io,

            Self::InternalPanic { .. } => ErrorKind::Internal,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, LunarzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LunarzError::file_not_found("/path/to/file.jpg");
        assert!(err.to_string().contains("/path/to/file.jpg"));

        let err = LunarzError::invalid_parameter("gamma", "gamma", "0", "must be in (0.1, 5.0]");
        assert_eq!(
            err.to_string(),
            "Invalid value for gamma.gamma: 0. must be in (0.1, 5.0]"
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(LunarzError::file_not_found("test.jpg").is_recoverable());
        assert!(LunarzError::no_image_loaded().is_recoverable());
        assert!(LunarzError::unknown_edge_method("Bogus").is_recoverable());
        assert!(!LunarzError::internal_panic("test").is_recoverable());
    }

    #[test]
    fn test_error_kind_decode() {
        assert_eq!(
            LunarzError::file_not_found("a.png").kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            LunarzError::file_read_failed(
                "a.png",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied)
            )
            .kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            LunarzError::unsupported_format("xcf").kind(),
            ErrorKind::Decode
        );
        assert_eq!(LunarzError::decode_failed("eof").kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_error_kind_encode() {
        assert_eq!(
            LunarzError::encode_failed("png", "test").kind(),
            ErrorKind::Encode
        );
        assert_eq!(
            LunarzError::unsupported_output_format("webp").kind(),
            ErrorKind::Encode
        );
        assert_eq!(
            LunarzError::file_write_failed(
                "out.png",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied)
            )
            .kind(),
            ErrorKind::Encode
        );
    }

    #[test]
    fn test_error_kind_unsupported_input() {
        assert_eq!(
            LunarzError::unknown_operator("sepia").kind(),
            ErrorKind::UnsupportedInput
        );
        assert_eq!(
            LunarzError::unknown_edge_method("Bogus").kind(),
            ErrorKind::UnsupportedInput
        );
        assert_eq!(
            LunarzError::unsupported_layout(4).kind(),
            ErrorKind::UnsupportedInput
        );
        assert_eq!(
            LunarzError::dimension_exceeds_limit(40000, 32768).kind(),
            ErrorKind::UnsupportedInput
        );
    }

    #[test]
    fn test_error_kind_structural() {
        assert_eq!(
            LunarzError::output_dir_unavailable(
                "/nope",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied)
            )
            .kind(),
            ErrorKind::Io
        );
        assert_eq!(
            LunarzError::scan_failed("/nope", "not a directory").kind(),
            ErrorKind::Io
        );
        assert_eq!(
            LunarzError::no_image_loaded().kind(),
            ErrorKind::NoImageLoaded
        );
        assert_eq!(
            LunarzError::internal_panic("boom").kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_clone_preserves_io_kind_and_message() {
        let err = LunarzError::file_read_failed(
            "a.png",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let cloned = err.clone();
        assert_eq!(cloned.to_string(), err.to_string());
        match cloned {
            LunarzError::FileReadFailed { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied)
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_kind_codes_are_distinct() {
        let kinds = [
            ErrorKind::Decode,
            ErrorKind::Encode,
            ErrorKind::InvalidParameter,
            ErrorKind::UnsupportedInput,
            ErrorKind::NoImageLoaded,
            ErrorKind::Io,
            ErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }
}
