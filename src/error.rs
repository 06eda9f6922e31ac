//! Unified error types for codec operations.

use alloc::boxed::Box;
use alloc::string::String;

use crate::format::ImageFormat;
use crate::pixel::PixelLayout;
use crate::resize::ResizeError;

/// Boxed error from an underlying codec library.
pub type BoxedSource = Box<dyn core::error::Error + Send + Sync>;

/// Format resolution failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FormatError {
    /// No codec in the catalog accepts the byte prefix, or the requested
    /// format is not compiled in.
    #[error("unrecognized image format")]
    Unrecognized,
    /// The format was recognized but its header is incomplete.
    #[error("{format:?} header is truncated")]
    Truncated { format: ImageFormat },
}

/// Decode failures after the format was resolved.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The codec library rejected the data.
    #[error("corrupt {format:?} data: {source}")]
    Corrupt {
        format: ImageFormat,
        #[source]
        source: BoxedSource,
    },
    /// Valid data using a feature this crate does not map to a [`PixelLayout`].
    #[error("{format:?} feature not supported: {detail}")]
    Unsupported { format: ImageFormat, detail: String },
    /// Header dimensions exceed the caller's [`Limits`](crate::Limits).
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}

/// Encode failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// The target format cannot represent the buffer's pixel layout.
    #[error("{format:?} cannot encode {layout} pixels")]
    UnsupportedPixelLayout {
        format: ImageFormat,
        layout: PixelLayout,
    },
    /// An option name or value is not accepted by the target format.
    #[error("{format:?} does not accept {option} = {value:?}")]
    InvalidOption {
        format: ImageFormat,
        option: &'static str,
        value: String,
    },
    /// Dimensions exceed what the container can store.
    #[error("{format:?} cannot store a {width}x{height} image")]
    UnsupportedDimensions {
        format: ImageFormat,
        width: u32,
        height: u32,
    },
    /// The codec library failed while writing.
    #[error("{format:?} encoder failed: {source}")]
    Failed {
        format: ImageFormat,
        #[source]
        source: BoxedSource,
    },
}

/// Unified error type for codec operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Resize(#[from] ResizeError),
    /// The worker running an async operation panicked.
    #[error("worker panicked before completing the operation")]
    WorkerPanicked,
}

/// Flat discriminant of [`CodecError`], for comparing failures across
/// sync and async paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    Unrecognized,
    Truncated,
    Corrupt,
    UnsupportedFeature,
    LimitExceeded,
    UnsupportedPixelLayout,
    InvalidOption,
    UnsupportedDimensions,
    EncodeFailed,
    InvalidResize,
    WorkerPanicked,
}

impl CodecError {
    /// Discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Format(FormatError::Unrecognized) => ErrorKind::Unrecognized,
            CodecError::Format(FormatError::Truncated { .. }) => ErrorKind::Truncated,
            CodecError::Decode(DecodeError::Corrupt { .. }) => ErrorKind::Corrupt,
            CodecError::Decode(DecodeError::Unsupported { .. }) => ErrorKind::UnsupportedFeature,
            CodecError::Decode(DecodeError::LimitExceeded(_)) => ErrorKind::LimitExceeded,
            CodecError::Encode(EncodeError::UnsupportedPixelLayout { .. }) => {
                ErrorKind::UnsupportedPixelLayout
            }
            CodecError::Encode(EncodeError::InvalidOption { .. }) => ErrorKind::InvalidOption,
            CodecError::Encode(EncodeError::UnsupportedDimensions { .. }) => {
                ErrorKind::UnsupportedDimensions
            }
            CodecError::Encode(EncodeError::Failed { .. }) => ErrorKind::EncodeFailed,
            CodecError::Resize(_) => ErrorKind::InvalidResize,
            CodecError::WorkerPanicked => ErrorKind::WorkerPanicked,
        }
    }

    /// Wrap a codec library error raised while reading.
    ///
    /// End-of-input I/O errors become [`FormatError::Truncated`]; everything
    /// else is [`DecodeError::Corrupt`].
    pub(crate) fn from_decoder<E>(format: ImageFormat, error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        if is_unexpected_eof(&error) {
            return FormatError::Truncated { format }.into();
        }
        DecodeError::Corrupt {
            format,
            source: Box::new(error),
        }
        .into()
    }

    /// Wrap a codec library error raised while writing.
    pub(crate) fn from_encoder<E>(format: ImageFormat, error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        EncodeError::Failed {
            format,
            source: Box::new(error),
        }
        .into()
    }

    pub(crate) fn invalid_option(
        format: ImageFormat,
        option: &'static str,
        value: impl Into<String>,
    ) -> Self {
        EncodeError::InvalidOption {
            format,
            option,
            value: value.into(),
        }
        .into()
    }
}

/// Walks the source chain looking for an `UnexpectedEof` I/O error.
fn is_unexpected_eof(error: &(dyn core::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::UnexpectedEof {
                return true;
            }
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("wrapped")]
    struct Wrapped(#[source] std::io::Error);

    #[test]
    fn eof_maps_to_truncated() {
        let err = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        let err = CodecError::from_decoder(ImageFormat::Png, err);
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn nested_eof_maps_to_truncated() {
        let err = Wrapped(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        let err = CodecError::from_decoder(ImageFormat::Tiff, err);
        assert!(matches!(
            err,
            CodecError::Format(FormatError::Truncated {
                format: ImageFormat::Tiff
            })
        ));
    }

    #[test]
    fn other_io_maps_to_corrupt() {
        let err = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad");
        let err = CodecError::from_decoder(ImageFormat::Jpeg, err);
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(core::error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_option_message() {
        let err = CodecError::invalid_option(ImageFormat::Tiff, "compression", "zstd");
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert_eq!(
            err.to_string(),
            "Tiff does not accept compression = \"zstd\""
        );
    }
}
