//! Codec adapters for format-specific implementations.
//!
//! Each module provides a thin adapter between zenpicha's unified contract and
//! the format-specific codec crate: option translation, layout mapping, and
//! error classification. Bitstream work stays inside the codec crate.

use alloc::vec::Vec;

use crate::buffer::PixelBuffer;
use crate::config::EncodeOptions;
use crate::error::{CodecError, EncodeError};
use crate::format::ImageFormat;
use crate::info::StatResult;
use crate::pixel::PixelLayout;

#[cfg(feature = "jpeg")]
pub(crate) mod jpeg;

#[cfg(feature = "png")]
pub(crate) mod png;

#[cfg(feature = "tiff")]
pub(crate) mod tiff;

#[cfg(feature = "jpeg")]
pub use self::jpeg::JpegCodec;
#[cfg(feature = "png")]
pub use self::png::PngCodec;
#[cfg(feature = "tiff")]
pub use self::tiff::TiffCodec;

/// Probe/decode/encode capability of one format.
///
/// Implementations are stateless and registered once in a
/// [`Catalog`](crate::Catalog).
pub trait Codec: Send + Sync + 'static {
    /// Format tag this codec handles.
    fn format(&self) -> ImageFormat;

    /// MIME type this codec is registered under.
    fn mime_type(&self) -> &'static str {
        self.format().mime_type()
    }

    /// Parse the header only and report what [`decode`](Codec::decode) will produce.
    fn probe(&self, data: &[u8]) -> Result<StatResult, CodecError>;

    /// Decode the whole image into a freshly allocated buffer.
    fn decode(&self, data: &[u8]) -> Result<PixelBuffer, CodecError>;

    /// Encode `image` with format-specific `options`.
    ///
    /// Options are validated before anything is written.
    fn encode(&self, image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>, CodecError>;

    /// Layouts [`encode`](Codec::encode) accepts.
    fn encodable_layouts(&self) -> &'static [PixelLayout];

    /// Whether the underlying library may run on several threads at once.
    ///
    /// The execution bridge serializes async calls into codecs returning `false`.
    fn reentrant(&self) -> bool {
        true
    }
}

impl core::fmt::Debug for dyn Codec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Codec")
            .field("format", &self.format())
            .field("reentrant", &self.reentrant())
            .finish()
    }
}

/// Reject layouts the codec cannot store.
pub(crate) fn check_layout(codec: &dyn Codec, image: &PixelBuffer) -> Result<(), CodecError> {
    if codec.encodable_layouts().contains(&image.layout()) {
        Ok(())
    } else {
        Err(EncodeError::UnsupportedPixelLayout {
            format: codec.format(),
            layout: image.layout(),
        }
        .into())
    }
}

/// Reject an option the format does not take at all.
pub(crate) fn reject_option<T: core::fmt::Display>(
    format: ImageFormat,
    option: &'static str,
    value: Option<T>,
) -> Result<(), CodecError> {
    match value {
        Some(v) => Err(CodecError::invalid_option(format, option, v.to_string())),
        None => Ok(()),
    }
}

/// Build the buffer a codec library handed back, classifying a size mismatch
/// as corrupt data.
pub(crate) fn buffer_from_samples(
    format: ImageFormat,
    samples: Vec<u8>,
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<PixelBuffer, CodecError> {
    PixelBuffer::from_vec(samples, width, height, layout).map_err(|e| {
        crate::error::DecodeError::Corrupt {
            format,
            source: alloc::boxed::Box::new(e),
        }
        .into()
    })
}
