//! # zenpicha
//!
//! Format dispatch and pixel buffers over JPEG, PNG, and TIFF.
//!
//! Give it bytes and it tells you what they are ([`stat`]), turns them into a
//! [`PixelBuffer`] ([`decode`]), and turns buffers back into bytes
//! ([`encode`]). Every operation also has a non-blocking form that runs on a
//! rayon pool and resolves a [`Pending`] future with exactly the same result.
//!
//! Each codec is feature-gated. Enable only what you need:
//!
//! ```toml
//! [dependencies]
//! zenpicha = { version = "0.1", default-features = false, features = ["png", "tiff"] }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use zenpicha::{DecodeOptions, EncodeOptions};
//!
//! let data: &[u8] = &[]; // your image bytes
//! let stat = zenpicha::stat(data)?;
//! println!("{}x{} {} {}", stat.width, stat.height, stat.pixel, stat.mimetype);
//!
//! let image = zenpicha::decode(data, &DecodeOptions::new())?;
//! let tiff = zenpicha::encode(
//!     &image,
//!     "image/tiff",
//!     &EncodeOptions::new().with_compression("deflate"),
//! )?;
//! # let _ = tiff;
//! # Ok::<(), zenpicha::CodecError>(())
//! ```
//!
//! Formats can be withheld at runtime by building a [`Dispatcher`] over a
//! restricted [`Catalog`]:
//!
//! ```rust
//! use zenpicha::{Catalog, Dispatcher, ImageFormat};
//!
//! let dispatcher = Dispatcher::new(Catalog::builtin().without(ImageFormat::Tiff));
//! assert!(!dispatcher.catalog().has("image/tiff"));
//! ```

#![forbid(unsafe_code)]

extern crate alloc;

pub mod bridge;
mod buffer;
mod catalog;
pub mod codecs;
mod config;
mod decode;
mod dispatch;
mod encode;
mod error;
mod format;
mod info;
mod limits;
pub mod pixel;
pub mod probe;
pub mod resize;

pub use bridge::{Bridge, BridgeConfig, Pending};
pub use buffer::{BufferError, PixelBuffer, compare_bytes};
pub use catalog::Catalog;
pub use codecs::Codec;
pub use config::{
    DEFAULT_JPEG_QUALITY, DecodeOptions, EncodeOptions, PngCompression, TiffCompression,
    UnknownValue,
};
pub use decode::DecodeRequest;
pub use dispatch::Dispatcher;
pub use encode::EncodeRequest;
pub use error::{BoxedSource, CodecError, DecodeError, EncodeError, ErrorKind, FormatError};
pub use format::ImageFormat;
pub use info::StatResult;
pub use limits::Limits;
pub use pixel::PixelLayout;
pub use probe::ProbeResult;
pub use resize::{ResizeError, ResizeFilter, ResizeOptions};

use alloc::vec::Vec;

/// Read the header of `data` with the global [`Dispatcher`].
pub fn stat(data: &[u8]) -> Result<StatResult, CodecError> {
    Dispatcher::global().stat(data)
}

/// Decode `data` with the global [`Dispatcher`].
pub fn decode(data: &[u8], options: &DecodeOptions) -> Result<PixelBuffer, CodecError> {
    Dispatcher::global().decode(data, options)
}

/// Encode `image` as `mimetype` with the global [`Dispatcher`].
pub fn encode(
    image: &PixelBuffer,
    mimetype: &str,
    options: &EncodeOptions,
) -> Result<Vec<u8>, CodecError> {
    Dispatcher::global().encode(image, mimetype, options)
}

/// [`stat`] on the global bridge.
pub fn stat_async<D>(data: D) -> Pending<StatResult>
where
    D: AsRef<[u8]> + Send + 'static,
{
    Dispatcher::global().stat_async(data)
}

/// [`decode`] on the global bridge.
pub fn decode_async<D>(data: D, options: DecodeOptions) -> Pending<PixelBuffer>
where
    D: AsRef<[u8]> + Send + 'static,
{
    Dispatcher::global().decode_async(data, options)
}

/// [`encode`] on the global bridge.
pub fn encode_async<B>(image: B, mimetype: &str, options: EncodeOptions) -> Pending<Vec<u8>>
where
    B: core::borrow::Borrow<PixelBuffer> + Send + 'static,
{
    Dispatcher::global().encode_async(image, mimetype, options)
}
