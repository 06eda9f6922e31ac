//! Format dispatch: one entry point for stat, decode, encode, and resize.
//!
//! A [`Dispatcher`] pairs a [`Catalog`] with a [`Bridge`]. Every operation has
//! a blocking form and two non-blocking forms (`*_async` returning a
//! [`Pending`], `*_with` taking a completion callback). The non-blocking forms
//! run the blocking form on the bridge, so both observe identical results and
//! errors.
//!
//! Each call resolves its format, runs one codec call, and either returns the
//! complete result or an error. Nothing is cached between calls.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::borrow::Borrow;
use std::sync::OnceLock;

use log::debug;

use crate::bridge::{self, Bridge, Pending};
use crate::buffer::PixelBuffer;
use crate::catalog::Catalog;
use crate::codecs::Codec;
use crate::config::{DecodeOptions, EncodeOptions};
use crate::error::{CodecError, ErrorKind, FormatError};
use crate::format::ImageFormat;
use crate::info::StatResult;
use crate::probe::ProbeResult;
use crate::resize::{self, ResizeOptions};

/// Routes bytes and buffers to the right codec.
///
/// Cheap to clone; clones share the catalog and the bridge.
///
/// ```no_run
/// use zenpicha::{DecodeOptions, Dispatcher, EncodeOptions};
///
/// let data: &[u8] = &[]; // your image bytes
/// let dispatcher = Dispatcher::global();
/// let stat = dispatcher.stat(data)?;
/// let image = dispatcher.decode(data, &DecodeOptions::new())?;
/// let tiff = dispatcher.encode(
///     &image,
///     "image/tiff",
///     &EncodeOptions::new().with_compression("lzw"),
/// )?;
/// # let _ = (stat, tiff);
/// # Ok::<(), zenpicha::CodecError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    bridge: Arc<Bridge>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}

impl Dispatcher {
    /// Dispatcher over `catalog`, running async work on rayon's global pool.
    pub fn new(catalog: Catalog) -> Self {
        Self::with_bridge(catalog, Bridge::shared())
    }

    /// Dispatcher over `catalog`, running async work on `bridge`.
    pub fn with_bridge(catalog: Catalog, bridge: Bridge) -> Self {
        Self {
            catalog: Arc::new(catalog),
            bridge: Arc::new(bridge),
        }
    }

    /// The process-wide dispatcher over [`Catalog::global`].
    pub fn global() -> &'static Dispatcher {
        static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();
        GLOBAL.get_or_init(|| Dispatcher::new(Catalog::global().clone()))
    }

    /// Formats this dispatcher serves.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Where async work runs.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Sniff `data` (or trust `hint`) and look the codec up.
    fn resolve(
        &self,
        data: &[u8],
        hint: Option<ImageFormat>,
    ) -> Result<&'static dyn Codec, CodecError> {
        let format = match hint {
            Some(format) => format,
            None => ImageFormat::detect(data).ok_or(FormatError::Unrecognized)?,
        };
        let codec = self.catalog.require(format)?;
        debug!("resolved {format} for {} bytes", data.len());
        Ok(codec)
    }

    /// Read the header of `data` without decoding pixels.
    ///
    /// # Errors
    ///
    /// - [`FormatError::Unrecognized`] if no cataloged format matches.
    /// - [`FormatError::Truncated`] if the header ends early.
    /// - [`DecodeError::Corrupt`](crate::DecodeError::Corrupt) if the header is malformed.
    pub fn stat(&self, data: &[u8]) -> Result<StatResult, CodecError> {
        let codec = self.resolve(data, None)?;
        probe_with(codec, data)
    }

    /// [`stat`](Self::stat) without sniffing.
    pub fn stat_as(&self, data: &[u8], format: ImageFormat) -> Result<StatResult, CodecError> {
        let codec = self.resolve(data, Some(format))?;
        probe_with(codec, data)
    }

    /// Decode `data` into a fresh buffer.
    ///
    /// The format comes from `options.format` or from the magic bytes. With
    /// `options.limits` set, the header is probed and checked first.
    pub fn decode(&self, data: &[u8], options: &DecodeOptions) -> Result<PixelBuffer, CodecError> {
        let codec = self.resolve(data, options.format)?;

        if let Some(limits) = options.limits.as_ref().filter(|l| !l.is_unbounded()) {
            limits.validate(&probe_with(codec, data)?)?;
        }

        let image = bridge::serialized(codec, || codec.decode(data))
            .map_err(|e| refine(e, codec.format(), data))?;
        debug!(
            "decoded {}x{} {} from {}",
            image.width(),
            image.height(),
            image.layout(),
            codec.format()
        );
        Ok(image)
    }

    /// [`decode`](Self::decode) without sniffing.
    pub fn decode_as(&self, data: &[u8], format: ImageFormat) -> Result<PixelBuffer, CodecError> {
        self.decode(data, &DecodeOptions::new().with_format(format))
    }

    /// Encode `image` as `mimetype`.
    ///
    /// The target is never sniffed; an uncataloged `mimetype` fails with
    /// [`FormatError::Unrecognized`].
    pub fn encode(
        &self,
        image: &PixelBuffer,
        mimetype: &str,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let format = ImageFormat::from_mime_type(mimetype).ok_or(FormatError::Unrecognized)?;
        self.encode_as(image, format, options)
    }

    /// Encode `image` as `format`.
    pub fn encode_as(
        &self,
        image: &PixelBuffer,
        format: ImageFormat,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let codec = self.catalog.require(format)?;
        let encoded = bridge::serialized(codec, || codec.encode(image, options))?;
        debug!(
            "encoded {}x{} {} to {} bytes of {format}",
            image.width(),
            image.height(),
            image.layout(),
            encoded.len()
        );
        Ok(encoded)
    }

    /// Resample `image`.
    pub fn resize(
        &self,
        image: &PixelBuffer,
        options: &ResizeOptions,
    ) -> Result<PixelBuffer, CodecError> {
        let resized = resize::resize(image, options)?;
        debug!(
            "resized {}x{} to {}x{} with {}",
            image.width(),
            image.height(),
            resized.width(),
            resized.height(),
            options.filter()
        );
        Ok(resized)
    }

    /// [`stat`](Self::stat) on the bridge.
    pub fn stat_async<D>(&self, data: D) -> Pending<StatResult>
    where
        D: AsRef<[u8]> + Send + 'static,
    {
        let this = self.clone();
        self.bridge.submit(move || this.stat(data.as_ref()))
    }

    /// [`stat`](Self::stat) on the bridge, reporting to `callback`.
    pub fn stat_with<D, C>(&self, data: D, callback: C)
    where
        D: AsRef<[u8]> + Send + 'static,
        C: FnOnce(Result<StatResult, CodecError>) + Send + 'static,
    {
        let this = self.clone();
        self.bridge
            .submit_with(move || this.stat(data.as_ref()), callback);
    }

    /// [`decode`](Self::decode) on the bridge.
    pub fn decode_async<D>(&self, data: D, options: DecodeOptions) -> Pending<PixelBuffer>
    where
        D: AsRef<[u8]> + Send + 'static,
    {
        let this = self.clone();
        self.bridge
            .submit(move || this.decode(data.as_ref(), &options))
    }

    /// [`decode`](Self::decode) on the bridge, reporting to `callback`.
    pub fn decode_with<D, C>(&self, data: D, options: DecodeOptions, callback: C)
    where
        D: AsRef<[u8]> + Send + 'static,
        C: FnOnce(Result<PixelBuffer, CodecError>) + Send + 'static,
    {
        let this = self.clone();
        self.bridge
            .submit_with(move || this.decode(data.as_ref(), &options), callback);
    }

    /// [`encode`](Self::encode) on the bridge.
    ///
    /// `image` may be owned or shared (`Arc<PixelBuffer>`); it is only read.
    pub fn encode_async<B>(
        &self,
        image: B,
        mimetype: &str,
        options: EncodeOptions,
    ) -> Pending<Vec<u8>>
    where
        B: Borrow<PixelBuffer> + Send + 'static,
    {
        let this = self.clone();
        let mimetype: String = mimetype.to_owned();
        self.bridge
            .submit(move || this.encode(image.borrow(), &mimetype, &options))
    }

    /// [`encode`](Self::encode) on the bridge, reporting to `callback`.
    pub fn encode_with<B, C>(&self, image: B, mimetype: &str, options: EncodeOptions, callback: C)
    where
        B: Borrow<PixelBuffer> + Send + 'static,
        C: FnOnce(Result<Vec<u8>, CodecError>) + Send + 'static,
    {
        let this = self.clone();
        let mimetype: String = mimetype.to_owned();
        self.bridge.submit_with(
            move || this.encode(image.borrow(), &mimetype, &options),
            callback,
        );
    }

    /// [`resize`](Self::resize) on the bridge.
    pub fn resize_async<B>(&self, image: B, options: ResizeOptions) -> Pending<PixelBuffer>
    where
        B: Borrow<PixelBuffer> + Send + 'static,
    {
        let this = self.clone();
        self.bridge
            .submit(move || this.resize(image.borrow(), &options))
    }

    /// [`resize`](Self::resize) on the bridge, reporting to `callback`.
    pub fn resize_with<B, C>(&self, image: B, options: ResizeOptions, callback: C)
    where
        B: Borrow<PixelBuffer> + Send + 'static,
        C: FnOnce(Result<PixelBuffer, CodecError>) + Send + 'static,
    {
        let this = self.clone();
        self.bridge
            .submit_with(move || this.resize(image.borrow(), &options), callback);
    }
}

fn probe_with(codec: &'static dyn Codec, data: &[u8]) -> Result<StatResult, CodecError> {
    let stat = bridge::serialized(codec, || codec.probe(data))
        .map_err(|e| refine(e, codec.format(), data))?;
    debug!(
        "stat {}x{} {} {}",
        stat.width, stat.height, stat.pixel, stat.mimetype
    );
    Ok(stat)
}

/// Report a library failure on a header that ends early as truncation.
///
/// A malformed but complete header stays [`DecodeError::Corrupt`](crate::DecodeError::Corrupt).
fn refine(error: CodecError, format: ImageFormat, data: &[u8]) -> CodecError {
    if error.kind() == ErrorKind::Corrupt && ProbeResult::for_format(data, format).incomplete {
        FormatError::Truncated { format }.into()
    } else {
        error
    }
}
