//! Image decoding.

use crate::bridge::Pending;
use crate::{CodecError, DecodeOptions, Dispatcher, ImageFormat, Limits, PixelBuffer, StatResult};

/// Image decode request builder.
///
/// # Example
///
/// ```no_run
/// use zenpicha::DecodeRequest;
///
/// let data: &[u8] = &[]; // your image bytes
/// let image = DecodeRequest::new(data).decode()?;
/// println!("{}x{} {}", image.width(), image.height(), image.layout());
/// # Ok::<(), zenpicha::CodecError>(())
/// ```
pub struct DecodeRequest<'a> {
    data: &'a [u8],
    options: DecodeOptions,
    dispatcher: Option<&'a Dispatcher>,
}

impl<'a> DecodeRequest<'a> {
    /// Create a new decode request.
    ///
    /// Format will be auto-detected from magic bytes and decoded by the
    /// global [`Dispatcher`].
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            options: DecodeOptions::new(),
            dispatcher: None,
        }
    }

    /// Override format auto-detection.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.options.format = Some(format);
        self
    }

    /// Set resource limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.options.limits = Some(limits);
        self
    }

    /// Decode through `dispatcher` instead of the global one.
    pub fn with_dispatcher(mut self, dispatcher: &'a Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    fn dispatcher(&self) -> &'a Dispatcher {
        self.dispatcher.unwrap_or_else(|| Dispatcher::global())
    }

    /// Read the header only.
    pub fn stat(self) -> Result<StatResult, CodecError> {
        let dispatcher = self.dispatcher();
        match self.options.format {
            Some(format) => dispatcher.stat_as(self.data, format),
            None => dispatcher.stat(self.data),
        }
    }

    /// Decode the image to pixels.
    pub fn decode(self) -> Result<PixelBuffer, CodecError> {
        self.dispatcher().decode(self.data, &self.options)
    }

    /// Decode on the dispatcher's bridge. The input is copied.
    pub fn decode_async(self) -> Pending<PixelBuffer> {
        self.dispatcher()
            .decode_async(self.data.to_vec(), self.options)
    }
}
