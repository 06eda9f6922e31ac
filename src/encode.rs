//! Image encoding.

use alloc::vec::Vec;

use crate::bridge::Pending;
use crate::pixel::{ImgRef, ImgVec, Rgb, Rgba};
use crate::{CodecError, Dispatcher, EncodeError, EncodeOptions, FormatError, ImageFormat, PixelBuffer};

/// Image encode request builder.
///
/// # Example
///
/// ```no_run
/// use zenpicha::{EncodeRequest, ImageFormat};
/// use zenpicha::pixel::{ImgVec, Rgba};
///
/// let pixels = ImgVec::new(vec![Rgba { r: 0u8, g: 0, b: 0, a: 255 }; 100 * 100], 100, 100);
/// let png = EncodeRequest::new(ImageFormat::Png)
///     .with_compression("best")
///     .encode_rgba8(pixels.as_ref())?;
/// # Ok::<(), zenpicha::CodecError>(())
/// ```
pub struct EncodeRequest<'a> {
    format: ImageFormat,
    options: EncodeOptions,
    dispatcher: Option<&'a Dispatcher>,
}

impl<'a> EncodeRequest<'a> {
    /// Encode to a specific format.
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            options: EncodeOptions::new(),
            dispatcher: None,
        }
    }

    /// Encode to the format registered under `mimetype`.
    pub fn for_mime_type(mimetype: &str) -> Result<Self, CodecError> {
        let format = ImageFormat::from_mime_type(mimetype).ok_or(FormatError::Unrecognized)?;
        Ok(Self::new(format))
    }

    /// Set the compression scheme by name.
    pub fn with_compression(mut self, compression: &str) -> Self {
        self.options.compression = Some(compression.into());
        self
    }

    /// Set quality (1-100, lossy formats only).
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.options.quality = Some(quality);
        self
    }

    /// Replace all options at once.
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Encode through `dispatcher` instead of the global one.
    pub fn with_dispatcher(mut self, dispatcher: &'a Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    fn dispatcher(&self) -> &'a Dispatcher {
        self.dispatcher.unwrap_or_else(|| Dispatcher::global())
    }

    /// Encode a pixel buffer.
    pub fn encode(self, image: &PixelBuffer) -> Result<Vec<u8>, CodecError> {
        self.dispatcher()
            .encode_as(image, self.format, &self.options)
    }

    /// Encode on the dispatcher's bridge.
    pub fn encode_async(self, image: PixelBuffer) -> Pending<Vec<u8>> {
        self.dispatcher()
            .encode_async(image, self.format.mime_type(), self.options)
    }

    /// Encode RGB8 pixels.
    pub fn encode_rgb8(self, img: ImgRef<'_, Rgb<u8>>) -> Result<Vec<u8>, CodecError> {
        let (buf, w, h) = img.to_contiguous_buf();
        let image = self.buffer_from(ImgVec::new(buf.into_owned(), w, h))?;
        self.encode(&image)
    }

    /// Encode RGBA8 pixels.
    pub fn encode_rgba8(self, img: ImgRef<'_, Rgba<u8>>) -> Result<Vec<u8>, CodecError> {
        let (buf, w, h) = img.to_contiguous_buf();
        let image = self.buffer_from(ImgVec::new(buf.into_owned(), w, h))?;
        self.encode(&image)
    }

    fn buffer_from<P>(&self, img: ImgVec<P>) -> Result<PixelBuffer, CodecError>
    where
        PixelBuffer: TryFrom<ImgVec<P>>,
    {
        let (width, height) = (img.width(), img.height());
        PixelBuffer::try_from(img).map_err(|_| {
            EncodeError::UnsupportedDimensions {
                format: self.format,
                width: u32::try_from(width).unwrap_or(u32::MAX),
                height: u32::try_from(height).unwrap_or(u32::MAX),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn builder_pattern() {
        let request = EncodeRequest::new(ImageFormat::Tiff)
            .with_compression("lzw")
            .with_quality(50);
        assert_eq!(request.format, ImageFormat::Tiff);
        assert_eq!(request.options.compression.as_deref(), Some("lzw"));
        assert_eq!(request.options.quality, Some(50));
    }

    #[test]
    fn unknown_mime_type() {
        let err = EncodeRequest::for_mime_type("image/gif").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unrecognized);
        assert!(EncodeRequest::for_mime_type("IMAGE/PNG").is_ok());
    }

    #[cfg(feature = "jpeg")]
    #[test]
    fn rgba_to_jpeg_error() {
        let pixels = ImgVec::new(vec![Rgba { r: 0u8, g: 0, b: 0, a: 255 }; 8 * 8], 8, 8);
        let err = EncodeRequest::new(ImageFormat::Jpeg)
            .encode_rgba8(pixels.as_ref())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPixelLayout);
    }

    #[cfg(feature = "jpeg")]
    #[test]
    fn rgb_to_jpeg() {
        let pixels = ImgVec::new(vec![Rgb { r: 200u8, g: 10, b: 10 }; 16 * 8], 16, 8);
        let jpeg = EncodeRequest::new(ImageFormat::Jpeg)
            .with_quality(90)
            .encode_rgb8(pixels.as_ref())
            .unwrap();
        assert_eq!(ImageFormat::detect(&jpeg), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn empty_image_reports_its_dimensions() {
        let pixels: ImgVec<Rgb<u8>> = ImgVec::new(Vec::new(), 3, 0);
        let err = EncodeRequest::new(ImageFormat::Png)
            .encode_rgb8(pixels.as_ref())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDimensions);
        assert!(err.to_string().contains("3x0"), "{err}");
    }
}
