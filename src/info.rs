//! Header-only image metadata.

use crate::format::ImageFormat;
use crate::pixel::PixelLayout;

/// Metadata derivable from a format header alone, without decoding pixels.
///
/// `pixel` is the layout [`decode`](crate::Dispatcher::decode) will produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StatResult {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel layout of the decoded buffer.
    pub pixel: PixelLayout,
    /// MIME type of the container.
    pub mimetype: &'static str,
}

impl StatResult {
    pub(crate) fn new(format: ImageFormat, width: u32, height: u32, pixel: PixelLayout) -> Self {
        Self {
            width,
            height,
            pixel,
            mimetype: format.mime_type(),
        }
    }

    /// Format tag for [`mimetype`](Self::mimetype).
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(self.mimetype)
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn serializes_like_a_stat_object() {
        let stat = StatResult::new(ImageFormat::Jpeg, 50, 50, PixelLayout::Rgb);
        let json = serde_json::to_value(stat).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "width": 50,
                "height": 50,
                "pixel": "rgb",
                "mimetype": "image/jpeg",
            })
        );
    }
}
