//! JPEG codec adapter using jpeg-decoder and jpeg-encoder.

use alloc::string::ToString;
use alloc::vec::Vec;

use jpeg_decoder::PixelFormat;

use super::{Codec, buffer_from_samples, check_layout, reject_option};
use crate::config::{DEFAULT_JPEG_QUALITY, EncodeOptions};
use crate::error::{CodecError, DecodeError, EncodeError};
use crate::{ImageFormat, PixelBuffer, PixelLayout, StatResult};

/// Baseline/progressive JPEG, 8-bit gray or YCbCr.
#[derive(Clone, Copy, Debug, Default)]
pub struct JpegCodec;

const FORMAT: ImageFormat = ImageFormat::Jpeg;

/// Map the decoder's output format to a layout.
fn layout_for(pixel_format: PixelFormat) -> Result<PixelLayout, CodecError> {
    match pixel_format {
        PixelFormat::L8 => Ok(PixelLayout::Gray),
        PixelFormat::RGB24 => Ok(PixelLayout::Rgb),
        other => Err(DecodeError::Unsupported {
            format: FORMAT,
            detail: alloc::format!("{other:?} output"),
        }
        .into()),
    }
}

impl Codec for JpegCodec {
    fn format(&self) -> ImageFormat {
        FORMAT
    }

    /// Probe JPEG metadata without decoding pixels.
    fn probe(&self, data: &[u8]) -> Result<StatResult, CodecError> {
        let mut decoder = jpeg_decoder::Decoder::new(data);
        decoder
            .read_info()
            .map_err(|e| CodecError::from_decoder(FORMAT, e))?;
        let info = decoder
            .info()
            .ok_or(crate::FormatError::Truncated { format: FORMAT })?;

        Ok(StatResult::new(
            FORMAT,
            u32::from(info.width),
            u32::from(info.height),
            layout_for(info.pixel_format)?,
        ))
    }

    /// Decode JPEG to pixels.
    fn decode(&self, data: &[u8]) -> Result<PixelBuffer, CodecError> {
        let mut decoder = jpeg_decoder::Decoder::new(data);
        let pixels = decoder
            .decode()
            .map_err(|e| CodecError::from_decoder(FORMAT, e))?;
        let info = decoder
            .info()
            .ok_or(crate::FormatError::Truncated { format: FORMAT })?;
        let layout = layout_for(info.pixel_format)?;

        buffer_from_samples(
            FORMAT,
            pixels,
            u32::from(info.width),
            u32::from(info.height),
            layout,
        )
    }

    /// Encode gray or RGB pixels to JPEG.
    fn encode(&self, image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        reject_option(FORMAT, "compression", options.compression.as_deref())?;
        let quality = match options.quality {
            None => DEFAULT_JPEG_QUALITY,
            Some(q @ 1..=100) => q,
            Some(q) => return Err(CodecError::invalid_option(FORMAT, "quality", q.to_string())),
        };
        check_layout(self, image)?;

        let (width, height) = match (
            u16::try_from(image.width()),
            u16::try_from(image.height()),
        ) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(EncodeError::UnsupportedDimensions {
                    format: FORMAT,
                    width: image.width(),
                    height: image.height(),
                }
                .into());
            }
        };

        let color = match image.layout() {
            PixelLayout::Gray => jpeg_encoder::ColorType::Luma,
            _ => jpeg_encoder::ColorType::Rgb,
        };

        let samples = image.to_contiguous();
        let mut output = Vec::new();
        let encoder = jpeg_encoder::Encoder::new(&mut output, quality);
        encoder
            .encode(&samples, width, height, color)
            .map_err(|e| CodecError::from_encoder(FORMAT, e))?;

        Ok(output)
    }

    fn encodable_layouts(&self) -> &'static [PixelLayout] {
        &[PixelLayout::Gray, PixelLayout::Rgb]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn rgb_gradient(w: u32, h: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8]);
            }
        }
        PixelBuffer::from_vec(data, w, h, PixelLayout::Rgb).unwrap()
    }

    #[test]
    fn encode_then_probe_and_decode() {
        let image = rgb_gradient(64, 48);
        let encoded = JpegCodec.encode(&image, &EncodeOptions::new()).unwrap();
        assert!(ImageFormat::Jpeg.matches_magic(&encoded));

        let stat = JpegCodec.probe(&encoded).unwrap();
        assert_eq!(stat, StatResult::new(FORMAT, 64, 48, PixelLayout::Rgb));

        let decoded = JpegCodec.decode(&encoded).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
        assert_eq!(decoded.layout(), PixelLayout::Rgb);
    }

    #[test]
    fn gray_round_trip_keeps_layout() {
        let image = PixelBuffer::from_vec(vec![128u8; 16 * 16], 16, 16, PixelLayout::Gray).unwrap();
        let encoded = JpegCodec
            .encode(&image, &EncodeOptions::new().with_quality(95))
            .unwrap();
        let decoded = JpegCodec.decode(&encoded).unwrap();
        assert_eq!(decoded.layout(), PixelLayout::Gray);
    }

    #[test]
    fn rejects_alpha_layouts() {
        let image = PixelBuffer::new(4, 4, PixelLayout::Rgba).unwrap();
        let err = JpegCodec.encode(&image, &EncodeOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPixelLayout);
    }

    #[test]
    fn rejects_bad_options() {
        let image = rgb_gradient(4, 4);
        for opts in [
            EncodeOptions::new().with_quality(0),
            EncodeOptions::new().with_quality(101),
            EncodeOptions::new().with_compression("deflate"),
        ] {
            let err = JpegCodec.encode(&image, &opts).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidOption, "{opts:?}");
        }
    }

    #[test]
    fn garbage_after_soi_is_not_ok() {
        let data = [0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x02, 0x13, 0x37, 0x00];
        assert!(JpegCodec.decode(&data).is_err());
    }
}
