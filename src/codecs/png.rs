//! PNG codec adapter using png crate.
//!
//! Decoding normalizes every PNG to 8-bit samples: palettes and low bit depths
//! are expanded, 16-bit is stripped, and tRNS becomes an alpha channel.

use std::io::Cursor;

use alloc::vec::Vec;

use super::{Codec, buffer_from_samples, check_layout, reject_option};
use crate::config::{EncodeOptions, PngCompression};
use crate::error::{CodecError, DecodeError};
use crate::{ImageFormat, PixelBuffer, PixelLayout, StatResult};

/// PNG, any color type, decoded to 8-bit samples.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngCodec;

const FORMAT: ImageFormat = ImageFormat::Png;

fn reader(data: &[u8]) -> Result<png::Reader<Cursor<&[u8]>>, CodecError> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    decoder
        .read_info()
        .map_err(|e| CodecError::from_decoder(FORMAT, e))
}

/// Layout of the transformed output.
fn output_layout<R: std::io::BufRead + std::io::Seek>(
    reader: &png::Reader<R>,
) -> Result<PixelLayout, CodecError> {
    let (color_type, bit_depth) = reader.output_color_type();
    if bit_depth != png::BitDepth::Eight {
        return Err(DecodeError::Unsupported {
            format: FORMAT,
            detail: alloc::format!("{bit_depth:?} output"),
        }
        .into());
    }
    match color_type {
        png::ColorType::Grayscale => Ok(PixelLayout::Gray),
        png::ColorType::GrayscaleAlpha => Ok(PixelLayout::GrayAlpha),
        png::ColorType::Rgb => Ok(PixelLayout::Rgb),
        png::ColorType::Rgba => Ok(PixelLayout::Rgba),
        // EXPAND turns palettes into RGB/RGBA
        png::ColorType::Indexed => Err(DecodeError::Unsupported {
            format: FORMAT,
            detail: "unexpanded palette".into(),
        }
        .into()),
    }
}

fn compression_for(level: PngCompression) -> png::Compression {
    match level {
        PngCompression::None => png::Compression::NoCompression,
        PngCompression::Fast => png::Compression::Fast,
        PngCompression::Default => png::Compression::Balanced,
        PngCompression::Best => png::Compression::High,
    }
}

fn color_for(layout: PixelLayout) -> png::ColorType {
    match layout {
        PixelLayout::Gray => png::ColorType::Grayscale,
        PixelLayout::GrayAlpha => png::ColorType::GrayscaleAlpha,
        PixelLayout::Rgb => png::ColorType::Rgb,
        PixelLayout::Rgba => png::ColorType::Rgba,
    }
}

impl Codec for PngCodec {
    fn format(&self) -> ImageFormat {
        FORMAT
    }

    /// Probe PNG metadata without decoding pixels.
    ///
    /// Reads the chunks before the first IDAT, so a tRNS chunk is honored.
    fn probe(&self, data: &[u8]) -> Result<StatResult, CodecError> {
        let reader = reader(data)?;
        let layout = output_layout(&reader)?;
        let info = reader.info();
        Ok(StatResult::new(FORMAT, info.width, info.height, layout))
    }

    /// Decode PNG to pixels.
    fn decode(&self, data: &[u8]) -> Result<PixelBuffer, CodecError> {
        let mut reader = reader(data)?;
        let layout = output_layout(&reader)?;
        let (width, height) = {
            let info = reader.info();
            (info.width, info.height)
        };

        let buffer_size = reader.output_buffer_size().ok_or_else(|| {
            CodecError::from(DecodeError::LimitExceeded("PNG output buffer size overflows"))
        })?;
        let mut raw_pixels = alloc::vec![0u8; buffer_size];

        let output_info = reader
            .next_frame(&mut raw_pixels)
            .map_err(|e| CodecError::from_decoder(FORMAT, e))?;

        raw_pixels.truncate(output_info.buffer_size());

        buffer_from_samples(FORMAT, raw_pixels, width, height, layout)
    }

    /// Encode pixels to PNG. Every layout is supported.
    fn encode(&self, image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        reject_option(FORMAT, "quality", options.quality)?;
        let compression = match options.compression.as_deref() {
            None => PngCompression::default(),
            Some(name) => name
                .parse::<PngCompression>()
                .map_err(|e| CodecError::invalid_option(FORMAT, "compression", e.0))?,
        };
        check_layout(self, image)?;

        let samples = image.to_contiguous();
        let mut output = Vec::new();
        let mut encoder = png::Encoder::new(&mut output, image.width(), image.height());
        encoder.set_color(color_for(image.layout()));
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(compression_for(compression));

        let mut writer = encoder
            .write_header()
            .map_err(|e| CodecError::from_encoder(FORMAT, e))?;

        writer
            .write_image_data(&samples)
            .map_err(|e| CodecError::from_encoder(FORMAT, e))?;

        writer
            .finish()
            .map_err(|e| CodecError::from_encoder(FORMAT, e))?;

        Ok(output)
    }

    fn encodable_layouts(&self) -> &'static [PixelLayout] {
        &[
            PixelLayout::Gray,
            PixelLayout::GrayAlpha,
            PixelLayout::Rgb,
            PixelLayout::Rgba,
        ]
    }
}
