//! TIFF codec adapter using the tiff crate.
//!
//! Only the first image directory is read. Every 8-bit gray, gray+alpha, RGB,
//! or RGBA image decodes to RGBA, with opaque alpha where none is stored.
//! Encoding writes one strip-organized image with the requested compression.

use std::io::Cursor;

use alloc::vec::Vec;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{Compression, DeflateLevel, TiffEncoder, colortype};

use super::{Codec, buffer_from_samples, check_layout, reject_option};
use crate::config::{EncodeOptions, TiffCompression};
use crate::error::{CodecError, DecodeError};
use crate::{ImageFormat, PixelBuffer, PixelLayout, StatResult};

/// TIFF, 8-bit gray, gray+alpha, RGB, or RGBA, always decoded to RGBA.
#[derive(Clone, Copy, Debug, Default)]
pub struct TiffCodec;

const FORMAT: ImageFormat = ImageFormat::Tiff;

/// Layout of the stored samples.
fn stored_layout(color: ColorType) -> Result<PixelLayout, CodecError> {
    match color {
        ColorType::Gray(8) => Ok(PixelLayout::Gray),
        ColorType::GrayA(8) => Ok(PixelLayout::GrayAlpha),
        ColorType::RGB(8) => Ok(PixelLayout::Rgb),
        ColorType::RGBA(8) => Ok(PixelLayout::Rgba),
        other => Err(DecodeError::Unsupported {
            format: FORMAT,
            detail: alloc::format!("{other:?} samples"),
        }
        .into()),
    }
}

fn compression_for(scheme: TiffCompression) -> Compression {
    match scheme {
        TiffCompression::None => Compression::Uncompressed,
        TiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
        TiffCompression::Lzw => Compression::Lzw,
        TiffCompression::PackBits => Compression::Packbits,
    }
}

/// Widen stored samples to RGBA.
fn expand_to_rgba(samples: Vec<u8>, stored: PixelLayout) -> Vec<u8> {
    match stored {
        PixelLayout::Rgba => samples,
        PixelLayout::Rgb => samples
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 0xFF])
            .collect(),
        PixelLayout::GrayAlpha => samples
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        PixelLayout::Gray => samples.iter().flat_map(|&v| [v, v, v, 0xFF]).collect(),
    }
}

/// Open the first directory and read its geometry and stored layout.
fn open(data: &[u8]) -> Result<(Decoder<Cursor<&[u8]>>, StatResult, PixelLayout), CodecError> {
    let mut decoder =
        Decoder::new(Cursor::new(data)).map_err(|e| CodecError::from_decoder(FORMAT, e))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| CodecError::from_decoder(FORMAT, e))?;
    let color = decoder
        .colortype()
        .map_err(|e| CodecError::from_decoder(FORMAT, e))?;
    let stored = stored_layout(color)?;
    let stat = StatResult::new(FORMAT, width, height, PixelLayout::Rgba);
    Ok((decoder, stat, stored))
}

impl Codec for TiffCodec {
    fn format(&self) -> ImageFormat {
        FORMAT
    }

    /// Probe TIFF metadata from the first IFD.
    fn probe(&self, data: &[u8]) -> Result<StatResult, CodecError> {
        open(data).map(|(_, stat, _)| stat)
    }

    /// Decode the first TIFF image to pixels.
    fn decode(&self, data: &[u8]) -> Result<PixelBuffer, CodecError> {
        let (mut decoder, stat, stored) = open(data)?;
        let samples = match decoder
            .read_image()
            .map_err(|e| CodecError::from_decoder(FORMAT, e))?
        {
            DecodingResult::U8(samples) => samples,
            _ => {
                return Err(DecodeError::Unsupported {
                    format: FORMAT,
                    detail: "non-8-bit samples".into(),
                }
                .into());
            }
        };

        let rgba = expand_to_rgba(samples, stored);
        buffer_from_samples(FORMAT, rgba, stat.width, stat.height, stat.pixel)
    }

    /// Encode pixels to TIFF with the requested compression.
    fn encode(&self, image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        reject_option(FORMAT, "quality", options.quality)?;
        let scheme = match options.compression.as_deref() {
            None => TiffCompression::default(),
            Some(name) => name
                .parse::<TiffCompression>()
                .map_err(|e| CodecError::invalid_option(FORMAT, "compression", e.0))?,
        };
        check_layout(self, image)?;

        let (width, height) = (image.width(), image.height());
        let samples = image.to_contiguous();
        let mut output = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut output)
                .map_err(|e| CodecError::from_encoder(FORMAT, e))?
                .with_compression(compression_for(scheme));

            let written = match image.layout() {
                PixelLayout::Gray => {
                    encoder.write_image::<colortype::Gray8>(width, height, &samples)
                }
                PixelLayout::Rgb => encoder.write_image::<colortype::RGB8>(width, height, &samples),
                PixelLayout::Rgba => {
                    encoder.write_image::<colortype::RGBA8>(width, height, &samples)
                }
                // filtered out by check_layout
                PixelLayout::GrayAlpha => unreachable!("gray+alpha is not encodable as TIFF"),
            };
            written.map_err(|e| CodecError::from_encoder(FORMAT, e))?;
        }

        Ok(output.into_inner())
    }

    fn encodable_layouts(&self) -> &'static [PixelLayout] {
        &[PixelLayout::Gray, PixelLayout::Rgb, PixelLayout::Rgba]
    }
}
