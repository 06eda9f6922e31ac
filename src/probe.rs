//! Header sniffing on partial data.
//!
//! Reads dimensions, alpha, and bit depth from however many leading bytes are
//! available. Parsing is plain byte inspection with no codec involvement, so
//! it works for formats whose feature is disabled. The dispatcher leans on it
//! to tell a cut-off header from a malformed one.

use crate::error::{CodecError, FormatError};
use crate::format::ImageFormat;

/// What could be learned from a (possibly incomplete) header.
///
/// Everything except `format` is optional: short input leaves fields unset
/// instead of failing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProbeResult {
    /// Container format.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: Option<u32>,
    /// Height in pixels.
    pub height: Option<u32>,
    /// `Some(true)` when the stored samples include alpha.
    pub has_alpha: Option<bool>,
    /// Bits per stored sample.
    pub bit_depth: Option<u8>,
    /// How far into the input the parser looked.
    pub bytes_examined: usize,
    /// The header needed bytes past the end of the input.
    ///
    /// Stays `false` when parsing stopped on malformed data, so a short read
    /// can be told apart from a bad header.
    pub incomplete: bool,
}

impl ProbeResult {
    fn empty(format: ImageFormat) -> Self {
        ProbeResult {
            format,
            width: None,
            height: None,
            has_alpha: None,
            bit_depth: None,
            bytes_examined: 0,
            incomplete: false,
        }
    }

    /// Whether both dimensions were found.
    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }

    /// Parse `data` as `format` without checking its signature.
    pub fn for_format(data: &[u8], format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => probe_jpeg(data),
            ImageFormat::Png => probe_png(data),
            ImageFormat::Tiff => probe_tiff(data),
        }
    }
}

/// Detect the format of `data` and read what its header offers.
///
/// Only an unknown signature is an error; a short header just leaves fields
/// empty.
pub fn probe(data: &[u8]) -> Result<ProbeResult, CodecError> {
    let format = ImageFormat::detect(data).ok_or(FormatError::Unrecognized)?;
    Ok(ProbeResult::for_format(data, format))
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

// PNG: signature (8) then the IHDR chunk: length (4), type (4), 13 bytes of
// fields, CRC (4).
const PNG_IHDR_END: usize = 33;

fn probe_png(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Png);
    result.bytes_examined = data.len().min(PNG_IHDR_END);

    let ihdr = match data.get(12..PNG_IHDR_END) {
        Some(chunk) if chunk.starts_with(b"IHDR") => &chunk[4..],
        Some(_) => return result,
        None => {
            result.incomplete = true;
            return result;
        }
    };

    result.width = be_u32(ihdr, 0);
    result.height = be_u32(ihdr, 4);
    result.bit_depth = Some(ihdr[8]);
    // gray+alpha and RGBA carry alpha; anything else might still get it from tRNS
    result.has_alpha = matches!(ihdr[9], 4 | 6).then_some(true);
    result
}

// JPEG: SOI, then marker segments `FF xx` with a big-endian length that
// counts itself. Dimensions sit in the first start-of-frame segment.
const JPEG_SOS: u8 = 0xDA;
const JPEG_EOI: u8 = 0xD9;

fn is_start_of_frame(marker: u8) -> bool {
    // C4 (DHT), C8 (JPG), and CC (DAC) share the range but are not frames
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn has_no_length(marker: u8) -> bool {
    matches!(marker, 0x00 | 0x01 | 0xD0..=0xD7)
}

fn probe_jpeg(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Jpeg);
    result.has_alpha = Some(false);

    let mut pos = 2;
    loop {
        // fill bytes before a marker are legal
        let Some(skip) = data.get(pos..).and_then(|rest| rest.iter().position(|&b| b != 0xFF))
        else {
            result.incomplete = true;
            break;
        };
        if skip == 0 {
            break;
        }
        let marker_at = pos + skip;
        let marker = data[marker_at];
        pos = marker_at + 1;

        if has_no_length(marker) {
            continue;
        }
        if marker == JPEG_SOS || marker == JPEG_EOI {
            break;
        }

        let Some(length) = be_u16(data, pos) else {
            result.incomplete = true;
            break;
        };
        if is_start_of_frame(marker) {
            // length (2), precision (1), height (2), width (2)
            if let (Some(&precision), Some(height), Some(width)) =
                (data.get(pos + 2), be_u16(data, pos + 3), be_u16(data, pos + 5))
            {
                result.bit_depth = Some(precision);
                result.height = Some(u32::from(height));
                result.width = Some(u32::from(width));
                result.bytes_examined = pos + 7;
                return result;
            }
            result.incomplete = true;
            break;
        }
        if length < 2 {
            break;
        }
        pos += usize::from(length);
    }

    result.bytes_examined = pos.min(data.len());
    result
}

// ---------------------------------------------------------------------------
// TIFF: 8-byte header (byte order, 42, first IFD offset), then the IFD:
// 2-byte entry count + 12-byte entries (tag, type, count, value/offset).
// Dimensions live in ImageWidth (256) and ImageLength (257), SHORT or LONG.
// ---------------------------------------------------------------------------

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_EXTRA_SAMPLES: u16 = 338;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

struct ByteOrder {
    little: bool,
}

impl ByteOrder {
    fn u16(&self, b: &[u8]) -> u16 {
        let b = [b[0], b[1]];
        if self.little {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        }
    }

    fn u32(&self, b: &[u8]) -> u32 {
        let b = [b[0], b[1], b[2], b[3]];
        if self.little {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        }
    }

    /// Inline value of a SHORT or LONG entry.
    fn scalar(&self, ty: u16, value: &[u8]) -> Option<u32> {
        match ty {
            TYPE_SHORT => Some(u32::from(self.u16(value))),
            TYPE_LONG => Some(self.u32(value)),
            _ => None,
        }
    }
}

fn probe_tiff(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Tiff);
    result.bytes_examined = data.len().min(8);

    if data.len() < 8 {
        result.incomplete = true;
        return result;
    }

    let order = ByteOrder {
        little: data[0] == b'I',
    };
    let ifd = order.u32(&data[4..8]) as usize;

    if ifd < 8 {
        return result;
    }
    if ifd.saturating_add(2) > data.len() {
        result.incomplete = true;
        return result;
    }
    let count = order.u16(&data[ifd..ifd + 2]) as usize;
    let end = ifd + 2 + count * 12;
    if end > data.len() {
        result.bytes_examined = data.len();
        result.incomplete = true;
        return result;
    }
    result.bytes_examined = end;

    let mut width = None;
    let mut height = None;
    let mut samples = None;
    let mut extra_samples = false;

    for entry in data[ifd + 2..end].chunks_exact(12) {
        let tag = order.u16(&entry[0..2]);
        let ty = order.u16(&entry[2..4]);
        let n = order.u32(&entry[4..8]);
        let value = &entry[8..12];
        match tag {
            TAG_IMAGE_WIDTH => width = order.scalar(ty, value),
            TAG_IMAGE_LENGTH => height = order.scalar(ty, value),
            TAG_SAMPLES_PER_PIXEL => samples = order.scalar(ty, value),
            // every sample shares one depth in the images we handle; the first
            // value is inline for SHORT counts of 1 or 2
            TAG_BITS_PER_SAMPLE if ty == TYPE_SHORT && n <= 2 => {
                result.bit_depth = u8::try_from(order.u16(value)).ok();
            }
            TAG_EXTRA_SAMPLES => extra_samples = n > 0,
            _ => {}
        }
    }

    result.width = width;
    result.height = height;
    result.has_alpha = Some(extra_samples || matches!(samples, Some(2) | Some(4)));
    result
}
