//! Request options and their per-format interpretations.
//!
//! Options arrive as loosely typed values ([`EncodeOptions::compression`] is a
//! string) and are validated by the target codec at encode time. The typed
//! enums here are what each codec adapter parses them into.

use alloc::string::String;
use core::str::FromStr;

use crate::format::ImageFormat;
use crate::limits::Limits;

/// Options for a decode call.
#[derive(Clone, Debug, Default)]
pub struct DecodeOptions {
    /// Skip sniffing and decode as this format.
    pub format: Option<ImageFormat>,
    /// Header limits checked before the full decode.
    pub limits: Option<Limits>,
}

impl DecodeOptions {
    /// Default options: sniff the format, no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override format auto-detection.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set resource limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// Options for an encode call.
///
/// Each format accepts a subset; anything else is rejected with
/// [`EncodeError::InvalidOption`](crate::EncodeError::InvalidOption).
///
/// | format | `compression`                        | `quality` |
/// |--------|--------------------------------------|-----------|
/// | JPEG   | n/a                                  | 1..=100   |
/// | PNG    | `none`, `fast`, `default`, `best`    | n/a       |
/// | TIFF   | `none`, `deflate`, `lzw`, `packbits` | n/a       |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Compression scheme name.
    pub compression: Option<String>,
    /// Lossy quality.
    pub quality: Option<u8>,
}

impl EncodeOptions {
    /// No options: every codec uses its defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression scheme by name.
    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set lossy quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Error from parsing an option value the format does not know.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown value {0:?}")]
pub struct UnknownValue(pub String);

/// TIFF compression schemes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TiffCompression {
    /// Uncompressed strips.
    None,
    /// Zlib/Deflate (Adobe).
    #[default]
    Deflate,
    /// LZW.
    Lzw,
    /// PackBits run-length encoding.
    PackBits,
}

impl TiffCompression {
    /// Every accepted value.
    pub const ALL: [TiffCompression; 4] = [
        TiffCompression::None,
        TiffCompression::Deflate,
        TiffCompression::Lzw,
        TiffCompression::PackBits,
    ];

    /// Option string for this scheme.
    pub const fn as_str(self) -> &'static str {
        match self {
            TiffCompression::None => "none",
            TiffCompression::Deflate => "deflate",
            TiffCompression::Lzw => "lzw",
            TiffCompression::PackBits => "packbits",
        }
    }
}

impl FromStr for TiffCompression {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownValue(s.into()))
    }
}

/// PNG deflate effort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PngCompression {
    /// Stored deflate blocks.
    None,
    /// Fast, larger output.
    Fast,
    /// Balanced.
    #[default]
    Default,
    /// Slow, smaller output.
    Best,
}

impl PngCompression {
    /// Every accepted value.
    pub const ALL: [PngCompression; 4] = [
        PngCompression::None,
        PngCompression::Fast,
        PngCompression::Default,
        PngCompression::Best,
    ];

    /// Option string for this level.
    pub const fn as_str(self) -> &'static str {
        match self {
            PngCompression::None => "none",
            PngCompression::Fast => "fast",
            PngCompression::Default => "default",
            PngCompression::Best => "best",
        }
    }
}

impl FromStr for PngCompression {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownValue(s.into()))
    }
}

/// JPEG quality used when none is given.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
