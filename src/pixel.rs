//! Pixel layouts and typed pixel re-exports.
//!
//! Typed views use `imgref` for 2D geometry and the `rgb` crate for pixels.

use core::fmt;
use core::str::FromStr;

pub use imgref::{Img, ImgRef, ImgVec};
pub use rgb::{Gray, Rgb, Rgba};

/// Channel composition and order of 8-bit samples in a [`PixelBuffer`](crate::PixelBuffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelLayout {
    /// Single luminance channel.
    #[cfg_attr(feature = "serde", serde(rename = "gray"))]
    Gray,
    /// Luminance + alpha.
    #[cfg_attr(feature = "serde", serde(rename = "graya"))]
    GrayAlpha,
    /// Red, green, blue.
    #[cfg_attr(feature = "serde", serde(rename = "rgb"))]
    Rgb,
    /// Red, green, blue, alpha (straight).
    #[cfg_attr(feature = "serde", serde(rename = "rgba"))]
    Rgba,
}

impl PixelLayout {
    /// Every layout.
    pub const ALL: [PixelLayout; 4] = [Self::Gray, Self::GrayAlpha, Self::Rgb, Self::Rgba];

    /// Number of channels in this layout.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Bytes per pixel. All layouts use 8-bit samples.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        self.channels()
    }

    /// Whether this layout includes an alpha channel.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::GrayAlpha | Self::Rgba)
    }

    /// Whether this layout has no color channels.
    #[inline]
    pub const fn is_grayscale(self) -> bool {
        matches!(self, Self::Gray | Self::GrayAlpha)
    }

    /// Short lowercase name: `gray`, `graya`, `rgb`, `rgba`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::GrayAlpha => "graya",
            Self::Rgb => "rgb",
            Self::Rgba => "rgba",
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from parsing an unknown layout name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown pixel layout {0:?}")]
pub struct UnknownLayout(pub String);

impl FromStr for PixelLayout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gray" | "grey" => Ok(Self::Gray),
            "graya" | "greya" => Ok(Self::GrayAlpha),
            "rgb" => Ok(Self::Rgb),
            "rgba" => Ok(Self::Rgba),
            other => Err(UnknownLayout(other.into())),
        }
    }
}
