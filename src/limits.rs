//! Resource limits for decode operations.

use crate::error::{CodecError, DecodeError};
use crate::info::StatResult;

/// Resource limits checked against the header before a full decode.
///
/// Unset fields impose nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    /// Maximum image width in pixels.
    pub max_width: Option<u64>,
    /// Maximum image height in pixels.
    pub max_height: Option<u64>,
    /// Maximum total pixels (width × height).
    pub max_pixels: Option<u64>,
    /// Maximum size of the decoded buffer in bytes.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// No restrictions.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set maximum width.
    pub fn with_max_width(mut self, width: u64) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Set maximum height.
    pub fn with_max_height(mut self, height: u64) -> Self {
        self.max_height = Some(height);
        self
    }

    /// Set maximum pixel count.
    pub fn with_max_pixels(mut self, pixels: u64) -> Self {
        self.max_pixels = Some(pixels);
        self
    }

    /// Set maximum decoded buffer size.
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    /// Check a width and height against the dimension limits.
    ///
    /// The error names the first limit that was crossed.
    pub fn check_dimensions(&self, width: u64, height: u64) -> Result<(), &'static str> {
        if exceeds(self.max_width, width) {
            Err("width exceeds limit")
        } else if exceeds(self.max_height, height) {
            Err("height exceeds limit")
        } else if exceeds(self.max_pixels, width.saturating_mul(height)) {
            Err("pixel count exceeds limit")
        } else {
            Ok(())
        }
    }

    /// Check a decoded buffer size against the memory limit.
    pub fn check_memory(&self, bytes: u64) -> Result<(), &'static str> {
        if exceeds(self.max_memory_bytes, bytes) {
            return Err("memory allocation exceeds limit");
        }
        Ok(())
    }

    /// Validate a probed header against every limit.
    pub(crate) fn validate(&self, stat: &StatResult) -> Result<(), CodecError> {
        let (w, h) = (u64::from(stat.width), u64::from(stat.height));
        self.check_dimensions(w, h)
            .and_then(|()| {
                let bytes = w
                    .saturating_mul(h)
                    .saturating_mul(stat.pixel.bytes_per_pixel() as u64);
                self.check_memory(bytes)
            })
            .map_err(|msg| DecodeError::LimitExceeded(msg).into())
    }

    pub(crate) fn is_unbounded(&self) -> bool {
        *self == Self::none()
    }
}

fn exceeds(limit: Option<u64>, value: u64) -> bool {
    limit.is_some_and(|max| value > max)
}
