//! Image format detection and metadata.

/// Supported image formats.
///
/// This is the closed set of codec tags; which of them are usable at runtime
/// is decided by the [`Catalog`](crate::Catalog).
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ImageFormat {
    Jpeg,
    Png,
    Tiff,
}

impl ImageFormat {
    /// Every format tag, in detection order.
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Tiff];

    /// Number of leading bytes [`detect`](Self::detect) may inspect.
    pub const MAGIC_LEN: usize = 8;

    /// Detect format from magic bytes. Returns None if unrecognized.
    ///
    /// Checks the first few bytes of the data for known format signatures.
    pub fn detect(data: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.matches_magic(data))
    }

    /// Whether `data` starts with this format's signature.
    pub fn matches_magic(self, data: &[u8]) -> bool {
        match self {
            // JPEG: SOI marker followed by the start of the next marker
            ImageFormat::Jpeg => data.starts_with(&[0xFF, 0xD8, 0xFF]),
            // PNG: 89 50 4E 47 0D 0A 1A 0A
            ImageFormat::Png => {
                data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
            }
            // TIFF: byte-order mark + 42 in that byte order
            ImageFormat::Tiff => {
                data.starts_with(b"II\x2A\x00") || data.starts_with(b"MM\x00\x2A")
            }
        }
    }

    /// Detect format from file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    /// Look up a format by MIME type (case-insensitive).
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.mime_type().eq_ignore_ascii_case(mime.trim()))
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Tiff => "image/tiff",
        }
    }

    /// Common file extensions.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ImageFormat::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            ImageFormat::Png => &["png"],
            ImageFormat::Tiff => &["tif", "tiff"],
        }
    }

    /// Whether this format supports lossless encoding.
    pub fn supports_lossless(self) -> bool {
        match self {
            ImageFormat::Jpeg => false,
            ImageFormat::Png => true,
            ImageFormat::Tiff => true,
        }
    }

    /// Whether this format supports an alpha channel.
    pub fn supports_alpha(self) -> bool {
        match self {
            ImageFormat::Jpeg => false,
            ImageFormat::Png => true,
            ImageFormat::Tiff => true,
        }
    }
}

impl core::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.mime_type())
    }
}
