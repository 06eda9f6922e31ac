//! Codec catalog: which formats this process can handle.
//!
//! Compile-time features decide which codecs are *available*; a [`Catalog`]
//! decides which are *offered*. The process-wide [`Catalog::global`] offers
//! everything compiled in, and services that restrict formats per tenant or
//! per request build their own with [`Catalog::without`].

use alloc::vec::Vec;
use std::sync::OnceLock;

use crate::codecs::Codec;
use crate::error::{CodecError, FormatError};
use crate::format::ImageFormat;

/// Mapping from MIME type to codec.
///
/// One entry per [`ImageFormat`], keyed by [`ImageFormat::mime_type`]. Presence
/// of an entry is the only test for "supported": every operation on a format
/// without an entry fails with [`FormatError::Unrecognized`].
#[derive(Clone, Debug)]
pub struct Catalog {
    // Indexed by format, in `ImageFormat::ALL` order.
    entries: [Option<&'static dyn Codec>; ImageFormat::ALL.len()],
}

fn builtin_codec(format: ImageFormat) -> Option<&'static dyn Codec> {
    match format {
        #[cfg(feature = "jpeg")]
        ImageFormat::Jpeg => Some(&crate::codecs::JpegCodec),
        #[cfg(feature = "png")]
        ImageFormat::Png => Some(&crate::codecs::PngCodec),
        #[cfg(feature = "tiff")]
        ImageFormat::Tiff => Some(&crate::codecs::TiffCodec),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn slot(format: ImageFormat) -> usize {
    match format {
        ImageFormat::Jpeg => 0,
        ImageFormat::Png => 1,
        ImageFormat::Tiff => 2,
    }
}

impl Catalog {
    /// Every codec compiled into this build.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for format in ImageFormat::ALL {
            catalog.entries[slot(format)] = builtin_codec(format);
        }
        catalog
    }

    /// No codecs. Callers opt in with [`with_codec`](Self::with_codec).
    pub fn empty() -> Self {
        Self {
            entries: [None; ImageFormat::ALL.len()],
        }
    }

    /// The process-wide catalog, built from [`builtin`](Self::builtin) on
    /// first use and never changed afterwards.
    pub fn global() -> &'static Catalog {
        static GLOBAL: OnceLock<Catalog> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let catalog = Catalog::builtin();
            log::debug!("codec catalog: {:?}", catalog.mime_types().collect::<Vec<_>>());
            catalog
        })
    }

    /// Register `codec` under its format, replacing any previous entry.
    pub fn with_codec(mut self, codec: &'static dyn Codec) -> Self {
        self.entries[slot(codec.format())] = Some(codec);
        self
    }

    /// Add the compiled-in codec for `format`, if there is one.
    pub fn with(mut self, format: ImageFormat) -> Self {
        self.entries[slot(format)] = builtin_codec(format);
        self
    }

    /// Drop the entry for `format`.
    pub fn without(mut self, format: ImageFormat) -> Self {
        self.entries[slot(format)] = None;
        self
    }

    /// Whether `mime` has a codec.
    pub fn has(&self, mime: &str) -> bool {
        self.get(mime).is_some()
    }

    /// Codec registered for `mime`.
    pub fn get(&self, mime: &str) -> Option<&'static dyn Codec> {
        ImageFormat::from_mime_type(mime).and_then(|f| self.by_format(f))
    }

    /// Codec registered for `format`.
    pub fn by_format(&self, format: ImageFormat) -> Option<&'static dyn Codec> {
        self.entries[slot(format)]
    }

    /// Codec for `format`, or [`FormatError::Unrecognized`].
    pub(crate) fn require(&self, format: ImageFormat) -> Result<&'static dyn Codec, CodecError> {
        self.by_format(format)
            .ok_or_else(|| FormatError::Unrecognized.into())
    }

    /// Codec whose magic bytes match the start of `data`.
    pub fn sniff(&self, data: &[u8]) -> Option<&'static dyn Codec> {
        self.formats()
            .find(|f| f.matches_magic(data))
            .and_then(|f| self.by_format(f))
    }

    /// Registered formats, in [`ImageFormat::ALL`] order.
    pub fn formats(&self) -> impl Iterator<Item = ImageFormat> + '_ {
        ImageFormat::ALL
            .into_iter()
            .filter(|f| self.entries[slot(*f)].is_some())
    }

    /// Registered MIME types, in [`ImageFormat::ALL`] order.
    pub fn mime_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formats().map(ImageFormat::mime_type)
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Whether no codec is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog() {
        let catalog = Catalog::builtin();

        #[cfg(feature = "jpeg")]
        assert!(catalog.has("image/jpeg"));
        #[cfg(feature = "png")]
        assert!(catalog.has("image/png"));
        #[cfg(feature = "tiff")]
        assert!(catalog.has("image/tiff"));

        for mime in catalog.mime_types() {
            let codec = catalog.get(mime).unwrap();
            assert_eq!(codec.mime_type(), mime);
        }
    }

    #[test]
    fn empty_catalog() {
        let catalog = Catalog::empty();
        assert!(catalog.is_empty());
        assert!(!catalog.has("image/jpeg"));
        assert_eq!(catalog.mime_types().count(), 0);
        assert!(catalog.sniff(&[0xFF, 0xD8, 0xFF, 0xE0]).is_none());
    }

    #[test]
    fn unknown_mime_is_absent() {
        let catalog = Catalog::builtin();
        assert!(!catalog.has("image/webp"));
        assert!(!catalog.has(""));
        assert!(catalog.get("text/plain").is_none());
    }

    #[cfg(feature = "png")]
    #[test]
    fn without_removes_one_format() {
        let catalog = Catalog::builtin().without(ImageFormat::Png);
        assert!(!catalog.has("image/png"));
        assert!(!catalog.formats().any(|f| f == ImageFormat::Png));

        let err = catalog.require(ImageFormat::Png).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Unrecognized);

        let catalog = catalog.with(ImageFormat::Png);
        assert!(catalog.has("image/png"));
    }

    #[cfg(feature = "jpeg")]
    #[test]
    fn sniff_follows_magic() {
        let catalog = Catalog::empty().with(ImageFormat::Jpeg);
        let codec = catalog.sniff(&[0xFF, 0xD8, 0xFF, 0xDB]).unwrap();
        assert_eq!(codec.format(), ImageFormat::Jpeg);
        assert!(catalog.sniff(b"\x89PNG\r\n\x1a\n").is_none());
    }

    #[test]
    fn global_is_shared() {
        let a = Catalog::global() as *const Catalog;
        let b = Catalog::global() as *const Catalog;
        assert_eq!(a, b);
        assert_eq!(Catalog::global().len(), Catalog::builtin().len());
    }
}
