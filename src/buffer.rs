//! Owned pixel buffer: the canonical in-memory image.
//!
//! Every codec decodes into a [`PixelBuffer`] and encodes from one. The buffer
//! carries its own geometry and [`PixelLayout`], and enforces
//! `data.len() == stride * height` for its whole lifetime.

use alloc::borrow::Cow;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::pixel::{Gray, ImgRef, ImgVec, PixelLayout, Rgb, Rgba};

/// Errors from pixel buffer construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BufferError {
    /// Width or height is zero or causes overflow.
    #[error("width or height is zero or causes overflow")]
    InvalidDimensions,
    /// Stride is smaller than `width * bytes_per_pixel`.
    #[error("stride is smaller than width * bytes_per_pixel")]
    StrideTooSmall,
    /// Data length is not `stride * height`.
    #[error("data length {actual} does not match stride * height = {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Owned image with 8-bit samples.
///
/// Rows are `stride` bytes apart; the first `width * bytes_per_pixel` bytes of
/// each row are samples, anything after is padding.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    layout: PixelLayout,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zero-filled, tightly packed buffer.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Result<Self, BufferError> {
        let stride = packed_stride(width, layout)?;
        let total = checked_total(stride, height)?;
        Ok(Self {
            width,
            height,
            layout,
            stride,
            data: vec![0u8; total],
        })
    }

    /// Wrap tightly packed samples.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::LengthMismatch`] unless
    /// `data.len() == width * height * bytes_per_pixel`.
    pub fn from_vec(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self, BufferError> {
        let stride = packed_stride(width, layout)?;
        Self::from_vec_with_stride(data, width, height, layout, stride)
    }

    /// Wrap samples whose rows are `stride` bytes apart.
    pub fn from_vec_with_stride(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layout: PixelLayout,
        stride: usize,
    ) -> Result<Self, BufferError> {
        let min_stride = packed_stride(width, layout)?;
        if stride < min_stride {
            return Err(BufferError::StrideTooSmall);
        }
        let expected = checked_total(stride, height)?;
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            layout,
            stride,
            data,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout of the samples.
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Distance between rows in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Bytes of sample data per row, excluding padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    /// Whether rows are tightly packed.
    pub fn is_packed(&self) -> bool {
        self.stride == self.row_bytes()
    }

    /// Raw data, `stride * height` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw data. The length cannot change.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer, returning raw data including any row padding.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Samples of row `y`, without padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y as usize * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    /// Mutable samples of row `y`, without padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y as usize * self.stride;
        let len = self.row_bytes();
        &mut self.data[start..start + len]
    }

    /// Iterate over rows, without padding.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let row_bytes = self.row_bytes();
        self.data
            .chunks_exact(self.stride)
            .map(move |row| &row[..row_bytes])
    }

    /// Tightly packed samples; borrows when there is no padding.
    pub fn to_contiguous(&self) -> Cow<'_, [u8]> {
        if self.is_packed() {
            Cow::Borrowed(&self.data)
        } else {
            let mut packed = Vec::with_capacity(self.row_bytes() * self.height as usize);
            for row in self.rows() {
                packed.extend_from_slice(row);
            }
            Cow::Owned(packed)
        }
    }

    /// True iff geometry, layout, and stride match and every stored byte is
    /// identical, row padding included. There is no tolerance.
    pub fn equal_pixels(&self, other: &PixelBuffer) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.layout == other.layout
            && self.stride == other.stride
            && self.data == other.data
    }

    /// Lexicographic comparison of the raw data.
    pub fn byte_compare(&self, other: &PixelBuffer) -> Ordering {
        compare_bytes(&self.data, &other.data)
    }

    /// Typed view of a [`PixelLayout::Gray`] buffer.
    pub fn as_gray8(&self) -> Option<ImgRef<'_, Gray<u8>>> {
        self.typed_view(PixelLayout::Gray)
    }

    /// Typed view of a [`PixelLayout::Rgb`] buffer.
    pub fn as_rgb8(&self) -> Option<ImgRef<'_, Rgb<u8>>> {
        self.typed_view(PixelLayout::Rgb)
    }

    /// Typed view of a [`PixelLayout::Rgba`] buffer.
    pub fn as_rgba8(&self) -> Option<ImgRef<'_, Rgba<u8>>> {
        self.typed_view(PixelLayout::Rgba)
    }

    fn typed_view<P: bytemuck::Pod>(&self, layout: PixelLayout) -> Option<ImgRef<'_, P>> {
        let bpp = layout.bytes_per_pixel();
        if self.layout != layout || self.stride % bpp != 0 {
            return None;
        }
        let pixels: &[P] = bytemuck::try_cast_slice(&self.data).ok()?;
        Some(ImgRef::new_stride(
            pixels,
            self.width as usize,
            self.height as usize,
            self.stride / bpp,
        ))
    }

    fn from_img<P: bytemuck::Pod>(img: ImgVec<P>, layout: PixelLayout) -> Result<Self, BufferError> {
        let (pixels, width, height) = img.into_contiguous_buf();
        let width = u32::try_from(width).map_err(|_| BufferError::InvalidDimensions)?;
        let height = u32::try_from(height).map_err(|_| BufferError::InvalidDimensions)?;
        Self::from_vec(bytemuck::allocation::cast_vec(pixels), width, height, layout)
    }
}

impl TryFrom<ImgVec<Gray<u8>>> for PixelBuffer {
    type Error = BufferError;

    fn try_from(img: ImgVec<Gray<u8>>) -> Result<Self, Self::Error> {
        Self::from_img(img, PixelLayout::Gray)
    }
}

impl TryFrom<ImgVec<Rgb<u8>>> for PixelBuffer {
    type Error = BufferError;

    fn try_from(img: ImgVec<Rgb<u8>>) -> Result<Self, Self::Error> {
        Self::from_img(img, PixelLayout::Rgb)
    }
}

impl TryFrom<ImgVec<Rgba<u8>>> for PixelBuffer {
    type Error = BufferError;

    fn try_from(img: ImgVec<Rgba<u8>>) -> Result<Self, Self::Error> {
        Self::from_img(img, PixelLayout::Rgba)
    }
}

/// Lexicographic comparison of two byte blobs, e.g. two encoded outputs.
///
/// Encoders may legitimately emit different bytes for the same pixels, so a
/// non-equal result says nothing about pixel equality.
pub fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

fn packed_stride(width: u32, layout: PixelLayout) -> Result<usize, BufferError> {
    if width == 0 {
        return Err(BufferError::InvalidDimensions);
    }
    (width as usize)
        .checked_mul(layout.bytes_per_pixel())
        .ok_or(BufferError::InvalidDimensions)
}

fn checked_total(stride: usize, height: u32) -> Result<usize, BufferError> {
    if height == 0 {
        return Err(BufferError::InvalidDimensions);
    }
    stride
        .checked_mul(height as usize)
        .ok_or(BufferError::InvalidDimensions)
}
