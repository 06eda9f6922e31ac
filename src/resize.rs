//! Separable image resampling.
//!
//! Resizing runs two passes: every source row is filtered horizontally into a
//! floating-point scratch image of the target width, then every target row is
//! filtered vertically out of that scratch. Filter weights are computed once
//! per axis and normalized to sum to one, so flat regions stay flat.
//!
//! The output keeps the source [`PixelLayout`](crate::PixelLayout) and is
//! tightly packed.

use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::PI;
use core::str::FromStr;

use rayon::prelude::*;

use crate::buffer::{BufferError, PixelBuffer};
use crate::config::UnknownValue;

/// Filter scale used when neither a filter nor a scale is chosen.
pub const DEFAULT_FILTER_SCALE: f32 = 0.70;

/// Resampling kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[non_exhaustive]
pub enum ResizeFilter {
    /// Smooth cubic, support 2.
    #[default]
    Cubic,
    /// Lanczos windowed sinc, a = 2.
    Lanczos,
    /// Catmull-Rom spline (B = 0, C = 0.5).
    CatmullRom,
    /// Mitchell-Netravali (B = C = 1/3).
    Mitchell,
    /// Box, support 0.5.
    Box,
    /// Tent, support 1.
    Triangle,
}

impl ResizeFilter {
    /// Every filter.
    pub const ALL: [ResizeFilter; 6] = [
        ResizeFilter::Cubic,
        ResizeFilter::Lanczos,
        ResizeFilter::CatmullRom,
        ResizeFilter::Mitchell,
        ResizeFilter::Box,
        ResizeFilter::Triangle,
    ];

    /// Option string for this filter.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResizeFilter::Cubic => "cubic",
            ResizeFilter::Lanczos => "lanczos",
            ResizeFilter::CatmullRom => "catmullrom",
            ResizeFilter::Mitchell => "mitchell",
            ResizeFilter::Box => "box",
            ResizeFilter::Triangle => "triangle",
        }
    }

    /// Kernel radius at filter scale 1, in source pixels.
    pub const fn support(self) -> f32 {
        match self {
            ResizeFilter::Cubic
            | ResizeFilter::Lanczos
            | ResizeFilter::CatmullRom
            | ResizeFilter::Mitchell => 2.0,
            ResizeFilter::Box => 0.5,
            ResizeFilter::Triangle => 1.0,
        }
    }

    /// Unnormalized kernel value at offset `x`.
    fn weight(self, x: f32) -> f32 {
        let x = x.abs();
        if x > self.support() {
            return 0.0;
        }
        match self {
            ResizeFilter::Cubic => 1.0 - x * x * (0.75 - 0.25 * x),
            ResizeFilter::Lanczos => {
                let px = x * PI;
                if px == 0.0 {
                    1.0
                } else {
                    2.0 * px.sin() * (px / 2.0).sin() / (px * px)
                }
            }
            ResizeFilter::CatmullRom => bicubic(x, 0.0, 0.5),
            ResizeFilter::Mitchell => bicubic(x, 1.0 / 3.0, 1.0 / 3.0),
            ResizeFilter::Box => 1.0,
            ResizeFilter::Triangle => 1.0 - x,
        }
    }
}

/// Mitchell-Netravali family, `0 <= x <= 2`.
fn bicubic(x: f32, b: f32, c: f32) -> f32 {
    if x < 1.0 {
        let a3 = (12.0 - 9.0 * b - 6.0 * c) / 6.0;
        let a2 = (-18.0 + 12.0 * b + 6.0 * c) / 6.0;
        let a0 = (6.0 - 2.0 * b) / 6.0;
        a0 + x * x * (a2 + x * a3)
    } else {
        let b3 = (-b - 6.0 * c) / 6.0;
        let b2 = (6.0 * b + 30.0 * c) / 6.0;
        let b1 = (-12.0 * b - 48.0 * c) / 6.0;
        let b0 = (8.0 * b + 24.0 * c) / 6.0;
        b0 + x * (b1 + x * (b2 + x * b3))
    }
}

impl core::fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeFilter {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catmulrom" => Ok(ResizeFilter::CatmullRom),
            "mitchel" => Ok(ResizeFilter::Mitchell),
            _ => Self::ALL
                .into_iter()
                .find(|f| f.as_str() == s)
                .ok_or_else(|| UnknownValue(s.into())),
        }
    }
}

/// Errors from [`resize`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResizeError {
    /// Target width or height is zero.
    #[error("invalid target dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// Filter scale is NaN, infinite, zero, or negative.
    #[error("invalid filter scale {0}")]
    InvalidFilterScale(f32),
    /// The target buffer could not be allocated.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Target geometry and kernel for [`resize`].
///
/// ```
/// use zenpicha::{ResizeFilter, ResizeOptions};
///
/// let opts = ResizeOptions::new(320, 200).with_filter(ResizeFilter::Lanczos);
/// assert_eq!(opts.filter_scale(), 1.0);
/// assert_eq!(ResizeOptions::new(320, 200).filter_scale(), 0.70);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeOptions {
    width: u32,
    height: u32,
    filter: Option<ResizeFilter>,
    filter_scale: Option<f32>,
}

impl ResizeOptions {
    /// Resize to `width` x `height` with the default cubic kernel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: None,
            filter_scale: None,
        }
    }

    /// Choose a kernel. Unless a scale is also set, the kernel runs at
    /// scale 1.
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Stretch (> 1) or narrow (< 1) the kernel. Smaller values sharpen.
    pub fn with_filter_scale(mut self, scale: f32) -> Self {
        self.filter_scale = Some(scale);
        self
    }

    /// Target width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Target height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Kernel in effect.
    pub fn filter(&self) -> ResizeFilter {
        self.filter.unwrap_or_default()
    }

    /// Kernel scale in effect.
    pub fn filter_scale(&self) -> f32 {
        match (self.filter_scale, self.filter) {
            (Some(scale), _) => scale,
            (None, Some(_)) => 1.0,
            (None, None) => DEFAULT_FILTER_SCALE,
        }
    }

    fn validate(&self) -> Result<(), ResizeError> {
        if self.width == 0 || self.height == 0 {
            return Err(ResizeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let scale = self.filter_scale();
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ResizeError::InvalidFilterScale(scale));
        }
        Ok(())
    }
}

/// One target sample's window into the source axis.
#[derive(Clone, Copy, Debug)]
struct Span {
    first: usize,
    start: usize,
    len: usize,
}

/// Pre-computed normalized weights for one axis.
#[derive(Debug)]
struct Contributions {
    spans: Vec<Span>,
    weights: Vec<f32>,
}

impl Contributions {
    fn new(filter: ResizeFilter, filter_scale: f32, src_len: u32, dst_len: u32) -> Self {
        let scale = src_len as f32 / dst_len as f32;
        let support = filter.support() * filter_scale;
        // Widen the kernel when downscaling, and never below one source pixel.
        let fscale = scale.max(1.0).max(1.0 / support);
        let fsupport = support * fscale;
        let inv = 1.0 / (fscale * filter_scale);
        let last = i64::from(src_len) - 1;

        let mut spans = Vec::with_capacity(dst_len as usize);
        let mut weights = Vec::with_capacity(dst_len as usize * (2.0 * fsupport).ceil() as usize);

        for i in 0..dst_len {
            let center = (i as f32 + 0.5) * scale;
            let weight = |j: i64| filter.weight((center - (j as f32 + 0.5)) * inv);

            let mut left = ((center - 0.5 - fsupport).ceil() as i64).clamp(0, last);
            let mut right = ((center - 0.5 + fsupport).floor() as i64).clamp(0, last);
            while left < right && weight(left) == 0.0 {
                left += 1;
            }
            while right > left && weight(right) == 0.0 {
                right -= 1;
            }

            let start = weights.len();
            let mut total = 0.0f32;
            for j in left..=right {
                let w = weight(j);
                weights.push(w);
                total += w;
            }

            if total.abs() > f32::EPSILON {
                let norm = 1.0 / total;
                weights[start..].iter_mut().for_each(|w| *w *= norm);
            } else {
                // Degenerate window: take the nearest source sample.
                weights.truncate(start);
                weights.push(1.0);
                left = ((center - 0.5).round() as i64).clamp(0, last);
            }

            spans.push(Span {
                first: left as usize,
                start,
                len: weights.len() - start,
            });
        }

        Self { spans, weights }
    }

    fn weights(&self, span: Span) -> &[f32] {
        &self.weights[span.start..span.start + span.len]
    }
}

#[inline]
fn to_sample(v: f32) -> u8 {
    if v <= 0.0 {
        0
    } else if v >= 255.0 {
        255
    } else {
        (v + 0.5) as u8
    }
}

/// Resample `src` to the geometry in `options`.
///
/// Rows are processed in parallel on the current rayon pool.
pub fn resize(src: &PixelBuffer, options: &ResizeOptions) -> Result<PixelBuffer, ResizeError> {
    options.validate()?;
    let (dst_w, dst_h) = (options.width(), options.height());
    let layout = src.layout();
    let channels = layout.bytes_per_pixel();
    let filter = options.filter();
    let filter_scale = options.filter_scale();

    let mut dst = PixelBuffer::new(dst_w, dst_h, layout)?;
    let scratch_row = dst_w as usize * channels;
    let scratch_len = scratch_row
        .checked_mul(src.height() as usize)
        .filter(|len| {
            len.checked_mul(core::mem::size_of::<f32>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or(BufferError::InvalidDimensions)?;

    let horizontal = Contributions::new(filter, filter_scale, src.width(), dst_w);
    let vertical = Contributions::new(filter, filter_scale, src.height(), dst_h);

    // Horizontal pass: every source row, target width.
    let mut scratch = vec![0.0f32; scratch_len];
    scratch
        .par_chunks_mut(scratch_row)
        .enumerate()
        .for_each(|(y, out)| {
            let row = src.row(y as u32);
            for (x, span) in horizontal.spans.iter().enumerate() {
                let acc = &mut out[x * channels..(x + 1) * channels];
                for (k, w) in horizontal.weights(*span).iter().enumerate() {
                    let px = (span.first + k) * channels;
                    for (a, s) in acc.iter_mut().zip(&row[px..px + channels]) {
                        *a += w * f32::from(*s);
                    }
                }
            }
        });

    // Vertical pass: every target row out of the scratch rows it covers.
    let dst_row = dst.row_bytes();
    dst.data_mut()
        .par_chunks_mut(dst_row)
        .zip(vertical.spans.par_iter())
        .for_each(|(out, span)| {
            let weights = vertical.weights(*span);
            for (i, sample) in out.iter_mut().enumerate() {
                let v: f32 = weights
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * scratch[(span.first + k) * scratch_row + i])
                    .sum();
                *sample = to_sample(v);
            }
        });

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelLayout;

    fn gradient(w: u32, h: u32, layout: PixelLayout) -> PixelBuffer {
        let bpp = layout.bytes_per_pixel();
        let data = (0..h)
            .flat_map(|y| (0..w).flat_map(move |x| (0..bpp).map(move |c| (x * 7 + y * 3 + c as u32 * 40) as u8)))
            .collect();
        PixelBuffer::from_vec(data, w, h, layout).unwrap()
    }

    #[test]
    fn oversized_target_fails_before_allocating() {
        let src = gradient(4, 4, PixelLayout::Rgba);
        let err = resize(&src, &ResizeOptions::new(u32::MAX, u32::MAX)).unwrap_err();
        assert!(matches!(err, ResizeError::Buffer(BufferError::InvalidDimensions)), "{err:?}");
    }

    #[test]
    fn filter_scale_follows_filter_choice() {
        assert_eq!(ResizeOptions::new(1, 1).filter(), ResizeFilter::Cubic);
        assert_eq!(ResizeOptions::new(1, 1).filter_scale(), DEFAULT_FILTER_SCALE);
        let opts = ResizeOptions::new(1, 1).with_filter(ResizeFilter::Cubic);
        assert_eq!(opts.filter_scale(), 1.0);
        let opts = ResizeOptions::new(1, 1)
            .with_filter_scale(1.5)
            .with_filter(ResizeFilter::Box);
        assert_eq!(opts.filter_scale(), 1.5);
    }

    #[test]
    fn parses_filter_names() {
        for filter in ResizeFilter::ALL {
            assert_eq!(filter.as_str().parse::<ResizeFilter>(), Ok(filter));
        }
        assert_eq!("catmulrom".parse(), Ok(ResizeFilter::CatmullRom));
        assert_eq!("mitchel".parse(), Ok(ResizeFilter::Mitchell));
        assert!("bilinear".parse::<ResizeFilter>().is_err());
    }

    #[test]
    fn kernels_peak_at_zero_and_vanish_outside_support() {
        for filter in ResizeFilter::ALL {
            let peak = filter.weight(0.0);
            assert!(peak > 0.0 && peak >= filter.weight(0.5), "{filter}");
            assert_eq!(filter.weight(filter.support() + 0.01), 0.0, "{filter}");
        }
    }

    #[test]
    fn rejects_bad_options() {
        let src = gradient(4, 4, PixelLayout::Rgb);
        assert!(matches!(
            resize(&src, &ResizeOptions::new(0, 4)),
            Err(ResizeError::InvalidDimensions { width: 0, height: 4 })
        ));
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let opts = ResizeOptions::new(2, 2).with_filter_scale(scale);
            assert!(
                matches!(resize(&src, &opts), Err(ResizeError::InvalidFilterScale(_))),
                "{scale}"
            );
        }
    }

    #[test]
    fn flat_image_stays_flat_under_every_filter() {
        let src = PixelBuffer::from_vec(vec![77u8; 9 * 7 * 4], 9, 7, PixelLayout::Rgba).unwrap();
        for filter in ResizeFilter::ALL {
            for (w, h) in [(3, 2), (20, 15), (9, 7)] {
                let out = resize(&src, &ResizeOptions::new(w, h).with_filter(filter)).unwrap();
                assert_eq!((out.width(), out.height()), (w, h));
                assert_eq!(out.layout(), PixelLayout::Rgba);
                assert!(out.data().iter().all(|&v| v == 77), "{filter} {w}x{h}");
            }
        }
    }

    #[test]
    fn triangle_at_same_size_is_identity() {
        let src = gradient(11, 6, PixelLayout::Rgb);
        let out = resize(&src, &ResizeOptions::new(11, 6).with_filter(ResizeFilter::Triangle)).unwrap();
        assert!(out.equal_pixels(&src));
    }

    #[test]
    fn box_halving_averages_pairs() {
        let src = PixelBuffer::from_vec(vec![10, 30, 100, 200], 4, 1, PixelLayout::Gray).unwrap();
        let out = resize(&src, &ResizeOptions::new(2, 1).with_filter(ResizeFilter::Box)).unwrap();
        assert_eq!(out.data(), &[20, 150]);
    }

    #[test]
    fn padded_source_is_read_by_row() {
        let packed = gradient(5, 4, PixelLayout::GrayAlpha);
        let mut padded = vec![0xEEu8; 16 * 4];
        for (y, row) in packed.rows().enumerate() {
            padded[y * 16..y * 16 + row.len()].copy_from_slice(row);
        }
        let padded = PixelBuffer::from_vec_with_stride(padded, 5, 4, PixelLayout::GrayAlpha, 16).unwrap();

        let opts = ResizeOptions::new(3, 3).with_filter(ResizeFilter::Mitchell);
        let a = resize(&packed, &opts).unwrap();
        let b = resize(&padded, &opts).unwrap();
        assert!(a.equal_pixels(&b));
    }
}
