//! Deterministic resampling.
//!
//! Shrinking uses area averaging: every destination pixel is the
//! coverage-weighted mean of the source pixels under its footprint, which
//! behaves like a box filter for integer ratios and never aliases. Enlarging
//! uses bilinear sampling with pixel-center alignment
//! (`src = (dst + 0.5) * ratio - 0.5`) and clamped borders. The final value
//! is rounded to the nearest integer and clamped to `[0, 255]`.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::to_u8;
use crate::util::{PyrScanError, PyrScanResult};

/// Resizes `src` to exactly `width` x `height`.
///
/// Area averaging is used on an axis pair when both axes shrink or keep
/// their size; otherwise bilinear sampling is used.
pub fn resize(src: ImageView<'_>, width: usize, height: usize) -> PyrScanResult<OwnedImage> {
    if width == 0 || height == 0 {
        return Err(PyrScanError::InvalidDimensions { width, height });
    }
    if width == src.width() && height == src.height() {
        return Ok(src.to_owned_image());
    }
    if width <= src.width() && height <= src.height() {
        resize_area(src, width, height)
    } else {
        resize_bilinear(src, width, height)
    }
}

/// Resizes `src` to `width`, deriving the height from the aspect ratio.
///
/// The height is `trunc(src_height * width / src_width)`, computed exactly in
/// integer arithmetic.
pub fn resize_to_width(src: ImageView<'_>, width: usize) -> PyrScanResult<OwnedImage> {
    let height = height_for_width(src.width(), src.height(), width);
    resize(src, width, height)
}

/// Height that keeps the aspect ratio of `src_width` x `src_height` at `width`.
pub fn height_for_width(src_width: usize, src_height: usize, width: usize) -> usize {
    if src_width == 0 {
        return 0;
    }
    let scaled = src_height as u128 * width as u128 / src_width as u128;
    usize::try_from(scaled).unwrap_or(usize::MAX)
}

/// Area-averaging downscale.
pub fn resize_area(src: ImageView<'_>, width: usize, height: usize) -> PyrScanResult<OwnedImage> {
    if width == 0 || height == 0 {
        return Err(PyrScanError::InvalidDimensions { width, height });
    }
    let channels = src.channels();
    let x_taps = area_taps(src.width(), width);
    let y_taps = area_taps(src.height(), height);
    let norm = (src.width() as f64 / width as f64) * (src.height() as f64 / height as f64);
    let inv_norm = (1.0 / norm) as f32;

    let mut out = vec![0u8; width * height * channels];
    let mut acc = vec![0.0f32; width * channels];
    for (y, ytaps) in y_taps.iter().enumerate() {
        acc.iter_mut().for_each(|v| *v = 0.0);
        for &(sy, wy) in ytaps {
            let row = src.row(sy).ok_or(PyrScanError::BufferTooSmall {
                needed: (sy + 1) * src.stride(),
                got: src.as_slice().len(),
            })?;
            for (x, xtaps) in x_taps.iter().enumerate() {
                for &(sx, wx) in xtaps {
                    let w = wx * wy;
                    let base = sx * channels;
                    for c in 0..channels {
                        acc[x * channels + c] += w * row[base + c] as f32;
                    }
                }
            }
        }
        let dst = &mut out[y * width * channels..(y + 1) * width * channels];
        for (d, a) in dst.iter_mut().zip(acc.iter()) {
            *d = to_u8(a * inv_norm);
        }
    }

    OwnedImage::new(out, width, height, channels)
}

/// Bilinear resize with pixel-center alignment.
pub fn resize_bilinear(
    src: ImageView<'_>,
    width: usize,
    height: usize,
) -> PyrScanResult<OwnedImage> {
    if width == 0 || height == 0 {
        return Err(PyrScanError::InvalidDimensions { width, height });
    }
    let channels = src.channels();
    let x_taps = bilinear_taps(src.width(), width);
    let y_taps = bilinear_taps(src.height(), height);

    let mut out = vec![0u8; width * height * channels];
    for (y, &(y0, y1, fy)) in y_taps.iter().enumerate() {
        let (row0, row1) = match (src.row(y0), src.row(y1)) {
            (Some(row0), Some(row1)) => (row0, row1),
            _ => {
                return Err(PyrScanError::BufferTooSmall {
                    needed: (y1 + 1) * src.stride(),
                    got: src.as_slice().len(),
                })
            }
        };
        for (x, &(x0, x1, fx)) in x_taps.iter().enumerate() {
            let w00 = (1.0 - fx) * (1.0 - fy);
            let w10 = fx * (1.0 - fy);
            let w01 = (1.0 - fx) * fy;
            let w11 = fx * fy;
            for c in 0..channels {
                let a = row0[x0 * channels + c] as f32;
                let b = row0[x1 * channels + c] as f32;
                let cc = row1[x0 * channels + c] as f32;
                let d = row1[x1 * channels + c] as f32;
                let value = a * w00 + b * w10 + cc * w01 + d * w11;
                out[(y * width + x) * channels + c] = to_u8(value);
            }
        }
    }

    OwnedImage::new(out, width, height, channels)
}

/// Source indices and coverage weights for each destination index.
fn area_taps(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let ratio = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * ratio;
            let end = ((d + 1) as f64 * ratio).min(src_len as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let lo = start.max(s as f64);
                    let hi = end.min((s + 1) as f64);
                    let w = hi - lo;
                    (w > 1e-9).then_some((s, w as f32))
                })
                .collect()
        })
        .collect()
}

/// Neighbor indices and the interpolation fraction for each destination index.
fn bilinear_taps(src_len: usize, dst_len: usize) -> Vec<(usize, usize, f32)> {
    let ratio = src_len as f32 / dst_len as f32;
    let max = (src_len - 1) as f32;
    (0..dst_len)
        .map(|d| {
            let s = ((d as f32 + 0.5) * ratio - 0.5).clamp(0.0, max);
            let s0 = s.floor() as usize;
            let s1 = (s0 + 1).min(src_len - 1);
            (s0, s1, s - s0 as f32)
        })
        .collect()
}
