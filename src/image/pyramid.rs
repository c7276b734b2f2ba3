//! Lazy image pyramid for multi-scale window scanning.
//!
//! The first level is an unchanged copy of the base image. Every following
//! level shrinks the previous one: `width = trunc(prev_width / scale)` and
//! the height follows the aspect ratio of the previous level. Iteration stops
//! at (and excludes) the first level that falls below the minimum size. The
//! base level is always yielded, even when it is already below the minimum.
//!
//! Each level is produced on demand from the one yielded before it, so at
//! most one level beyond the consumer's current one is ever materialized.

use crate::image::resize::{height_for_width, resize_area};
use crate::image::{ImageView, OwnedImage};
use crate::util::{PyrScanError, PyrScanResult};

/// One level of the pyramid.
#[derive(Clone, Debug)]
pub struct PyramidLevel {
    /// Level index (0 is the base resolution).
    pub index: usize,
    /// Level pixels.
    pub image: OwnedImage,
}

/// Single-pass iterator over pyramid levels.
pub struct ImagePyramid {
    next: Option<OwnedImage>,
    index: usize,
    scale: f64,
    min_width: usize,
    min_height: usize,
}

impl ImagePyramid {
    /// Starts a pyramid over `base`.
    ///
    /// `scale` must be finite and greater than 1.
    pub fn new(
        base: ImageView<'_>,
        scale: f64,
        min_width: usize,
        min_height: usize,
    ) -> PyrScanResult<Self> {
        validate_scale(scale)?;
        Ok(Self {
            next: Some(base.to_owned_image()),
            index: 0,
            scale,
            min_width,
            min_height,
        })
    }

    /// Same as [`ImagePyramid::new`] but takes ownership of the base image.
    pub fn from_owned(
        base: OwnedImage,
        scale: f64,
        min_width: usize,
        min_height: usize,
    ) -> PyrScanResult<Self> {
        validate_scale(scale)?;
        Ok(Self {
            next: Some(base),
            index: 0,
            scale,
            min_width,
            min_height,
        })
    }

    fn shrink(&self, prev: &OwnedImage) -> Option<(usize, usize)> {
        next_level_size(
            prev.width(),
            prev.height(),
            self.scale,
            self.min_width,
            self.min_height,
        )
    }
}

impl Iterator for ImagePyramid {
    type Item = PyrScanResult<PyramidLevel>;

    fn next(&mut self) -> Option<Self::Item> {
        let image = self.next.take()?;
        let index = self.index;
        self.index += 1;

        if let Some((width, height)) = self.shrink(&image) {
            match resize_area(image.view(), width, height) {
                Ok(smaller) => self.next = Some(smaller),
                Err(err) => return Some(Err(err)),
            }
        }

        Some(Ok(PyramidLevel { index, image }))
    }
}

/// Computes the sizes of all levels without resampling any pixels.
pub fn pyramid_level_sizes(
    width: usize,
    height: usize,
    scale: f64,
    min_width: usize,
    min_height: usize,
) -> PyrScanResult<Vec<(usize, usize)>> {
    validate_scale(scale)?;
    let mut sizes = vec![(width, height)];
    let (mut w, mut h) = (width, height);
    while let Some(next) = next_level_size(w, h, scale, min_width, min_height) {
        sizes.push(next);
        (w, h) = next;
    }
    Ok(sizes)
}

fn next_level_size(
    width: usize,
    height: usize,
    scale: f64,
    min_width: usize,
    min_height: usize,
) -> Option<(usize, usize)> {
    let next_width = (width as f64 / scale) as usize;
    let next_height = height_for_width(width, height, next_width);
    if next_width == 0 || next_height == 0 {
        return None;
    }
    if next_width < min_width || next_height < min_height {
        return None;
    }
    Some((next_width, next_height))
}

fn validate_scale(scale: f64) -> PyrScanResult<()> {
    if !scale.is_finite() || scale <= 1.0 {
        return Err(PyrScanError::InvalidConfig("pyramid scale must be > 1"));
    }
    Ok(())
}
