//! Fixed-size sliding window over a single image.
//!
//! Placements are generated in row-major order (`y` outer, `x` inner). The
//! ranges are `0..W - win_width` and `0..H - win_height` stepped by `step`,
//! with an exclusive upper bound, so a window that would touch or cross the
//! far edge is never emitted and an image that is not larger than the window
//! yields nothing.

use crate::image::ImageView;
use crate::util::{PyrScanError, PyrScanResult};

/// A window placement and its zero-copy pixel view.
#[derive(Clone, Copy, Debug)]
pub struct Window<'a> {
    /// Left edge in image coordinates.
    pub x: usize,
    /// Top edge in image coordinates.
    pub y: usize,
    /// Pixels under the window.
    pub view: ImageView<'a>,
}

/// Row-major sliding-window iterator.
pub struct SlidingWindow<'a> {
    image: ImageView<'a>,
    step: usize,
    win_width: usize,
    win_height: usize,
    x_end: usize,
    y_end: usize,
    x: usize,
    y: usize,
}

impl<'a> SlidingWindow<'a> {
    /// Creates a sliding window with stride `step` and a fixed window size.
    pub fn new(
        image: ImageView<'a>,
        step: usize,
        win_width: usize,
        win_height: usize,
    ) -> PyrScanResult<Self> {
        if step == 0 {
            return Err(PyrScanError::InvalidConfig("window step must be > 0"));
        }
        if win_width == 0 || win_height == 0 {
            return Err(PyrScanError::InvalidConfig("window size must be non-zero"));
        }
        Ok(Self {
            image,
            step,
            win_width,
            win_height,
            x_end: image.width().saturating_sub(win_width),
            y_end: image.height().saturating_sub(win_height),
            x: 0,
            y: 0,
        })
    }

    /// Number of placements along each axis `(columns, rows)`.
    pub fn grid_size(&self) -> (usize, usize) {
        (
            self.x_end.div_ceil(self.step),
            self.y_end.div_ceil(self.step),
        )
    }

    fn remaining(&self) -> usize {
        let (cols, rows) = self.grid_size();
        if self.y >= self.y_end || self.x_end == 0 {
            return 0;
        }
        let row = self.y / self.step;
        let col = self.x / self.step;
        (rows - row - 1) * cols + (cols - col)
    }
}

impl<'a> Iterator for SlidingWindow<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.x_end == 0 {
            return None;
        }
        while self.y < self.y_end {
            if self.x < self.x_end {
                let (x, y) = (self.x, self.y);
                self.x += self.step;
                // Placements are strictly inside the image, so the ROI is valid.
                if let Ok(view) = self.image.roi(x, y, self.win_width, self.win_height) {
                    return Some(Window { x, y, view });
                }
                continue;
            }
            self.x = 0;
            self.y += self.step;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlidingWindow<'_> {}
