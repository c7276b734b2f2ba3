//! Image views, owned buffers, resampling and the detection pyramid.
//!
//! Pixels are interleaved `u8` samples with 1, 3 or 4 channels. `ImageView`
//! is a borrowed 2D view into a 1D buffer with an explicit stride counted in
//! bytes between the starts of consecutive rows, so a stride larger than
//! `width * channels` represents padded rows. ROI slices are zero-copy views
//! into the same backing slice and retain the original stride.

use crate::util::{PyrScanError, PyrScanResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;
pub mod resize;

/// Borrowed interleaved image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl<'a> ImageView<'a> {
    /// Creates a contiguous view with `stride == width * channels`.
    pub fn from_slice(
        data: &'a [u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> PyrScanResult<Self> {
        let row_len = row_len(width, channels)?;
        Self::new(data, width, height, channels, row_len)
    }

    /// Creates a view with an explicit stride in bytes.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> PyrScanResult<Self> {
        let needed = required_len(width, height, channels, stride)?;
        if data.len() < needed {
            return Err(PyrScanError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the stride in bytes between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the samples of pixel `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y
            .checked_mul(self.stride)?
            .checked_add(x.checked_mul(self.channels)?)?;
        self.data.get(start..start + self.channels)
    }

    /// Returns row `y` with length `width * channels`.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> PyrScanResult<Self> {
        if width == 0 || height == 0 {
            return Err(PyrScanError::InvalidDimensions { width, height });
        }
        let out_of_bounds = PyrScanError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x * self.channels))
            .ok_or(PyrScanError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self
            .data
            .get(start..)
            .ok_or(PyrScanError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, width, height, self.channels, self.stride)
    }

    /// Copies the view into a contiguous owned image.
    pub fn to_owned_image(&self) -> OwnedImage {
        let row_len = self.width * self.channels;
        let mut data = Vec::with_capacity(row_len * self.height);
        for y in 0..self.height {
            let start = y * self.stride;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }
}

/// Owned contiguous interleaved image buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl OwnedImage {
    /// Wraps a contiguous buffer of exactly `width * height * channels` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> PyrScanResult<Self> {
        let row_len = row_len(width, channels)?;
        let needed = required_len(width, height, channels, row_len)?;
        if data.len() < needed {
            return Err(PyrScanError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(PyrScanError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Creates an image filled with a constant per-channel value.
    pub fn filled(width: usize, height: usize, value: &[u8]) -> PyrScanResult<Self> {
        let channels = value.len();
        let row_len = row_len(width, channels)?;
        let needed = required_len(width, height, channels, row_len)?;
        let data = value.iter().copied().cycle().take(needed).collect();
        Self::new(data, width, height, channels)
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            stride: self.width * self.channels,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the contiguous pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the image and returns its pixel data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

fn row_len(width: usize, channels: usize) -> PyrScanResult<usize> {
    if !matches!(channels, 1 | 3 | 4) {
        return Err(PyrScanError::InvalidChannels { channels });
    }
    width
        .checked_mul(channels)
        .ok_or(PyrScanError::InvalidDimensions { width, height: 0 })
}

fn required_len(
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
) -> PyrScanResult<usize> {
    if width == 0 || height == 0 {
        return Err(PyrScanError::InvalidDimensions { width, height });
    }
    let row_len = row_len(width, channels)?;
    if stride < row_len {
        return Err(PyrScanError::InvalidStride { row_len, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(PyrScanError::InvalidDimensions { width, height })
}
