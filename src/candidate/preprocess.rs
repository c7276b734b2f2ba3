//! Crop preparation for the scorer: resize plus per-channel normalization.
//!
//! The scorer consumes `f32` tensors in HWC order. Four-channel input drops
//! its alpha channel; grayscale input stays single-channel and uses the
//! first mean/std entry.

use crate::image::resize::resize;
use crate::image::ImageView;
use crate::util::{PyrScanError, PyrScanResult};

/// ImageNet channel means in RGB order, for `[0, 1]` inputs.
const IMAGENET_MEAN_RGB: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations in RGB order.
const IMAGENET_STD_RGB: [f32; 3] = [0.229, 0.224, 0.225];
/// ImageNet channel means in BGR order, for `[0, 255]` inputs.
const IMAGENET_MEAN_BGR_255: [f32; 3] = [103.939, 116.779, 123.68];

/// Explicit affine transform: `(sample * scale - mean[c]) / std[c]`.
///
/// With `swap_rb` the red and blue channels are exchanged before the means
/// are applied, so `mean` and `std` are given in output channel order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelTransform {
    /// Per-channel mean subtracted after scaling.
    pub mean: [f32; 3],
    /// Per-channel divisor applied last.
    pub std: [f32; 3],
    /// Multiplier applied to the raw `u8` sample.
    pub scale: f32,
    /// Emit BGR instead of RGB.
    pub swap_rb: bool,
}

/// Input normalization required by the scoring model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Normalization {
    /// Convert to BGR and subtract the ImageNet means (ResNet50 in Keras).
    #[default]
    Caffe,
    /// Scale to `[0, 1]`, then ImageNet mean/std in RGB (torchvision models).
    Torch,
    /// Scale to `[-1, 1]`.
    Tf,
    /// Scale to `[0, 1]`.
    Unit,
    /// Caller-provided transform.
    Custom(ChannelTransform),
}

impl Normalization {
    /// Resolves the preset into its explicit transform.
    pub fn transform(&self) -> ChannelTransform {
        match *self {
            Normalization::Caffe => ChannelTransform {
                mean: IMAGENET_MEAN_BGR_255,
                std: [1.0; 3],
                scale: 1.0,
                swap_rb: true,
            },
            Normalization::Torch => ChannelTransform {
                mean: IMAGENET_MEAN_RGB,
                std: IMAGENET_STD_RGB,
                scale: 1.0 / 255.0,
                swap_rb: false,
            },
            Normalization::Tf => ChannelTransform {
                mean: [1.0; 3],
                std: [1.0; 3],
                scale: 1.0 / 127.5,
                swap_rb: false,
            },
            Normalization::Unit => ChannelTransform {
                mean: [0.0; 3],
                std: [1.0; 3],
                scale: 1.0 / 255.0,
                swap_rb: false,
            },
            Normalization::Custom(transform) => transform,
        }
    }

    pub(crate) fn validate(&self) -> PyrScanResult<()> {
        let t = self.transform();
        if !t.scale.is_finite() || t.scale == 0.0 {
            return Err(PyrScanError::InvalidConfig("normalization scale must be non-zero"));
        }
        if t.mean.iter().any(|m| !m.is_finite()) {
            return Err(PyrScanError::InvalidConfig("normalization mean must be finite"));
        }
        if t.std.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(PyrScanError::InvalidConfig("normalization std must be non-zero"));
        }
        Ok(())
    }
}

/// A normalized model input tensor in HWC order.
#[derive(Clone, Debug, PartialEq)]
pub struct Crop {
    data: Vec<f32>,
    width: usize,
    height: usize,
    channels: usize,
}

impl Crop {
    /// Wraps a HWC tensor of exactly `width * height * channels` values.
    pub fn new(data: Vec<f32>, width: usize, height: usize, channels: usize) -> PyrScanResult<Self> {
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(PyrScanError::InvalidDimensions { width, height })?;
        if needed == 0 {
            return Err(PyrScanError::InvalidDimensions { width, height });
        }
        if data.len() != needed {
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
        })
    }

    /// Tensor width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Tensor height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw HWC values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(x, y, channel)`.
    pub fn at(&self, x: usize, y: usize, channel: usize) -> Option<f32> {
        if x >= self.width || y >= self.height || channel >= self.channels {
            return None;
        }
        self.data
            .get((y * self.width + x) * self.channels + channel)
            .copied()
    }

    /// Copies the tensor into CHW order.
    pub fn to_chw(&self) -> Vec<f32> {
        let plane = self.width * self.height;
        let mut out = vec![0.0f32; self.data.len()];
        for (idx, px) in self.data.chunks_exact(self.channels).enumerate() {
            for (c, value) in px.iter().enumerate() {
                out[c * plane + idx] = *value;
            }
        }
        out
    }
}

/// Resizes a window to the model input size and normalizes it.
pub fn prepare_crop(
    window: ImageView<'_>,
    input_width: usize,
    input_height: usize,
    normalization: &Normalization,
) -> PyrScanResult<Crop> {
    let resized = resize(window, input_width, input_height)?;
    let transform = normalization.transform();
    let in_channels = resized.channels();
    let out_channels = in_channels.min(3);

    let mut data = Vec::with_capacity(input_width * input_height * out_channels);
    for px in resized.data().chunks_exact(in_channels) {
        for c in 0..out_channels {
            let src = if transform.swap_rb && out_channels == 3 {
                2 - c
            } else {
                c
            };
            let value = px[src] as f32 * transform.scale;
            data.push((value - transform.mean[c]) / transform.std[c]);
        }
    }
    Crop::new(data, input_width, input_height, out_channels)
}

#[cfg(test)]
mod tests {
    use super::{prepare_crop, ChannelTransform, Crop, Normalization};
    use crate::image::OwnedImage;

    #[test]
    fn caffe_swaps_channels_and_subtracts_means() {
        let img = OwnedImage::filled(4, 4, &[200, 100, 50]).unwrap();
        let crop = prepare_crop(img.view(), 2, 2, &Normalization::Caffe).unwrap();
        assert_eq!(crop.channels(), 3);
        let b = crop.at(0, 0, 0).unwrap();
        let g = crop.at(0, 0, 1).unwrap();
        let r = crop.at(0, 0, 2).unwrap();
        assert!((b - (50.0 - 103.939)).abs() < 1e-4);
        assert!((g - (100.0 - 116.779)).abs() < 1e-4);
        assert!((r - (200.0 - 123.68)).abs() < 1e-4);
    }

    #[test]
    fn tf_maps_to_unit_interval() {
        let img = OwnedImage::filled(3, 3, &[0, 255, 0, 255]).unwrap();
        let crop = prepare_crop(img.view(), 3, 3, &Normalization::Tf).unwrap();
        assert_eq!(crop.channels(), 3);
        assert!((crop.at(1, 1, 0).unwrap() + 1.0).abs() < 1e-6);
        assert!((crop.at(1, 1, 1).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn custom_transform_on_grayscale_uses_first_entry() {
        let transform = ChannelTransform {
            mean: [10.0, 0.0, 0.0],
            std: [2.0, 1.0, 1.0],
            scale: 1.0,
            swap_rb: true,
        };
        let img = OwnedImage::filled(2, 2, &[30]).unwrap();
        let crop = prepare_crop(img.view(), 2, 2, &Normalization::Custom(transform)).unwrap();
        assert_eq!(crop.channels(), 1);
        assert!(crop.data().iter().all(|&v| (v - 10.0).abs() < 1e-6));
    }

    #[test]
    fn chw_layout_groups_planes() {
        let crop = Crop::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 1, 3).unwrap();
        assert_eq!(crop.to_chw(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn zero_std_is_rejected() {
        let norm = Normalization::Custom(ChannelTransform {
            mean: [0.0; 3],
            std: [1.0, 0.0, 1.0],
            scale: 1.0,
            swap_rb: false,
        });
        assert!(norm.validate().is_err());
    }
}
