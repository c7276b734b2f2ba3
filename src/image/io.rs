//! Convenience helpers for loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ImageView, OwnedImage};
use crate::util::{PyrScanError, PyrScanResult};
use std::path::Path;

/// Copies a view into an RGB buffer.
///
/// Grayscale pixels are replicated into all three channels; alpha is dropped.
pub fn rgb_image_from_view(view: ImageView<'_>) -> PyrScanResult<image::RgbImage> {
    let (width, height) = dims_u32(view)?;
    let mut data = Vec::with_capacity(view.width() * view.height() * 3);
    for y in 0..view.height() {
        let row = view.row(y).ok_or(PyrScanError::InvalidDimensions {
            width: view.width(),
            height: view.height(),
        })?;
        for px in row.chunks_exact(view.channels()) {
            match view.channels() {
                1 => data.extend_from_slice(&[px[0], px[0], px[0]]),
                _ => data.extend_from_slice(&px[..3]),
            }
        }
    }
    image::RgbImage::from_raw(width, height, data).ok_or(PyrScanError::InvalidDimensions {
        width: view.width(),
        height: view.height(),
    })
}

/// Takes ownership of an RGB buffer.
pub fn owned_from_rgb_image(img: image::RgbImage) -> PyrScanResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImage::new(img.into_raw(), width, height, 3)
}

/// Creates an owned RGB image from a dynamic image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> PyrScanResult<OwnedImage> {
    owned_from_rgb_image(img.to_rgb8())
}

/// Loads any decodable raster image from disk as RGB.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> PyrScanResult<OwnedImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| PyrScanError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })?;
    owned_from_dynamic_image(&img)
}

/// Writes an image to disk; the format follows the file extension.
pub fn save_image<P: AsRef<Path>>(img: ImageView<'_>, path: P) -> PyrScanResult<()> {
    let path = path.as_ref();
    let (width, height) = dims_u32(img)?;
    let data = img.to_owned_image().into_data();
    let color = match img.channels() {
        1 => image::ExtendedColorType::L8,
        3 => image::ExtendedColorType::Rgb8,
        4 => image::ExtendedColorType::Rgba8,
        channels => return Err(PyrScanError::InvalidChannels { channels }),
    };
    image::save_buffer(path, &data, width, height, color).map_err(|err| PyrScanError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })
}

fn dims_u32(img: ImageView<'_>) -> PyrScanResult<(u32, u32)> {
    let err = || PyrScanError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    };
    let width = u32::try_from(img.width()).map_err(|_| err())?;
    let height = u32::try_from(img.height()).map_err(|_| err())?;
    Ok((width, height))
}
