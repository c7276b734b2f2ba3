//! Box and label overlays for debug visualization and result images.
//!
//! Available when the `image-io` feature is enabled. Overlays are RGB copies
//! of the base image: grayscale is replicated and alpha is dropped. A label
//! sits just above its box, or just below the box's top edge when the box is
//! near the top of the image.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::candidate::{BBox, ScoredBox};
use crate::image::io::{owned_from_rgb_image, rgb_image_from_view};
use crate::image::{ImageView, OwnedImage};
use crate::util::{PyrScanError, PyrScanResult};

const BUILTIN_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Vertical distance between the box's top edge and the label baseline.
const LABEL_OFFSET: usize = 10;

/// Outline color and thickness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxStyle {
    /// RGB color of outlines and labels.
    pub color: [u8; 3],
    /// Line thickness in pixels, drawn inward from the box edge.
    pub thickness: usize,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            thickness: 2,
        }
    }
}

/// Font and pixel height used for label text.
#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
    scale: PxScale,
}

impl LabelFont {
    /// The bundled DejaVu Sans Mono face.
    pub fn builtin(px_height: f32) -> PyrScanResult<Self> {
        Self::from_bytes(BUILTIN_FONT.to_vec(), px_height)
    }

    /// Parses a TrueType/OpenType font.
    pub fn from_bytes(data: Vec<u8>, px_height: f32) -> PyrScanResult<Self> {
        if !px_height.is_finite() || px_height <= 0.0 {
            return Err(PyrScanError::InvalidConfig("label height must be > 0"));
        }
        let font = FontArc::try_from_vec(data).map_err(|err| PyrScanError::ImageIo {
            reason: format!("invalid font: {err}"),
        })?;
        Ok(Self {
            font,
            scale: PxScale::from(px_height),
        })
    }

    /// Reads a font file from disk.
    pub fn load<P: AsRef<Path>>(path: P, px_height: f32) -> PyrScanResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| PyrScanError::ImageIo {
            reason: format!("{}: {err}", path.display()),
        })?;
        Self::from_bytes(data, px_height)
    }
}

/// Baseline row of the label drawn for `bbox`.
pub fn label_baseline(bbox: &BBox) -> usize {
    if bbox.start_y > 2 * LABEL_OFFSET {
        bbox.start_y - LABEL_OFFSET
    } else {
        bbox.start_y + LABEL_OFFSET
    }
}

/// Draws the outline of `bbox` in place. Parts outside the canvas are clipped.
pub fn draw_box(canvas: &mut RgbImage, bbox: &BBox, style: BoxStyle) {
    let clipped = bbox.clamp_to(canvas.width() as usize, canvas.height() as usize);
    for inset in 0..style.thickness.max(1) {
        let width = clipped.width().saturating_sub(2 * inset);
        let height = clipped.height().saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at(
            (clipped.start_x + inset) as i32,
            (clipped.start_y + inset) as i32,
        )
        .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, Rgb(style.color));
    }
}

/// Draws `label` with its baseline at [`label_baseline`], starting at the
/// box's left edge.
pub fn draw_label(
    canvas: &mut RgbImage,
    bbox: &BBox,
    label: &str,
    font: &LabelFont,
    color: [u8; 3],
) {
    if label.is_empty() {
        return;
    }
    let (_, text_height) = text_size(font.scale, &font.font, label);
    let top = label_baseline(bbox) as i32 - text_height as i32;
    draw_text_mut(
        canvas,
        Rgb(color),
        bbox.start_x as i32,
        top,
        font.scale,
        &font.font,
        label,
    );
}

/// Copies `base` and draws every box on the copy.
pub fn render_boxes<'b, I>(
    base: ImageView<'_>,
    boxes: I,
    style: BoxStyle,
) -> PyrScanResult<OwnedImage>
where
    I: IntoIterator<Item = &'b BBox>,
{
    let mut canvas = rgb_image_from_view(base)?;
    for bbox in boxes {
        draw_box(&mut canvas, bbox, style);
    }
    owned_from_rgb_image(canvas)
}

/// Copies `base` and draws every box of one label together with its name.
pub fn render_detections(
    base: ImageView<'_>,
    label: &str,
    boxes: &[ScoredBox],
    style: BoxStyle,
    font: &LabelFont,
) -> PyrScanResult<OwnedImage> {
    let mut canvas = rgb_image_from_view(base)?;
    for scored in boxes {
        draw_box(&mut canvas, &scored.bbox, style);
        draw_label(&mut canvas, &scored.bbox, label, font, style.color);
    }
    owned_from_rgb_image(canvas)
}
