//! Candidate generation: pyramid levels, sliding windows and crop
//! preparation, mapped back to base-image coordinates.
//!
//! Window coordinates on a level of width `level_w` are mapped to the base
//! image with `scale = base_w / level_w` and truncation toward zero:
//! `(trunc(x * s), trunc(y * s))` for the corner and `trunc(win * s)` for the
//! extent. Ends are clamped to the base image. Candidates are emitted level
//! by level in row-major scan order; crop preparation may run in parallel but
//! never reorders the batch.

pub(crate) mod bbox;
pub(crate) mod nms;
pub(crate) mod preprocess;

use crate::detect::DetectConfig;
use crate::image::pyramid::ImagePyramid;
use crate::image::ImageView;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::scale_trunc;
use crate::util::PyrScanResult;
use crate::window::{SlidingWindow, Window};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

pub use bbox::{BBox, ScoredBox};
pub use preprocess::{prepare_crop, ChannelTransform, Crop, Normalization};

/// Receives every candidate box when debug visualization is enabled.
pub trait CandidateObserver {
    /// Called once per candidate, in batch order, with the base image, the
    /// mapped box and the pixels of the window on its pyramid level.
    fn on_candidate(&mut self, base: ImageView<'_>, bbox: BBox, window: ImageView<'_>);
}

/// A box in base-image coordinates and its prepared model input.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Region in base-image coordinates.
    pub bbox: BBox,
    /// Normalized model input.
    pub crop: Crop,
}

/// Candidates with boxes and crops kept positionally aligned.
#[derive(Clone, Debug, Default)]
pub struct CandidateBatch {
    boxes: Vec<BBox>,
    crops: Vec<Crop>,
}

impl CandidateBatch {
    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Returns true when no window was generated.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Boxes in scan order.
    pub fn boxes(&self) -> &[BBox] {
        &self.boxes
    }

    /// Crops aligned with [`CandidateBatch::boxes`].
    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    /// Splits the batch into candidates.
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.boxes
            .into_iter()
            .zip(self.crops)
            .map(|(bbox, crop)| Candidate { bbox, crop })
            .collect()
    }
}

/// Maps a window on a pyramid level to base-image coordinates.
///
/// `scale` is `base_width / level_width`. All four values are truncated.
pub fn map_window_to_base(
    x: usize,
    y: usize,
    win_width: usize,
    win_height: usize,
    scale: f64,
) -> BBox {
    let start_x = scale_trunc(x, scale);
    let start_y = scale_trunc(y, scale);
    let width = scale_trunc(win_width, scale);
    let height = scale_trunc(win_height, scale);
    BBox::new(start_x, start_y, start_x + width, start_y + height)
}

/// Generates every candidate of `base` in scan order.
///
/// `observer` is only invoked when `cfg.show_debug_boxes` is set.
pub fn collect_candidates(
    base: ImageView<'_>,
    cfg: &DetectConfig,
    mut observer: Option<&mut dyn CandidateObserver>,
) -> PyrScanResult<CandidateBatch> {
    let (roi_width, roi_height) = cfg.roi_size;
    let _span = trace_span!(
        "collect_candidates",
        width = base.width(),
        height = base.height()
    )
    .entered();

    let pyramid = ImagePyramid::new(base, cfg.pyramid_scale, roi_width, roi_height)?;
    let mut batch = CandidateBatch::default();
    for level in pyramid {
        let level = level?;
        let view = level.image.view();
        let scale = base.width() as f64 / view.width() as f64;
        let _level_span = trace_span!(
            "pyramid_level",
            level = level.index,
            width = view.width(),
            height = view.height()
        )
        .entered();

        let windows: Vec<Window<'_>> =
            SlidingWindow::new(view, cfg.window_step, roi_width, roi_height)?.collect();
        let boxes: Vec<BBox> = windows
            .iter()
            .map(|w| {
                map_window_to_base(w.x, w.y, roi_width, roi_height, scale)
                    .clamp_to(base.width(), base.height())
            })
            .collect();

        if cfg.show_debug_boxes {
            for (window, bbox) in windows.iter().zip(boxes.iter()) {
                trace_debug!(
                    "candidate_box",
                    level = level.index,
                    start_x = bbox.start_x,
                    start_y = bbox.start_y,
                    end_x = bbox.end_x,
                    end_y = bbox.end_y
                );
                if let Some(observer) = observer.as_mut() {
                    observer.on_candidate(base, *bbox, window.view);
                }
            }
        }

        let crops = prepare_crops(&windows, cfg)?;
        trace_event!("level_candidates", level = level.index, count = crops.len());
        batch.boxes.extend(boxes);
        batch.crops.extend(crops);
    }

    trace_event!("candidates", count = batch.len());
    Ok(batch)
}

fn prepare_crops(windows: &[Window<'_>], cfg: &DetectConfig) -> PyrScanResult<Vec<Crop>> {
    let (input_width, input_height) = cfg.model_input_size;
    #[cfg(feature = "rayon")]
    if cfg.parallel {
        return windows
            .par_iter()
            .map(|w| prepare_crop(w.view, input_width, input_height, &cfg.normalization))
            .collect();
    }
    windows
        .iter()
        .map(|w| prepare_crop(w.view, input_width, input_height, &cfg.normalization))
        .collect()
}
