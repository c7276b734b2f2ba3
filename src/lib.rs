//! pyrscan is a sliding-window object detector driven by an external image
//! classifier.
//!
//! Candidate regions come from an image pyramid scanned with a fixed-size
//! window. Every region is resized and normalized for the classifier, scored
//! in a single batch, filtered by confidence and reduced per label with
//! greedy non-maximum suppression. The classifier is injected through the
//! [`Scorer`] trait; with the `tract` feature an ONNX model can be used
//! directly. Crop preparation can run on rayon with the `rayon` feature.

pub mod candidate;
pub mod detect;
pub mod image;
#[cfg(feature = "image-io")]
pub mod render;
pub mod score;
mod trace;
pub mod util;
pub mod window;

#[cfg(feature = "image-io")]
pub use image::io;
pub use image::pyramid::{pyramid_level_sizes, ImagePyramid, PyramidLevel};
pub use image::{ImageView, OwnedImage};
pub use util::{ErrorKind, PyrScanError, PyrScanResult};

pub use candidate::nms::{nms_boxes, overlap_ratio, OverlapMetric};
pub use candidate::{
    collect_candidates, map_window_to_base, BBox, Candidate, CandidateBatch, CandidateObserver,
    ChannelTransform, Crop, Normalization, ScoredBox,
};
pub use detect::{DetectConfig, DetectionGroups, DetectionReport, Detections, Detector};
#[cfg(feature = "image-io")]
pub use render::{render_boxes, render_detections, BoxStyle, LabelFont};
pub use score::{Classifier, FnScorer, LabelMap, Prediction, Scorer, TopOneScorer};
pub use window::{SlidingWindow, Window};
