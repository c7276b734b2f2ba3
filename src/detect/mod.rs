//! The detection pipeline and its configuration.
//!
//! A run resizes the input to `resize_width`, generates candidates over the
//! pyramid, scores them in one batch, keeps confident boxes per label and
//! reduces every label with NMS. Every stage either succeeds completely or
//! aborts the run; there are no partial results.

pub(crate) mod aggregate;

pub use aggregate::{group_by_label, reduce_groups, DetectionGroups, Detections};

use crate::candidate::nms::OverlapMetric;
use crate::candidate::{collect_candidates, CandidateObserver, Normalization};
use crate::image::resize::resize_to_width;
use crate::image::{ImageView, OwnedImage};
use crate::score::{score_checked, Scorer};
use crate::trace::{trace_event, trace_span};
use crate::util::{PyrScanError, PyrScanResult};

/// Configuration for a detection run.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectConfig {
    /// Aspect-preserving resize applied to the input before scanning
    /// (`None` keeps the input size).
    pub resize_width: Option<usize>,
    /// Per-level shrink factor of the pyramid (> 1).
    pub pyramid_scale: f64,
    /// Sliding window stride in pixels.
    pub window_step: usize,
    /// Window size `(width, height)`; also the pyramid's minimum level size.
    pub roi_size: (usize, usize),
    /// Size `(width, height)` crops are resized to before scoring.
    pub model_input_size: (usize, usize),
    /// Minimum confidence for a box to be kept.
    pub min_confidence: f32,
    /// NMS suppression threshold.
    pub nms_overlap_threshold: f32,
    /// Overlap ratio used by NMS.
    pub overlap_metric: OverlapMetric,
    /// Channel normalization expected by the scorer.
    pub normalization: Normalization,
    /// Report every candidate box to the debug observer.
    pub show_debug_boxes: bool,
    /// Prepare crops on the rayon pool (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            resize_width: Some(600),
            pyramid_scale: 1.5,
            window_step: 16,
            roi_size: (250, 250),
            model_input_size: (224, 224),
            min_confidence: 0.9,
            nms_overlap_threshold: 0.3,
            overlap_metric: OverlapMetric::IntersectionOverCandidate,
            normalization: Normalization::Caffe,
            show_debug_boxes: false,
            parallel: false,
        }
    }
}

impl DetectConfig {
    /// Checks every value that does not depend on the input image.
    pub fn validate(&self) -> PyrScanResult<()> {
        if self.resize_width == Some(0) {
            return Err(PyrScanError::InvalidConfig("resize_width must be > 0"));
        }
        if !self.pyramid_scale.is_finite() || self.pyramid_scale <= 1.0 {
            return Err(PyrScanError::InvalidConfig("pyramid_scale must be > 1"));
        }
        if self.window_step == 0 {
            return Err(PyrScanError::InvalidConfig("window_step must be > 0"));
        }
        if self.roi_size.0 == 0 || self.roi_size.1 == 0 {
            return Err(PyrScanError::InvalidConfig("roi_size must be non-zero"));
        }
        if self.model_input_size.0 == 0 || self.model_input_size.1 == 0 {
            return Err(PyrScanError::InvalidConfig(
                "model_input_size must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PyrScanError::InvalidConfig(
                "min_confidence must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.nms_overlap_threshold) {
            return Err(PyrScanError::InvalidConfig(
                "nms_overlap_threshold must be within [0, 1]",
            ));
        }
        self.normalization.validate()
    }

    fn check_fits(&self, image: ImageView<'_>) -> PyrScanResult<()> {
        let (roi_width, roi_height) = self.roi_size;
        if roi_width > image.width() || roi_height > image.height() {
            return Err(PyrScanError::RoiLargerThanImage {
                roi_width,
                roi_height,
                img_width: image.width(),
                img_height: image.height(),
            });
        }
        Ok(())
    }
}

/// Everything a run produced, for callers that render intermediate stages.
#[derive(Clone, Debug, Default)]
pub struct DetectionReport {
    /// Width of the scanned image.
    pub image_width: usize,
    /// Height of the scanned image.
    pub image_height: usize,
    /// Number of candidates scored.
    pub candidates: usize,
    /// Confident boxes per label before NMS.
    pub groups: DetectionGroups,
    /// Boxes per label after NMS.
    pub detections: Detections,
}

/// Sliding-window detector.
#[derive(Clone, Debug)]
pub struct Detector {
    cfg: DetectConfig,
}

impl Detector {
    /// Creates a detector after validating the configuration.
    pub fn new(cfg: DetectConfig) -> PyrScanResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &DetectConfig {
        &self.cfg
    }

    /// Applies the initial aspect-preserving resize.
    pub fn prepare_image(&self, image: ImageView<'_>) -> PyrScanResult<OwnedImage> {
        match self.cfg.resize_width {
            Some(width) => resize_to_width(image, width),
            None => Ok(image.to_owned_image()),
        }
    }

    /// Runs the pipeline on an already prepared image.
    ///
    /// The image is scanned as given; call [`Detector::prepare_image`] first
    /// to apply `resize_width`.
    pub fn run<S: Scorer + ?Sized>(
        &self,
        image: ImageView<'_>,
        scorer: &mut S,
    ) -> PyrScanResult<DetectionReport> {
        self.run_observed(image, scorer, None)
    }

    /// Like [`Detector::run`], reporting candidates to `observer` when
    /// `show_debug_boxes` is set.
    pub fn run_observed<S: Scorer + ?Sized>(
        &self,
        image: ImageView<'_>,
        scorer: &mut S,
        observer: Option<&mut dyn CandidateObserver>,
    ) -> PyrScanResult<DetectionReport> {
        let _span = trace_span!("detect", width = image.width(), height = image.height()).entered();
        self.cfg.check_fits(image)?;

        let batch = collect_candidates(image, &self.cfg, observer)?;
        let predictions = score_checked(scorer, batch.crops())?;
        let groups = group_by_label(batch.boxes(), predictions, self.cfg.min_confidence);
        trace_event!(
            "confident_boxes",
            labels = groups.len(),
            boxes = groups.total_boxes()
        );

        let detections = reduce_groups(
            &groups,
            self.cfg.nms_overlap_threshold,
            self.cfg.overlap_metric,
        );
        trace_event!(
            "detections",
            labels = detections.len(),
            boxes = detections.total_boxes()
        );

        Ok(DetectionReport {
            image_width: image.width(),
            image_height: image.height(),
            candidates: batch.len(),
            groups,
            detections,
        })
    }

    /// Resizes `image` and returns only the final detections.
    pub fn detect<S: Scorer + ?Sized>(
        &self,
        image: ImageView<'_>,
        scorer: &mut S,
    ) -> PyrScanResult<Detections> {
        let prepared = self.prepare_image(image)?;
        Ok(self.run(prepared.view(), scorer)?.detections)
    }

    /// Loads an image file, resizes it and runs the pipeline.
    ///
    /// Returns the prepared image so callers can draw on it.
    #[cfg(feature = "image-io")]
    pub fn detect_path<P, S>(
        &self,
        path: P,
        scorer: &mut S,
        observer: Option<&mut dyn CandidateObserver>,
    ) -> PyrScanResult<(OwnedImage, DetectionReport)>
    where
        P: AsRef<std::path::Path>,
        S: Scorer + ?Sized,
    {
        let original = crate::image::io::load_rgb_image(path)?;
        let prepared = self.prepare_image(original.view())?;
        let report = self.run_observed(prepared.view(), scorer, observer)?;
        Ok((prepared, report))
    }
}
