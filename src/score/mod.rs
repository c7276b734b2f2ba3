//! Scorer contract and helpers for classifier-backed scorers.
//!
//! The pipeline treats the classifier as an injected collaborator: it hands
//! over the whole candidate batch in one call and expects exactly one
//! `(label, confidence)` pair per crop, in order. Any failure or malformed
//! batch aborts the run.

#[cfg(feature = "tract")]
pub mod tract;

use crate::candidate::Crop;
use crate::util::{PyrScanError, PyrScanResult};

/// Top-1 prediction for a single crop.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Predicted class label.
    pub label: String,
    /// Probability of the label in `[0, 1]`.
    pub confidence: f32,
}

impl Prediction {
    /// Creates a prediction.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Batch classifier producing one top-1 prediction per crop.
pub trait Scorer {
    /// Scores every crop of the batch.
    fn score_batch(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Prediction>>;
}

impl<S: Scorer + ?Sized> Scorer for &mut S {
    fn score_batch(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Prediction>> {
        (**self).score_batch(crops)
    }
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn score_batch(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Prediction>> {
        (**self).score_batch(crops)
    }
}

/// Adapts a closure into a [`Scorer`].
pub struct FnScorer<F>(pub F);

impl<F> Scorer for FnScorer<F>
where
    F: FnMut(&[Crop]) -> PyrScanResult<Vec<Prediction>>,
{
    fn score_batch(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Prediction>> {
        (self.0)(crops)
    }
}

/// Runs the scorer once and checks the shape and range of its output.
pub(crate) fn score_checked<S: Scorer + ?Sized>(
    scorer: &mut S,
    crops: &[Crop],
) -> PyrScanResult<Vec<Prediction>> {
    if crops.is_empty() {
        return Ok(Vec::new());
    }
    let predictions = scorer.score_batch(crops)?;
    if predictions.len() != crops.len() {
        return Err(PyrScanError::ScoreCountMismatch {
            expected: crops.len(),
            got: predictions.len(),
        });
    }
    for (index, p) in predictions.iter().enumerate() {
        if !p.confidence.is_finite() || !(0.0..=1.0).contains(&p.confidence) {
            return Err(PyrScanError::InvalidConfidence {
                index,
                confidence: p.confidence,
            });
        }
    }
    Ok(predictions)
}

/// Class index to label lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Creates a map from labels in class-index order.
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Parses one label per non-empty line; surrounding whitespace is trimmed.
    pub fn from_lines(text: &str) -> Self {
        let labels = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        Self { labels }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true when no labels are known.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

/// Produces raw per-class scores for every crop.
pub trait Classifier {
    /// Returns one score row per crop, each with one entry per class.
    fn classify(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Vec<f32>>>;
}

/// Picks the most probable class of a probability row.
///
/// Ties keep the lowest class index. Returns `None` for an empty row or a
/// row containing NaN.
pub fn decode_top1(probs: &[f32], labels: &LabelMap) -> PyrScanResult<Option<Prediction>> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &p) in probs.iter().enumerate() {
        if p.is_nan() {
            return Ok(None);
        }
        if best.map_or(true, |(_, b)| p > b) {
            best = Some((idx, p));
        }
    }
    let Some((idx, confidence)) = best else {
        return Ok(None);
    };
    let label = labels.get(idx).ok_or_else(|| PyrScanError::Scoring {
        reason: format!("class index {idx} has no label ({} known)", labels.len()),
    })?;
    Ok(Some(Prediction::new(label, confidence)))
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return exps;
    }
    exps.into_iter().map(|v| v / sum).collect()
}

/// Turns a [`Classifier`] into a [`Scorer`] by top-1 decoding.
pub struct TopOneScorer<C> {
    classifier: C,
    labels: LabelMap,
    apply_softmax: bool,
}

impl<C: Classifier> TopOneScorer<C> {
    /// Wraps a classifier whose rows are already probabilities.
    pub fn new(classifier: C, labels: LabelMap) -> Self {
        Self {
            classifier,
            labels,
            apply_softmax: false,
        }
    }

    /// Applies softmax to every row before decoding (for logit outputs).
    pub fn with_softmax(mut self, apply_softmax: bool) -> Self {
        self.apply_softmax = apply_softmax;
        self
    }
}

impl<C: Classifier> Scorer for TopOneScorer<C> {
    fn score_batch(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Prediction>> {
        let rows = self.classifier.classify(crops)?;
        let mut out = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let row = if self.apply_softmax { softmax(&row) } else { row };
            let prediction = decode_top1(&row, &self.labels)?.ok_or_else(|| {
                PyrScanError::Scoring {
                    reason: format!("crop {index} produced no usable class scores"),
                }
            })?;
            out.push(prediction);
        }
        Ok(out)
    }
}
