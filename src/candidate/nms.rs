//! Greedy non-maximum suppression over scored boxes.
//!
//! Boxes are visited by descending confidence with ties broken by input
//! order. A box survives unless its overlap with an already kept box is
//! strictly greater than the threshold. Overlap is measured with an explicit
//! [`OverlapMetric`]; areas use end-exclusive integer extents.

use crate::candidate::bbox::{BBox, ScoredBox};
use std::cmp::Ordering;

/// Overlap ratio used to decide suppression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapMetric {
    /// Intersection area divided by the area of the box tested for
    /// suppression. A box fully inside a kept box scores 1 regardless of the
    /// kept box's size.
    #[default]
    IntersectionOverCandidate,
    /// Intersection area divided by the union area (IoU).
    IntersectionOverUnion,
}

/// Overlap of `candidate` with an already kept box.
///
/// Returns 0 when either box is degenerate or the boxes are disjoint.
pub fn overlap_ratio(kept: &BBox, candidate: &BBox, metric: OverlapMetric) -> f32 {
    let inter = kept.intersection_area(candidate);
    if inter == 0 {
        return 0.0;
    }
    let denom = match metric {
        OverlapMetric::IntersectionOverCandidate => candidate.area(),
        OverlapMetric::IntersectionOverUnion => kept.area() + candidate.area() - inter,
    };
    if denom == 0 {
        return 0.0;
    }
    (inter as f64 / denom as f64) as f32
}

fn confidence_desc(a: &ScoredBox, b: &ScoredBox) -> Ordering {
    b.confidence.total_cmp(&a.confidence)
}

/// Applies greedy NMS and returns the kept boxes by descending confidence.
///
/// The output is a subset of the input, never larger, and running NMS again
/// on it with the same parameters returns it unchanged.
pub fn nms_boxes(boxes: &[ScoredBox], threshold: f32, metric: OverlapMetric) -> Vec<ScoredBox> {
    let mut order: Vec<ScoredBox> = boxes.to_vec();
    // Stable sort keeps input order among equal confidences.
    order.sort_by(confidence_desc);

    let mut kept: Vec<ScoredBox> = Vec::new();
    'outer: for candidate in order {
        for kept_box in kept.iter() {
            if overlap_ratio(&kept_box.bbox, &candidate.bbox, metric) > threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }

    kept
}
