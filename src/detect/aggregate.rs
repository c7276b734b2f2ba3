//! Confidence filtering, grouping by label and per-label suppression.

use std::collections::BTreeMap;

use crate::candidate::nms::{nms_boxes, OverlapMetric};
use crate::candidate::{BBox, ScoredBox};
use crate::score::Prediction;

/// Scored boxes keyed by label.
///
/// Labels iterate in lexicographic order; boxes keep the order they were
/// inserted in. No label is ever mapped to an empty list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionGroups {
    groups: BTreeMap<String, Vec<ScoredBox>>,
}

impl DetectionGroups {
    /// Boxes for a label, if any survived.
    pub fn get(&self, label: &str) -> Option<&[ScoredBox]> {
        self.groups.get(label).map(Vec::as_slice)
    }

    /// Labels with at least one box.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Iterates `(label, boxes)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ScoredBox])> {
        self.groups
            .iter()
            .map(|(label, boxes)| (label.as_str(), boxes.as_slice()))
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true when no label has a box.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of boxes across labels.
    pub fn total_boxes(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    fn push(&mut self, label: String, scored: ScoredBox) {
        self.groups.entry(label).or_default().push(scored);
    }
}

/// Final detections after suppression, same shape as [`DetectionGroups`].
///
/// Boxes of each label are sorted by descending confidence.
pub type Detections = DetectionGroups;

/// Keeps predictions with `confidence >= min_confidence` grouped by label.
///
/// `boxes` and `predictions` are aligned positionally; extra entries on
/// either side are ignored (the pipeline checks lengths before calling).
pub fn group_by_label(
    boxes: &[BBox],
    predictions: Vec<Prediction>,
    min_confidence: f32,
) -> DetectionGroups {
    let mut groups = DetectionGroups::default();
    for (bbox, prediction) in boxes.iter().zip(predictions) {
        if prediction.confidence >= min_confidence {
            groups.push(
                prediction.label,
                ScoredBox {
                    bbox: *bbox,
                    confidence: prediction.confidence,
                },
            );
        }
    }
    groups
}

/// Runs NMS independently for every label.
pub fn reduce_groups(
    groups: &DetectionGroups,
    threshold: f32,
    metric: OverlapMetric,
) -> Detections {
    let groups = groups
        .groups
        .iter()
        .map(|(label, boxes)| (label.clone(), nms_boxes(boxes, threshold, metric)))
        .filter(|(_, kept)| !kept.is_empty())
        .collect();
    DetectionGroups { groups }
}

#[cfg(test)]
mod tests {
    use super::{group_by_label, reduce_groups};
    use crate::candidate::nms::OverlapMetric;
    use crate::candidate::BBox;
    use crate::score::Prediction;

    #[test]
    fn threshold_is_inclusive_and_drops_empty_labels() {
        let boxes = [
            BBox::new(0, 0, 10, 10),
            BBox::new(5, 5, 15, 15),
            BBox::new(20, 20, 30, 30),
        ];
        let preds = vec![
            Prediction::new("zebra", 0.9),
            Prediction::new("horse", 0.2),
            Prediction::new("zebra", 0.95),
        ];
        let groups = group_by_label(&boxes, preds, 0.9);
        assert_eq!(groups.labels().collect::<Vec<_>>(), vec!["zebra"]);
        let zebra = groups.get("zebra").unwrap();
        assert_eq!(zebra.len(), 2);
        assert_eq!(zebra[0].bbox, boxes[0]);
        assert_eq!(zebra[1].bbox, boxes[2]);
        assert!(groups.get("horse").is_none());
    }

    #[test]
    fn reduce_runs_per_label() {
        let same = BBox::new(0, 0, 10, 10);
        let preds = vec![
            Prediction::new("a", 0.95),
            Prediction::new("b", 0.91),
            Prediction::new("a", 0.97),
        ];
        let groups = group_by_label(&[same, same, same], preds, 0.5);
        let reduced = reduce_groups(&groups, 0.3, OverlapMetric::IntersectionOverCandidate);
        assert_eq!(reduced.total_boxes(), 2);
        assert!((reduced.get("a").unwrap()[0].confidence - 0.97).abs() < 1e-6);
        assert_eq!(reduced.get("b").unwrap().len(), 1);
    }
}
