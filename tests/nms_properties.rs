use pyrscan::{nms_boxes, overlap_ratio, BBox, OverlapMetric, ScoredBox};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const METRICS: [OverlapMetric; 2] = [
    OverlapMetric::IntersectionOverCandidate,
    OverlapMetric::IntersectionOverUnion,
];

fn random_boxes(rng: &mut StdRng, count: usize) -> Vec<ScoredBox> {
    (0..count)
        .map(|_| {
            let x = rng.random_range(0..200);
            let y = rng.random_range(0..200);
            let w = rng.random_range(1..80);
            let h = rng.random_range(1..80);
            // Coarse confidences so ties actually occur.
            let confidence = rng.random_range(0..10) as f32 / 10.0;
            ScoredBox {
                bbox: BBox::new(x, y, x + w, y + h),
                confidence,
            }
        })
        .collect()
}

#[test]
fn overlap_is_zero_for_disjoint_and_touching_boxes() {
    let a = BBox::new(0, 0, 10, 10);
    let far = BBox::new(50, 50, 60, 60);
    let touching = BBox::new(10, 0, 20, 10);
    for metric in METRICS {
        assert_eq!(overlap_ratio(&a, &far, metric), 0.0);
        assert_eq!(overlap_ratio(&a, &touching, metric), 0.0);
    }
}

#[test]
fn overlap_of_identical_boxes_is_one() {
    let a = BBox::new(100, 100, 350, 350);
    for metric in METRICS {
        assert!((overlap_ratio(&a, &a, metric) - 1.0).abs() < 1e-6);
    }
}

#[test]
fn containment_depends_on_metric() {
    let big = BBox::new(0, 0, 20, 20);
    let small = BBox::new(5, 5, 15, 15);

    // Candidate fully inside the kept box.
    let ioc = overlap_ratio(&big, &small, OverlapMetric::IntersectionOverCandidate);
    assert!((ioc - 1.0).abs() < 1e-6);
    // Kept box fully inside the candidate.
    let ioc = overlap_ratio(&small, &big, OverlapMetric::IntersectionOverCandidate);
    assert!((ioc - 0.25).abs() < 1e-6);

    for (kept, candidate) in [(big, small), (small, big)] {
        let iou = overlap_ratio(&kept, &candidate, OverlapMetric::IntersectionOverUnion);
        assert!((iou - 0.25).abs() < 1e-6);
    }
}

#[test]
fn contained_low_confidence_box_is_suppressed_only_by_candidate_metric() {
    let boxes = [
        ScoredBox {
            bbox: BBox::new(0, 0, 20, 20),
            confidence: 0.99,
        },
        ScoredBox {
            bbox: BBox::new(5, 5, 15, 15),
            confidence: 0.95,
        },
    ];
    let ioc = nms_boxes(&boxes, 0.3, OverlapMetric::IntersectionOverCandidate);
    assert_eq!(ioc, vec![boxes[0]]);
    let iou = nms_boxes(&boxes, 0.3, OverlapMetric::IntersectionOverUnion);
    assert_eq!(iou, boxes.to_vec());
}

#[test]
fn nms_output_is_sorted_by_confidence() {
    let boxes = [
        ScoredBox {
            bbox: BBox::new(0, 0, 10, 10),
            confidence: 0.91,
        },
        ScoredBox {
            bbox: BBox::new(100, 100, 110, 110),
            confidence: 0.99,
        },
    ];
    let kept = nms_boxes(&boxes, 0.3, OverlapMetric::IntersectionOverCandidate);
    assert_eq!(kept, vec![boxes[1], boxes[0]]);
}

#[test]
fn nms_is_monotone_idempotent_and_closed() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..64 {
        let count = rng.random_range(0..40);
        let boxes = random_boxes(&mut rng, count);
        let threshold = rng.random_range(0..=10) as f32 / 10.0;
        for metric in METRICS {
            let kept = nms_boxes(&boxes, threshold, metric);
            assert!(kept.len() <= boxes.len());
            assert!(kept.iter().all(|k| boxes.contains(k)));
            if !boxes.is_empty() {
                assert!(!kept.is_empty());
            }

            for (i, earlier) in kept.iter().enumerate() {
                for later in &kept[i + 1..] {
                    assert!(earlier.confidence >= later.confidence);
                    assert!(overlap_ratio(&earlier.bbox, &later.bbox, metric) <= threshold);
                }
            }

            let again = nms_boxes(&kept, threshold, metric);
            assert_eq!(again, kept);
        }
    }
}

#[test]
fn nms_of_empty_input_is_empty() {
    assert!(nms_boxes(&[], 0.3, OverlapMetric::IntersectionOverCandidate).is_empty());
}
