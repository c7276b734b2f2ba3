use pyrscan::{
    overlap_ratio, BBox, CandidateObserver, Crop, DetectConfig, Detector, ErrorKind, FnScorer,
    ImageView, Normalization, OverlapMetric, OwnedImage, Prediction, PyrScanError,
    PyrScanResult, Scorer,
};

const TARGET: BBox = BBox {
    start_x: 100,
    start_y: 100,
    end_x: 300,
    end_y: 300,
};

/// Black RGB image with a white rectangle over `TARGET`.
fn make_scene(width: usize, height: usize) -> OwnedImage {
    let mut data = vec![0u8; width * height * 3];
    for y in TARGET.start_y..TARGET.end_y {
        for x in TARGET.start_x..TARGET.end_x {
            let idx = (y * width + x) * 3;
            data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
        }
    }
    OwnedImage::new(data, width, height, 3).unwrap()
}

fn scene_config() -> DetectConfig {
    DetectConfig {
        resize_width: Some(600),
        pyramid_scale: 1.5,
        window_step: 16,
        roi_size: (250, 250),
        model_input_size: (32, 32),
        normalization: Normalization::Unit,
        ..DetectConfig::default()
    }
}

/// Calls a crop "zebra" when at least a tenth of it is bright.
#[derive(Default)]
struct BrightRegionScorer {
    calls: usize,
}

impl Scorer for BrightRegionScorer {
    fn score_batch(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Prediction>> {
        self.calls += 1;
        Ok(crops
            .iter()
            .map(|crop| {
                let bright = crop
                    .data()
                    .chunks_exact(crop.channels())
                    .filter(|px| px[0] > 0.5)
                    .count();
                let total = crop.width() * crop.height();
                if bright * 10 >= total {
                    Prediction::new("zebra", 0.95)
                } else {
                    Prediction::new("background", 0.0)
                }
            })
            .collect())
    }
}

struct PanicScorer;

impl Scorer for PanicScorer {
    fn score_batch(&mut self, _crops: &[Crop]) -> PyrScanResult<Vec<Prediction>> {
        panic!("scorer must not be called");
    }
}

#[derive(Default)]
struct CountingObserver {
    boxes: Vec<BBox>,
}

impl CandidateObserver for CountingObserver {
    fn on_candidate(&mut self, base: ImageView<'_>, bbox: BBox, window: ImageView<'_>) {
        assert!(bbox.end_x <= base.width() && bbox.end_y <= base.height());
        assert_eq!((window.width(), window.height()), (250, 250));
        self.boxes.push(bbox);
    }
}

#[test]
fn finds_single_label_around_target() {
    let image = make_scene(600, 450);
    let detector = Detector::new(scene_config()).unwrap();
    let mut scorer = BrightRegionScorer::default();

    let prepared = detector.prepare_image(image.view()).unwrap();
    assert_eq!(prepared, image);
    let report = detector.run(prepared.view(), &mut scorer).unwrap();

    // Level 0 (600x450): 22 x 13 windows; level 1 (400x300): 10 x 4 windows.
    assert_eq!(report.candidates, 22 * 13 + 10 * 4);
    assert_eq!(scorer.calls, 1);
    assert_eq!((report.image_width, report.image_height), (600, 450));

    assert_eq!(report.groups.labels().collect::<Vec<_>>(), vec!["zebra"]);
    let before = report.groups.get("zebra").unwrap();
    assert!(before.len() > 1);
    assert!(before.iter().all(|b| b.bbox.intersects(&TARGET)));
    assert!(before.iter().all(|b| b.confidence >= 0.9));

    assert_eq!(report.detections.labels().collect::<Vec<_>>(), vec!["zebra"]);
    let after = report.detections.get("zebra").unwrap();
    assert!(!after.is_empty());
    assert!(after.len() < before.len());
    assert!(after.iter().all(|b| b.bbox.intersects(&TARGET)));
    assert!(after.iter().all(|b| before.contains(b)));
    for (i, earlier) in after.iter().enumerate() {
        for later in &after[i + 1..] {
            let overlap = overlap_ratio(
                &earlier.bbox,
                &later.bbox,
                OverlapMetric::IntersectionOverCandidate,
            );
            assert!(overlap <= 0.3);
        }
    }
}

#[test]
fn detect_resizes_before_scanning() {
    let small = make_scene(600, 450);
    let large = pyrscan::image::resize::resize(small.view(), 1200, 900).unwrap();
    let detector = Detector::new(scene_config()).unwrap();

    let prepared = detector.prepare_image(large.view()).unwrap();
    assert_eq!((prepared.width(), prepared.height()), (600, 450));

    let detections = detector
        .detect(large.view(), &mut BrightRegionScorer::default())
        .unwrap();
    assert_eq!(detections.labels().collect::<Vec<_>>(), vec!["zebra"]);
}

#[test]
fn blank_image_yields_no_detections() {
    let image = OwnedImage::filled(600, 450, &[0, 0, 0]).unwrap();
    let detector = Detector::new(scene_config()).unwrap();
    let report = detector
        .run(image.view(), &mut BrightRegionScorer::default())
        .unwrap();
    assert!(report.candidates > 0);
    assert!(report.groups.is_empty());
    assert!(report.detections.is_empty());
}

#[test]
fn roi_larger_than_image_fails_before_scoring() {
    let image = OwnedImage::filled(200, 300, &[0, 0, 0]).unwrap();
    let detector = Detector::new(DetectConfig {
        resize_width: None,
        ..scene_config()
    })
    .unwrap();
    let err = detector.run(image.view(), &mut PanicScorer).unwrap_err();
    assert_eq!(
        err,
        PyrScanError::RoiLargerThanImage {
            roi_width: 250,
            roi_height: 250,
            img_width: 200,
            img_height: 300,
        }
    );
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn image_equal_to_roi_has_no_candidates() {
    let image = OwnedImage::filled(250, 250, &[0, 0, 0]).unwrap();
    let detector = Detector::new(DetectConfig {
        resize_width: None,
        ..scene_config()
    })
    .unwrap();
    let report = detector.run(image.view(), &mut PanicScorer).unwrap();
    assert_eq!(report.candidates, 0);
    assert!(report.detections.is_empty());
}

#[test]
fn scorer_failure_aborts_run() {
    let image = make_scene(600, 450);
    let detector = Detector::new(scene_config()).unwrap();
    let mut failing = FnScorer(|_: &[Crop]| -> PyrScanResult<Vec<Prediction>> {
        Err(PyrScanError::Scoring {
            reason: "model unavailable".into(),
        })
    });
    let err = detector.run(image.view(), &mut failing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scoring);
}

#[test]
fn short_scorer_batch_is_rejected() {
    let image = make_scene(600, 450);
    let detector = Detector::new(scene_config()).unwrap();
    let mut short = FnScorer(|crops: &[Crop]| -> PyrScanResult<Vec<Prediction>> {
        Ok(crops
            .iter()
            .skip(1)
            .map(|_| Prediction::new("zebra", 0.99))
            .collect())
    });
    let err = detector.run(image.view(), &mut short).unwrap_err();
    assert_eq!(
        err,
        PyrScanError::ScoreCountMismatch {
            expected: 326,
            got: 325
        }
    );
}

#[test]
fn observer_sees_every_candidate_only_in_debug_mode() {
    let image = make_scene(600, 450);
    let mut scorer = BrightRegionScorer::default();

    let quiet = Detector::new(scene_config()).unwrap();
    let mut observer = CountingObserver::default();
    quiet
        .run_observed(image.view(), &mut scorer, Some(&mut observer))
        .unwrap();
    assert!(observer.boxes.is_empty());

    let debug = Detector::new(DetectConfig {
        show_debug_boxes: true,
        ..scene_config()
    })
    .unwrap();
    let mut observer = CountingObserver::default();
    let report = debug
        .run_observed(image.view(), &mut scorer, Some(&mut observer))
        .unwrap();
    assert_eq!(observer.boxes.len(), report.candidates);
    assert_eq!(observer.boxes[0], BBox::new(0, 0, 250, 250));
    // First window of the second level: scale 1.5.
    assert_eq!(observer.boxes[22 * 13], BBox::new(0, 0, 375, 375));
}
