use pyrscan::{
    map_window_to_base, pyramid_level_sizes, ImagePyramid, OwnedImage, SlidingWindow,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_image(width: usize, height: usize, channels: usize) -> OwnedImage {
    let mut data = Vec::with_capacity(width * height * channels);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let value = ((x * 13) ^ (y * 7) ^ (x * y) ^ (c * 91)) & 0xFF;
                data.push(value as u8);
            }
        }
    }
    OwnedImage::new(data, width, height, channels).unwrap()
}

#[test]
fn pyramid_levels_shrink_by_scale_and_stop_before_minimum() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..24 {
        let width = rng.random_range(20..=240);
        let height = rng.random_range(20..=240);
        let scale: f64 = rng.random_range(1.1..2.5);
        let min_w = rng.random_range(4..=40);
        let min_h = rng.random_range(4..=40);
        let img = make_image(width, height, 1);

        let levels: Vec<_> = ImagePyramid::new(img.view(), scale, min_w, min_h)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(levels[0].image, img, "first level must be the input");
        for pair in levels.windows(2) {
            let prev = &pair[0].image;
            let next = &pair[1].image;
            let expected_w = (prev.width() as f64 / scale) as usize;
            assert_eq!(next.width(), expected_w);
            assert_eq!(next.height(), prev.height() * expected_w / prev.width());
            assert!(next.width() >= min_w && next.height() >= min_h);
        }

        let last = &levels.last().unwrap().image;
        let stop_w = (last.width() as f64 / scale) as usize;
        let stop_h = last.height() * stop_w / last.width();
        assert!(stop_w < min_w || stop_h < min_h || stop_w == 0 || stop_h == 0);

        let sizes = pyramid_level_sizes(width, height, scale, min_w, min_h).unwrap();
        let actual: Vec<_> = levels
            .iter()
            .map(|l| (l.image.width(), l.image.height()))
            .collect();
        assert_eq!(sizes, actual);
    }
}

#[test]
fn pyramid_is_single_pass() {
    let img = make_image(64, 48, 3);
    let mut pyramid = ImagePyramid::new(img.view(), 2.0, 16, 12).unwrap();
    let count = pyramid.by_ref().count();
    assert_eq!(count, 3);
    assert!(pyramid.next().is_none());
}

#[test]
fn windows_are_row_major_and_in_bounds() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..24 {
        let width = rng.random_range(8..=96);
        let height = rng.random_range(8..=96);
        let win_w = rng.random_range(1..=width);
        let win_h = rng.random_range(1..=height);
        let step = rng.random_range(1..=12);
        let img = make_image(width, height, 3);
        let view = img.view();

        let windows: Vec<_> = SlidingWindow::new(view, step, win_w, win_h)
            .unwrap()
            .collect();

        let expected_cols = (width - win_w).div_ceil(step);
        let expected_rows = (height - win_h).div_ceil(step);
        assert_eq!(windows.len(), expected_cols * expected_rows);

        for pair in windows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.y < b.y || (a.y == b.y && a.x < b.x), "scan must be row-major");
        }
        for w in &windows {
            assert!(w.x < width - win_w && w.y < height - win_h);
            assert_eq!(w.x % step, 0);
            assert_eq!(w.y % step, 0);
            assert_eq!((w.view.width(), w.view.height()), (win_w, win_h));
            assert_eq!(w.view.pixel(0, 0), view.pixel(w.x, w.y));
            assert_eq!(
                w.view.pixel(win_w - 1, win_h - 1),
                view.pixel(w.x + win_w - 1, w.y + win_h - 1)
            );
        }
    }
}

#[test]
fn window_larger_than_image_yields_nothing() {
    let img = make_image(30, 40, 1);
    assert_eq!(SlidingWindow::new(img.view(), 4, 31, 10).unwrap().count(), 0);
    assert_eq!(SlidingWindow::new(img.view(), 4, 10, 41).unwrap().count(), 0);
}

#[test]
fn mapped_boxes_use_truncated_scale() {
    let base_w = 600usize;
    for level_w in [600usize, 400, 266, 177] {
        let scale = base_w as f64 / level_w as f64;
        for (x, y) in [(0usize, 0usize), (16, 32), (144, 48), (33, 17)] {
            let bbox = map_window_to_base(x, y, 250, 200, scale);
            assert_eq!(bbox.start_x, (x as f64 * scale) as usize);
            assert_eq!(bbox.start_y, (y as f64 * scale) as usize);
            assert_eq!(bbox.width(), (250.0 * scale) as usize);
            assert_eq!(bbox.height(), (200.0 * scale) as usize);
        }
    }
}
