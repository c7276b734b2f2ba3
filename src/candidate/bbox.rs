//! Axis-aligned boxes in base-image coordinates.

/// Axis-aligned rectangle with exclusive end coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BBox {
    /// Left edge (inclusive).
    pub start_x: usize,
    /// Top edge (inclusive).
    pub start_y: usize,
    /// Right edge (exclusive).
    pub end_x: usize,
    /// Bottom edge (exclusive).
    pub end_y: usize,
}

impl BBox {
    /// Creates a box from its corners.
    pub fn new(start_x: usize, start_y: usize, end_x: usize, end_y: usize) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    /// Box width, zero for degenerate boxes.
    pub fn width(&self) -> usize {
        self.end_x.saturating_sub(self.start_x)
    }

    /// Box height, zero for degenerate boxes.
    pub fn height(&self) -> usize {
        self.end_y.saturating_sub(self.start_y)
    }

    /// Box area in pixels.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Area of the intersection with `other`.
    pub fn intersection_area(&self, other: &BBox) -> u64 {
        let x0 = self.start_x.max(other.start_x);
        let y0 = self.start_y.max(other.start_y);
        let x1 = self.end_x.min(other.end_x);
        let y1 = self.end_y.min(other.end_y);
        x1.saturating_sub(x0) as u64 * y1.saturating_sub(y0) as u64
    }

    /// Returns true when the boxes share a region of positive area.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.intersection_area(other) > 0
    }

    /// Clamps the end coordinates to `width` x `height`.
    pub fn clamp_to(self, width: usize, height: usize) -> Self {
        Self {
            end_x: self.end_x.min(width),
            end_y: self.end_y.min(height),
            ..self
        }
    }
}

/// A box with the confidence of its predicted label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredBox {
    /// Box in base-image coordinates.
    pub bbox: BBox,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f32,
}
