use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle on the XZ ground plane.
///
/// `DVec2::x` is world X and `DVec2::y` is world Z. Values are immutable;
/// every combinator returns a new rectangle. A rectangle whose max is not
/// greater than its min on some axis has zero area and counts as empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    min: DVec2,
    max: DVec2,
}

impl Default for Rect {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Rect {
    pub const ZERO: Rect = Rect {
        min: DVec2::ZERO,
        max: DVec2::ZERO,
    };

    pub fn from_min_max(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    pub fn from_edges(min_x: f64, max_x: f64, min_z: f64, max_z: f64) -> Self {
        Self {
            min: DVec2::new(min_x, min_z),
            max: DVec2::new(max_x, max_z),
        }
    }

    pub fn from_center_size(center: DVec2, size: DVec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn min(&self) -> DVec2 {
        self.min
    }

    pub fn max(&self) -> DVec2 {
        self.max
    }

    pub fn min_x(&self) -> f64 {
        self.min.x
    }

    pub fn max_x(&self) -> f64 {
        self.max.x
    }

    pub fn min_z(&self) -> f64 {
        self.min.y
    }

    pub fn max_z(&self) -> f64 {
        self.max.y
    }

    /// Extent along X, never negative.
    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    /// Extent along Z, never negative.
    pub fn depth(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width(), self.depth())
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn area(&self) -> f64 {
        self.width() * self.depth()
    }

    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    /// Closed-interval overlap test: rectangles sharing only an edge overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Intersection with `other`.
    ///
    /// On an axis where the two do not intersect the result collapses to a
    /// zero-extent edge of `other`, so the result always lies within `other`.
    pub fn clip(&self, other: &Rect) -> Rect {
        let min = self.min.max(other.min).min(other.max);
        let max = self.max.min(other.max).max(min);
        Rect { min, max }
    }

    /// Smallest rectangle containing both.
    pub fn expand(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains_point(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    pub fn with_min_x(&self, min_x: f64) -> Rect {
        Rect {
            min: DVec2::new(min_x, self.min.y),
            ..*self
        }
    }

    pub fn with_max_x(&self, max_x: f64) -> Rect {
        Rect {
            max: DVec2::new(max_x, self.max.y),
            ..*self
        }
    }

    pub fn with_min_z(&self, min_z: f64) -> Rect {
        Rect {
            min: DVec2::new(self.min.x, min_z),
            ..*self
        }
    }

    pub fn with_max_z(&self, max_z: f64) -> Rect {
        Rect {
            max: DVec2::new(self.max.x, max_z),
            ..*self
        }
    }
}
