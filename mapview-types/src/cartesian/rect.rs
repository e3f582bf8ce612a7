use serde::{Deserialize, Serialize};

use crate::cartesian::{CartesianPoint2d, Point2d};

/// Axis aligned rectangle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
}

impl Rect {
    /// Creates a new rectangle. Coordinates are reordered if `min > max`.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_min.max(x_max),
            y_max: y_min.max(y_max),
        }
    }

    /// Rectangle with the top-left corner at `origin` and the given dimensions.
    pub fn from_origin(origin: Point2d, width: f64, height: f64) -> Self {
        Self::new(
            origin.x(),
            origin.y(),
            origin.x() + width,
            origin.y() + height,
        )
    }

    /// Minimal rectangle containing all the given points.
    pub fn from_points<'a>(mut points: impl Iterator<Item = &'a Point2d>) -> Option<Self> {
        let first = points.next()?;
        let mut rect = Self::new(first.x(), first.y(), first.x(), first.y());
        for p in points {
            rect.x_min = rect.x_min.min(p.x());
            rect.y_min = rect.y_min.min(p.y());
            rect.x_max = rect.x_max.max(p.x());
            rect.y_max = rect.y_max.max(p.y());
        }

        Some(rect)
    }

    /// Minimum x.
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Maximum x.
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Minimum y.
    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    /// Maximum y.
    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// Width.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Center point.
    pub fn center(&self) -> Point2d {
        Point2d::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Returns true if the point is inside the rectangle or on its border.
    pub fn contains(&self, point: &Point2d) -> bool {
        self.x_min <= point.x()
            && self.x_max >= point.x()
            && self.y_min <= point.y()
            && self.y_max >= point.y()
    }

    /// Returns true if the rectangles have a common area of non-zero size.
    pub fn intersects(&self, other: Rect) -> bool {
        self.x_max > other.x_min
            && self.x_min < other.x_max
            && self.y_max > other.y_min
            && self.y_min < other.y_max
    }

    /// Intersection of two rectangles, if they intersect.
    pub fn intersection(&self, other: Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }

        Some(Rect {
            x_min: self.x_min.max(other.x_min),
            y_min: self.y_min.max(other.y_min),
            x_max: self.x_max.min(other.x_max),
            y_max: self.y_max.min(other.y_max),
        })
    }

    /// Expands the rectangle by `amount` in every direction.
    pub fn expand(&self, amount: f64) -> Self {
        Self::new(
            self.x_min - amount,
            self.y_min - amount,
            self.x_max + amount,
            self.y_max + amount,
        )
    }
}
