use nalgebra::Scalar;
pub use nalgebra::{Point2, Vector2};
use num_traits::Float;

/// A point in pixel space. `x` grows to the right and `y` grows down.
pub type Point2d = Point2<f64>;
/// Vector between two points in pixel space.
pub type Vector2d = Vector2<f64>;

/// A point in 2-dimensional cartesian coordinate space.
pub trait CartesianPoint2d {
    /// Numeric type of the coordinates.
    type Num: Copy;

    /// X coordinate.
    fn x(&self) -> Self::Num;
    /// Y coordinate.
    fn y(&self) -> Self::Num;

    /// Returns true if both coordinates are finite numbers.
    fn is_finite(&self) -> bool
    where
        Self::Num: Float,
    {
        self.x().is_finite() && self.y().is_finite()
    }
}

impl<Num: Scalar + Copy> CartesianPoint2d for Point2<Num> {
    type Num = Num;

    fn x(&self) -> Num {
        self.x
    }

    fn y(&self) -> Num {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn point_vector_arithmetic() {
        let a = Point2d::new(1.0, 2.0);
        let b = Point2d::new(4.0, 6.0);
        let v = b - a;
        assert_eq!(v, Vector2d::new(3.0, 4.0));
        assert_abs_diff_eq!(v.norm(), 5.0);
        assert_abs_diff_eq!(nalgebra::distance_squared(&a, &b), 25.0);
        assert_eq!(a + v, b);
        assert_eq!(b - v, a);
        assert_eq!(v * 2.0, Vector2d::new(6.0, 8.0));
        assert_eq!(-v, Vector2d::new(-3.0, -4.0));
    }

    #[test]
    fn cartesian_accessors() {
        let p = Point2d::new(1.5, -2.0);
        assert_eq!(p.x(), 1.5);
        assert_eq!(p.y(), -2.0);
        assert!(p.is_finite());
        assert!(!Point2d::new(f64::NAN, 0.0).is_finite());
        assert!(!Point2d::new(0.0, f64::INFINITY).is_finite());
    }
}
