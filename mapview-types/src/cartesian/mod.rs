//! Types and functions on geometries in cartesian (screen pixel) coordinates.

mod point;
mod rect;
mod size;

pub use point::{CartesianPoint2d, Point2, Point2d, Vector2, Vector2d};
pub use rect::Rect;
pub use size::Size;
