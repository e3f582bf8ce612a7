//! Geometries in geographic coordinates (latitude and longitude) and their projection onto the
//! pixel plane.

mod datum;
mod point;
mod web_mercator;

pub use datum::Datum;
pub use point::{GeoPoint, GeoPoint2d};
pub use web_mercator::{WebMercator, MAX_LATITUDE, TILE_SIZE};
