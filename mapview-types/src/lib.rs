//! Geometry primitives used by the `mapview` engine.
//!
//! The crate is split into two coordinate spaces:
//!
//! * [`geo`] - points on the surface of the Earth given by latitude and longitude, the
//!   [`Datum`](geo::Datum) they refer to, and the spherical [`WebMercator`](geo::WebMercator)
//!   projection that maps them onto the pixel plane of a given zoom level.
//! * [`cartesian`] - points, vectors, sizes and rectangles in pixel space.
//!
//! Everything here is pure math without any I/O.

pub mod cartesian;
pub mod error;
pub mod geo;
