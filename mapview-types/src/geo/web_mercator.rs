use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::cartesian::{CartesianPoint2d, Point2d};
use crate::geo::datum::Datum;
use crate::geo::point::{GeoPoint, GeoPoint2d};

/// Width and height of a standard slippy map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Latitude limit of the web mercator projection in degrees. Points closer to the poles are
/// clamped to this value.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spherical web mercator projection onto the pixel plane of a zoom level.
///
/// At zoom `z` the whole world is a square of `tile_size * 2^z` pixels, with `(0, 0)` at the
/// north-west corner (longitude -180, latitude [`MAX_LATITUDE`]). Pixel scale is
/// `tile_size * 2^z / 2π` pixels per radian.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WebMercator {
    datum: Datum,
    tile_size: u32,
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            datum: Datum::WGS84,
            tile_size: TILE_SIZE,
        }
    }
}

impl WebMercator {
    /// Creates a projection with the given datum and tile size.
    pub fn new(datum: Datum, tile_size: u32) -> Self {
        Self { datum, tile_size }
    }

    /// Tile size in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Datum used for distance calculations.
    pub fn datum(&self) -> Datum {
        self.datum
    }

    /// Clamps latitude into the range valid for the projection.
    pub fn clamp_latitude(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Size of the whole world in pixels at the given zoom.
    pub fn world_size(&self, zoom: u8) -> f64 {
        self.tile_size as f64 * 2f64.powi(zoom as i32)
    }

    /// Pixels per radian at the given zoom.
    pub fn scale(&self, zoom: u8) -> f64 {
        self.world_size(zoom) / (2.0 * PI)
    }

    /// Projects a geographic point into the world pixel plane of the zoom level.
    ///
    /// Longitude is mapped linearly and is not wrapped, so lines crossing the antimeridian stay
    /// continuous.
    pub fn project(&self, point: &impl GeoPoint, zoom: u8) -> Point2d {
        let scale = self.scale(zoom);
        let lat = Self::clamp_latitude(point.lat()).to_radians();
        let x = scale * (point.lon_rad() + PI);
        let y = scale * (PI - (FRAC_PI_4 + lat / 2.0).tan().ln());

        Point2d::new(x, y)
    }

    /// Inverse of [`WebMercator::project`].
    pub fn unproject(&self, pixel: Point2d, zoom: u8) -> GeoPoint2d {
        let scale = self.scale(zoom);
        let lon = pixel.x() / scale - PI;
        let lat = 2.0 * (PI - pixel.y() / scale).exp().atan() - FRAC_PI_2;

        GeoPoint2d::latlon(lat.to_degrees(), lon.to_degrees())
    }

    /// Meters on the ground covered by one pixel at the given latitude and zoom.
    pub fn ground_resolution(&self, latitude: f64, zoom: u8) -> f64 {
        let lat = Self::clamp_latitude(latitude).to_radians();
        lat.cos() * self.datum.equator_length() / self.world_size(zoom)
    }

    /// Converts a distance on the ground at the given latitude into pixels at the given zoom.
    pub fn meters_to_pixels(&self, meters: f64, latitude: f64, zoom: u8) -> f64 {
        meters / self.ground_resolution(latitude, zoom)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::latlon;

    #[test]
    fn project_corners() {
        let projection = WebMercator::default();
        assert_abs_diff_eq!(
            projection.project(&latlon!(0.0, 0.0), 0),
            Point2d::new(128.0, 128.0),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            projection.project(&latlon!(MAX_LATITUDE, -180.0), 1),
            Point2d::new(0.0, 0.0),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            projection.project(&latlon!(-MAX_LATITUDE, 180.0), 2),
            Point2d::new(1024.0, 1024.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn poles_are_clamped() {
        let projection = WebMercator::default();
        let pole = projection.project(&latlon!(90.0, 10.0), 5);
        let limit = projection.project(&latlon!(MAX_LATITUDE, 10.0), 5);
        assert!(pole.is_finite());
        assert_abs_diff_eq!(pole, limit, epsilon = 1e-9);

        let south = projection.project(&latlon!(-90.0, 10.0), 5);
        assert!(south.is_finite());
    }

    #[test]
    fn round_trip() {
        let projection = WebMercator::default();
        for zoom in [0, 3, 10, 17, 22] {
            for point in [
                latlon!(47.32, 12.79),
                latlon!(-33.86, 151.2),
                latlon!(84.9, -179.9),
                latlon!(-84.9, 179.9),
                latlon!(0.0, 0.0),
            ] {
                let pixel = projection.project(&point, zoom);
                let back = projection.unproject(pixel, zoom);
                assert_abs_diff_eq!(back, point, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn ground_resolution_at_equator() {
        let projection = WebMercator::default();
        assert_abs_diff_eq!(
            projection.ground_resolution(0.0, 0),
            156_543.033_928,
            epsilon = 1e-3
        );
        assert_abs_diff_eq!(
            projection.meters_to_pixels(156_543.033_928, 0.0, 0),
            1.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn meters_to_pixels_grows_with_zoom() {
        let projection = WebMercator::default();
        let mut prev = 0.0;
        for zoom in 0..=22 {
            let pixels = projection.meters_to_pixels(500.0, 47.29, zoom);
            assert!(pixels > prev);
            prev = pixels;
        }
    }
}
