use mapview_types::cartesian::{CartesianPoint2d, Point2d, Rect, Size, Vector2d};
use mapview_types::geo::{GeoPoint, GeoPoint2d, WebMercator};

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 22;

/// Viewport of the map: geographic center, integer zoom level and size of the drawing area in
/// pixels.
///
/// `MapView` is a cheap value type. All mutating operations return a new instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    center: GeoPoint2d,
    zoom: u8,
    size: Size,
    projection: WebMercator,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: GeoPoint2d::default(),
            zoom: 0,
            size: Size::new(0.0, 0.0),
            projection: WebMercator::default(),
        }
    }
}

impl MapView {
    /// Creates a new view with zero size. The view must be given a size before it can be used
    /// to calculate tiles or render.
    pub fn new(center: &impl GeoPoint, zoom: u8) -> Self {
        Self::default().with_center(center).with_zoom(zoom)
    }

    /// Geographic center of the view.
    pub fn center(&self) -> GeoPoint2d {
        self.center
    }

    /// Zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Size of the view in pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Projection used to convert geographic coordinates into pixels.
    pub fn projection(&self) -> &WebMercator {
        &self.projection
    }

    /// Returns true if the view has a non-zero pixel size.
    pub fn has_size(&self) -> bool {
        !self.size.is_zero() && self.size.width().is_finite() && self.size.height().is_finite()
    }

    /// Copy of the view centered at the given point. Latitude is clamped to the mercator limit
    /// and longitude is wrapped into `[-180, 180)`.
    pub fn with_center(&self, center: &impl GeoPoint) -> Self {
        let lat = WebMercator::clamp_latitude(center.lat());
        let lon = wrap_longitude(center.lon());
        Self {
            center: GeoPoint2d::latlon(lat, lon),
            ..*self
        }
    }

    /// Copy of the view with the given zoom, clamped to `[0, MAX_ZOOM]`.
    pub fn with_zoom(&self, zoom: u8) -> Self {
        Self {
            zoom: zoom.min(MAX_ZOOM),
            ..*self
        }
    }

    /// Copy of the view with the given size.
    pub fn with_size(&self, size: Size) -> Self {
        Self { size, ..*self }
    }

    /// Position of the view center in the world pixel plane of the current zoom.
    pub fn center_world_pixel(&self) -> Point2d {
        self.projection.project(&self.center, self.zoom)
    }

    fn top_left_world_pixel(&self) -> Point2d {
        self.center_world_pixel() - Vector2d::new(self.size.half_width(), self.size.half_height())
    }

    /// Area of the world pixel plane covered by the view.
    pub fn world_pixel_rect(&self) -> Rect {
        Rect::from_origin(
            self.top_left_world_pixel(),
            self.size.width(),
            self.size.height(),
        )
    }

    /// Converts a world pixel position of the current zoom into a screen position.
    pub fn world_to_screen(&self, world: Point2d) -> Point2d {
        let top_left = self.top_left_world_pixel();
        Point2d::new(world.x() - top_left.x(), world.y() - top_left.y())
    }

    /// Screen position of a geographic point. `(0, 0)` is the top left corner of the view.
    pub fn geo_to_pixel(&self, point: &impl GeoPoint) -> Point2d {
        self.world_to_screen(self.projection.project(point, self.zoom))
    }

    /// Geographic position of a screen pixel. Inverse of [`MapView::geo_to_pixel`].
    pub fn pixel_to_geo(&self, pixel: Point2d) -> GeoPoint2d {
        let top_left = self.top_left_world_pixel();
        let world = Point2d::new(top_left.x() + pixel.x(), top_left.y() + pixel.y());
        self.projection.unproject(world, self.zoom)
    }

    /// Converts a ground distance at the given latitude into pixels at the current zoom.
    pub fn meters_to_pixels(&self, meters: f64, latitude: f64) -> f64 {
        self.projection.meters_to_pixels(meters, latitude, self.zoom)
    }

    /// Moves the map so that the point under `from` ends up under `to`.
    pub fn translate_by_pixels(&self, from: Point2d, to: Point2d) -> Self {
        let new_center = self.center_world_pixel() - (to - from);
        let center = self.projection.unproject(new_center, self.zoom);
        self.with_center(&center)
    }

    /// Changes zoom keeping the geographic point under the `anchor` screen position in place.
    pub fn zoom_around(&self, zoom: u8, anchor: Point2d) -> Self {
        let anchor_geo = self.pixel_to_geo(anchor);
        let zoomed = self.with_zoom(zoom);
        let moved_anchor = zoomed.geo_to_pixel(&anchor_geo);
        zoomed.translate_by_pixels(moved_anchor, anchor)
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use mapview_types::latlon;

    use super::*;

    fn view() -> MapView {
        MapView::new(&latlon!(47.32, 12.79), 12).with_size(Size::new(800.0, 600.0))
    }

    #[test]
    fn center_maps_to_screen_center() {
        let view = view();
        assert_abs_diff_eq!(
            view.geo_to_pixel(&latlon!(47.32, 12.79)),
            Point2d::new(400.0, 300.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn pixel_round_trip() {
        let view = view();
        for point in [
            latlon!(47.33, 12.76),
            latlon!(47.3045, 12.7345),
            latlon!(47.292, 12.783),
        ] {
            let pixel = view.geo_to_pixel(&point);
            assert_abs_diff_eq!(view.pixel_to_geo(pixel), point, epsilon = 1e-9);
        }

        let view = view.with_zoom(22);
        let point = latlon!(47.3001, 12.7999);
        assert_abs_diff_eq!(
            view.pixel_to_geo(view.geo_to_pixel(&point)),
            point,
            epsilon = 1e-9
        );
    }

    #[test]
    fn north_is_up() {
        let view = view();
        let north = view.geo_to_pixel(&latlon!(47.40, 12.79));
        let east = view.geo_to_pixel(&latlon!(47.32, 12.90));
        assert!(north.y() < 300.0);
        assert!(east.x() > 400.0);
    }

    #[test]
    fn translate_by_pixels() {
        let view = view();
        let point = latlon!(47.33, 12.76);
        let before = view.geo_to_pixel(&point);
        let moved = view.translate_by_pixels(Point2d::new(100.0, 100.0), Point2d::new(150.0, 80.0));
        let after = moved.geo_to_pixel(&point);
        assert_abs_diff_eq!(after.x() - before.x(), 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(after.y() - before.y(), -20.0, epsilon = 1e-6);
    }

    #[test]
    fn zoom_around_keeps_anchor() {
        let view = view();
        let anchor = Point2d::new(100.0, 500.0);
        let geo = view.pixel_to_geo(anchor);
        let zoomed = view.zoom_around(14, anchor);
        assert_eq!(zoomed.zoom(), 14);
        assert_abs_diff_eq!(zoomed.geo_to_pixel(&geo), anchor, epsilon = 1e-6);
    }

    #[test]
    fn zoom_and_center_are_clamped() {
        let view = MapView::new(&latlon!(89.9, 190.0), 40);
        assert_eq!(view.zoom(), MAX_ZOOM);
        assert!(view.center().lat() < 85.06);
        assert_abs_diff_eq!(view.center().lon(), -170.0, epsilon = 1e-9);
        assert!(!view.has_size());
    }
}
