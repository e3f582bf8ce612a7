//! Vector overlays drawn over the tile mosaic: polylines, polygons, markers and circles.
//!
//! Overlays are kept in an append-only [`OverlayStore`]. The order of the store is the paint
//! order, so an overlay added later is drawn on top of the earlier ones.

use mapview_types::geo::{GeoPoint, GeoPoint2d};

use crate::color::Color;
use crate::error::MapViewError;

mod icon_store;

pub use icon_store::{IconKey, IconStore};

/// Index of an overlay in the store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(pub(crate) usize);

/// Color and width of a line.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineStyle {
    /// Color of the line.
    pub color: Color,
    /// Width of the line in pixels. Zero is drawn as a one pixel hairline.
    pub width: f64,
}

/// Fill and outline of a shape.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapeStyle {
    /// Fill color.
    pub fill: Color,
    /// Outline color.
    pub stroke: Color,
    /// Outline width in pixels. Zero is drawn as a one pixel hairline.
    pub stroke_width: f64,
}

fn check_width(width: f64) -> Result<f64, MapViewError> {
    if !width.is_finite() || width < 0.0 {
        return Err(MapViewError::config(format!(
            "stroke width must be a non-negative number, got {width}"
        )));
    }

    Ok(width)
}

/// Connected line segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<GeoPoint2d>,
    style: LineStyle,
}

impl Polyline {
    /// Default line color.
    pub const DEFAULT_COLOR: Color = Color::RED;

    /// Creates a polyline. At least two points are required.
    pub fn new(points: Vec<GeoPoint2d>, style: LineStyle) -> Result<Self, MapViewError> {
        if points.len() < 2 {
            return Err(MapViewError::config(format!(
                "polyline needs at least 2 points, got {}",
                points.len()
            )));
        }

        check_width(style.width)?;
        Ok(Self { points, style })
    }

    /// Vertices of the line.
    pub fn points(&self) -> &[GeoPoint2d] {
        &self.points
    }

    /// Line style.
    pub fn style(&self) -> LineStyle {
        self.style
    }
}

/// Closed filled shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<GeoPoint2d>,
    style: ShapeStyle,
}

impl Polygon {
    /// Default style: transparent fill with a black hairline outline.
    pub const DEFAULT_STYLE: ShapeStyle = ShapeStyle {
        fill: Color::TRANSPARENT,
        stroke: Color::BLACK,
        stroke_width: 0.0,
    };

    /// Creates a polygon. The ring is closed implicitly; a last point equal to the first one is
    /// dropped. At least three distinct vertices are required.
    pub fn new(mut points: Vec<GeoPoint2d>, style: ShapeStyle) -> Result<Self, MapViewError> {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        if points.len() < 3 {
            return Err(MapViewError::config(format!(
                "polygon needs at least 3 points, got {}",
                points.len()
            )));
        }

        check_width(style.stroke_width)?;
        Ok(Self { points, style })
    }

    /// Vertices of the open ring (the closing segment is implied).
    pub fn points(&self) -> &[GeoPoint2d] {
        &self.points
    }

    /// Fill and outline style.
    pub fn style(&self) -> ShapeStyle {
        self.style
    }
}

/// Icon placed at a geographic position.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    position: GeoPoint2d,
    icon: IconKey,
    offset: (i32, i32),
}

impl Marker {
    /// Creates a marker. `icon_path` is a url or a file path (a `file://` prefix is stripped).
    ///
    /// The icon is centered on the projected position moved by `offset` pixels (right and down).
    pub fn new(
        position: GeoPoint2d,
        icon_path: &str,
        offset: (i32, i32),
        icon_size: Option<(u32, u32)>,
    ) -> Result<Self, MapViewError> {
        let path = icon_path.replace("file://", "");
        let path = path.trim();
        if path.is_empty() {
            return Err(MapViewError::config("marker iconPath must not be empty"));
        }

        if let Some((w, h)) = icon_size {
            if w == 0 || h == 0 {
                return Err(MapViewError::config(format!(
                    "marker iconSize must be positive, got [{w}, {h}]"
                )));
            }
        }

        Ok(Self {
            position,
            icon: IconKey::new(path, icon_size),
            offset,
        })
    }

    /// Geographic position.
    pub fn position(&self) -> GeoPoint2d {
        self.position
    }

    /// Icon source and size.
    pub fn icon(&self) -> &IconKey {
        &self.icon
    }

    /// Horizontal and vertical pixel offset.
    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }
}

/// Circle with the radius given in meters on the ground.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    center: GeoPoint2d,
    radius: f64,
    style: ShapeStyle,
}

impl Circle {
    /// Default style: red fill with a black hairline outline.
    pub const DEFAULT_STYLE: ShapeStyle = ShapeStyle {
        fill: Color::RED,
        stroke: Color::BLACK,
        stroke_width: 0.0,
    };

    /// Creates a circle. A negative radius is an error.
    pub fn new(center: GeoPoint2d, radius: f64, style: ShapeStyle) -> Result<Self, MapViewError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(MapViewError::config(format!(
                "circle radius must be a non-negative number of meters, got {radius}"
            )));
        }

        check_width(style.stroke_width)?;
        Ok(Self {
            center,
            radius,
            style,
        })
    }

    /// Center of the circle.
    pub fn center(&self) -> GeoPoint2d {
        self.center
    }

    /// Radius in meters.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Fill and outline style.
    pub fn style(&self) -> ShapeStyle {
        self.style
    }

    /// Radius in pixels at the given zoom, using the mercator scale at the circle's latitude.
    pub fn pixel_radius(&self, view: &crate::view::MapView) -> f64 {
        view.meters_to_pixels(self.radius, self.center.lat())
    }
}

/// A vector overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Connected line segments.
    Polyline(Polyline),
    /// Closed filled shape.
    Polygon(Polygon),
    /// Icon.
    Marker(Marker),
    /// Circle with radius in meters.
    Circle(Circle),
}

impl From<Polyline> for Overlay {
    fn from(value: Polyline) -> Self {
        Self::Polyline(value)
    }
}

impl From<Polygon> for Overlay {
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}

impl From<Marker> for Overlay {
    fn from(value: Marker) -> Self {
        Self::Marker(value)
    }
}

impl From<Circle> for Overlay {
    fn from(value: Circle) -> Self {
        Self::Circle(value)
    }
}

/// Ordered, append-only collection of overlays.
#[derive(Debug, Default, Clone)]
pub struct OverlayStore {
    overlays: Vec<Overlay>,
}

impl OverlayStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the overlay on top of the existing ones.
    pub fn add(&mut self, overlay: impl Into<Overlay>) -> OverlayId {
        self.overlays.push(overlay.into());
        OverlayId(self.overlays.len() - 1)
    }

    /// Overlay with the given id.
    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(id.0)
    }

    /// Overlays in the paint order.
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Markers in the paint order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.overlays.iter().filter_map(|overlay| match overlay {
            Overlay::Marker(marker) => Some(marker),
            _ => None,
        })
    }

    /// Number of overlays.
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}
