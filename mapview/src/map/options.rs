//! Typed versions of the declarative option maps.
//!
//! Every struct rejects unknown keys. Zoom levels are accepted both as numbers and as numeric
//! strings (`"zoomlevel": "12"`).

use std::str::FromStr;

use mapview_types::geo::GeoPoint2d;
use serde::Deserialize;

use crate::color::Color;
use crate::error::MapViewError;
use crate::layer::{LayerSpec, RasterTileLayerBuilder};
use crate::overlay::{Circle, LineStyle, Marker, Polygon, Polyline, ShapeStyle};
use crate::view::{MapView, MAX_ZOOM};

/// Zoom level given either as a number or as a string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "ZoomValue")]
pub struct ZoomLevel(pub u8);

#[derive(Deserialize)]
#[serde(untagged)]
enum ZoomValue {
    Number(i64),
    Text(String),
}

impl ZoomLevel {
    fn checked(value: i64) -> Result<Self, MapViewError> {
        u8::try_from(value)
            .ok()
            .filter(|zoom| *zoom <= MAX_ZOOM)
            .map(ZoomLevel)
            .ok_or_else(|| {
                MapViewError::config(format!(
                    "zoom level must be between 0 and {MAX_ZOOM}, got {value}"
                ))
            })
    }
}

impl TryFrom<ZoomValue> for ZoomLevel {
    type Error = MapViewError;

    fn try_from(value: ZoomValue) -> Result<Self, Self::Error> {
        match value {
            ZoomValue::Number(v) => Self::checked(v),
            ZoomValue::Text(s) => s.parse(),
        }
    }
}

impl FromStr for ZoomLevel {
    type Err = MapViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| MapViewError::config(format!("zoom level '{s}' is not a number")))?;
        Self::checked(value)
    }
}

fn point(values: &[f64]) -> Result<GeoPoint2d, MapViewError> {
    Ok(GeoPoint2d::from_slice(values)?)
}

fn points(values: &[Vec<f64>]) -> Result<Vec<GeoPoint2d>, MapViewError> {
    values.iter().map(|pair| point(pair)).collect()
}

/// Options of `createMapView`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapOptions {
    /// Draw a scale bar.
    #[serde(default)]
    pub scalebar: bool,
    /// Initial center as `[lat, lon]`.
    #[serde(default = "default_center")]
    pub center: Vec<f64>,
    /// Initial zoom level.
    #[serde(default)]
    pub zoomlevel: ZoomLevel,
    /// Draw tile boundaries.
    #[serde(default)]
    pub debug: bool,
}

fn default_center() -> Vec<f64> {
    vec![0.0, 0.0]
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            scalebar: false,
            center: default_center(),
            zoomlevel: ZoomLevel::default(),
            debug: false,
        }
    }
}

impl MapOptions {
    /// Initial view described by the options. The view has no size until the map is attached.
    pub fn view(&self) -> Result<MapView, MapViewError> {
        Ok(MapView::new(&point(&self.center)?, self.zoomlevel.0))
    }
}

/// Options of `addLayer`. All keys are required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LayerOptions {
    /// Unique name of the layer.
    pub name: String,
    /// Url template with `{s}`, `{z}`, `{x}` and `{y}` tokens.
    pub url: String,
    /// Values of the `{s}` token. May be empty if the template has no `{s}`.
    pub subdomains: Vec<String>,
    /// Maximum number of concurrent requests.
    pub parallel_requests: i64,
    /// Lowest zoom level the layer is displayed at.
    pub min_zoom: ZoomLevel,
    /// Highest zoom level the layer is displayed at.
    pub max_zoom: ZoomLevel,
}

impl TryFrom<LayerOptions> for LayerSpec {
    type Error = MapViewError;

    fn try_from(value: LayerOptions) -> Result<Self, Self::Error> {
        let parallel_requests = usize::try_from(value.parallel_requests).map_err(|_| {
            MapViewError::config(format!(
                "layer '{}': parallelRequests must be at least 1, got {}",
                value.name, value.parallel_requests
            ))
        })?;

        RasterTileLayerBuilder::new(value.name, value.url)
            .with_subdomains(value.subdomains)
            .with_parallel_requests(parallel_requests)
            .with_zoom_range(value.min_zoom.0, value.max_zoom.0)
            .build()
    }
}

/// Options of `drawPolyline`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PolylineOptions {
    /// Vertices as `[lat, lon]` pairs.
    pub coordinates: Vec<Vec<f64>>,
    /// Line color.
    #[serde(default = "default_line_color")]
    pub color: Color,
    /// Line width in pixels.
    #[serde(default)]
    pub stroke_width: f64,
}

fn default_line_color() -> Color {
    Polyline::DEFAULT_COLOR
}

impl TryFrom<PolylineOptions> for Polyline {
    type Error = MapViewError;

    fn try_from(value: PolylineOptions) -> Result<Self, Self::Error> {
        Polyline::new(
            points(&value.coordinates)?,
            LineStyle {
                color: value.color,
                width: value.stroke_width,
            },
        )
    }
}

/// Options of `drawPolygon`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PolygonOptions {
    /// Vertices as `[lat, lon]` pairs. The ring is closed implicitly.
    pub coordinates: Vec<Vec<f64>>,
    /// Fill color.
    #[serde(default = "default_polygon_fill")]
    pub fill_color: Color,
    /// Outline color.
    #[serde(default = "default_stroke")]
    pub stroke_color: Color,
    /// Outline width in pixels.
    #[serde(default)]
    pub stroke_width: f64,
}

fn default_polygon_fill() -> Color {
    Polygon::DEFAULT_STYLE.fill
}

fn default_stroke() -> Color {
    Color::BLACK
}

impl TryFrom<PolygonOptions> for Polygon {
    type Error = MapViewError;

    fn try_from(value: PolygonOptions) -> Result<Self, Self::Error> {
        Polygon::new(
            points(&value.coordinates)?,
            ShapeStyle {
                fill: value.fill_color,
                stroke: value.stroke_color,
                stroke_width: value.stroke_width,
            },
        )
    }
}

/// Options of `drawMarker`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MarkerOptions {
    /// Url or file path of the icon.
    pub icon_path: String,
    /// Position as `[lat, lon]`.
    pub coordinates: Vec<f64>,
    /// Horizontal offset of the icon in pixels, positive to the right.
    #[serde(default)]
    pub h_offset: i32,
    /// Vertical offset of the icon in pixels, positive downwards.
    #[serde(default)]
    pub v_offset: i32,
    /// Size the icon is scaled to, `[width, height]`.
    #[serde(default)]
    pub icon_size: Option<[u32; 2]>,
}

impl TryFrom<MarkerOptions> for Marker {
    type Error = MapViewError;

    fn try_from(value: MarkerOptions) -> Result<Self, Self::Error> {
        Marker::new(
            point(&value.coordinates)?,
            &value.icon_path,
            (value.h_offset, value.v_offset),
            value.icon_size.map(|[w, h]| (w, h)),
        )
    }
}

/// Options of `drawCircle`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CircleOptions {
    /// Center as `[lat, lon]`.
    pub coordinates: Vec<f64>,
    /// Fill color.
    #[serde(default = "default_circle_fill")]
    pub fill_color: Color,
    /// Outline color.
    #[serde(default = "default_stroke")]
    pub stroke_color: Color,
    /// Outline width in pixels.
    #[serde(default)]
    pub stroke_width: f64,
    /// Radius in meters.
    #[serde(default)]
    pub radius: f64,
}

fn default_circle_fill() -> Color {
    Circle::DEFAULT_STYLE.fill
}

impl TryFrom<CircleOptions> for Circle {
    type Error = MapViewError;

    fn try_from(value: CircleOptions) -> Result<Self, Self::Error> {
        Circle::new(
            point(&value.coordinates)?,
            value.radius,
            ShapeStyle {
                fill: value.fill_color,
                stroke: value.stroke_color,
                stroke_width: value.stroke_width,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn zoom_from_number_or_string() {
        let options: MapOptions = serde_json::from_value(json!({
            "scalebar": true,
            "center": [47.32, 12.79],
            "zoomlevel": "12",
            "debug": true
        }))
        .unwrap();
        assert_eq!(options.zoomlevel, ZoomLevel(12));
        assert!(options.scalebar && options.debug);

        let options: MapOptions = serde_json::from_value(json!({ "zoomlevel": 7 })).unwrap();
        assert_eq!(options.zoomlevel, ZoomLevel(7));
        assert_eq!(options.center, vec![0.0, 0.0]);

        assert!(serde_json::from_value::<MapOptions>(json!({ "zoomlevel": "twelve" })).is_err());
        assert!(serde_json::from_value::<MapOptions>(json!({ "zoomlevel": 23 })).is_err());
        assert_matches!("-1".parse::<ZoomLevel>(), Err(MapViewError::Configuration(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_value::<MapOptions>(json!({ "zoom": 12 })).is_err());
        assert!(serde_json::from_value::<CircleOptions>(json!({
            "coordinates": [47.29, 12.78],
            "radius": 500,
            "colour": "red"
        }))
        .is_err());
    }

    #[test]
    fn layer_options() {
        let options: LayerOptions = serde_json::from_value(json!({
            "name": "osm",
            "url": "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            "subdomains": ["a", "b"],
            "parallelRequests": 2,
            "maxZoom": "18",
            "minZoom": "12"
        }))
        .unwrap();

        let spec = LayerSpec::try_from(options.clone()).unwrap();
        assert_eq!(spec.name(), "osm");
        assert_eq!((spec.min_zoom(), spec.max_zoom()), (12, 18));
        assert_eq!(spec.parallel_requests(), 2);

        let inverted = LayerOptions {
            min_zoom: ZoomLevel(18),
            max_zoom: ZoomLevel(12),
            ..options.clone()
        };
        assert_matches!(
            LayerSpec::try_from(inverted),
            Err(MapViewError::Configuration(_))
        );

        let negative = LayerOptions {
            parallel_requests: -1,
            ..options
        };
        assert_matches!(
            LayerSpec::try_from(negative),
            Err(MapViewError::Configuration(_))
        );
    }

    #[test]
    fn every_layer_key_is_required() {
        let full = json!({
            "name": "osm",
            "url": "http://tile.openstreetmap.org/{z}/{x}/{y}.png",
            "subdomains": [],
            "parallelRequests": 2,
            "minZoom": 0,
            "maxZoom": "18"
        });
        assert!(serde_json::from_value::<LayerOptions>(full.clone()).is_ok());

        for key in [
            "name",
            "url",
            "subdomains",
            "parallelRequests",
            "minZoom",
            "maxZoom",
        ] {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(key);
            let err = serde_json::from_value::<LayerOptions>(partial).unwrap_err();
            assert!(
                err.to_string().contains(&format!("missing field `{key}`")),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn overlay_defaults() {
        let circle: CircleOptions =
            serde_json::from_value(json!({ "coordinates": [47.29, 12.78] })).unwrap();
        let circle = Circle::try_from(circle).unwrap();
        assert_eq!(circle.style(), Circle::DEFAULT_STYLE);
        assert_eq!(circle.radius(), 0.0);

        let line: PolylineOptions = serde_json::from_value(json!({
            "coordinates": [[47.33, 12.76], [47.33, 12.78]]
        }))
        .unwrap();
        let line = Polyline::try_from(line).unwrap();
        assert_eq!(line.style().color, Color::RED);
        assert_eq!(line.style().width, 0.0);

        let polygon: PolygonOptions = serde_json::from_value(json!({
            "coordinates": [[1.0, 1.0], [1.0, 2.0], [2.0, 2.0]]
        }))
        .unwrap();
        assert_eq!(Polygon::try_from(polygon).unwrap().style(), Polygon::DEFAULT_STYLE);
    }

    #[test]
    fn marker_options() {
        let marker: MarkerOptions = serde_json::from_value(json!({
            "iconPath": "http://www.google.com/mapfiles/dd-start.png",
            "coordinates": [47.31, 12.73],
            "hOffset": 5,
            "vOffset": 4,
            "iconSize": [64, 64]
        }))
        .unwrap();
        let marker = Marker::try_from(marker).unwrap();
        assert_eq!(marker.offset(), (5, 4));
        assert_eq!(marker.icon().size(), Some((64, 64)));

        let incomplete: MarkerOptions = serde_json::from_value(json!({
            "iconPath": "marker.png",
            "coordinates": [47.31]
        }))
        .unwrap();
        assert_matches!(
            Marker::try_from(incomplete),
            Err(MapViewError::Configuration(_))
        );
    }

    #[test]
    fn colors_by_name_and_hex() {
        let polygon: PolygonOptions = serde_json::from_value(json!({
            "coordinates": [[1.0, 1.0], [1.0, 2.0], [2.0, 2.0]],
            "fillColor": "Green",
            "strokeColor": "#ff000080"
        }))
        .unwrap();
        assert_eq!(polygon.fill_color, Color::GREEN);
        assert_eq!(polygon.stroke_color, Color::RED.with_alpha(128));

        assert!(serde_json::from_value::<PolylineOptions>(json!({
            "coordinates": [[1.0, 1.0], [1.0, 2.0]],
            "color": "mauve"
        }))
        .is_err());
    }
}
