use mapview_types::cartesian::{Point2d, Rect, Vector2d};
use mapview_types::geo::{GeoPoint, GeoPoint2d};

use super::{Canvas, Frame, LinePaint, Paint, PixelCanvas};
use crate::color::Color;
use crate::layer::{LayerManager, TileKey, TileState};
use crate::overlay::{IconStore, Overlay, ShapeStyle};
use crate::tile_schema::TileIndex;
use crate::view::MapView;

/// Maximum length of the scale bar in pixels.
const SCALEBAR_MAX_WIDTH: f64 = 100.0;
const SCALEBAR_MARGIN: f64 = 10.0;
const SCALEBAR_HEIGHT: f64 = 4.0;

/// What is drawn besides layers and overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Color of the frame where no tile is drawn.
    pub background: Color,
    /// Color of the placeholder drawn in place of failed tiles.
    pub failed_tile: Color,
    /// Draw tile boundaries.
    pub debug: bool,
    /// Draw a scale bar in the bottom left corner.
    pub scalebar: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            failed_tile: Color::GRAY.with_alpha(128),
            debug: false,
            scalebar: false,
        }
    }
}

/// Composes tiles of all active layers and the overlays into a frame.
#[derive(Debug, Clone, Default)]
pub struct MapRenderer {
    options: RenderOptions,
}

impl MapRenderer {
    /// Creates a renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Changes render options.
    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    /// Renders the view into a new frame of the view's size.
    pub fn render(
        &self,
        view: &MapView,
        layers: &LayerManager,
        overlays: &[Overlay],
        icons: &IconStore,
    ) -> Frame {
        let size = view.size();
        let mut canvas = PixelCanvas::new(
            size.width().max(0.0).round() as u32,
            size.height().max(0.0).round() as u32,
            self.options.background,
        );
        self.render_to(&mut canvas, view, layers, overlays, icons);
        canvas.into_frame()
    }

    /// Draws the view on the canvas: tiles of active layers in the order the layers were
    /// added, then overlays in their paint order, then the scale bar.
    ///
    /// Markers with icons that are not loaded yet are skipped, and their icons are requested.
    pub fn render_to(
        &self,
        canvas: &mut dyn Canvas,
        view: &MapView,
        layers: &LayerManager,
        overlays: &[Overlay],
        icons: &IconStore,
    ) {
        if !view.has_size() {
            return;
        }

        self.draw_tiles(canvas, view, layers);

        for overlay in overlays {
            draw_overlay(canvas, view, overlay, icons);
        }

        if self.options.scalebar {
            self.draw_scalebar(canvas, view);
        }
    }

    fn draw_tiles(&self, canvas: &mut dyn Canvas, view: &MapView, layers: &LayerManager) {
        let schema = layers.schema();
        let Some(tiles) = schema.iter_tiles(view) else {
            return;
        };
        let tiles: Vec<_> = tiles.collect();

        for layer in layers.layers().iter().filter(|layer| layer.is_active(view)) {
            for index in &tiles {
                let key = TileKey::new(layer.id(), TileIndex::from(*index));
                let Some(entry) = layers.cache().get(&key) else {
                    continue;
                };

                let rect = schema.tile_screen_rect(*index, view);
                match entry.state {
                    TileState::Ready(image) => canvas.draw_image(&image, rect),
                    TileState::Failed { .. } => canvas.fill_rect(rect, self.options.failed_tile),
                    TileState::Pending => {}
                }
            }
        }

        if self.options.debug {
            let paint = LinePaint {
                color: Color::RED.with_alpha(160),
                width: 0.0,
            };
            for index in &tiles {
                canvas.stroke_rect(schema.tile_screen_rect(*index, view), paint);
            }
        }
    }

    fn draw_scalebar(&self, canvas: &mut dyn Canvas, view: &MapView) {
        let Some((_, width)) = scalebar_length(view) else {
            return;
        };

        let bottom = canvas.size().height() - SCALEBAR_MARGIN;
        let bar = Rect::new(
            SCALEBAR_MARGIN,
            bottom - SCALEBAR_HEIGHT,
            SCALEBAR_MARGIN + width,
            bottom,
        );
        canvas.fill_rect(bar.expand(1.0), Color::WHITE.with_alpha(200));
        canvas.fill_rect(bar, Color::BLACK);
    }
}

fn draw_overlay(canvas: &mut dyn Canvas, view: &MapView, overlay: &Overlay, icons: &IconStore) {
    match overlay {
        Overlay::Polyline(line) => {
            let points = project(view, line.points());
            let style = line.style();
            canvas.draw_polyline(
                &points,
                LinePaint {
                    color: style.color,
                    width: style.width,
                },
            );
        }
        Overlay::Polygon(polygon) => {
            let points = project(view, polygon.points());
            canvas.draw_polygon(&points, shape_paint(polygon.style()));
        }
        Overlay::Marker(marker) => {
            let Some(icon) = icons.get(marker.icon()) else {
                icons.request(marker.icon());
                return;
            };

            let (dx, dy) = marker.offset();
            let anchor = view.geo_to_pixel(&marker.position()) + Vector2d::new(dx as f64, dy as f64);
            let (width, height) = (icon.width() as f64, icon.height() as f64);
            let origin = anchor - Vector2d::new(width / 2.0, height / 2.0);
            canvas.draw_image(&icon, Rect::from_origin(origin, width, height));
        }
        Overlay::Circle(circle) => {
            let center = view.geo_to_pixel(&circle.center());
            canvas.draw_circle(center, circle.pixel_radius(view), shape_paint(circle.style()));
        }
    }
}

fn project(view: &MapView, points: &[GeoPoint2d]) -> Vec<Point2d> {
    points.iter().map(|p| view.geo_to_pixel(p)).collect()
}

fn shape_paint(style: ShapeStyle) -> Paint {
    Paint {
        fill: style.fill,
        stroke: LinePaint {
            color: style.stroke,
            width: style.stroke_width,
        },
    }
}

/// Length of the scale bar for the view: the largest distance of the 1-2-5 series that fits
/// into 100 pixels at the latitude of the view center, as `(meters, pixels)`.
pub fn scalebar_length(view: &MapView) -> Option<(f64, f64)> {
    let center = view.center();
    let meters_per_pixel = view
        .projection()
        .ground_resolution(center.lat(), view.zoom());
    let max_meters = SCALEBAR_MAX_WIDTH * meters_per_pixel;
    if !max_meters.is_finite() || max_meters <= 0.0 {
        return None;
    }

    let magnitude = 10f64.powf(max_meters.log10().floor());
    let meters = [5.0, 2.0, 1.0]
        .into_iter()
        .map(|k| k * magnitude)
        .find(|m| *m <= max_meters * (1.0 + 1e-9))?;

    Some((meters, meters / meters_per_pixel))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mapview_types::cartesian::Size;
    use mapview_types::latlon;

    use super::*;
    use crate::decoded_image::DecodedImage;
    use crate::layer::{RasterTileLayerBuilder, TileCache, TileEntry, TileFetcher};
    use crate::overlay::{Circle, IconKey, Marker, OverlayStore};
    use crate::tests::{fast_config, TestLoader, TestPlatform};
    use crate::tile_schema::TileSchema;

    fn view() -> MapView {
        MapView::new(&latlon!(47.32, 12.79), 14).with_size(Size::new(400.0, 300.0))
    }

    fn manager() -> LayerManager {
        let cache = Arc::new(TileCache::new(512));
        let fetcher = TileFetcher::new(
            cache.clone(),
            Arc::new(TestLoader::default()),
            fast_config(),
            None,
        );
        LayerManager::new(cache, fetcher, TileSchema::web())
    }

    fn icons() -> IconStore {
        IconStore::new(8, Arc::new(TestPlatform::default()), None)
    }

    fn add_layer(manager: &mut LayerManager, name: &str, min_zoom: u8, state: TileState) {
        let spec = RasterTileLayerBuilder::new(name, "http://tiles.test/{z}/{x}/{y}.png")
            .with_zoom_range(min_zoom, 18)
            .build()
            .unwrap();
        let id = manager.add_layer(spec).unwrap();
        for index in TileSchema::web().iter_tiles(&view()).unwrap() {
            manager.cache().put(TileEntry::new(
                TileKey::new(id, TileIndex::from(index)),
                state.clone(),
            ));
        }
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> Color {
        let [r, g, b, a] = frame.get_pixel(x, y).0;
        Color::rgba(r, g, b, a)
    }

    fn ready(color: Color) -> TileState {
        TileState::Ready(Arc::new(DecodedImage::solid(color, 256, 256)))
    }

    #[test]
    fn layers_are_drawn_in_order() {
        let mut manager = manager();
        manager.update_view(view());
        add_layer(&mut manager, "base", 0, ready(Color::RED));
        add_layer(&mut manager, "top", 0, ready(Color::BLUE));
        add_layer(&mut manager, "detail", 16, ready(Color::GREEN));
        manager.start_layers();

        let frame = MapRenderer::default().render(&view(), &manager, &[], &icons());
        assert_eq!(frame.dimensions(), (400, 300));
        assert_eq!(pixel(&frame, 200, 150), Color::BLUE);
        assert_eq!(pixel(&frame, 0, 0), Color::BLUE);

        manager.stop_layer("top").unwrap();
        let frame = MapRenderer::default().render(&view(), &manager, &[], &icons());
        assert_eq!(pixel(&frame, 200, 150), Color::RED);
    }

    #[test]
    fn failed_tiles_get_placeholder() {
        let mut manager = manager();
        manager.update_view(view());
        add_layer(&mut manager, "failed", 0, TileState::Failed { attempts: 3 });
        manager.start_layers();

        let frame = MapRenderer::default().render(&view(), &manager, &[], &icons());
        let placeholder = pixel(&frame, 200, 150);
        assert_ne!(placeholder, Color::WHITE);
        assert_eq!(placeholder, Color::WHITE.blend(Color::GRAY.with_alpha(128)));

        let mut manager = self::manager();
        manager.update_view(view());
        add_layer(&mut manager, "pending", 0, TileState::Pending);
        manager.start_layers();
        let frame = MapRenderer::default().render(&view(), &manager, &[], &icons());
        assert_eq!(pixel(&frame, 200, 150), Color::WHITE);
    }

    #[test]
    fn later_overlay_wins() {
        let style = |fill| ShapeStyle {
            fill,
            ..Circle::DEFAULT_STYLE
        };
        let center = latlon!(47.32, 12.79);

        let mut store = OverlayStore::new();
        store.add(Circle::new(center, 200.0, style(Color::RED)).unwrap());
        store.add(Circle::new(center, 100.0, style(Color::BLUE)).unwrap());
        let frame = MapRenderer::default().render(&view(), &manager(), store.overlays(), &icons());
        assert_eq!(pixel(&frame, 200, 150), Color::BLUE);

        let mut store = OverlayStore::new();
        store.add(Circle::new(center, 100.0, style(Color::BLUE)).unwrap());
        store.add(Circle::new(center, 200.0, style(Color::RED)).unwrap());
        let frame = MapRenderer::default().render(&view(), &manager(), store.overlays(), &icons());
        assert_eq!(pixel(&frame, 200, 150), Color::RED);
    }

    fn blue_bounds(frame: &Frame) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in frame.enumerate_pixels() {
            if p.0 != Color::BLUE.to_u8_array() {
                continue;
            }

            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        bounds
    }

    #[test]
    fn marker_offset_moves_icon() {
        let icons = icons();
        let path = "http://example.com/marker.png";
        icons.insert(
            IconKey::new(path, None),
            DecodedImage::solid(Color::BLUE, 10, 8),
        );

        let render = |offset| {
            let mut store = OverlayStore::new();
            store.add(Marker::new(latlon!(47.32, 12.79), path, offset, None).unwrap());
            MapRenderer::default().render(&view(), &manager(), store.overlays(), &icons)
        };

        let plain = blue_bounds(&render((0, 0))).unwrap();
        let shifted = blue_bounds(&render((5, 4))).unwrap();
        assert_eq!(plain, (195, 146, 204, 153));
        assert_eq!(
            shifted,
            (plain.0 + 5, plain.1 + 4, plain.2 + 5, plain.3 + 4)
        );
    }

    #[test]
    fn marker_without_icon_is_skipped() {
        let icons = icons();
        let mut store = OverlayStore::new();
        store.add(Marker::new(latlon!(47.32, 12.79), "/sdcard/missing.png", (0, 0), None).unwrap());

        let frame = MapRenderer::default().render(&view(), &manager(), store.overlays(), &icons);
        assert!(blue_bounds(&frame).is_none());
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut manager = manager();
        manager.update_view(view());
        add_layer(&mut manager, "base", 0, ready(Color::GREEN));
        manager.start_layers();

        let mut store = OverlayStore::new();
        store.add(Circle::new(latlon!(47.32, 12.79), 300.0, Circle::DEFAULT_STYLE).unwrap());

        let renderer = MapRenderer::new(RenderOptions {
            debug: true,
            scalebar: true,
            ..Default::default()
        });
        let first = renderer.render(&view(), &manager, store.overlays(), &icons());
        let second = renderer.render(&view(), &manager, store.overlays(), &icons());
        assert_eq!(first, second);
    }

    #[test]
    fn scalebar_uses_round_numbers() {
        for zoom in 0..=22 {
            let (meters, pixels) = scalebar_length(&view().with_zoom(zoom)).unwrap();
            assert!(pixels <= SCALEBAR_MAX_WIDTH + 1e-6);
            assert!(pixels >= SCALEBAR_MAX_WIDTH * 0.4 - 1e-9);

            let magnitude = 10f64.powf((meters.log10() + 1e-9).floor());
            let leading = (meters / magnitude).round();
            assert!([1.0, 2.0, 5.0].contains(&leading));
        }
    }
}
