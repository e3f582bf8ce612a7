use image::{Rgba, RgbaImage};
use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, FillVertexConstructor, LineJoin,
    StrokeOptions, StrokeTessellator, StrokeVertex, StrokeVertexConstructor, TessellationError,
    VertexBuffers,
};
use lyon::math::{point, Point as LyonPoint};
use lyon::path::Path;
use mapview_types::cartesian::{CartesianPoint2d, Point2d, Rect, Size, Vector2d};

use super::{Canvas, LinePaint, Paint};
use crate::color::Color;
use crate::decoded_image::DecodedImage;

/// Rendered map image.
pub type Frame = RgbaImage;

/// Software canvas rasterizing into an RGBA buffer.
///
/// Lines, polygons and circles are tessellated into triangles with `lyon`. The triangles of one
/// shape are rasterized into a coverage mask that is then blended into the buffer with
/// source-over blending, so overlapping triangles of a semi-transparent shape are not blended
/// twice. Pixels are sampled at their centers; there is no anti-aliasing. Lines thinner than one
/// pixel are drawn one pixel wide.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    image: RgbaImage,
}

impl PixelCanvas {
    /// Creates a canvas filled with the background color.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(background.to_u8_array())),
        }
    }

    /// Current content of the canvas.
    pub fn frame(&self) -> &Frame {
        &self.image
    }

    /// Consumes the canvas returning its content.
    pub fn into_frame(self) -> Frame {
        self.image
    }

    fn blend_pixel(&mut self, x: u32, y: u32, color: Color) {
        let pixel = self.image.get_pixel_mut(x, y);
        let [r, g, b, a] = pixel.0;
        *pixel = Rgba(Color::rgba(r, g, b, a).blend(color).to_u8_array());
    }

    fn coverage(&self) -> Coverage {
        Coverage::new(self.image.width(), self.image.height())
    }

    fn paint(&mut self, coverage: &Coverage, color: Color) {
        if color.is_transparent() {
            return;
        }

        for y in 0..coverage.height {
            for x in 0..coverage.width {
                if coverage.is_set(x, y) {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    fn stroke_path(&mut self, path: &Path, paint: LinePaint) {
        if paint.color.is_transparent() {
            return;
        }

        let options = StrokeOptions::DEFAULT
            .with_line_width(paint.width.max(1.0) as f32)
            .with_line_join(LineJoin::Miter)
            .with_miter_limit(2.0)
            .with_tolerance(TOLERANCE);
        let mut buffers = VertexBuffers::new();
        let result = StrokeTessellator::new().tessellate_path(
            path,
            &options,
            &mut BuffersBuilder::new(&mut buffers, PositionConstructor),
        );
        self.paint_triangles(result, &buffers, paint.color);
    }

    fn fill_path(&mut self, path: &Path, color: Color) {
        if color.is_transparent() {
            return;
        }

        let mut buffers = VertexBuffers::new();
        let result = FillTessellator::new().tessellate_path(
            path,
            &FillOptions::DEFAULT.with_tolerance(TOLERANCE),
            &mut BuffersBuilder::new(&mut buffers, PositionConstructor),
        );
        self.paint_triangles(result, &buffers, color);
    }

    fn paint_triangles(
        &mut self,
        result: Result<(), TessellationError>,
        buffers: &VertexBuffers<LyonPoint, u32>,
        color: Color,
    ) {
        if let Err(err) = result {
            log::warn!("Failed to tessellate a shape: {err:?}");
            return;
        }

        let mut coverage = self.coverage();
        coverage.fill_triangles(buffers);
        self.paint(&coverage, color);
    }
}

impl Canvas for PixelCanvas {
    fn size(&self) -> Size {
        Size::new(self.image.width() as f64, self.image.height() as f64)
    }

    fn draw_image(&mut self, image: &DecodedImage, rect: Rect) {
        if image.width() == 0 || image.height() == 0 || rect.width() <= 0.0 || rect.height() <= 0.0
        {
            return;
        }

        let (x_from, x_to) = pixel_range(rect.x_min(), rect.x_max(), self.image.width());
        let (y_from, y_to) = pixel_range(rect.y_min(), rect.y_max(), self.image.height());
        let x_scale = image.width() as f64 / rect.width();
        let y_scale = image.height() as f64 / rect.height();

        for y in y_from..y_to {
            let sy = ((y as f64 + 0.5 - rect.y_min()) * y_scale).floor();
            let sy = (sy.max(0.0) as u32).min(image.height() - 1);
            for x in x_from..x_to {
                let sx = ((x as f64 + 0.5 - rect.x_min()) * x_scale).floor();
                let sx = (sx.max(0.0) as u32).min(image.width() - 1);
                if let Some(color) = image.pixel(sx, sy) {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let (x_from, x_to) = pixel_range(rect.x_min(), rect.x_max(), self.image.width());
        let (y_from, y_to) = pixel_range(rect.y_min(), rect.y_max(), self.image.height());
        for y in y_from..y_to {
            for x in x_from..x_to {
                self.blend_pixel(x, y, color);
            }
        }
    }

    fn stroke_rect(&mut self, rect: Rect, paint: LinePaint) {
        // Hairline outline stays inside the rectangle.
        let inset = if paint.width < 1.0 { 0.5 } else { 0.0 };
        let x_min = rect.x_min() + inset;
        let y_min = rect.y_min() + inset;
        let x_max = rect.x_max() - inset;
        let y_max = rect.y_max() - inset;
        let ring = [
            Point2d::new(x_min, y_min),
            Point2d::new(x_max, y_min),
            Point2d::new(x_max, y_max),
            Point2d::new(x_min, y_max),
        ];
        if let Some(path) = build_path(&ring, true) {
            self.stroke_path(&path, paint);
        }
    }

    fn draw_polyline(&mut self, points: &[Point2d], paint: LinePaint) {
        if points.len() < 2 {
            return;
        }

        if let Some(path) = build_path(points, false) {
            self.stroke_path(&path, paint);
        }
    }

    fn draw_polygon(&mut self, points: &[Point2d], paint: Paint) {
        if points.len() < 3 {
            return;
        }

        if let Some(path) = build_path(points, true) {
            self.fill_path(&path, paint.fill);
            self.stroke_path(&path, paint.stroke);
        }
    }

    fn draw_circle(&mut self, center: Point2d, radius: f64, paint: Paint) {
        if !center.is_finite() || !radius.is_finite() || radius <= 0.0 {
            return;
        }

        let center = point(center.x() as f32, center.y() as f32);
        let radius = radius as f32;

        if !paint.fill.is_transparent() {
            let mut buffers = VertexBuffers::new();
            let result = FillTessellator::new().tessellate_circle(
                center,
                radius,
                &FillOptions::DEFAULT.with_tolerance(TOLERANCE),
                &mut BuffersBuilder::new(&mut buffers, PositionConstructor),
            );
            self.paint_triangles(result, &buffers, paint.fill);
        }

        if !paint.stroke.color.is_transparent() {
            let options = StrokeOptions::DEFAULT
                .with_line_width(paint.stroke.width.max(1.0) as f32)
                .with_tolerance(TOLERANCE);
            let mut buffers = VertexBuffers::new();
            let result = StrokeTessellator::new().tessellate_circle(
                center,
                radius,
                &options,
                &mut BuffersBuilder::new(&mut buffers, PositionConstructor),
            );
            self.paint_triangles(result, &buffers, paint.stroke.color);
        }
    }
}

/// Maximum distance between a curve and its flattened approximation, in pixels.
const TOLERANCE: f32 = 0.1;

/// Path through the points, or `None` if any of them is not finite.
fn build_path(points: &[Point2d], closed: bool) -> Option<Path> {
    if points.iter().any(|p| !p.is_finite()) {
        return None;
    }

    let (first, rest) = points.split_first()?;
    let mut builder = Path::builder();
    let _ = builder.begin(point(first.x() as f32, first.y() as f32));
    for p in rest {
        let _ = builder.line_to(point(p.x() as f32, p.y() as f32));
    }
    builder.end(closed);

    Some(builder.build())
}

/// Keeps only the position of tessellated vertices.
struct PositionConstructor;

impl FillVertexConstructor<LyonPoint> for PositionConstructor {
    fn new_vertex(&mut self, vertex: FillVertex) -> LyonPoint {
        vertex.position()
    }
}

impl StrokeVertexConstructor<LyonPoint> for PositionConstructor {
    fn new_vertex(&mut self, vertex: StrokeVertex) -> LyonPoint {
        vertex.position()
    }
}

/// Range of pixel indices whose centers lie in `[from, to)`, clipped to `[0, limit)`.
fn pixel_range(from: f64, to: f64, limit: u32) -> (u32, u32) {
    let clip = |v: f64| (v - 0.5).ceil().clamp(0.0, limit as f64) as u32;
    (clip(from), clip(to))
}

/// Range of pixel indices whose centers lie in `[from, to]`, clipped to `[0, limit)`.
fn closed_pixel_range(from: f64, to: f64, limit: u32) -> (u32, u32) {
    let first = (from - 0.5).ceil().clamp(0.0, limit as f64) as u32;
    let last = ((to - 0.5).floor() + 1.0).clamp(0.0, limit as f64) as u32;
    (first, last)
}

/// Set of pixels covered by a shape.
struct Coverage {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Coverage {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    fn is_set(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    fn fill_triangles(&mut self, buffers: &VertexBuffers<LyonPoint, u32>) {
        let vertex = |index: u32| buffers.vertices.get(index as usize).copied();
        for triangle in buffers.indices.chunks_exact(3) {
            if let (Some(a), Some(b), Some(c)) =
                (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2]))
            {
                self.fill_triangle(a, b, c);
            }
        }
    }

    /// Marks pixels whose centers are inside the triangle or on its border.
    fn fill_triangle(&mut self, a: LyonPoint, b: LyonPoint, c: LyonPoint) {
        let [a, b, c] = [a, b, c].map(|p| Point2d::new(p.x as f64, p.y as f64));
        let area = edge(a, b, c);
        if area == 0.0 {
            return;
        }

        let (x_from, x_to) =
            closed_pixel_range(a.x.min(b.x).min(c.x), a.x.max(b.x).max(c.x), self.width);
        let (y_from, y_to) =
            closed_pixel_range(a.y.min(b.y).min(c.y), a.y.max(b.y).max(c.y), self.height);

        for y in y_from..y_to {
            for x in x_from..x_to {
                let p = Point2d::new(x as f64 + 0.5, y as f64 + 0.5);
                let weights = [edge(b, c, p), edge(c, a, p), edge(a, b, p)];
                let inside = if area > 0.0 {
                    weights.iter().all(|w| *w >= 0.0)
                } else {
                    weights.iter().all(|w| *w <= 0.0)
                };

                if inside {
                    self.bits[y as usize * self.width as usize + x as usize] = true;
                }
            }
        }
    }
}

/// Doubled signed area of the triangle `abp`.
fn edge(a: Point2d, b: Point2d, p: Point2d) -> f64 {
    let ab: Vector2d = b - a;
    let ap: Vector2d = p - a;
    ab.x * ap.y - ab.y * ap.x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_at(canvas: &PixelCanvas, x: u32, y: u32) -> Color {
        let [r, g, b, a] = canvas.frame().get_pixel(x, y).0;
        Color::rgba(r, g, b, a)
    }

    fn count(canvas: &PixelCanvas, color: Color) -> usize {
        canvas
            .frame()
            .pixels()
            .filter(|p| p.0 == color.to_u8_array())
            .count()
    }

    #[test]
    fn fill_rect_covers_pixel_centers() {
        let mut canvas = PixelCanvas::new(10, 10, Color::WHITE);
        canvas.fill_rect(Rect::new(2.0, 2.0, 5.0, 4.0), Color::RED);
        assert_eq!(count(&canvas, Color::RED), 6);
        assert_eq!(color_at(&canvas, 2, 2), Color::RED);
        assert_eq!(color_at(&canvas, 5, 2), Color::WHITE);
    }

    #[test]
    fn draw_image_scales_into_rect() {
        let mut canvas = PixelCanvas::new(20, 20, Color::WHITE);
        let image = DecodedImage::solid(Color::BLUE, 2, 2);
        canvas.draw_image(&image, Rect::new(-5.0, -5.0, 5.0, 5.0));
        assert_eq!(count(&canvas, Color::BLUE), 25);
    }

    #[test]
    fn hairline_is_one_pixel_wide() {
        let mut canvas = PixelCanvas::new(20, 20, Color::WHITE);
        canvas.draw_polyline(
            &[Point2d::new(2.0, 10.5), Point2d::new(18.0, 10.5)],
            LinePaint {
                color: Color::BLACK,
                width: 0.0,
            },
        );
        assert_eq!(count(&canvas, Color::BLACK), 16);
    }

    #[test]
    fn wide_line_covers_its_width() {
        let mut canvas = PixelCanvas::new(20, 20, Color::WHITE);
        canvas.draw_polyline(
            &[Point2d::new(2.0, 10.0), Point2d::new(18.0, 10.0)],
            LinePaint {
                color: Color::BLACK,
                width: 6.0,
            },
        );

        assert_eq!(count(&canvas, Color::BLACK), 16 * 6);
        assert_eq!(color_at(&canvas, 10, 7), Color::BLACK);
        assert_eq!(color_at(&canvas, 10, 12), Color::BLACK);
        assert_eq!(color_at(&canvas, 10, 6), Color::WHITE);
        assert_eq!(color_at(&canvas, 10, 13), Color::WHITE);
    }

    #[test]
    fn wide_line_blends_once() {
        let mut canvas = PixelCanvas::new(40, 40, Color::WHITE);
        let paint = LinePaint {
            color: Color::BLACK.with_alpha(128),
            width: 6.0,
        };
        canvas.draw_polyline(
            &[
                Point2d::new(5.0, 20.0),
                Point2d::new(20.0, 20.0),
                Point2d::new(20.0, 35.0),
            ],
            paint,
        );

        let joint = color_at(&canvas, 20, 20);
        let straight = color_at(&canvas, 12, 20);
        assert_eq!(joint, straight);
        assert_ne!(straight, Color::WHITE);
    }

    #[test]
    fn polygon_fill_and_stroke() {
        let mut canvas = PixelCanvas::new(20, 20, Color::WHITE);
        canvas.draw_polygon(
            &[
                Point2d::new(2.5, 2.5),
                Point2d::new(17.5, 2.5),
                Point2d::new(17.5, 17.5),
                Point2d::new(2.5, 17.5),
            ],
            Paint {
                fill: Color::GREEN,
                stroke: LinePaint {
                    color: Color::BLACK,
                    width: 0.0,
                },
            },
        );

        assert_eq!(color_at(&canvas, 10, 10), Color::GREEN);
        assert_eq!(color_at(&canvas, 2, 10), Color::BLACK);
        assert_eq!(color_at(&canvas, 17, 10), Color::BLACK);
        assert_eq!(color_at(&canvas, 0, 0), Color::WHITE);
    }

    #[test]
    fn concave_polygon_keeps_its_notch() {
        let mut canvas = PixelCanvas::new(30, 30, Color::WHITE);
        let transparent = LinePaint {
            color: Color::TRANSPARENT,
            width: 0.0,
        };
        canvas.draw_polygon(
            &[
                Point2d::new(0.0, 0.0),
                Point2d::new(30.0, 0.0),
                Point2d::new(30.0, 30.0),
                Point2d::new(20.0, 30.0),
                Point2d::new(20.0, 10.0),
                Point2d::new(10.0, 10.0),
                Point2d::new(10.0, 30.0),
                Point2d::new(0.0, 30.0),
            ],
            Paint {
                fill: Color::BLUE,
                stroke: transparent,
            },
        );

        assert_eq!(color_at(&canvas, 5, 25), Color::BLUE);
        assert_eq!(color_at(&canvas, 25, 25), Color::BLUE);
        assert_eq!(color_at(&canvas, 15, 5), Color::BLUE);
        assert_eq!(color_at(&canvas, 15, 20), Color::WHITE);
        assert_eq!(count(&canvas, Color::BLUE), 30 * 30 - 10 * 20);
    }

    #[test]
    fn semi_transparent_polygon_blends_once() {
        let mut canvas = PixelCanvas::new(30, 30, Color::WHITE);
        let fill = Color::BLUE.with_alpha(128);
        canvas.draw_polygon(
            &[
                Point2d::new(1.0, 1.0),
                Point2d::new(29.0, 3.0),
                Point2d::new(25.0, 28.0),
                Point2d::new(12.0, 20.0),
                Point2d::new(3.0, 27.0),
            ],
            Paint {
                fill,
                stroke: LinePaint {
                    color: Color::TRANSPARENT,
                    width: 0.0,
                },
            },
        );

        let once = Color::WHITE.blend(fill);
        let painted = canvas
            .frame()
            .pixels()
            .filter(|p| p.0 != Color::WHITE.to_u8_array())
            .count();
        assert!(painted > 0);
        assert_eq!(count(&canvas, once), painted);
    }

    #[test]
    fn circle_fill_and_outline() {
        let mut canvas = PixelCanvas::new(40, 40, Color::WHITE);
        canvas.draw_circle(
            Point2d::new(20.0, 20.0),
            10.0,
            Paint {
                fill: Color::RED,
                stroke: LinePaint {
                    color: Color::BLACK,
                    width: 0.0,
                },
            },
        );

        assert_eq!(color_at(&canvas, 20, 20), Color::RED);
        assert_eq!(color_at(&canvas, 29, 19), Color::BLACK);
        assert_eq!(color_at(&canvas, 35, 20), Color::WHITE);
    }

    #[test]
    fn far_away_segment_is_clipped() {
        let mut canvas = PixelCanvas::new(10, 10, Color::WHITE);
        canvas.draw_polyline(
            &[Point2d::new(-1e9, 5.5), Point2d::new(1e9, 5.5)],
            LinePaint {
                color: Color::BLACK,
                width: 0.0,
            },
        );
        assert_eq!(count(&canvas, Color::BLACK), 10);
    }
}
