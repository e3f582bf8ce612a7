//! Rendering of the map into frames.
//!
//! [`MapRenderer`] walks the layers and overlays of a map and issues drawing commands to a
//! [`Canvas`]. The crate provides one canvas implementation, [`PixelCanvas`], which rasterizes
//! everything in software into an RGBA [`Frame`].

use mapview_types::cartesian::{Point2d, Rect, Size};

use crate::color::Color;
use crate::decoded_image::DecodedImage;

mod pixel_canvas;
mod renderer;

pub use pixel_canvas::{Frame, PixelCanvas};
pub use renderer::{scalebar_length, MapRenderer, RenderOptions};

/// Drawing surface the renderer paints on. All coordinates are screen pixels with `(0, 0)` in
/// the top left corner.
pub trait Canvas {
    /// Size of the surface in pixels.
    fn size(&self) -> Size;

    /// Draws the image scaled into the rectangle.
    fn draw_image(&mut self, image: &DecodedImage, rect: Rect);

    /// Fills the rectangle with the color.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Strokes the outline of the rectangle.
    fn stroke_rect(&mut self, rect: Rect, paint: LinePaint);

    /// Draws connected line segments.
    fn draw_polyline(&mut self, points: &[Point2d], paint: LinePaint);

    /// Fills the implicitly closed ring and strokes its outline.
    fn draw_polygon(&mut self, points: &[Point2d], paint: Paint);

    /// Fills and strokes a circle.
    fn draw_circle(&mut self, center: Point2d, radius: f64, paint: Paint);
}

/// Line color and width. Width of less than one pixel is drawn as a one pixel hairline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePaint {
    /// Line color.
    pub color: Color,
    /// Line width in pixels.
    pub width: f64,
}

/// Fill and outline of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Fill color.
    pub fill: Color,
    /// Outline.
    pub stroke: LinePaint,
}
