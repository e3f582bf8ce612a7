//! Changes of the map view requested by the host: gestures, programmatic moves and resizes.
//!
//! The host converts its own input events (touch, mouse, window callbacks) into [`ViewEvent`]s
//! and passes them to [`Map::handle_event`](crate::Map::handle_event).

use mapview_types::cartesian::{Point2d, Size};
use mapview_types::geo::GeoPoint2d;

use crate::view::{MapView, MAX_ZOOM};

/// Change of the map view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewEvent {
    /// Drag gesture: the point under `from` is moved under `to` (screen pixels).
    Pan {
        /// Screen position where the drag started.
        from: Point2d,
        /// Current screen position.
        to: Point2d,
    },
    /// Zoom in by one level, keeping the geographic point under `anchor` in place. Without an
    /// anchor the center stays in place.
    ZoomIn {
        /// Screen position that stays in place.
        anchor: Option<Point2d>,
    },
    /// Zoom out by one level.
    ZoomOut {
        /// Screen position that stays in place.
        anchor: Option<Point2d>,
    },
    /// Set zoom level, keeping the center.
    SetZoom(u8),
    /// Move the center to the point, keeping the zoom.
    SetCenter(GeoPoint2d),
    /// The drawing area changed its size.
    Resize(Size),
}

impl ViewEvent {
    /// Returns the view after the event.
    ///
    /// Zoom never leaves `[0, MAX_ZOOM]`; zooming beyond the limits leaves the view unchanged.
    pub fn apply(&self, view: &MapView) -> MapView {
        match *self {
            ViewEvent::Pan { from, to } => view.translate_by_pixels(from, to),
            ViewEvent::ZoomIn { anchor } => {
                if view.zoom() >= MAX_ZOOM {
                    return *view;
                }

                zoom_to(view, view.zoom() + 1, anchor)
            }
            ViewEvent::ZoomOut { anchor } => {
                if view.zoom() == 0 {
                    return *view;
                }

                zoom_to(view, view.zoom() - 1, anchor)
            }
            ViewEvent::SetZoom(zoom) => view.with_zoom(zoom),
            ViewEvent::SetCenter(center) => view.with_center(&center),
            ViewEvent::Resize(size) => view.with_size(size),
        }
    }
}

fn zoom_to(view: &MapView, zoom: u8, anchor: Option<Point2d>) -> MapView {
    match anchor {
        Some(anchor) if view.has_size() => view.zoom_around(zoom, anchor),
        _ => view.with_zoom(zoom),
    }
}
