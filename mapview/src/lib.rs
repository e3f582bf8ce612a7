//! Mapview is a slippy map view engine. It shows raster tile layers from any `{z}/{x}/{y}` tile
//! server and draws vector overlays (polylines, polygons, markers and circles) over them.
//!
//! # Quick start
//!
//! ```no_run
//! use mapview::mapview_types::cartesian::Size;
//! use mapview::MapBuilder;
//! use serde_json::json;
//!
//! let mut map = MapBuilder::new().build()?;
//! map.set_center(47.32, 12.79)?;
//! map.set_zoom_level("12")?;
//! map.add_layer_options(json!({
//!     "name": "osm",
//!     "url": "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
//!     "subdomains": ["a", "b", "c"],
//!     "parallelRequests": 2,
//!     "minZoom": 0,
//!     "maxZoom": 19,
//! }))?;
//! map.start_layer("osm")?;
//! map.attach(Size::new(800.0, 600.0))?;
//!
//! let frame = map.render();
//! # Ok::<(), mapview::error::MapViewError>(())
//! ```
//!
//! # Main components
//!
//! * [`Map`] ties everything together. It keeps the current [`MapView`] (center, zoom and pixel
//!   size), a set of [`layers`](layer) and the [`overlays`](overlay).
//! * Each raster layer has a url template and a limit of parallel requests. Tiles required for
//!   the current view are loaded in the background by the
//!   [`TileFetcher`](layer::TileFetcher) and kept in a shared LRU
//!   [`TileCache`](layer::TileCache).
//! * The [`renderer`](render) draws the cached tiles, the overlays and the scale bar into an RGBA
//!   frame, or onto any [`Canvas`](render::Canvas) the host provides.
//! * The host is told when a new frame should be drawn through the [`Messenger`] trait. User
//!   gestures are passed to the map as [`control::ViewEvent`]s.

pub(crate) mod async_runtime;
mod color;
pub mod config;
pub mod control;
pub mod decoded_image;
pub mod error;
pub mod layer;
mod map;
mod messenger;
pub mod overlay;
mod platform;
pub mod render;
mod tile_schema;
mod view;

#[cfg(test)]
mod tests;

pub use color::Color;
pub use config::EngineConfig;
pub use map::options;
pub use map::{Map, MapBuilder, MapState};
pub use messenger::{DummyMessenger, MapEvent, Messenger};
pub use platform::{NativePlatformService, PlatformService};
pub use tile_schema::{TileIndex, TileSchema, WrappingTileIndex};
pub use view::{MapView, MAX_ZOOM};

// Reexport mapview_types
pub use mapview_types;
