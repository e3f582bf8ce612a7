//! Notifications from the engine back to the host application.

use crate::layer::TileKey;

/// Layer lifecycle and tile events reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    /// The view got a valid pixel size and started fetching and rendering.
    Ready,
    /// A layer was registered.
    LayerAdded(String),
    /// A layer was enabled.
    LayerStarted(String),
    /// A layer was disabled.
    LayerStopped(String),
    /// A layer was removed together with its cached tiles.
    LayerRemoved(String),
    /// A tile was downloaded, decoded and stored in the cache.
    TileLoaded(TileKey),
    /// A tile download failed. `gave_up` is set after the last allowed attempt.
    TileFailed {
        /// Tile that failed.
        key: TileKey,
        /// Number of attempts made so far.
        attempts: u32,
        /// No more attempts will be made.
        gave_up: bool,
    },
}

/// Messenger is used by the engine to notify the application that the map should be redrawn or
/// that something happened to a layer.
///
/// Methods can be called from fetch worker threads.
pub trait Messenger: Send + Sync {
    /// Ask the application to render a new frame.
    fn request_redraw(&self);

    /// Report an event. Ignored by default.
    fn notify(&self, _event: MapEvent) {}
}

/// Messenger that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
