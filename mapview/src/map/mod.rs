use std::sync::Arc;

use mapview_types::cartesian::Size;
use mapview_types::geo::GeoPoint2d;
use serde_json::Value;

use crate::control::ViewEvent;
use crate::error::MapViewError;
use crate::layer::{LayerId, LayerManager, LayerSpec};
use crate::messenger::{MapEvent, Messenger};
use crate::overlay::{
    Circle, IconStore, Marker, Overlay, OverlayId, OverlayStore, Polygon, Polyline,
};
use crate::render::{Frame, MapRenderer};
use crate::view::MapView;

mod builder;
pub mod options;

pub use builder::MapBuilder;
use options::{
    CircleOptions, LayerOptions, MapOptions, MarkerOptions, PolygonOptions, PolylineOptions,
    ZoomLevel,
};

/// Lifecycle state of a [`Map`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MapState {
    /// The map exists but has no drawing area yet. Layer start and stop requests are queued.
    Created,
    /// The map has a drawing area, fetches tiles and renders frames.
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LayerCommand {
    Start(String),
    Stop(String),
    StartAll,
    StopAll,
}

/// Map view: the current viewport, raster tile layers and vector overlays drawn over them.
///
/// A map is created with a [`MapBuilder`] (or [`Map::create`]) and becomes usable once it gets a
/// drawing area with [`Map::attach`]. Layers can be added at any time; starting and stopping
/// them before the map is attached is queued and applied in order on attach.
pub struct Map {
    view: MapView,
    state: MapState,
    queued: Vec<LayerCommand>,
    layers: LayerManager,
    overlays: OverlayStore,
    icons: IconStore,
    renderer: MapRenderer,
    messenger: Option<Arc<dyn Messenger>>,
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("view", &self.view)
            .field("state", &self.state)
            .field("layers", &self.layers)
            .field("overlays", &self.overlays.len())
            .finish()
    }
}

impl Map {
    pub(crate) fn new(
        view: MapView,
        layers: LayerManager,
        icons: IconStore,
        renderer: MapRenderer,
    ) -> Self {
        Self {
            view,
            state: MapState::Created,
            queued: vec![],
            layers,
            overlays: OverlayStore::new(),
            icons,
            renderer,
            messenger: None,
        }
    }

    /// Creates a map with the given options and default engine settings.
    pub fn create(options: MapOptions) -> Result<Self, MapViewError> {
        MapBuilder::new().with_options(options).build()
    }

    /// Creates a map from a `createMapView` option map:
    /// `{"scalebar": bool, "center": [lat, lon], "zoomlevel": "12", "debug": bool}`.
    pub fn create_map_view(options: Value) -> Result<Self, MapViewError> {
        Self::create(serde_json::from_value(options)?)
    }

    /// Sets the messenger that is asked to redraw the map and is notified about layer events.
    pub fn set_messenger(&mut self, messenger: Arc<dyn Messenger>) {
        self.layers.set_messenger(messenger.clone());
        self.icons.set_messenger(messenger.clone());
        self.messenger = Some(messenger);
    }

    /// Current view of the map.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Lifecycle state.
    pub fn state(&self) -> MapState {
        self.state
    }

    /// Returns true if the map is attached to a drawing area.
    pub fn is_ready(&self) -> bool {
        self.state == MapState::Ready
    }

    /// Layers of the map.
    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    /// Overlays of the map in paint order.
    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    /// Marker icons.
    pub fn icons(&self) -> &IconStore {
        &self.icons
    }

    /// Renderer of the map.
    pub fn renderer(&self) -> &MapRenderer {
        &self.renderer
    }

    /// Gives the map its drawing area and switches it to the [`MapState::Ready`] state. Queued
    /// layer commands are applied in the order they were issued.
    ///
    /// Attaching an already attached map only changes its size.
    pub fn attach(&mut self, size: Size) -> Result<(), MapViewError> {
        let view = self.view.with_size(size);
        if !view.has_size() {
            return Err(MapViewError::config(format!(
                "map must be attached to a non-empty area, got {}x{}",
                size.width(),
                size.height()
            )));
        }

        if self.is_ready() {
            self.set_view(view);
            return Ok(());
        }

        self.view = view;
        self.state = MapState::Ready;
        log::info!(
            "Map attached with size {}x{}, applying {} queued commands",
            size.width(),
            size.height(),
            self.queued.len()
        );

        self.layers.update_view(self.view);
        for command in std::mem::take(&mut self.queued) {
            if let Err(err) = self.apply(&command) {
                log::warn!("Queued command {command:?} failed: {err}");
            }
        }

        self.notify(MapEvent::Ready);
        self.redraw();
        Ok(())
    }

    /// Changes the view. Tiles are requested only when the map is ready.
    pub fn set_view(&mut self, view: MapView) {
        if view == self.view {
            return;
        }

        self.view = view;
        if self.is_ready() {
            self.layers.update_view(view);
            self.redraw();
        }
    }

    /// Applies a view change requested by the host.
    ///
    /// Resizing a map that is not attached yet attaches it.
    pub fn handle_event(&mut self, event: ViewEvent) -> Result<(), MapViewError> {
        match event {
            ViewEvent::Resize(size) => self.attach(size),
            _ => {
                let view = event.apply(&self.view);
                self.set_view(view);
                Ok(())
            }
        }
    }

    /// Moves the center of the map, keeping the zoom.
    pub fn set_center(&mut self, lat: f64, lon: f64) -> Result<(), MapViewError> {
        let center = GeoPoint2d::from_slice(&[lat, lon])?;
        self.handle_event(ViewEvent::SetCenter(center))
    }

    /// Sets the zoom level given as a numeric string, e.g. `"12"`.
    pub fn set_zoom_level(&mut self, zoom: &str) -> Result<(), MapViewError> {
        let ZoomLevel(zoom) = zoom.parse()?;
        self.handle_event(ViewEvent::SetZoom(zoom))
    }

    /// Adds a layer on top of the existing ones. The layer is stopped until it is started.
    pub fn add_layer(&mut self, spec: LayerSpec) -> Result<LayerId, MapViewError> {
        self.layers.add_layer(spec)
    }

    /// Adds a layer from an `addLayer` option map.
    pub fn add_layer_options(&mut self, options: Value) -> Result<LayerId, MapViewError> {
        let options: LayerOptions = serde_json::from_value(options)?;
        self.add_layer(LayerSpec::try_from(options)?)
    }

    /// Removes the layer, cancelling its requests and dropping its tiles.
    pub fn remove_layer(&mut self, name: &str) -> Result<(), MapViewError> {
        self.queued.retain(|command| {
            !matches!(command, LayerCommand::Start(n) | LayerCommand::Stop(n) if n == name)
        });
        self.layers.remove_layer(name)?;
        self.redraw();
        Ok(())
    }

    /// Starts the layer.
    pub fn start_layer(&mut self, name: &str) -> Result<(), MapViewError> {
        self.submit(LayerCommand::Start(name.to_string()))
    }

    /// Stops the layer. Its loaded tiles stay cached.
    pub fn stop_layer(&mut self, name: &str) -> Result<(), MapViewError> {
        self.submit(LayerCommand::Stop(name.to_string()))
    }

    /// Starts all layers.
    pub fn start_layers(&mut self) -> Result<(), MapViewError> {
        self.submit(LayerCommand::StartAll)
    }

    /// Stops all layers.
    pub fn stop_layers(&mut self) -> Result<(), MapViewError> {
        self.submit(LayerCommand::StopAll)
    }

    fn submit(&mut self, command: LayerCommand) -> Result<(), MapViewError> {
        if let LayerCommand::Start(name) | LayerCommand::Stop(name) = &command {
            if self.layers.layer_by_name(name).is_none() {
                return Err(MapViewError::UnknownLayer(name.clone()));
            }
        }

        if !self.is_ready() {
            log::debug!("Map is not attached yet, queueing {command:?}");
            self.queued.push(command);
            return Ok(());
        }

        self.apply(&command)
    }

    fn apply(&mut self, command: &LayerCommand) -> Result<(), MapViewError> {
        match command {
            LayerCommand::Start(name) => self.layers.start_layer(name)?,
            LayerCommand::Stop(name) => self.layers.stop_layer(name)?,
            LayerCommand::StartAll => self.layers.start_layers(),
            LayerCommand::StopAll => self.layers.stop_layers(),
        }

        self.redraw();
        Ok(())
    }

    /// Adds an overlay on top of the existing ones.
    pub fn add_overlay(&mut self, overlay: impl Into<Overlay>) -> OverlayId {
        let overlay = overlay.into();
        if let Overlay::Marker(marker) = &overlay {
            self.icons.request(marker.icon());
        }

        let id = self.overlays.add(overlay);
        self.redraw();
        id
    }

    /// Draws a polyline from a `drawPolyline` option map.
    pub fn draw_polyline_options(&mut self, options: Value) -> Result<OverlayId, MapViewError> {
        let options: PolylineOptions = serde_json::from_value(options)?;
        Ok(self.add_overlay(Polyline::try_from(options)?))
    }

    /// Draws a polygon from a `drawPolygon` option map.
    pub fn draw_polygon_options(&mut self, options: Value) -> Result<OverlayId, MapViewError> {
        let options: PolygonOptions = serde_json::from_value(options)?;
        Ok(self.add_overlay(Polygon::try_from(options)?))
    }

    /// Draws a marker from a `drawMarker` option map.
    pub fn draw_marker_options(&mut self, options: Value) -> Result<OverlayId, MapViewError> {
        let options: MarkerOptions = serde_json::from_value(options)?;
        Ok(self.add_overlay(Marker::try_from(options)?))
    }

    /// Draws a circle from a `drawCircle` option map.
    pub fn draw_circle_options(&mut self, options: Value) -> Result<OverlayId, MapViewError> {
        let options: CircleOptions = serde_json::from_value(options)?;
        Ok(self.add_overlay(Circle::try_from(options)?))
    }

    /// Renders the current view. A map that is not attached yet renders an empty frame.
    pub fn render(&self) -> Frame {
        if !self.is_ready() {
            return Frame::new(0, 0);
        }

        self.renderer
            .render(&self.view, &self.layers, self.overlays.overlays(), &self.icons)
    }

    /// Asks the host to draw a new frame.
    pub fn redraw(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    fn notify(&self, event: MapEvent) {
        if let Some(messenger) = &self.messenger {
            messenger.notify(event);
        }
    }
}
