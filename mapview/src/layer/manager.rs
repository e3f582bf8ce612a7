use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use super::raster_tile_layer::{LayerSpec, RasterTileLayer};
use super::{LayerId, TileCache, TileFetcher, TileKey};
use crate::error::MapViewError;
use crate::messenger::{MapEvent, Messenger};
use crate::tile_schema::TileSchema;
use crate::view::MapView;

/// Owns the ordered set of tile layers and keeps the tiles they need for the current view
/// requested.
///
/// On every view change the set of required tiles of each active layer is compared with the
/// previously required one: requests for tiles that are not needed anymore are cancelled, and
/// tiles missing from the cache are requested.
///
/// Failed tiles are not requested again when they come back into view. They stay failed until
/// they are evicted from the cache or the layer is started again.
pub struct LayerManager {
    layers: Vec<RasterTileLayer>,
    next_id: u32,
    cache: Arc<TileCache>,
    fetcher: TileFetcher,
    schema: TileSchema,
    view: Option<MapView>,
    required: AHashMap<LayerId, AHashSet<TileKey>>,
    messenger: Option<Arc<dyn Messenger>>,
}

impl std::fmt::Debug for LayerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerManager")
            .field("layers", &self.layers)
            .field("view", &self.view)
            .finish()
    }
}

impl LayerManager {
    /// Creates an empty manager.
    pub fn new(cache: Arc<TileCache>, fetcher: TileFetcher, schema: TileSchema) -> Self {
        Self {
            layers: vec![],
            next_id: 0,
            cache,
            fetcher,
            schema,
            view: None,
            required: AHashMap::new(),
            messenger: None,
        }
    }

    /// Sets the messenger notified about layer changes.
    pub fn set_messenger(&mut self, messenger: Arc<dyn Messenger>) {
        self.fetcher.set_messenger(messenger.clone());
        self.messenger = Some(messenger);
    }

    /// Tile cache shared by all layers.
    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// Fetcher used to load tiles.
    pub fn fetcher(&self) -> &TileFetcher {
        &self.fetcher
    }

    /// Tile schema of the layers.
    pub fn schema(&self) -> &TileSchema {
        &self.schema
    }

    /// Layers in the drawing order.
    pub fn layers(&self) -> &[RasterTileLayer] {
        &self.layers
    }

    /// Layer with the given id.
    pub fn layer(&self, id: LayerId) -> Option<&RasterTileLayer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    /// Layer with the given name.
    pub fn layer_by_name(&self, name: &str) -> Option<&RasterTileLayer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    /// Adds a new layer on top of the existing ones. The layer is stopped until
    /// [`LayerManager::start_layer`] is called.
    pub fn add_layer(&mut self, spec: LayerSpec) -> Result<LayerId, MapViewError> {
        if self.layer_by_name(spec.name()).is_some() {
            return Err(MapViewError::config(format!(
                "layer '{}' already exists",
                spec.name()
            )));
        }

        let id = LayerId(self.next_id);
        self.next_id += 1;

        self.fetcher.register_layer(id, &spec);
        let layer = RasterTileLayer::new(id, spec);
        log::info!("Added layer '{}' as {id}", layer.name());
        self.notify(MapEvent::LayerAdded(layer.name().to_string()));
        self.layers.push(layer);

        Ok(id)
    }

    /// Removes the layer, cancels its requests and drops its tiles from the cache.
    pub fn remove_layer(&mut self, name: &str) -> Result<(), MapViewError> {
        let id = self.id_of(name)?;
        self.fetcher.unregister_layer(id);
        self.required.remove(&id);
        let purged = self.cache.purge_layer(id);
        self.layers.retain(|layer| layer.id() != id);

        log::info!("Removed layer '{name}', {purged} cached tiles dropped");
        self.notify(MapEvent::LayerRemoved(name.to_string()));
        Ok(())
    }

    /// Enables the layer and requests the tiles missing for the current view. Tiles of the layer
    /// that failed to load are requested again.
    pub fn start_layer(&mut self, name: &str) -> Result<(), MapViewError> {
        let id = self.id_of(name)?;
        self.start(id);
        Ok(())
    }

    /// Disables the layer and cancels its requests. Loaded tiles stay in the cache.
    pub fn stop_layer(&mut self, name: &str) -> Result<(), MapViewError> {
        let id = self.id_of(name)?;
        self.stop(id);
        Ok(())
    }

    /// Starts all layers.
    pub fn start_layers(&mut self) {
        let ids: Vec<LayerId> = self.layers.iter().map(|layer| layer.id()).collect();
        for id in ids {
            self.start(id);
        }
    }

    /// Stops all layers.
    pub fn stop_layers(&mut self) {
        let ids: Vec<LayerId> = self.layers.iter().map(|layer| layer.id()).collect();
        for id in ids {
            self.stop(id);
        }
    }

    /// Sets the current view and updates tile requests of all layers.
    ///
    /// A view without a size is remembered, but no tiles are requested for it.
    pub fn update_view(&mut self, view: MapView) {
        self.view = Some(view);
        let ids: Vec<LayerId> = self.layers.iter().map(|layer| layer.id()).collect();
        for id in ids {
            self.refresh(id);
        }
    }

    /// Tiles required by the layer for the current view, as of the last update.
    pub fn required_tiles(&self, id: LayerId) -> Option<&AHashSet<TileKey>> {
        self.required.get(&id)
    }

    fn id_of(&self, name: &str) -> Result<LayerId, MapViewError> {
        self.layer_by_name(name)
            .map(|layer| layer.id())
            .ok_or_else(|| MapViewError::UnknownLayer(name.to_string()))
    }

    fn layer_mut(&mut self, id: LayerId) -> Option<&mut RasterTileLayer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }

    fn start(&mut self, id: LayerId) {
        let Some(layer) = self.layer_mut(id) else {
            return;
        };

        layer.set_enabled(true);
        let name = layer.name().to_string();

        let reset = self.cache.reset_failed(id);
        if !reset.is_empty() {
            log::debug!("Layer '{name}': {} failed tiles will be requested again", reset.len());
        }

        self.notify(MapEvent::LayerStarted(name));
        self.refresh(id);
    }

    fn stop(&mut self, id: LayerId) {
        let Some(layer) = self.layer_mut(id) else {
            return;
        };

        layer.set_enabled(false);
        let name = layer.name().to_string();

        self.fetcher.cancel_layer(id);
        self.required.remove(&id);
        self.notify(MapEvent::LayerStopped(name));
    }

    fn refresh(&mut self, id: LayerId) {
        let Some(layer) = self.layer(id) else {
            return;
        };

        let required = match &self.view {
            Some(view) => layer.required_tiles(view, &self.schema),
            None => AHashSet::new(),
        };

        let previous = self.required.remove(&id).unwrap_or_default();
        for stale in previous.difference(&required) {
            self.fetcher.cancel(stale);
        }

        let mut requested = 0;
        for key in &required {
            if self.cache.peek(key).is_none() && !self.fetcher.is_requested(key) {
                self.fetcher.fetch(*key);
                requested += 1;
            }
        }

        if requested > 0 {
            log::debug!("Layer {id}: requested {requested} tiles");
        }

        self.required.insert(id, required);
    }

    fn notify(&self, event: MapEvent) {
        if let Some(messenger) = &self.messenger {
            messenger.notify(event);
        }
    }
}
