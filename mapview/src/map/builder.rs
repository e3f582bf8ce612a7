use std::sync::Arc;

use mapview_types::geo::GeoPoint;
use tokio::runtime::Handle;

use super::options::{MapOptions, ZoomLevel};
use super::Map;
use crate::config::EngineConfig;
use crate::error::MapViewError;
use crate::layer::{LayerManager, RestTileLoader, TileCache, TileFetcher, TileLoader};
use crate::messenger::Messenger;
use crate::overlay::IconStore;
use crate::platform::{NativePlatformService, PlatformService};
use crate::render::{MapRenderer, RenderOptions};
use crate::tile_schema::TileSchema;

/// Convenience type to initialize a [`Map`].
///
/// ```
/// use mapview::MapBuilder;
/// use mapview::mapview_types::latlon;
///
/// let map = MapBuilder::new()
///     .with_center(latlon!(47.32, 12.79))
///     .with_zoom(12)
///     .with_scalebar(true)
///     .build()?;
/// assert!(!map.is_ready());
/// # Ok::<(), mapview::error::MapViewError>(())
/// ```
#[derive(Default)]
pub struct MapBuilder {
    options: MapOptions,
    config: EngineConfig,
    messenger: Option<Arc<dyn Messenger>>,
    platform: Option<Arc<dyn PlatformService>>,
    loader: Option<Arc<dyn TileLoader>>,
    runtime: Option<Handle>,
}

impl MapBuilder {
    /// Creates a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all view options at once.
    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the initial center of the map. Defaults to `[0, 0]`.
    pub fn with_center(mut self, center: impl GeoPoint) -> Self {
        self.options.center = vec![center.lat(), center.lon()];
        self
    }

    /// Sets the initial zoom level. Defaults to 0.
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.options.zoomlevel = ZoomLevel(zoom);
        self
    }

    /// Enables the scale bar.
    pub fn with_scalebar(mut self, scalebar: bool) -> Self {
        self.options.scalebar = scalebar;
        self
    }

    /// Enables drawing of tile boundaries.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    /// Sets engine settings: cache sizes, retry policy, HTTP client parameters.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the messenger that is asked to redraw the map and is notified about layer events.
    pub fn with_messenger(mut self, messenger: impl Messenger + 'static) -> Self {
        self.messenger = Some(Arc::new(messenger));
        self
    }

    /// Sets the service used to load marker icons and, unless a tile loader is given, tiles.
    pub fn with_platform(mut self, platform: Arc<dyn PlatformService>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Sets the loader of raster tiles.
    pub fn with_tile_loader(mut self, loader: Arc<dyn TileLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets the runtime background loading runs on. Without it the runtime of the calling
    /// context is used.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Creates the map in the [created](super::MapState::Created) state.
    pub fn build(self) -> Result<Map, MapViewError> {
        let view = self.options.view()?;
        let platform: Arc<dyn PlatformService> = match self.platform {
            Some(platform) => platform,
            None => Arc::new(NativePlatformService::new(&self.config)?),
        };
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(RestTileLoader::new(platform.clone())));

        let cache = Arc::new(TileCache::new(self.config.tile_cache_capacity));
        let fetcher = TileFetcher::new(
            cache.clone(),
            loader,
            self.config.clone(),
            self.runtime.clone(),
        );
        let layers = LayerManager::new(cache, fetcher, TileSchema::web());
        let icons = IconStore::new(self.config.icon_cache_capacity, platform, self.runtime);
        let renderer = MapRenderer::new(RenderOptions {
            debug: self.options.debug,
            scalebar: self.options.scalebar,
            ..Default::default()
        });

        let mut map = Map::new(view, layers, icons, renderer);
        if let Some(messenger) = self.messenger {
            map.set_messenger(messenger);
        }

        log::debug!(
            "Created map view at {:?}, zoom {}",
            view.center(),
            view.zoom()
        );
        Ok(map)
    }
}
