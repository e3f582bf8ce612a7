//! Raster tile layer and its loaders

use ahash::AHashSet;

use super::{LayerId, TileKey, UrlTemplate};
use crate::tile_schema::{TileIndex, TileSchema};
use crate::view::MapView;

mod builder;
mod provider;

pub use builder::{RasterTileLayerBuilder, DEFAULT_PARALLEL_REQUESTS};
pub use provider::{RestTileLoader, TileLoader};

/// Validated parameters of a raster tile layer. Created with [`RasterTileLayerBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    pub(super) name: String,
    pub(super) url_template: UrlTemplate,
    pub(super) parallel_requests: usize,
    pub(super) min_zoom: u8,
    pub(super) max_zoom: u8,
}

impl LayerSpec {
    /// Unique name of the layer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Url template the tiles are requested with.
    pub fn url_template(&self) -> &UrlTemplate {
        &self.url_template
    }

    /// Maximum number of concurrent requests.
    pub fn parallel_requests(&self) -> usize {
        self.parallel_requests
    }

    /// Lowest zoom level the layer is displayed at.
    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    /// Highest zoom level the layer is displayed at.
    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Returns true if the zoom is within `[min_zoom, max_zoom]`.
    pub fn contains_zoom(&self, zoom: u8) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&zoom)
    }
}

/// Raster tile layers load prerendered tile sets with the [`TileFetcher`](super::TileFetcher)
/// and are composited by the renderer in the order they were added.
#[derive(Debug, Clone)]
pub struct RasterTileLayer {
    id: LayerId,
    spec: LayerSpec,
    enabled: bool,
}

impl RasterTileLayer {
    pub(crate) fn new(id: LayerId, spec: LayerSpec) -> Self {
        Self {
            id,
            spec,
            enabled: false,
        }
    }

    /// Id of the layer.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Name of the layer.
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// Parameters of the layer.
    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }

    /// Returns true if the layer is started.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true if the layer is enabled and the zoom of the view is in the layer's range.
    pub fn is_active(&self, view: &MapView) -> bool {
        self.enabled && self.spec.contains_zoom(view.zoom())
    }

    /// Keys of the tiles needed to draw the layer for the view. Empty if the layer is not
    /// [active](Self::is_active) or the view has no size.
    pub fn required_tiles(&self, view: &MapView, schema: &TileSchema) -> AHashSet<TileKey> {
        if !self.is_active(view) {
            return AHashSet::new();
        }

        schema
            .iter_tiles(view)
            .map(|tiles| {
                tiles
                    .map(|index| TileKey::new(self.id, TileIndex::from(index)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
