//! Raster tile layers and the machinery that keeps their tiles loaded: the shared
//! [`TileCache`], the per-layer [`TileFetcher`] and the [`LayerManager`] that ties them to the
//! current [`MapView`](crate::view::MapView).

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::tile_schema::TileIndex;

mod fetcher;
mod manager;
pub mod raster_tile_layer;
mod tile_cache;
mod url_template;

pub use fetcher::TileFetcher;
pub use manager::LayerManager;
pub use raster_tile_layer::{
    LayerSpec, RasterTileLayer, RasterTileLayerBuilder, RestTileLoader, TileLoader,
    DEFAULT_PARALLEL_REQUESTS,
};
pub use tile_cache::{CancellationFlag, EvictionListener, TileCache, TileEntry, TileState};
pub use url_template::UrlTemplate;

/// Stable identifier of a layer inside a map. Ids are assigned in the order the layers are added
/// and are never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub(crate) u32);

impl Display for LayerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Unique identity of a raster tile request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    /// Layer the tile belongs to.
    pub layer: LayerId,
    /// Index of the tile.
    pub index: TileIndex,
}

impl TileKey {
    /// Creates a new key.
    pub fn new(layer: LayerId, index: TileIndex) -> Self {
        Self { layer, index }
    }
}

impl Display for TileKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.layer, self.index.z, self.index.x, self.index.y
        )
    }
}
