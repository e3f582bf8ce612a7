use std::sync::Arc;

use crate::decoded_image::DecodedImage;
use crate::error::MapViewError;
use crate::platform::PlatformService;

/// Loader of tile images for the [`TileFetcher`](crate::layer::TileFetcher).
#[async_trait::async_trait]
pub trait TileLoader: Send + Sync {
    /// Loads and decodes the tile image from the given url.
    async fn load(&self, url: &str) -> Result<DecodedImage, MapViewError>;
}

/// Tile loader that loads tiles one by one with REST HTTP GET requests.
///
/// This loader is able to load tiles from any protocol that uses separate GET requests for each
/// tile:
/// * OSM tile protocol
/// * OSG Tile Map Service (TMS)
/// * ArcGis TileService
/// * etc.
pub struct RestTileLoader {
    platform: Arc<dyn PlatformService>,
}

impl std::fmt::Debug for RestTileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestTileLoader").finish_non_exhaustive()
    }
}

impl RestTileLoader {
    /// Creates a new instance of the loader.
    pub fn new(platform: Arc<dyn PlatformService>) -> Self {
        Self { platform }
    }
}

#[async_trait::async_trait]
impl TileLoader for RestTileLoader {
    async fn load(&self, url: &str) -> Result<DecodedImage, MapViewError> {
        log::debug!("Loading {url}");
        let bytes = self.platform.load_bytes_from_url(url).await?;
        self.platform.decode_image(bytes).await
    }
}
