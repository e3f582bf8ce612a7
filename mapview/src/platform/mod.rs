//! Provides platform specific logic and [`PlatformService`] to access it.

use async_trait::async_trait;
use bytes::Bytes;

use crate::decoded_image::DecodedImage;
use crate::error::MapViewError;

mod native;

pub use native::NativePlatformService;

/// Service providing I/O and decoding functions in a generic way.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Loads a byte array from the given url with an HTTP GET request. Non-success statuses are
    /// returned as errors.
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, MapViewError>;

    /// Reads a file from the local file system.
    async fn load_bytes_from_file(&self, path: &str) -> Result<Bytes, MapViewError>;

    /// Decodes an image from raw byte data.
    ///
    /// Supported formats are PNG and JPEG.
    async fn decode_image(&self, image_data: Bytes) -> Result<DecodedImage, MapViewError>;

    /// Loads and decodes an image. `source` is either an `http(s)://` url or a file path.
    async fn load_image(&self, source: &str) -> Result<DecodedImage, MapViewError> {
        let bytes = if is_remote(source) {
            self.load_bytes_from_url(source).await?
        } else {
            self.load_bytes_from_file(source).await?
        };

        self.decode_image(bytes).await
    }
}

/// Returns true if the resource must be requested over the network.
pub(crate) fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_sources() {
        assert!(is_remote("http://www.google.com/mapfiles/marker.png"));
        assert!(is_remote("https://a.tile.openstreetmap.org/1/0/0.png"));
        assert!(!is_remote("/sdcard/marker.png"));
        assert!(!is_remote("icons/marker.png"));
    }
}
