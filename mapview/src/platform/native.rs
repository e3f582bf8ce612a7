use async_trait::async_trait;
use bytes::Bytes;
use log::info;

use crate::config::EngineConfig;
use crate::decoded_image::DecodedImage;
use crate::error::MapViewError;
use crate::platform::PlatformService;

/// Platform service backed by `reqwest` and the tokio file system API.
#[derive(Debug, Clone)]
pub struct NativePlatformService {
    http_client: reqwest::Client,
}

impl NativePlatformService {
    /// Creates a new service with an HTTP client configured from the engine config.
    pub fn new(config: &EngineConfig) -> Result<Self, MapViewError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl PlatformService for NativePlatformService {
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, MapViewError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            info!("Failed to load {url}: {status}");
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(MapViewError::NotFound);
            }

            return Err(MapViewError::HttpStatus(status.as_u16()));
        }

        Ok(response.bytes().await?)
    }

    async fn load_bytes_from_file(&self, path: &str) -> Result<Bytes, MapViewError> {
        let data = tokio::fs::read(path).await?;
        Ok(Bytes::from(data))
    }

    async fn decode_image(&self, image_data: Bytes) -> Result<DecodedImage, MapViewError> {
        tokio::task::spawn_blocking(move || DecodedImage::decode(&image_data))
            .await
            .map_err(|err| MapViewError::Generic(format!("decoding task failed: {err}")))?
    }
}
