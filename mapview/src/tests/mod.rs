use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use web_time::Duration;

use crate::color::Color;
use crate::config::EngineConfig;
use crate::decoded_image::DecodedImage;
use crate::error::MapViewError;
use crate::layer::TileLoader;
use crate::platform::PlatformService;

/// Loader that answers every request after `delay`, failing for urls that contain `fail`.
#[derive(Default)]
pub(crate) struct TestLoader {
    pub(crate) delay: Duration,
    pub(crate) fail: Option<String>,
    pub(crate) urls: Mutex<Vec<String>>,
    pub(crate) active: AtomicUsize,
    pub(crate) peak: AtomicUsize,
    pub(crate) calls: AtomicU32,
}

impl TestLoader {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub(crate) fn failing(pattern: &str) -> Self {
        Self {
            fail: Some(pattern.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl TileLoader for TestLoader {
    async fn load(&self, url: &str) -> Result<DecodedImage, MapViewError> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        self.urls.lock().push(url.to_string());
        let active = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(active, Ordering::AcqRel);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.active.fetch_sub(1, Ordering::AcqRel);
        match &self.fail {
            Some(pattern) if url.contains(pattern.as_str()) => Err(MapViewError::HttpStatus(500)),
            _ => Ok(DecodedImage::solid(Color::GREEN, 2, 2)),
        }
    }
}

/// Platform that serves a solid 10x8 blue image for every path not containing `missing`.
#[derive(Default)]
pub(crate) struct TestPlatform {
    pub(crate) loads: AtomicUsize,
}

#[async_trait]
impl PlatformService for TestPlatform {
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, MapViewError> {
        self.load_bytes_from_file(url).await
    }

    async fn load_bytes_from_file(&self, path: &str) -> Result<Bytes, MapViewError> {
        self.loads.fetch_add(1, Ordering::AcqRel);
        if path.contains("missing") {
            return Err(MapViewError::NotFound);
        }

        Ok(Bytes::from_static(b"icon"))
    }

    async fn decode_image(&self, _image_data: Bytes) -> Result<DecodedImage, MapViewError> {
        Ok(DecodedImage::solid(Color::BLUE, 10, 8))
    }
}

pub(crate) fn fast_config() -> EngineConfig {
    EngineConfig::default().with_base_backoff(Duration::from_millis(1))
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }

        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    panic!("condition was not met in time");
}
