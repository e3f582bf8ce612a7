//! Error types used by the crate.

use image::ImageError;
use thiserror::Error;

use mapview_types::error::MapViewTypesError;

/// Mapview error type.
#[derive(Debug, Error)]
pub enum MapViewError {
    /// Invalid layer, overlay or map view options. Reported synchronously by the call that
    /// received them; nothing is created.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Layer with the given name is not registered in the map.
    #[error("layer '{0}' does not exist")]
    UnknownLayer(String),
    /// I/O error (network).
    #[error("failed to load data")]
    IO,
    /// Server responded with a non-success status.
    #[error("server responded with status {0}")]
    HttpStatus(u16),
    /// Item not found.
    #[error("item not found")]
    NotFound,
    /// Image decoding error.
    #[error("image decode error: {0:?}")]
    ImageDecode(#[from] ImageError),
    /// Error reading data from the FS.
    #[error("failed to read file")]
    FsIo(#[from] std::io::Error),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

impl MapViewError {
    /// Shorthand for a configuration error.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<reqwest::Error> for MapViewError {
    fn from(value: reqwest::Error) -> Self {
        log::debug!("HTTP request failed: {value}");
        match value.status() {
            Some(status) => Self::HttpStatus(status.as_u16()),
            None => Self::IO,
        }
    }
}

impl From<serde_json::Error> for MapViewError {
    fn from(value: serde_json::Error) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl From<MapViewTypesError> for MapViewError {
    fn from(value: MapViewTypesError) -> Self {
        Self::Configuration(value.to_string())
    }
}
