use super::LayerSpec;
use crate::error::MapViewError;
use crate::layer::UrlTemplate;
use crate::view::MAX_ZOOM;

/// Default number of concurrent requests per layer.
pub const DEFAULT_PARALLEL_REQUESTS: usize = 2;

/// Constructor for a validated [`LayerSpec`].
///
/// ```
/// use mapview::layer::RasterTileLayerBuilder;
///
/// let spec = RasterTileLayerBuilder::new("osm", "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
///     .with_subdomains(["a", "b"])
///     .with_parallel_requests(2)
///     .with_zoom_range(12, 18)
///     .build()?;
/// # Ok::<(), mapview::error::MapViewError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RasterTileLayerBuilder {
    name: String,
    url: String,
    subdomains: Vec<String>,
    parallel_requests: usize,
    min_zoom: u8,
    max_zoom: u8,
}

impl RasterTileLayerBuilder {
    /// Initializes a builder for a layer with the given unique name and url template.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            subdomains: vec![],
            parallel_requests: DEFAULT_PARALLEL_REQUESTS,
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
        }
    }

    /// Sets the subdomains the `{s}` token of the url is replaced with, in round-robin order.
    pub fn with_subdomains<S: Into<String>>(
        mut self,
        subdomains: impl IntoIterator<Item = S>,
    ) -> Self {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the maximum number of concurrent requests of the layer.
    pub fn with_parallel_requests(mut self, parallel_requests: usize) -> Self {
        self.parallel_requests = parallel_requests;
        self
    }

    /// Sets the zoom levels the layer is displayed at, both ends inclusive.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Validates the parameters and creates the spec.
    ///
    /// # Errors
    ///
    /// Returns [`MapViewError::Configuration`] if the name is empty, `parallel_requests` is 0,
    /// the zoom range is empty or out of bounds, or the url template is malformed.
    pub fn build(self) -> Result<LayerSpec, MapViewError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(MapViewError::config("layer name must not be empty"));
        }

        if self.parallel_requests < 1 {
            return Err(MapViewError::config(format!(
                "layer '{name}': parallelRequests must be at least 1"
            )));
        }

        if self.min_zoom > self.max_zoom {
            return Err(MapViewError::config(format!(
                "layer '{name}': minZoom {} is greater than maxZoom {}",
                self.min_zoom, self.max_zoom
            )));
        }

        if self.max_zoom > MAX_ZOOM {
            return Err(MapViewError::config(format!(
                "layer '{name}': maxZoom {} is above the supported maximum {MAX_ZOOM}",
                self.max_zoom
            )));
        }

        let url_template = UrlTemplate::new(&self.url, self.subdomains)
            .map_err(|err| match err {
                MapViewError::Configuration(msg) => {
                    MapViewError::config(format!("layer '{name}': {msg}"))
                }
                other => other,
            })?;

        Ok(LayerSpec {
            name,
            url_template,
            parallel_requests: self.parallel_requests,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const OSM: &str = "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

    #[test]
    fn builds_valid_spec() {
        let spec = RasterTileLayerBuilder::new("osm", OSM)
            .with_subdomains(["a", "b"])
            .with_parallel_requests(2)
            .with_zoom_range(12, 18)
            .build()
            .unwrap();

        assert_eq!(spec.name(), "osm");
        assert_eq!(spec.parallel_requests(), 2);
        assert!(spec.contains_zoom(12));
        assert!(spec.contains_zoom(18));
        assert!(!spec.contains_zoom(11));
        assert!(!spec.contains_zoom(19));
        assert_eq!(spec.url_template().subdomains(), ["a", "b"]);
    }

    #[test]
    fn rejects_zero_parallel_requests() {
        let result = RasterTileLayerBuilder::new("osm", OSM)
            .with_subdomains(["a"])
            .with_parallel_requests(0)
            .build();
        assert_matches!(result, Err(MapViewError::Configuration(_)));
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let result = RasterTileLayerBuilder::new("osm", OSM)
            .with_subdomains(["a"])
            .with_zoom_range(18, 12)
            .build();
        assert_matches!(result, Err(MapViewError::Configuration(msg)) if msg.contains("minZoom"));

        let result = RasterTileLayerBuilder::new("osm", OSM)
            .with_subdomains(["a"])
            .with_zoom_range(12, 30)
            .build();
        assert_matches!(result, Err(MapViewError::Configuration(_)));
    }

    #[test]
    fn rejects_malformed_url() {
        let result = RasterTileLayerBuilder::new("osm", "http://tiles.org/{x}/{y}.png").build();
        assert_matches!(result, Err(MapViewError::Configuration(_)));

        let result = RasterTileLayerBuilder::new("osm", OSM).build();
        assert_matches!(result, Err(MapViewError::Configuration(msg)) if msg.contains("subdomains"));
    }

    #[test]
    fn rejects_empty_name() {
        let result = RasterTileLayerBuilder::new("  ", OSM)
            .with_subdomains(["a"])
            .build();
        assert_matches!(result, Err(MapViewError::Configuration(_)));
    }
}
