use std::collections::HashMap;

use crate::error::MapViewError;
use crate::tile_schema::TileIndex;

const SUBDOMAIN: &str = "s";
const ZOOM: &str = "z";
const X: &str = "x";
const Y: &str = "y";

/// Tile url template like `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`.
///
/// `{z}`, `{x}` and `{y}` are required and must go in this order. `{s}` is optional and is
/// replaced by one of the layer's subdomains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplate {
    /// Validates the template against the list of subdomains.
    pub fn new(template: &str, subdomains: Vec<String>) -> Result<Self, MapViewError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(MapViewError::config("url template is empty"));
        }

        let position = |token: &str| template.find(&format!("{{{token}}}"));
        let (Some(z), Some(x), Some(y)) = (position(ZOOM), position(X), position(Y)) else {
            return Err(MapViewError::config(format!(
                "url template '{template}' must contain {{z}}, {{x}} and {{y}}"
            )));
        };

        if !(z < x && x < y) {
            return Err(MapViewError::config(format!(
                "url template '{template}' must have {{z}}, {{x}} and {{y}} in this order"
            )));
        }

        let uses_subdomains = position(SUBDOMAIN).is_some();
        if uses_subdomains && subdomains.is_empty() {
            return Err(MapViewError::config(format!(
                "url template '{template}' uses {{s}} but no subdomains are given"
            )));
        }

        if subdomains.iter().any(|s| s.trim().is_empty()) {
            return Err(MapViewError::config("subdomains must not be empty strings"));
        }

        let this = Self {
            template: template.to_string(),
            subdomains,
        };

        // Unknown tokens and unbalanced braces are reported by the formatter.
        this.format(TileIndex::new(0, 0, 0), this.subdomains.first().map(|s| s.as_str()))?;

        Ok(this)
    }

    /// Raw template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Subdomains the `{s}` token is replaced with.
    pub fn subdomains(&self) -> &[String] {
        &self.subdomains
    }

    /// Url of the tile. `subdomain_counter` selects the subdomain in round-robin order.
    pub fn url(&self, index: TileIndex, subdomain_counter: usize) -> Result<String, MapViewError> {
        let subdomain = if self.subdomains.is_empty() {
            None
        } else {
            self.subdomains
                .get(subdomain_counter % self.subdomains.len())
                .map(|s| s.as_str())
        };

        self.format(index, subdomain)
    }

    fn format(&self, index: TileIndex, subdomain: Option<&str>) -> Result<String, MapViewError> {
        let mut vars = HashMap::new();
        vars.insert(ZOOM.to_string(), index.z.to_string());
        vars.insert(X.to_string(), index.x.to_string());
        vars.insert(Y.to_string(), index.y.to_string());
        vars.insert(
            SUBDOMAIN.to_string(),
            subdomain.map_or_else(|| "{s}".to_string(), str::to_string),
        );

        strfmt::strfmt(&self.template, &vars).map_err(|err| {
            MapViewError::config(format!("invalid url template '{}': {err}", self.template))
        })
    }
}
