//! Engine-wide settings that are not part of the declarative map API.

use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Default maximum number of tiles kept in the tile cache.
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 512;
/// Default maximum number of download attempts for a single tile.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the second attempt. Every next delay is doubled.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(200);
/// Default upper bound of the delay between two attempts.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Default maximum number of decoded marker icons kept in memory.
pub const DEFAULT_ICON_CACHE_CAPACITY: usize = 64;

/// Settings of the tile engine.
///
/// ```
/// use mapview::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_tile_cache_capacity(1024)
///     .with_max_attempts(5);
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of tile entries in the cache (over all layers).
    pub tile_cache_capacity: usize,
    /// Maximum number of attempts to download a tile before it is left failed.
    pub max_attempts: u32,
    /// Delay after the first failed attempt. Doubled after each next failure.
    pub base_backoff: Duration,
    /// Upper bound of the delay between two attempts.
    pub max_backoff: Duration,
    /// Timeout of a single HTTP request.
    pub request_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Maximum number of decoded marker icons kept in memory.
    pub icon_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_cache_capacity: DEFAULT_TILE_CACHE_CAPACITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("mapview/", env!("CARGO_PKG_VERSION")).to_string(),
            icon_cache_capacity: DEFAULT_ICON_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Sets the tile cache capacity. Values below 1 are raised to 1.
    pub fn with_tile_cache_capacity(mut self, capacity: usize) -> Self {
        self.tile_cache_capacity = capacity.max(1);
        self
    }

    /// Sets the maximum number of download attempts. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the delay after the first failed attempt.
    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Sets the upper bound of the delay between two attempts.
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Sets the timeout of a single HTTP request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Delay to wait after `attempt` (1-based) failed, never more than `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}
