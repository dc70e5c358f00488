//! Cache configuration.
//!
//! Controls freshness and notification buffering via `careboard.toml`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Cache configuration from the `[cache]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window applied to entries that do not set their own.
    /// `None` means entries only go stale when invalidated.
    pub default_stale_after: Option<Duration>,
    /// Buffered change notifications per subscriber before it lags.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_stale_after: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            default_stale_after: settings.default_stale_after,
            event_capacity: settings.event_capacity.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the event capacity, clamping to 1 if zero.
    pub fn event_capacity_non_zero(&self) -> usize {
        self.event_capacity.max(1)
    }
}
