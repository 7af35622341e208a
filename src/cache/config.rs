//! Cache configuration.
//!
//! Controls per-domain capacities and the invalidation consumer via the
//! `[cache]` section of `larder.toml`.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

// Default values for cache configuration
const DEFAULT_COOKBOOK_LIMIT: usize = 500;
const DEFAULT_RECIPE_LIMIT: usize = 1000;
const DEFAULT_POST_LIMIT: usize = 1000;
const DEFAULT_COMMENT_LIMIT: usize = 200;
const DEFAULT_FEED_LIMIT: usize = 32;
const DEFAULT_INTERACTION_LIMIT: usize = 5000;
const DEFAULT_ANALYTICS_LIMIT: usize = 500;
const DEFAULT_REFERENCE_LIMIT: usize = 1000;
const DEFAULT_SEARCH_LIMIT: usize = 64;
const DEFAULT_RECENT_QUERY_LIMIT: usize = 10;
const DEFAULT_CONSUME_INTERVAL_MS: u64 = 5000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;
const DEFAULT_EVENT_QUEUE_LIMIT: usize = 1024;

/// Cache configuration from `larder.toml`.
///
/// Every `*_limit` is the LRU key capacity of each store in that domain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch for event-driven invalidation.
    pub enabled: bool,
    pub cookbook_limit: usize,
    pub recipe_limit: usize,
    pub post_limit: usize,
    /// Number of posts whose comment threads are kept.
    pub comment_limit: usize,
    /// Number of distinct feed lists kept.
    pub feed_limit: usize,
    pub interaction_limit: usize,
    pub analytics_limit: usize,
    pub reference_limit: usize,
    /// Number of distinct search queries whose results are kept.
    pub search_limit: usize,
    /// Recent queries remembered per user.
    pub recent_query_limit: usize,
    /// Auto-consume interval (ms) for queued invalidation events.
    pub consume_interval_ms: u64,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
    /// Maximum pending events before the oldest is dropped.
    pub event_queue_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cookbook_limit: DEFAULT_COOKBOOK_LIMIT,
            recipe_limit: DEFAULT_RECIPE_LIMIT,
            post_limit: DEFAULT_POST_LIMIT,
            comment_limit: DEFAULT_COMMENT_LIMIT,
            feed_limit: DEFAULT_FEED_LIMIT,
            interaction_limit: DEFAULT_INTERACTION_LIMIT,
            analytics_limit: DEFAULT_ANALYTICS_LIMIT,
            reference_limit: DEFAULT_REFERENCE_LIMIT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            recent_query_limit: DEFAULT_RECENT_QUERY_LIMIT,
            consume_interval_ms: DEFAULT_CONSUME_INTERVAL_MS,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
            event_queue_limit: DEFAULT_EVENT_QUEUE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            cookbook_limit: settings.cookbook_limit.get(),
            recipe_limit: settings.recipe_limit.get(),
            post_limit: settings.post_limit.get(),
            comment_limit: settings.comment_limit.get(),
            feed_limit: settings.feed_limit.get(),
            interaction_limit: settings.interaction_limit.get(),
            analytics_limit: settings.analytics_limit.get(),
            reference_limit: settings.reference_limit.get(),
            search_limit: settings.search_limit.get(),
            recent_query_limit: settings.recent_query_limit.get(),
            consume_interval_ms: settings.consume_interval.as_millis() as u64,
            consume_batch_limit: settings.consume_batch_limit.get(),
            event_queue_limit: settings.event_queue_limit.get(),
        }
    }
}

/// Clamp a configured capacity to at least one entry.
pub(crate) fn non_zero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}

impl CacheConfig {
    /// A configuration with every capacity set to `limit`; handy for eviction tests.
    pub fn with_uniform_limit(limit: usize) -> Self {
        Self {
            cookbook_limit: limit,
            recipe_limit: limit,
            post_limit: limit,
            comment_limit: limit,
            feed_limit: limit,
            interaction_limit: limit,
            analytics_limit: limit,
            reference_limit: limit,
            search_limit: limit,
            ..Default::default()
        }
    }

    pub fn cookbook_capacity(&self) -> NonZeroUsize {
        non_zero(self.cookbook_limit)
    }

    pub fn recipe_capacity(&self) -> NonZeroUsize {
        non_zero(self.recipe_limit)
    }

    pub fn post_capacity(&self) -> NonZeroUsize {
        non_zero(self.post_limit)
    }

    pub fn comment_capacity(&self) -> NonZeroUsize {
        non_zero(self.comment_limit)
    }

    pub fn feed_capacity(&self) -> NonZeroUsize {
        non_zero(self.feed_limit)
    }

    pub fn interaction_capacity(&self) -> NonZeroUsize {
        non_zero(self.interaction_limit)
    }

    pub fn analytics_capacity(&self) -> NonZeroUsize {
        non_zero(self.analytics_limit)
    }

    pub fn reference_capacity(&self) -> NonZeroUsize {
        non_zero(self.reference_limit)
    }

    pub fn search_capacity(&self) -> NonZeroUsize {
        non_zero(self.search_limit)
    }

    /// Recent-query list length; zero disables the history.
    pub fn recent_query_cap(&self) -> usize {
        self.recent_query_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.cookbook_limit, 500);
        assert_eq!(config.recipe_limit, 1000);
        assert_eq!(config.post_limit, 1000);
        assert_eq!(config.comment_limit, 200);
        assert_eq!(config.feed_limit, 32);
        assert_eq!(config.recent_query_limit, 10);
        assert_eq!(config.consume_interval_ms, 5000);
        assert_eq!(config.consume_batch_limit, 100);
        assert_eq!(config.event_queue_limit, 1024);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let config = CacheConfig {
            post_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.post_capacity().get(), 1);
    }

    #[test]
    fn uniform_limit_touches_every_domain() {
        let config = CacheConfig::with_uniform_limit(3);
        assert_eq!(config.cookbook_capacity().get(), 3);
        assert_eq!(config.feed_capacity().get(), 3);
        assert_eq!(config.search_capacity().get(), 3);
        assert_eq!(config.recent_query_limit, DEFAULT_RECENT_QUERY_LIMIT);
    }

    #[test]
    fn deserializes_partial_section_with_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"feed_limit": 4, "enabled": false}"#).expect("valid json");
        assert_eq!(config.feed_limit, 4);
        assert!(!config.enabled);
        assert_eq!(config.post_limit, DEFAULT_POST_LIMIT);
    }
}
