//! Larder local cache.
//!
//! An advisory, in-memory mirror of the remote document store, split into
//! per-domain caches behind one aggregating façade:
//!
//! - **Stores**: LRU-bounded keyed and list primitives (`store`)
//! - **Domain caches**: cookbook, recipe, post, comment, feed, interaction,
//!   analytics, reference and search
//! - **`LocalCache`**: owns every domain cache and the cross-domain fan-out
//! - **Invalidation**: events, planner, consumer and trigger for sign-out and
//!   pull-to-refresh
//!
//! ## Configuration
//!
//! Capacities and the consumer are controlled via `larder.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! post_limit = 1000
//! feed_limit = 32
//! # ... see config.rs for all options
//! ```

mod aggregate;
mod analytics;
mod comment;
mod config;
mod consumer;
mod cookbook;
mod events;
mod feed;
#[cfg(test)]
mod fixtures;
mod interaction;
mod keys;
mod lock;
mod planner;
mod post;
mod recipe;
mod reference;
mod search;
mod store;
mod trigger;

pub use aggregate::{CacheSize, LocalCache};
pub use analytics::AnalyticsCache;
pub use comment::CommentCache;
pub use config::CacheConfig;
pub use consumer::CacheConsumer;
pub use cookbook::CookbookCache;
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use feed::FeedCache;
pub use interaction::InteractionCache;
pub use keys::{CacheDomain, FeedKey, SearchKey, UserEntityKey, normalize_query};
pub use planner::InvalidationPlan;
pub use post::PostCache;
pub use recipe::RecipeCache;
pub use reference::ReferenceCache;
pub use search::SearchCache;
pub use store::{KeyedStore, ListStore};
pub use trigger::CacheTrigger;

/// Metric names emitted by the cache, for telemetry registration.
pub mod metric_names {
    pub use super::aggregate::METRIC_CACHE_FANOUT_MS;
    pub use super::consumer::METRIC_CACHE_CONSUME_MS;
    pub use super::events::{METRIC_EVENT_DROPPED, METRIC_EVENT_QUEUE_LEN};
    pub use super::lock::METRIC_LOCK_POISONED;
    pub use super::store::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
}
