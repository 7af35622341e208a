//! Cache trigger service.
//!
//! Provides a high-level API for publishing invalidation events and
//! optionally consuming them immediately.

use std::sync::Arc;

use tracing::debug;

use super::config::CacheConfig;
use super::consumer::CacheConsumer;
use super::events::{EventKind, EventQueue};
use super::keys::{CacheDomain, FeedKey};

/// Cache trigger for publishing invalidation events.
///
/// # Usage
///
/// ```ignore
/// // After the remote store confirms a deletion:
/// trigger.post_deleted(&post_id);
/// ```
pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and optionally consume immediately.
    ///
    /// If `consume_now` is false, the event waits for the background consume
    /// loop or the next explicit consumption.
    pub fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.enabled {
            debug!(event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume();
        }
    }

    pub fn signed_out(&self, user_id: &str) {
        self.trigger(
            EventKind::SignedOut {
                user_id: user_id.to_string(),
            },
            true,
        );
    }

    pub fn domain_refreshed(&self, domain: CacheDomain) {
        self.trigger(EventKind::DomainRefreshed { domain }, true);
    }

    pub fn feed_refreshed(&self, key: FeedKey) {
        self.trigger(EventKind::FeedRefreshed { key }, true);
    }

    pub fn post_deleted(&self, post_id: &str) {
        self.trigger(
            EventKind::PostDeleted {
                post_id: post_id.to_string(),
            },
            true,
        );
    }

    pub fn cookbook_deleted(&self, cookbook_id: &str) {
        self.trigger(
            EventKind::CookbookDeleted {
                cookbook_id: cookbook_id.to_string(),
            },
            true,
        );
    }

    pub fn recipe_deleted(&self, recipe_id: &str) {
        self.trigger(
            EventKind::RecipeDeleted {
                recipe_id: recipe_id.to_string(),
            },
            true,
        );
    }

    pub fn reset_requested(&self) {
        self.trigger(EventKind::ResetRequested, true);
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<CacheConsumer> {
        &self.consumer
    }
}
