//! Cache consumer for executing invalidation plans.
//!
//! Drains events from the queue and applies the merged plan to the local
//! cache.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{info, instrument};
use uuid::Uuid;

use super::aggregate::LocalCache;
use super::config::CacheConfig;
use super::events::EventQueue;
use super::planner::InvalidationPlan;

pub const METRIC_CACHE_CONSUME_MS: &str = "larder_cache_consume_ms";

/// Cache consumer that processes events and keeps the local cache honest.
///
/// The consumer:
/// 1. Drains a batch of events from the queue
/// 2. Merges them into an invalidation plan
/// 3. Applies the plan through the aggregating façade
pub struct CacheConsumer {
    config: CacheConfig,
    cache: Arc<LocalCache>,
    queue: Arc<EventQueue>,
}

impl CacheConsumer {
    pub fn new(config: CacheConfig, cache: Arc<LocalCache>, queue: Arc<EventQueue>) -> Self {
        Self {
            config,
            cache,
            queue,
        }
    }

    /// Consume pending events and apply the plan.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub fn consume(&self) -> bool {
        let consume_started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit.max(1));
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let plan = InvalidationPlan::from_events(events);

        info!(
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Cache consumption starting"
        );

        self.apply(&plan);

        info!(event_count, "Cache consumption complete");

        histogram!(METRIC_CACHE_CONSUME_MS)
            .record(consume_started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    fn apply(&self, plan: &InvalidationPlan) {
        if plan.reset {
            self.cache.clear_all_caches();
            return;
        }

        for user_id in &plan.sign_out_users {
            self.cache.clear_user(user_id);
        }
        for domain in &plan.clear_domains {
            self.cache.clear_domain(*domain);
        }
        for key in &plan.refresh_feeds {
            self.cache.feeds().remove_feed(key);
        }
        for post_id in &plan.delete_posts {
            self.cache.delete_post(post_id);
        }
        for cookbook_id in &plan.delete_cookbooks {
            self.cache.delete_cookbook(cookbook_id);
        }
        for recipe_id in &plan.delete_recipes {
            self.cache.delete_recipe(recipe_id);
        }
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::events::EventKind;
    use crate::cache::fixtures::{feed_item, post};
    use crate::cache::keys::{CacheDomain, FeedKey};

    fn create_consumer(config: CacheConfig) -> CacheConsumer {
        let cache = Arc::new(LocalCache::new(&config));
        let queue = Arc::new(EventQueue::new());
        CacheConsumer::new(config, cache, queue)
    }

    #[test]
    fn consume_empty_queue_returns_false() {
        let consumer = create_consumer(CacheConfig::default());
        assert!(!consumer.consume());
    }

    #[test]
    fn consume_respects_batch_limit() {
        let consumer = create_consumer(CacheConfig {
            consume_batch_limit: 2,
            ..Default::default()
        });

        for _ in 0..5 {
            consumer.queue.publish(EventKind::ResetRequested);
        }

        assert_eq!(consumer.queue.len(), 5);
        assert!(consumer.consume());
        assert_eq!(consumer.queue.len(), 3);
    }

    #[test]
    fn post_deleted_event_fans_out() {
        let consumer = create_consumer(CacheConfig::default());
        consumer.cache.posts().save_post(post("p1", "a"));
        consumer
            .cache
            .feeds()
            .save_feed(FeedKey::Trending, vec![feed_item("p1", "a")]);

        consumer.queue.publish(EventKind::PostDeleted {
            post_id: "p1".to_string(),
        });
        assert!(consumer.consume());

        assert!(consumer.cache.posts().get_post("p1").is_none());
        assert!(consumer.cache.feeds().get_feed(&FeedKey::Trending, 10).is_empty());
    }

    #[test]
    fn feed_refresh_drops_only_that_feed() {
        let consumer = create_consumer(CacheConfig::default());
        let feeds = consumer.cache.feeds();
        feeds.save_feed(FeedKey::Trending, vec![feed_item("p1", "a")]);
        feeds.save_feed(FeedKey::Popular, vec![feed_item("p1", "a")]);

        consumer.queue.publish(EventKind::FeedRefreshed {
            key: FeedKey::Trending,
        });
        consumer.consume();

        assert!(feeds.get_feed(&FeedKey::Trending, 10).is_empty());
        assert_eq!(feeds.get_feed(&FeedKey::Popular, 10).len(), 1);
    }

    #[test]
    fn domain_refresh_and_reset() {
        let consumer = create_consumer(CacheConfig::default());
        consumer.cache.posts().save_post(post("p1", "a"));
        consumer.cache.analytics().record_view("p1");

        consumer.queue.publish(EventKind::DomainRefreshed {
            domain: CacheDomain::Analytics,
        });
        consumer.consume();
        assert!(consumer.cache.analytics().get_post_analytics("p1").is_none());
        assert!(consumer.cache.posts().get_post("p1").is_some());

        consumer.queue.publish(EventKind::ResetRequested);
        consumer.consume();
        assert_eq!(consumer.cache.cache_size().total(), 0);
    }
}
