//! Post analytics cache.

use time::OffsetDateTime;

use crate::domain::entities::PostAnalytics;

use super::config::CacheConfig;
use super::keys::CacheDomain;
use super::store::KeyedStore;

pub struct AnalyticsCache {
    analytics: KeyedStore<String, PostAnalytics>,
}

impl AnalyticsCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            analytics: KeyedStore::new(
                CacheDomain::Analytics,
                "analytics.posts",
                config.analytics_capacity(),
            ),
        }
    }

    pub fn get_post_analytics(&self, post_id: &str) -> Option<PostAnalytics> {
        self.analytics.get(post_id)
    }

    pub fn save_post_analytics(&self, analytics: PostAnalytics) {
        self.analytics.put(analytics.post_id.clone(), analytics);
    }

    /// Count a local view, seeding an empty record on first sight.
    pub fn record_view(&self, post_id: &str) -> PostAnalytics {
        self.analytics.upsert(
            post_id.to_string(),
            || PostAnalytics::empty(post_id),
            |analytics| {
                analytics.view_count = analytics.view_count.saturating_add(1);
                analytics.updated_at = OffsetDateTime::now_utc();
            },
        )
    }

    pub fn record_impression(&self, post_id: &str) -> PostAnalytics {
        self.analytics.upsert(
            post_id.to_string(),
            || PostAnalytics::empty(post_id),
            |analytics| {
                analytics.impression_count = analytics.impression_count.saturating_add(1);
                analytics.updated_at = OffsetDateTime::now_utc();
            },
        )
    }

    pub fn remove_post_analytics(&self, post_id: &str) -> Option<PostAnalytics> {
        self.analytics.remove(post_id)
    }

    pub fn clear(&self) {
        self.analytics.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.analytics.len()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        self.analytics.last_write()
    }
}
