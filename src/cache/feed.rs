//! Feed cache: home, following and global feed lists.
//!
//! Feed items carry the viewer's interaction flags. Per-user feeds belong to
//! one viewer; global feeds are shared, so a flag written there is the last
//! writer's view until the next refresh or until that writer signs out.

use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::{FeedItem, InteractionFlags, Post, PostListItem};
use crate::domain::types::{InteractionKind, PostCounter};

use super::config::CacheConfig;
use super::keys::{CacheDomain, FeedKey};
use super::post::apply_delta;
use super::store::ListStore;

pub struct FeedCache {
    feeds: ListStore<FeedKey, FeedItem>,
}

impl FeedCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            feeds: ListStore::new(CacheDomain::Feed, "feed.lists", config.feed_capacity()),
        }
    }

    /// The first `limit` cached items of a feed.
    pub fn get_feed(&self, key: &FeedKey, limit: usize) -> Vec<FeedItem> {
        self.feeds.get_limited(key, limit)
    }

    pub fn save_feed(&self, key: FeedKey, items: Vec<FeedItem>) {
        self.feeds.put(key, items);
    }

    /// Append a fetched page, skipping posts already in the feed.
    pub fn append_feed_page(&self, key: FeedKey, items: Vec<FeedItem>) -> usize {
        self.feeds.extend_unique(key, items)
    }

    pub fn prepend_to_feed(&self, key: FeedKey, item: FeedItem) {
        self.feeds.prepend(key, item);
    }

    /// Remove a post from every feed. Returns the feeds touched.
    pub fn remove_post_everywhere(&self, post_id: &str) -> usize {
        self.feeds.remove_item_everywhere(post_id)
    }

    /// Swap in a fresh projection of a post across every feed.
    ///
    /// Viewer flags already on each feed item are preserved.
    pub fn replace_post_everywhere(&self, item: &PostListItem) -> usize {
        self.feeds
            .update_everywhere(&item.id, |feed_item| feed_item.post = item.clone())
    }

    /// Refresh every feed copy from a full record, keeping author display
    /// fields and viewer flags.
    pub fn refresh_post_everywhere(&self, post: &Post) -> usize {
        self.feeds
            .update_everywhere(&post.id, |feed_item| feed_item.post.refresh_from(post))
    }

    /// Apply a signed counter delta to every feed copy of a post.
    pub fn adjust_count_everywhere(
        &self,
        post_id: &str,
        counter: PostCounter,
        delta: i32,
    ) -> usize {
        self.feeds.update_everywhere(post_id, |feed_item| {
            apply_delta(feed_item.post.counter_mut(counter), delta);
        })
    }

    /// Rewrite one interaction flag on every feed item for `post_id` that
    /// `viewer` can see: their own feeds and the global ones.
    pub fn set_flag_everywhere(
        &self,
        viewer: &str,
        post_id: &str,
        kind: InteractionKind,
        value: bool,
    ) -> usize {
        let touched = self.feeds.update_matching(
            |key| key.is_visible_to(viewer),
            post_id,
            |feed_item| feed_item.set_flag(kind, value),
        );
        debug!(
            viewer,
            post_id,
            kind = kind.as_str(),
            value,
            touched,
            "Rewrote feed interaction flag"
        );
        touched
    }

    /// Reset the flags set in `flags` on the global feed copies of `post_id`.
    pub fn clear_global_flags(&self, post_id: &str, flags: InteractionFlags) -> usize {
        let kinds: Vec<InteractionKind> = InteractionKind::ALL
            .into_iter()
            .filter(|kind| flags.get(*kind))
            .collect();
        if kinds.is_empty() {
            return 0;
        }
        self.feeds
            .update_matching(|key| key.owner().is_none(), post_id, |feed_item| {
                for kind in &kinds {
                    feed_item.set_flag(*kind, false);
                }
            })
    }

    /// Drop every feed owned by `user_id`.
    pub fn clear_user(&self, user_id: &str) -> usize {
        self.feeds
            .remove_keys_where(|key| key.owner() == Some(user_id))
    }

    pub fn remove_feed(&self, key: &FeedKey) -> bool {
        self.feeds.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.feeds.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.feeds.item_count()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        self.feeds.last_write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fixtures::{feed_item, post, post_item};

    fn cache() -> FeedCache {
        FeedCache::new(&CacheConfig::default())
    }

    fn home(user: &str) -> FeedKey {
        FeedKey::Home(user.to_string())
    }

    #[test]
    fn miss_is_empty() {
        let cache = cache();
        assert!(cache.get_feed(&FeedKey::Trending, 20).is_empty());
        assert!(cache.last_updated().is_none());
    }

    #[test]
    fn append_page_skips_duplicates() {
        let cache = cache();
        cache.save_feed(home("u1"), vec![feed_item("p1", "a"), feed_item("p2", "a")]);

        let page = vec![feed_item("p2", "a"), feed_item("p3", "b")];
        let added = cache.append_feed_page(home("u1"), page);
        assert_eq!(added, 1);
        assert_eq!(cache.get_feed(&home("u1"), 10).len(), 3);
        assert_eq!(cache.get_feed(&home("u1"), 2).len(), 2);
    }

    #[test]
    fn replace_keeps_viewer_flags() {
        let cache = cache();
        let mut liked = feed_item("p1", "a");
        liked.is_liked = true;
        cache.save_feed(home("u1"), vec![liked]);
        cache.save_feed(FeedKey::Popular, vec![feed_item("p1", "a")]);

        let mut fresh = post_item("p1", "a");
        fresh.like_count = 12;
        assert_eq!(cache.replace_post_everywhere(&fresh), 2);

        let item = &cache.get_feed(&home("u1"), 1)[0];
        assert_eq!(item.post.like_count, 12);
        assert!(item.is_liked);
    }

    #[test]
    fn flags_only_touch_visible_feeds() {
        let cache = cache();
        cache.save_feed(home("u1"), vec![feed_item("p1", "a")]);
        cache.save_feed(home("u2"), vec![feed_item("p1", "a")]);
        cache.save_feed(FeedKey::Trending, vec![feed_item("p1", "a")]);

        let touched = cache.set_flag_everywhere("u1", "p1", InteractionKind::Like, true);
        assert_eq!(touched, 2);
        assert!(cache.get_feed(&home("u1"), 1)[0].is_liked);
        assert!(cache.get_feed(&FeedKey::Trending, 1)[0].is_liked);
        assert!(!cache.get_feed(&home("u2"), 1)[0].is_liked);
    }

    #[test]
    fn remove_everywhere_and_clear_user() {
        let cache = cache();
        cache.save_feed(home("u1"), vec![feed_item("p1", "a"), feed_item("p2", "a")]);
        cache.save_feed(FeedKey::Following("u1".into()), vec![feed_item("p1", "a")]);
        cache.save_feed(FeedKey::Discover, vec![feed_item("p1", "a")]);

        assert_eq!(cache.remove_post_everywhere("p1"), 3);
        assert_eq!(cache.entry_count(), 1);

        assert_eq!(cache.clear_user("u1"), 2);
        assert!(cache.get_feed(&home("u1"), 10).is_empty());
    }

    #[test]
    fn global_flags_reset_only_named_kinds() {
        let cache = cache();
        let mut item = feed_item("p1", "a");
        item.is_liked = true;
        item.is_saved = true;
        cache.save_feed(FeedKey::Popular, vec![item.clone()]);
        cache.save_feed(home("u1"), vec![item]);

        let flags = InteractionFlags {
            liked: true,
            ..Default::default()
        };
        assert_eq!(cache.clear_global_flags("p1", flags), 1);

        let popular = &cache.get_feed(&FeedKey::Popular, 1)[0];
        assert!(!popular.is_liked);
        assert!(popular.is_saved);
        assert!(cache.get_feed(&home("u1"), 1)[0].is_liked);
        assert_eq!(cache.clear_global_flags("p1", InteractionFlags::default()), 0);
    }

    #[test]
    fn counter_deltas_reach_every_feed() {
        let cache = cache();
        cache.save_feed(home("u1"), vec![feed_item("p1", "a")]);
        cache.save_feed(FeedKey::Trending, vec![feed_item("p1", "a")]);

        assert_eq!(cache.adjust_count_everywhere("p1", PostCounter::Shares, 1), 2);
        assert_eq!(cache.get_feed(&FeedKey::Trending, 1)[0].post.share_count, 1);
    }

    #[test]
    fn refresh_from_record_keeps_flags() {
        let cache = cache();
        let mut saved = feed_item("p1", "a");
        saved.is_saved = true;
        cache.save_feed(home("u1"), vec![saved]);

        let mut edited = post("p1", "a");
        edited.comment_count = 3;
        assert_eq!(cache.refresh_post_everywhere(&edited), 1);

        let item = &cache.get_feed(&home("u1"), 1)[0];
        assert_eq!(item.post.comment_count, 3);
        assert!(item.is_saved);
    }
}
