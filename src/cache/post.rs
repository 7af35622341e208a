//! Post cache: records and per-author post lists.

use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::{Post, PostListItem};
use crate::domain::types::PostCounter;

use super::config::CacheConfig;
use super::keys::CacheDomain;
use super::store::{KeyedStore, ListStore, latest};

const DOMAIN: CacheDomain = CacheDomain::Post;

/// Apply a signed delta to an advisory counter, clamping at the bounds.
pub(crate) fn apply_delta(value: &mut u32, delta: i32) {
    *value = value.saturating_add_signed(delta);
}

pub struct PostCache {
    posts: KeyedStore<String, Post>,
    user_posts: ListStore<String, PostListItem>,
}

impl PostCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.post_capacity();
        Self {
            posts: KeyedStore::new(DOMAIN, "post.records", capacity),
            user_posts: ListStore::new(DOMAIN, "post.user_lists", capacity),
        }
    }

    pub fn get_post(&self, post_id: &str) -> Option<Post> {
        self.posts.get(post_id)
    }

    pub fn save_post(&self, post: Post) {
        self.posts.put(post.id.clone(), post);
    }

    pub fn remove_post(&self, post_id: &str) -> Option<Post> {
        self.posts.remove(post_id)
    }

    /// The first `limit` cached posts of `user_id`.
    pub fn get_user_posts(&self, user_id: &str, limit: usize) -> Vec<PostListItem> {
        self.user_posts.get_limited(user_id, limit)
    }

    pub fn save_user_posts(&self, user_id: &str, items: Vec<PostListItem>) {
        self.user_posts.put(user_id.to_string(), items);
    }

    pub fn add_to_user_posts(&self, user_id: &str, item: PostListItem) {
        self.user_posts.prepend(user_id.to_string(), item);
    }

    pub fn remove_from_user_posts(&self, user_id: &str, post_id: &str) -> bool {
        self.user_posts.remove_item(user_id, post_id)
    }

    /// Replace every user-list copy of the post. Returns the lists touched.
    pub fn update_post_in_user_lists(&self, item: &PostListItem) -> usize {
        self.user_posts.replace_everywhere(item)
    }

    /// Refresh list copies from a full record, keeping author display fields.
    pub fn refresh_post_in_user_lists(&self, post: &Post) -> usize {
        self.user_posts
            .update_everywhere(&post.id, |item| item.refresh_from(post))
    }

    /// Apply `delta` to one counter on the record and on every list copy.
    pub fn adjust_count(&self, post_id: &str, counter: PostCounter, delta: i32) {
        self.posts
            .update(post_id, |post| apply_delta(post.counter_mut(counter), delta));
        self.user_posts.update_everywhere(post_id, |item| {
            apply_delta(item.counter_mut(counter), delta);
        });
    }

    /// Drop the record and every user-list copy.
    pub fn purge_post(&self, post_id: &str) {
        self.posts.remove(post_id);
        let lists = self.user_posts.remove_item_everywhere(post_id);
        debug!(post_id, lists, "Purged post from cache");
    }

    pub fn clear_user(&self, user_id: &str) {
        self.user_posts.remove(user_id);
    }

    pub fn clear(&self) {
        self.posts.clear();
        self.user_posts.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.posts.len() + self.user_posts.item_count()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        latest([self.posts.last_write(), self.user_posts.last_write()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fixtures::{post, post_item};

    fn cache() -> PostCache {
        PostCache::new(&CacheConfig::default())
    }

    #[test]
    fn misses_return_defaults() {
        let cache = cache();
        assert!(cache.get_post("p1").is_none());
        assert!(cache.get_user_posts("u1", 20).is_empty());
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn user_posts_prepend_and_limit() {
        let cache = cache();
        cache.add_to_user_posts("u1", post_item("p1", "u1"));
        cache.add_to_user_posts("u1", post_item("p2", "u1"));
        cache.add_to_user_posts("u1", post_item("p3", "u1"));

        let page = cache.get_user_posts("u1", 2);
        let ids: Vec<_> = page.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["p3", "p2"]);
    }

    #[test]
    fn adjust_count_saturates_on_record_and_lists() {
        let cache = cache();
        cache.save_post(post("p1", "u1"));
        cache.add_to_user_posts("u1", post_item("p1", "u1"));

        cache.adjust_count("p1", PostCounter::Likes, 2);
        cache.adjust_count("p1", PostCounter::Likes, -5);
        cache.adjust_count("p1", PostCounter::Shares, 1);

        let record = cache.get_post("p1").expect("post cached");
        assert_eq!(record.like_count, 0);
        assert_eq!(record.share_count, 1);
        assert_eq!(cache.get_user_posts("u1", 1)[0].share_count, 1);
    }

    #[test]
    fn refresh_from_record_updates_list_copies() {
        let cache = cache();
        cache.add_to_user_posts("u1", post_item("p1", "u1"));

        let mut edited = post("p1", "u1");
        edited.content = "Edited".to_string();
        edited.comment_count = 4;
        assert_eq!(cache.refresh_post_in_user_lists(&edited), 1);

        let item = &cache.get_user_posts("u1", 1)[0];
        assert_eq!(item.content_preview, "Edited");
        assert_eq!(item.comment_count, 4);
        assert_eq!(item.author_name, "U1");
    }

    #[test]
    fn purge_post_clears_record_and_lists() {
        let cache = cache();
        cache.save_post(post("p1", "u1"));
        cache.add_to_user_posts("u1", post_item("p1", "u1"));
        cache.add_to_user_posts("u1", post_item("p2", "u1"));

        cache.purge_post("p1");

        assert!(cache.get_post("p1").is_none());
        assert_eq!(cache.get_user_posts("u1", 10).len(), 1);
    }

    #[test]
    fn delta_helper_clamps_both_ends() {
        let mut value = u32::MAX - 1;
        apply_delta(&mut value, 5);
        assert_eq!(value, u32::MAX);

        let mut value = 1;
        apply_delta(&mut value, -3);
        assert_eq!(value, 0);
    }
}
