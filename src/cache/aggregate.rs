//! Aggregating cache façade.
//!
//! `LocalCache` owns one instance of every domain cache and the rules for
//! mutations that must reach several of them. Multi-domain operations run
//! under a single fan-out lock so two fan-outs never interleave; reads on a
//! single domain go straight to that domain's cache.

use std::sync::Mutex;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::domain::entities::{Post, PostListItem, PostReferences};
use crate::domain::types::{InteractionKind, SearchScope};

use super::analytics::AnalyticsCache;
use super::comment::CommentCache;
use super::config::CacheConfig;
use super::cookbook::CookbookCache;
use super::feed::FeedCache;
use super::interaction::InteractionCache;
use super::keys::CacheDomain;
use super::lock::mutex_lock;
use super::post::PostCache;
use super::recipe::RecipeCache;
use super::reference::ReferenceCache;
use super::search::SearchCache;
use super::store::latest;

const SOURCE: &str = "cache::aggregate";
pub const METRIC_CACHE_FANOUT_MS: &str = "larder_cache_fanout_ms";

/// Entry counts per domain: keyed records plus list items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSize {
    pub cookbook: usize,
    pub recipe: usize,
    pub post: usize,
    pub comment: usize,
    pub feed: usize,
    pub interaction: usize,
    pub analytics: usize,
    pub reference: usize,
    pub search: usize,
}

impl CacheSize {
    pub fn get(&self, domain: CacheDomain) -> usize {
        match domain {
            CacheDomain::Cookbook => self.cookbook,
            CacheDomain::Recipe => self.recipe,
            CacheDomain::Post => self.post,
            CacheDomain::Comment => self.comment,
            CacheDomain::Feed => self.feed,
            CacheDomain::Interaction => self.interaction,
            CacheDomain::Analytics => self.analytics,
            CacheDomain::Reference => self.reference,
            CacheDomain::Search => self.search,
        }
    }

    pub fn total(&self) -> usize {
        CacheDomain::ALL.iter().map(|domain| self.get(*domain)).sum()
    }
}

pub struct LocalCache {
    cookbooks: CookbookCache,
    recipes: RecipeCache,
    posts: PostCache,
    comments: CommentCache,
    feeds: FeedCache,
    interactions: InteractionCache,
    analytics: AnalyticsCache,
    references: ReferenceCache,
    search: SearchCache,
    fanout: Mutex<()>,
}

impl LocalCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            cookbooks: CookbookCache::new(config),
            recipes: RecipeCache::new(config),
            posts: PostCache::new(config),
            comments: CommentCache::new(config),
            feeds: FeedCache::new(config),
            interactions: InteractionCache::new(config),
            analytics: AnalyticsCache::new(config),
            references: ReferenceCache::new(config),
            search: SearchCache::new(config),
            fanout: Mutex::new(()),
        }
    }

    pub fn cookbooks(&self) -> &CookbookCache {
        &self.cookbooks
    }

    pub fn recipes(&self) -> &RecipeCache {
        &self.recipes
    }

    pub fn posts(&self) -> &PostCache {
        &self.posts
    }

    pub fn comments(&self) -> &CommentCache {
        &self.comments
    }

    pub fn feeds(&self) -> &FeedCache {
        &self.feeds
    }

    pub fn interactions(&self) -> &InteractionCache {
        &self.interactions
    }

    pub fn analytics(&self) -> &AnalyticsCache {
        &self.analytics
    }

    pub fn references(&self) -> &ReferenceCache {
        &self.references
    }

    pub fn search(&self) -> &SearchCache {
        &self.search
    }

    // ========================================================================
    // Post fan-out
    // ========================================================================

    /// Remove every trace of a post from every domain.
    pub fn delete_post(&self, post_id: &str) {
        self.fan_out("delete_post", || {
            self.posts.purge_post(post_id);
            let interactions = self.interactions.remove_post(post_id);
            self.comments.remove_post_comments(post_id);
            let feeds = self.feeds.remove_post_everywhere(post_id);
            self.analytics.remove_post_analytics(post_id);
            self.references.remove_post_references(post_id);
            let searches = self.search.remove_entity(SearchScope::Posts, post_id);

            debug!(post_id, interactions, feeds, searches, "Post fan-out delete complete");
        });
    }

    /// Store an edited post and refresh every list copy of it.
    pub fn update_post(&self, post: Post) {
        self.fan_out("update_post", || {
            let lists = self.posts.refresh_post_in_user_lists(&post);
            let feeds = self.feeds.refresh_post_everywhere(&post);
            self.references
                .save_post_references(PostReferences::from(&post));
            debug!(post_id = %post.id, lists, feeds, "Post fan-out update complete");
            self.posts.save_post(post);
        });
    }

    /// Replace a post's list projection in user lists and every feed.
    pub fn update_post_item(&self, item: PostListItem) {
        self.fan_out("update_post_item", || {
            let lists = self.posts.update_post_in_user_lists(&item);
            let feeds = self.feeds.replace_post_everywhere(&item);
            debug!(post_id = %item.id, lists, feeds, "Post item fan-out update complete");
        });
    }

    pub fn set_post_like_status(&self, user_id: &str, post_id: &str, liked: bool) -> bool {
        self.set_post_interaction(user_id, post_id, InteractionKind::Like, liked)
    }

    pub fn set_post_share_status(&self, user_id: &str, post_id: &str, shared: bool) -> bool {
        self.set_post_interaction(user_id, post_id, InteractionKind::Share, shared)
    }

    pub fn set_post_save_status(&self, user_id: &str, post_id: &str, saved: bool) -> bool {
        self.set_post_interaction(user_id, post_id, InteractionKind::Save, saved)
    }

    /// Record an interaction and, when it changed, propagate the counter
    /// delta and the viewer flag. Returns whether the status changed.
    pub fn set_post_interaction(
        &self,
        user_id: &str,
        post_id: &str,
        kind: InteractionKind,
        value: bool,
    ) -> bool {
        self.fan_out("set_post_interaction", || {
            let changed = self.interactions.set_status(user_id, post_id, kind, value);
            if !changed {
                return false;
            }

            if let Some(counter) = kind.counter() {
                let delta = if value { 1 } else { -1 };
                self.posts.adjust_count(post_id, counter, delta);
                self.feeds.adjust_count_everywhere(post_id, counter, delta);
            }
            self.feeds
                .set_flag_everywhere(user_id, post_id, kind, value);
            true
        })
    }

    // ========================================================================
    // Cookbook and recipe fan-out
    // ========================================================================

    pub fn delete_cookbook(&self, cookbook_id: &str) {
        self.fan_out("delete_cookbook", || {
            self.cookbooks.purge_cookbook(cookbook_id);
            let posts = self.references.forget_cookbook(cookbook_id);
            let searches = self.search.remove_entity(SearchScope::Cookbooks, cookbook_id);
            debug!(
                cookbook_id,
                posts = posts.len(),
                searches,
                "Cookbook fan-out delete complete"
            );
        });
    }

    pub fn delete_recipe(&self, recipe_id: &str) {
        self.fan_out("delete_recipe", || {
            self.recipes.purge_recipe(recipe_id);
            let cookbooks = self.cookbooks.purge_recipe(recipe_id);
            let posts = self.references.forget_recipe(recipe_id);
            let searches = self.search.remove_entity(SearchScope::Recipes, recipe_id);
            debug!(
                recipe_id,
                cookbooks,
                posts = posts.len(),
                searches,
                "Recipe fan-out delete complete"
            );
        });
    }

    // ========================================================================
    // Clearing
    // ========================================================================

    /// Drop all per-user state, as on sign-out.
    ///
    /// Flags the user left on global feed items are reset along with their
    /// interaction rows.
    pub fn clear_user(&self, user_id: &str) {
        self.fan_out("clear_user", || {
            self.cookbooks.clear_user(user_id);
            self.recipes.clear_user(user_id);
            self.posts.clear_user(user_id);
            self.comments.clear_user(user_id);
            let rows = self.interactions.clear_user(user_id);
            let global_items: usize = rows
                .iter()
                .map(|(post_id, flags)| self.feeds.clear_global_flags(post_id, *flags))
                .sum();
            let feeds = self.feeds.clear_user(user_id);
            self.search.clear_user(user_id);
            debug!(
                user_id,
                interactions = rows.len(),
                global_items,
                feeds,
                "User fan-out clear complete"
            );
        });
        info!(user_id, "Cleared user cache state");
    }

    pub fn clear_domain(&self, domain: CacheDomain) {
        self.fan_out("clear_domain", || self.clear_domain_locked(domain));
        info!(domain = %domain, "Cleared cache domain");
    }

    /// Clear every domain. Calling it again leaves the same empty state.
    pub fn clear_all_caches(&self) {
        self.fan_out("clear_all_caches", || {
            for domain in CacheDomain::ALL {
                self.clear_domain_locked(domain);
            }
        });
        info!("Cleared all caches");
    }

    /// Return the cache to its freshly built state.
    pub fn reset(&self) {
        self.clear_all_caches();
    }

    pub fn cache_size(&self) -> CacheSize {
        CacheSize {
            cookbook: self.cookbooks.entry_count(),
            recipe: self.recipes.entry_count(),
            post: self.posts.entry_count(),
            comment: self.comments.entry_count(),
            feed: self.feeds.entry_count(),
            interaction: self.interactions.entry_count(),
            analytics: self.analytics.entry_count(),
            reference: self.references.entry_count(),
            search: self.search.entry_count(),
        }
    }

    /// The most recent write across every domain, or `None` if empty since
    /// construction or the last clear.
    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        latest([
            self.cookbooks.last_updated(),
            self.recipes.last_updated(),
            self.posts.last_updated(),
            self.comments.last_updated(),
            self.feeds.last_updated(),
            self.interactions.last_updated(),
            self.analytics.last_updated(),
            self.references.last_updated(),
            self.search.last_updated(),
        ])
    }

    fn clear_domain_locked(&self, domain: CacheDomain) {
        match domain {
            CacheDomain::Cookbook => self.cookbooks.clear(),
            CacheDomain::Recipe => self.recipes.clear(),
            CacheDomain::Post => self.posts.clear(),
            CacheDomain::Comment => self.comments.clear(),
            CacheDomain::Feed => self.feeds.clear(),
            CacheDomain::Interaction => self.interactions.clear(),
            CacheDomain::Analytics => self.analytics.clear(),
            CacheDomain::Reference => self.references.clear(),
            CacheDomain::Search => self.search.clear(),
        }
    }

    fn fan_out<R>(&self, op: &'static str, f: impl FnOnce() -> R) -> R {
        let started_at = Instant::now();
        let _guard = mutex_lock(&self.fanout, SOURCE, op);
        let result = f();
        histogram!(METRIC_CACHE_FANOUT_MS, "op" => op)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fixtures::{feed_item, post, post_item};
    use crate::cache::keys::FeedKey;

    fn cache() -> LocalCache {
        LocalCache::new(&CacheConfig::default())
    }

    #[test]
    fn like_toggle_moves_counters_once() {
        let cache = cache();
        cache.posts().save_post(post("p1", "author"));
        cache.feeds().save_feed(FeedKey::Home("u1".into()), vec![feed_item("p1", "author")]);

        assert!(cache.set_post_like_status("u1", "p1", true));
        assert!(!cache.set_post_like_status("u1", "p1", true));

        let record = cache.posts().get_post("p1").expect("post cached");
        assert_eq!(record.like_count, 1);
        let item = &cache.feeds().get_feed(&FeedKey::Home("u1".into()), 1)[0];
        assert!(item.is_liked);
        assert_eq!(item.post.like_count, 1);

        assert!(cache.set_post_like_status("u1", "p1", false));
        assert_eq!(cache.posts().get_post("p1").map(|p| p.like_count), Some(0));
    }

    #[test]
    fn save_toggle_leaves_counters_alone() {
        let cache = cache();
        cache.posts().save_post(post("p1", "author"));

        assert!(cache.set_post_save_status("u1", "p1", true));
        let record = cache.posts().get_post("p1").expect("post cached");
        assert_eq!((record.like_count, record.share_count), (0, 0));
        assert!(cache.interactions().get_flags("u1", "p1").saved);
    }

    #[test]
    fn update_post_refreshes_lists_and_references() {
        let cache = cache();
        cache.posts().add_to_user_posts("author", post_item("p1", "author"));
        cache.feeds().save_feed(FeedKey::Trending, vec![feed_item("p1", "author")]);

        let mut edited = post("p1", "author");
        edited.content = "Now with a recipe".to_string();
        edited.recipe_ids = vec!["r1".to_string()];
        cache.update_post(edited);

        assert_eq!(
            cache.posts().get_user_posts("author", 1)[0].content_preview,
            "Now with a recipe"
        );
        assert_eq!(
            cache.feeds().get_feed(&FeedKey::Trending, 1)[0].post.content_preview,
            "Now with a recipe"
        );
        assert_eq!(cache.references().get_posts_referencing_recipe("r1"), ["p1"]);
        assert!(cache.posts().get_post("p1").is_some());
    }

    #[test]
    fn cache_size_totals_domains() {
        let cache = cache();
        cache.posts().save_post(post("p1", "a"));
        cache.posts().save_post(post("p2", "a"));
        cache.analytics().record_view("p1");

        let size = cache.cache_size();
        assert_eq!(size.post, 2);
        assert_eq!(size.analytics, 1);
        assert_eq!(size.total(), 3);
    }

    #[test]
    fn clear_domain_only_touches_that_domain() {
        let cache = cache();
        cache.posts().save_post(post("p1", "a"));
        cache.analytics().record_view("p1");

        cache.clear_domain(CacheDomain::Analytics);

        assert!(cache.analytics().get_post_analytics("p1").is_none());
        assert!(cache.posts().get_post("p1").is_some());
    }
}
