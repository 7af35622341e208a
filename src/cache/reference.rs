//! Post references to recipes and cookbooks, with reverse indexes.
//!
//! The forward map and both reverse indexes are only mutated while holding
//! the façade's write lock, so readers never observe one direction without
//! the other once a call returns.

use std::sync::Mutex;

use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::PostReferences;

use super::config::CacheConfig;
use super::keys::CacheDomain;
use super::lock::mutex_lock;
use super::store::{KeyedStore, ListStore, latest};

const DOMAIN: CacheDomain = CacheDomain::Reference;
const SOURCE: &str = "cache::reference";

pub struct ReferenceCache {
    by_post: KeyedStore<String, PostReferences>,
    /// recipe id -> ids of posts referencing it
    posts_by_recipe: ListStore<String, String>,
    /// cookbook id -> ids of posts referencing it
    posts_by_cookbook: ListStore<String, String>,
    write_lock: Mutex<()>,
}

impl ReferenceCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.reference_capacity();
        Self {
            by_post: KeyedStore::new(DOMAIN, "reference.by_post", capacity),
            posts_by_recipe: ListStore::new(DOMAIN, "reference.by_recipe", capacity),
            posts_by_cookbook: ListStore::new(DOMAIN, "reference.by_cookbook", capacity),
            write_lock: Mutex::new(()),
        }
    }

    pub fn get_post_references(&self, post_id: &str) -> Option<PostReferences> {
        self.by_post.get(post_id)
    }

    /// Store a post's references, moving its reverse-index entries along.
    pub fn save_post_references(&self, refs: PostReferences) {
        let _guard = mutex_lock(&self.write_lock, SOURCE, "save_post_references");
        self.by_post.remove(refs.post_id.as_str());
        self.unindex(&refs.post_id);
        for recipe_id in &refs.recipe_ids {
            self.posts_by_recipe
                .append(recipe_id.clone(), refs.post_id.clone());
        }
        for cookbook_id in &refs.cookbook_ids {
            self.posts_by_cookbook
                .append(cookbook_id.clone(), refs.post_id.clone());
        }
        self.by_post.put(refs.post_id.clone(), refs);
    }

    pub fn get_posts_referencing_recipe(&self, recipe_id: &str) -> Vec<String> {
        self.posts_by_recipe.get(recipe_id)
    }

    pub fn get_posts_referencing_cookbook(&self, cookbook_id: &str) -> Vec<String> {
        self.posts_by_cookbook.get(cookbook_id)
    }

    /// Drop a post's references in both directions.
    pub fn remove_post_references(&self, post_id: &str) -> Option<PostReferences> {
        let _guard = mutex_lock(&self.write_lock, SOURCE, "remove_post_references");
        let removed = self.by_post.remove(post_id);
        self.unindex(post_id);
        removed
    }

    /// Forget a deleted recipe. Returns the posts that referenced it.
    pub fn forget_recipe(&self, recipe_id: &str) -> Vec<String> {
        let _guard = mutex_lock(&self.write_lock, SOURCE, "forget_recipe");
        let posts = self.posts_by_recipe.remove(recipe_id).unwrap_or_default();
        for post_id in &posts {
            self.by_post.update(post_id.as_str(), |refs| {
                refs.recipe_ids.retain(|id| id != recipe_id);
            });
        }
        debug!(recipe_id, posts = posts.len(), "Forgot recipe references");
        posts
    }

    /// Forget a deleted cookbook. Returns the posts that referenced it.
    pub fn forget_cookbook(&self, cookbook_id: &str) -> Vec<String> {
        let _guard = mutex_lock(&self.write_lock, SOURCE, "forget_cookbook");
        let posts = self
            .posts_by_cookbook
            .remove(cookbook_id)
            .unwrap_or_default();
        for post_id in &posts {
            self.by_post.update(post_id.as_str(), |refs| {
                refs.cookbook_ids.retain(|id| id != cookbook_id);
            });
        }
        debug!(cookbook_id, posts = posts.len(), "Forgot cookbook references");
        posts
    }

    pub fn clear(&self) {
        let _guard = mutex_lock(&self.write_lock, SOURCE, "clear");
        self.by_post.clear();
        self.posts_by_recipe.clear();
        self.posts_by_cookbook.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.by_post.len() + self.posts_by_recipe.item_count() + self.posts_by_cookbook.item_count()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        latest([
            self.by_post.last_write(),
            self.posts_by_recipe.last_write(),
            self.posts_by_cookbook.last_write(),
        ])
    }

    /// Drop `post_id` from both reverse indexes.
    ///
    /// The forward record may already have been evicted, so every reverse
    /// list is scanned rather than only the ones it named.
    fn unindex(&self, post_id: &str) -> usize {
        self.posts_by_recipe.remove_item_everywhere(post_id)
            + self.posts_by_cookbook.remove_item_everywhere(post_id)
    }
}
