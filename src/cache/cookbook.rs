//! Cookbook cache: records, per-user lists, collaborators, contents and
//! follow/like status.

use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::{Cookbook, CookbookListItem, RecipeListItem};

use super::config::CacheConfig;
use super::keys::{CacheDomain, UserEntityKey};
use super::store::{KeyedStore, ListStore, latest};

const DOMAIN: CacheDomain = CacheDomain::Cookbook;

pub struct CookbookCache {
    cookbooks: KeyedStore<String, Cookbook>,
    user_cookbooks: ListStore<String, CookbookListItem>,
    followed_cookbooks: ListStore<String, CookbookListItem>,
    /// cookbook id -> collaborator user ids
    collaborators: ListStore<String, String>,
    /// cookbook id -> recipes in that cookbook
    cookbook_recipes: ListStore<String, RecipeListItem>,
    follow_status: KeyedStore<UserEntityKey, bool>,
    like_status: KeyedStore<UserEntityKey, bool>,
}

impl CookbookCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.cookbook_capacity();
        let status_capacity = config.interaction_capacity();
        Self {
            cookbooks: KeyedStore::new(DOMAIN, "cookbook.records", capacity),
            user_cookbooks: ListStore::new(DOMAIN, "cookbook.user_lists", capacity),
            followed_cookbooks: ListStore::new(DOMAIN, "cookbook.followed_lists", capacity),
            collaborators: ListStore::new(DOMAIN, "cookbook.collaborators", capacity),
            cookbook_recipes: ListStore::new(DOMAIN, "cookbook.recipes", capacity),
            follow_status: KeyedStore::new(DOMAIN, "cookbook.follow_status", status_capacity),
            like_status: KeyedStore::new(DOMAIN, "cookbook.like_status", status_capacity),
        }
    }

    // ========================================================================
    // Records
    // ========================================================================

    pub fn get_cookbook(&self, cookbook_id: &str) -> Option<Cookbook> {
        self.cookbooks.get(cookbook_id)
    }

    pub fn save_cookbook(&self, cookbook: Cookbook) {
        self.cookbooks.put(cookbook.id.clone(), cookbook);
    }

    pub fn remove_cookbook(&self, cookbook_id: &str) -> Option<Cookbook> {
        self.cookbooks.remove(cookbook_id)
    }

    // ========================================================================
    // Per-user lists
    // ========================================================================

    pub fn get_user_cookbooks(&self, user_id: &str) -> Vec<CookbookListItem> {
        self.user_cookbooks.get(user_id)
    }

    pub fn save_user_cookbooks(&self, user_id: &str, items: Vec<CookbookListItem>) {
        self.user_cookbooks.put(user_id.to_string(), items);
    }

    /// Insert at the head of the user's list, replacing an older copy.
    pub fn add_to_user_cookbooks(&self, user_id: &str, item: CookbookListItem) {
        self.user_cookbooks.prepend(user_id.to_string(), item);
    }

    pub fn remove_from_user_cookbooks(&self, user_id: &str, cookbook_id: &str) -> bool {
        self.user_cookbooks.remove_item(user_id, cookbook_id)
    }

    pub fn get_followed_cookbooks(&self, user_id: &str) -> Vec<CookbookListItem> {
        self.followed_cookbooks.get(user_id)
    }

    pub fn save_followed_cookbooks(&self, user_id: &str, items: Vec<CookbookListItem>) {
        self.followed_cookbooks.put(user_id.to_string(), items);
    }

    // ========================================================================
    // Collaborators and contents
    // ========================================================================

    pub fn get_cookbook_collaborators(&self, cookbook_id: &str) -> Vec<String> {
        self.collaborators.get(cookbook_id)
    }

    pub fn save_cookbook_collaborators(&self, cookbook_id: &str, user_ids: Vec<String>) {
        self.collaborators.put(cookbook_id.to_string(), user_ids);
    }

    pub fn get_cookbook_recipes(&self, cookbook_id: &str) -> Vec<RecipeListItem> {
        self.cookbook_recipes.get(cookbook_id)
    }

    pub fn save_cookbook_recipes(&self, cookbook_id: &str, recipes: Vec<RecipeListItem>) {
        self.cookbook_recipes.put(cookbook_id.to_string(), recipes);
    }

    pub fn add_recipe_to_cookbook(&self, cookbook_id: &str, recipe: RecipeListItem) {
        self.cookbook_recipes.prepend(cookbook_id.to_string(), recipe);
    }

    pub fn remove_recipe_from_cookbook(&self, cookbook_id: &str, recipe_id: &str) -> bool {
        self.cookbook_recipes.remove_item(cookbook_id, recipe_id)
    }

    // ========================================================================
    // Status tables
    // ========================================================================

    pub fn get_cookbook_follow_status(&self, user_id: &str, cookbook_id: &str) -> bool {
        self.follow_status
            .get(&UserEntityKey::new(user_id, cookbook_id))
            .unwrap_or(false)
    }

    pub fn set_cookbook_follow_status(&self, user_id: &str, cookbook_id: &str, following: bool) {
        self.follow_status
            .put(UserEntityKey::new(user_id, cookbook_id), following);
    }

    pub fn get_cookbook_like_status(&self, user_id: &str, cookbook_id: &str) -> bool {
        self.like_status
            .get(&UserEntityKey::new(user_id, cookbook_id))
            .unwrap_or(false)
    }

    pub fn set_cookbook_like_status(&self, user_id: &str, cookbook_id: &str, liked: bool) {
        self.like_status
            .put(UserEntityKey::new(user_id, cookbook_id), liked);
    }

    // ========================================================================
    // Cross-list maintenance
    // ========================================================================

    /// Replace every list copy of the cookbook. Returns the lists touched.
    pub fn update_cookbook_in_lists(&self, item: &CookbookListItem) -> usize {
        self.user_cookbooks.replace_everywhere(item)
            + self.followed_cookbooks.replace_everywhere(item)
    }

    /// Drop the cookbook record, every list copy and every status row.
    pub fn purge_cookbook(&self, cookbook_id: &str) {
        self.cookbooks.remove(cookbook_id);
        let lists = self.user_cookbooks.remove_item_everywhere(cookbook_id)
            + self.followed_cookbooks.remove_item_everywhere(cookbook_id);
        self.collaborators.remove(cookbook_id);
        self.cookbook_recipes.remove(cookbook_id);
        let statuses = self
            .follow_status
            .remove_where(|key, _| key.entity_id == cookbook_id)
            + self
                .like_status
                .remove_where(|key, _| key.entity_id == cookbook_id);

        debug!(cookbook_id, lists, statuses, "Purged cookbook from cache");
    }

    /// Drop a recipe from every cookbook's contents.
    pub fn purge_recipe(&self, recipe_id: &str) -> usize {
        self.cookbook_recipes.remove_item_everywhere(recipe_id)
    }

    pub fn clear_user(&self, user_id: &str) {
        self.user_cookbooks.remove(user_id);
        self.followed_cookbooks.remove(user_id);
        self.follow_status.remove_where(|key, _| key.user_id == user_id);
        self.like_status.remove_where(|key, _| key.user_id == user_id);
    }

    pub fn clear(&self) {
        self.cookbooks.clear();
        self.user_cookbooks.clear();
        self.followed_cookbooks.clear();
        self.collaborators.clear();
        self.cookbook_recipes.clear();
        self.follow_status.clear();
        self.like_status.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.cookbooks.len()
            + self.user_cookbooks.item_count()
            + self.followed_cookbooks.item_count()
            + self.collaborators.item_count()
            + self.cookbook_recipes.item_count()
            + self.follow_status.len()
            + self.like_status.len()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        latest([
            self.cookbooks.last_write(),
            self.user_cookbooks.last_write(),
            self.followed_cookbooks.last_write(),
            self.collaborators.last_write(),
            self.cookbook_recipes.last_write(),
            self.follow_status.last_write(),
            self.like_status.last_write(),
        ])
    }
}
