//! Recipe cache: records, authored lists, favorites and favorite status.

use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::{Recipe, RecipeListItem};

use super::config::CacheConfig;
use super::keys::{CacheDomain, UserEntityKey};
use super::store::{KeyedStore, ListStore, latest};

const DOMAIN: CacheDomain = CacheDomain::Recipe;

pub struct RecipeCache {
    recipes: KeyedStore<String, Recipe>,
    user_recipes: ListStore<String, RecipeListItem>,
    favorite_recipes: ListStore<String, RecipeListItem>,
    favorite_status: KeyedStore<UserEntityKey, bool>,
}

impl RecipeCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.recipe_capacity();
        Self {
            recipes: KeyedStore::new(DOMAIN, "recipe.records", capacity),
            user_recipes: ListStore::new(DOMAIN, "recipe.user_lists", capacity),
            favorite_recipes: ListStore::new(DOMAIN, "recipe.favorite_lists", capacity),
            favorite_status: KeyedStore::new(
                DOMAIN,
                "recipe.favorite_status",
                config.interaction_capacity(),
            ),
        }
    }

    pub fn get_recipe(&self, recipe_id: &str) -> Option<Recipe> {
        self.recipes.get(recipe_id)
    }

    pub fn save_recipe(&self, recipe: Recipe) {
        self.recipes.put(recipe.id.clone(), recipe);
    }

    pub fn remove_recipe(&self, recipe_id: &str) -> Option<Recipe> {
        self.recipes.remove(recipe_id)
    }

    pub fn get_user_recipes(&self, user_id: &str) -> Vec<RecipeListItem> {
        self.user_recipes.get(user_id)
    }

    pub fn save_user_recipes(&self, user_id: &str, items: Vec<RecipeListItem>) {
        self.user_recipes.put(user_id.to_string(), items);
    }

    pub fn add_to_user_recipes(&self, user_id: &str, item: RecipeListItem) {
        self.user_recipes.prepend(user_id.to_string(), item);
    }

    pub fn remove_from_user_recipes(&self, user_id: &str, recipe_id: &str) -> bool {
        self.user_recipes.remove_item(user_id, recipe_id)
    }

    /// The first `limit` favorites of `user_id`.
    ///
    /// Truncates the cached list; callers cannot page past it.
    pub fn get_favorite_recipes(&self, user_id: &str, limit: usize) -> Vec<RecipeListItem> {
        self.favorite_recipes.get_limited(user_id, limit)
    }

    pub fn save_favorite_recipes(&self, user_id: &str, items: Vec<RecipeListItem>) {
        self.favorite_recipes.put(user_id.to_string(), items);
    }

    /// Prepend to the favorites list and mark the status row.
    pub fn add_favorite_recipe(&self, user_id: &str, item: RecipeListItem) {
        self.favorite_status
            .put(UserEntityKey::new(user_id, &item.id), true);
        self.favorite_recipes.prepend(user_id.to_string(), item);
    }

    /// Drop from the favorites list and clear the status row.
    pub fn remove_favorite_recipe(&self, user_id: &str, recipe_id: &str) -> bool {
        self.favorite_status
            .remove(&UserEntityKey::new(user_id, recipe_id));
        self.favorite_recipes.remove_item(user_id, recipe_id)
    }

    pub fn get_recipe_favorite_status(&self, user_id: &str, recipe_id: &str) -> bool {
        self.favorite_status
            .get(&UserEntityKey::new(user_id, recipe_id))
            .unwrap_or(false)
    }

    pub fn set_recipe_favorite_status(&self, user_id: &str, recipe_id: &str, favorite: bool) {
        self.favorite_status
            .put(UserEntityKey::new(user_id, recipe_id), favorite);
    }

    /// Replace every list copy of the recipe. Returns the lists touched.
    pub fn update_recipe_in_lists(&self, item: &RecipeListItem) -> usize {
        self.user_recipes.replace_everywhere(item) + self.favorite_recipes.replace_everywhere(item)
    }

    /// Drop the recipe record, every list copy and every favorite row.
    pub fn purge_recipe(&self, recipe_id: &str) {
        self.recipes.remove(recipe_id);
        let lists = self.user_recipes.remove_item_everywhere(recipe_id)
            + self.favorite_recipes.remove_item_everywhere(recipe_id);
        let statuses = self
            .favorite_status
            .remove_where(|key, _| key.entity_id == recipe_id);

        debug!(recipe_id, lists, statuses, "Purged recipe from cache");
    }

    pub fn clear_user(&self, user_id: &str) {
        self.user_recipes.remove(user_id);
        self.favorite_recipes.remove(user_id);
        self.favorite_status
            .remove_where(|key, _| key.user_id == user_id);
    }

    pub fn clear(&self) {
        self.recipes.clear();
        self.user_recipes.clear();
        self.favorite_recipes.clear();
        self.favorite_status.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.recipes.len()
            + self.user_recipes.item_count()
            + self.favorite_recipes.item_count()
            + self.favorite_status.len()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        latest([
            self.recipes.last_write(),
            self.user_recipes.last_write(),
            self.favorite_recipes.last_write(),
            self.favorite_status.last_write(),
        ])
    }
}
