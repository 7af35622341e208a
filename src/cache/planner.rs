//! Invalidation plan generation.
//!
//! Merges a batch of cache events into the minimal set of actions.

use std::collections::HashSet;
use std::fmt;

use super::events::{CacheEvent, Epoch, EventKind};
use super::keys::{CacheDomain, FeedKey};

/// Actions to execute against the local cache.
#[derive(Debug, Default)]
pub struct InvalidationPlan {
    /// Clear every domain; subsumes all other actions.
    pub reset: bool,
    pub clear_domains: HashSet<CacheDomain>,
    pub refresh_feeds: HashSet<FeedKey>,
    pub sign_out_users: HashSet<String>,
    pub delete_posts: HashSet<String>,
    pub delete_cookbooks: HashSet<String>,
    pub delete_recipes: HashSet<String>,
    /// Highest epoch merged into this plan.
    pub latest_epoch: Option<Epoch>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ reset: {}, domains: {}, feeds: {}, sign_outs: {}, \
             posts: {}, cookbooks: {}, recipes: {} }}",
            self.reset,
            self.clear_domains.len(),
            self.refresh_feeds.len(),
            self.sign_out_users.len(),
            self.delete_posts.len(),
            self.delete_cookbooks.len(),
            self.delete_recipes.len(),
        )
    }
}

impl InvalidationPlan {
    /// Merge events into a plan.
    ///
    /// - Deduplicates by event ID
    /// - A reset drops every other action
    /// - Clearing the feed domain drops individual feed refreshes
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            plan.latest_epoch = plan.latest_epoch.max(Some(event.epoch));
            match event.kind {
                EventKind::ResetRequested => plan.reset = true,
                EventKind::SignedOut { user_id } => {
                    plan.sign_out_users.insert(user_id);
                }
                EventKind::DomainRefreshed { domain } => {
                    plan.clear_domains.insert(domain);
                }
                EventKind::FeedRefreshed { key } => {
                    plan.refresh_feeds.insert(key);
                }
                EventKind::PostDeleted { post_id } => {
                    plan.delete_posts.insert(post_id);
                }
                EventKind::CookbookDeleted { cookbook_id } => {
                    plan.delete_cookbooks.insert(cookbook_id);
                }
                EventKind::RecipeDeleted { recipe_id } => {
                    plan.delete_recipes.insert(recipe_id);
                }
            }
        }

        if plan.reset {
            return Self {
                reset: true,
                latest_epoch: plan.latest_epoch,
                ..Self::default()
            };
        }
        if plan.clear_domains.contains(&CacheDomain::Feed) {
            plan.refresh_feeds.clear();
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.reset
            && self.clear_domains.is_empty()
            && self.refresh_feeds.is_empty()
            && self.sign_out_users.is_empty()
            && self.delete_posts.is_empty()
            && self.delete_cookbooks.is_empty()
            && self.delete_recipes.is_empty()
    }
}
