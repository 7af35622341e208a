//! Search result lists and per-user recent queries.

use time::OffsetDateTime;

use crate::domain::entities::SearchHit;
use crate::domain::types::SearchScope;

use super::config::CacheConfig;
use super::keys::{CacheDomain, SearchKey, normalize_query};
use super::store::{ListStore, latest};

const DOMAIN: CacheDomain = CacheDomain::Search;

pub struct SearchCache {
    results: ListStore<SearchKey, SearchHit>,
    /// user id -> normalized queries, most recent first
    recent_queries: ListStore<String, String>,
    recent_query_cap: usize,
}

impl SearchCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.search_capacity();
        Self {
            results: ListStore::new(DOMAIN, "search.results", capacity),
            recent_queries: ListStore::new(DOMAIN, "search.recent_queries", capacity),
            recent_query_cap: config.recent_query_cap(),
        }
    }

    /// The first `limit` cached hits for a query, matched after normalization.
    pub fn get_results(&self, scope: SearchScope, query: &str, limit: usize) -> Vec<SearchHit> {
        self.results
            .get_limited(&SearchKey::new(scope, query), limit)
    }

    pub fn save_results(&self, scope: SearchScope, query: &str, hits: Vec<SearchHit>) {
        self.results.put(SearchKey::new(scope, query), hits);
    }

    pub fn get_recent_queries(&self, user_id: &str) -> Vec<String> {
        self.recent_queries.get(user_id)
    }

    /// Record a query at the head of the user's history.
    ///
    /// Blank queries are ignored. Repeats move to the front instead of
    /// duplicating, and the history is capped.
    pub fn add_recent_query(&self, user_id: &str, query: &str) {
        let query = normalize_query(query);
        if query.is_empty() || self.recent_query_cap == 0 {
            return;
        }
        self.recent_queries
            .prepend_capped(user_id.to_string(), query, self.recent_query_cap);
    }

    pub fn clear_recent_queries(&self, user_id: &str) {
        self.recent_queries.remove(user_id);
    }

    /// Drop a deleted entity from every result list. Returns the lists touched.
    ///
    /// Ids are only unique within one collection, so hits are matched on
    /// kind as well as id.
    pub fn remove_entity(&self, kind: SearchScope, entity_id: &str) -> usize {
        self.results
            .remove_everywhere_where(|hit| hit.kind == kind && hit.id == entity_id)
    }

    pub fn clear_user(&self, user_id: &str) {
        self.clear_recent_queries(user_id);
    }

    pub fn clear(&self) {
        self.results.clear();
        self.recent_queries.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.results.item_count() + self.recent_queries.item_count()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        latest([self.results.last_write(), self.recent_queries.last_write()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fixtures::hit;

    fn cache_with_cap(cap: usize) -> SearchCache {
        SearchCache::new(&CacheConfig {
            recent_query_limit: cap,
            ..Default::default()
        })
    }

    #[test]
    fn results_match_after_normalization() {
        let cache = cache_with_cap(10);
        cache.save_results(
            SearchScope::Recipes,
            "Banana Bread",
            vec![hit("r1", SearchScope::Recipes), hit("r2", SearchScope::Recipes)],
        );

        assert_eq!(cache.get_results(SearchScope::Recipes, "  banana   bread", 10).len(), 2);
        assert_eq!(cache.get_results(SearchScope::Recipes, "banana bread", 1).len(), 1);
        assert!(cache.get_results(SearchScope::Posts, "banana bread", 10).is_empty());
    }

    #[test]
    fn recent_queries_dedupe_and_cap() {
        let cache = cache_with_cap(3);
        for query in ["pasta", "tacos", "Pasta ", "curry", "ramen"] {
            cache.add_recent_query("u1", query);
        }
        cache.add_recent_query("u1", "   ");

        assert_eq!(cache.get_recent_queries("u1"), ["ramen", "curry", "pasta"]);

        cache.clear_recent_queries("u1");
        assert!(cache.get_recent_queries("u1").is_empty());
    }

    #[test]
    fn zero_cap_disables_history() {
        let cache = cache_with_cap(0);
        cache.add_recent_query("u1", "pasta");
        assert!(cache.get_recent_queries("u1").is_empty());
    }

    #[test]
    fn remove_entity_drops_hits_everywhere() {
        let cache = cache_with_cap(10);
        cache.save_results(SearchScope::Posts, "a", vec![hit("p1", SearchScope::Posts)]);
        cache.save_results(SearchScope::Posts, "b", vec![hit("p1", SearchScope::Posts)]);

        assert_eq!(cache.remove_entity(SearchScope::Posts, "p1"), 2);
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn remove_entity_keeps_same_id_of_other_kind() {
        let cache = cache_with_cap(10);
        cache.save_results(
            SearchScope::Posts,
            "x",
            vec![hit("x", SearchScope::Posts), hit("x", SearchScope::Recipes)],
        );
        cache.save_results(SearchScope::Recipes, "x", vec![hit("x", SearchScope::Recipes)]);

        assert_eq!(cache.remove_entity(SearchScope::Posts, "x"), 1);
        let mixed = cache.get_results(SearchScope::Posts, "x", 10);
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].kind, SearchScope::Recipes);
        assert_eq!(cache.get_results(SearchScope::Recipes, "x", 10).len(), 1);
    }
}
