//! Keyed storage primitives backing every cache façade.
//!
//! `KeyedStore` maps a key to one value; `ListStore` maps a key to an ordered
//! list of identified items. Both are LRU-bounded and guard their map with a
//! single lock, so every read-modify-write runs as one critical section and
//! concurrent writers to the same key cannot lose updates.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::Identified;

use super::keys::CacheDomain;
use super::lock::{rw_read, rw_write};

pub const METRIC_CACHE_HIT: &str = "larder_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "larder_cache_miss_total";
pub const METRIC_CACHE_EVICT: &str = "larder_cache_evict_total";

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    last_write: Option<OffsetDateTime>,
}

impl<K: Hash + Eq, V> Inner<K, V> {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            last_write: None,
        }
    }

    fn touch(&mut self) {
        self.last_write = Some(OffsetDateTime::now_utc());
    }

    /// Insert and report whether a different key was evicted to make room.
    fn insert(&mut self, key: K, value: V) -> bool {
        self.touch();
        let replacing = self.entries.contains(&key);
        let displaced = self.entries.push(key, value);
        !replacing && displaced.is_some()
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.last_write = None;
    }
}

/// Identity shared by both store kinds for logging and metrics.
#[derive(Debug, Clone, Copy)]
struct StoreLabel {
    domain: CacheDomain,
    name: &'static str,
}

impl StoreLabel {
    fn record_lookup(self, hit: bool) {
        let metric = if hit { METRIC_CACHE_HIT } else { METRIC_CACHE_MISS };
        counter!(metric, "domain" => self.domain.as_str(), "store" => self.name).increment(1);
    }

    fn record_eviction(self) {
        counter!(
            METRIC_CACHE_EVICT,
            "domain" => self.domain.as_str(),
            "store" => self.name
        )
        .increment(1);
        debug!(
            domain = %self.domain,
            store = self.name,
            "Evicted least recently used cache entry"
        );
    }
}

// ============================================================================
// KeyedStore: key -> value
// ============================================================================

pub struct KeyedStore<K: Hash + Eq, V> {
    label: StoreLabel,
    inner: RwLock<Inner<K, V>>,
}

impl<K, V> KeyedStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(domain: CacheDomain, name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            label: StoreLabel { domain, name },
            inner: RwLock::new(Inner::new(capacity)),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        // LRU promotion mutates recency order, so lookups take the write lock.
        let value = rw_write(&self.inner, self.label.name, "get")
            .entries
            .get(key)
            .cloned();
        self.label.record_lookup(value.is_some());
        value
    }

    pub fn put(&self, key: K, value: V) {
        let evicted = rw_write(&self.inner, self.label.name, "put").insert(key, value);
        if evicted {
            self.label.record_eviction();
        }
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = rw_write(&self.inner, self.label.name, "remove");
        let removed = inner.entries.pop(key);
        if removed.is_some() {
            inner.touch();
        }
        removed
    }

    /// Mutate an existing value in place. Returns false when the key is absent.
    pub fn update<Q, F>(&self, key: &Q, f: F) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&mut V),
    {
        let mut inner = rw_write(&self.inner, self.label.name, "update");
        let Some(value) = inner.entries.get_mut(key) else {
            return false;
        };
        f(value);
        inner.touch();
        true
    }

    /// Mutate the value for `key`, seeding it with `init` when absent.
    ///
    /// Returns the value as it stands after the mutation.
    pub fn upsert<I, F>(&self, key: K, init: I, f: F) -> V
    where
        I: FnOnce() -> V,
        F: FnOnce(&mut V),
    {
        let mut inner = rw_write(&self.inner, self.label.name, "upsert");
        if let Some(value) = inner.entries.get_mut(&key) {
            f(value);
            let updated = value.clone();
            inner.touch();
            return updated;
        }

        let mut value = init();
        f(&mut value);
        let updated = value.clone();
        let evicted = inner.insert(key, value);
        drop(inner);
        if evicted {
            self.label.record_eviction();
        }
        updated
    }

    /// Remove every entry matching `pred`, returning how many were dropped.
    pub fn remove_where<F>(&self, pred: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.take_where(pred).len()
    }

    /// Remove every entry matching `pred`, handing the removed entries back.
    pub fn take_where<F>(&self, mut pred: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut inner = rw_write(&self.inner, self.label.name, "take_where");
        let doomed: Vec<K> = inner
            .entries
            .iter()
            .filter(|(key, value)| pred(*key, *value))
            .map(|(key, _)| key.clone())
            .collect();
        let taken: Vec<(K, V)> = doomed
            .into_iter()
            .filter_map(|key| inner.entries.pop(&key).map(|value| (key, value)))
            .collect();
        if !taken.is_empty() {
            inner.touch();
        }
        taken
    }

    pub fn clear(&self) {
        rw_write(&self.inner, self.label.name, "clear").reset();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.inner, self.label.name, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_write(&self) -> Option<OffsetDateTime> {
        rw_read(&self.inner, self.label.name, "last_write").last_write
    }
}

// ============================================================================
// ListStore: key -> ordered list of identified items
// ============================================================================

pub struct ListStore<K: Hash + Eq, T> {
    label: StoreLabel,
    inner: RwLock<Inner<K, Vec<T>>>,
}

impl<K, T> ListStore<K, T>
where
    K: Hash + Eq + Clone,
    T: Identified + Clone,
{
    pub fn new(domain: CacheDomain, name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            label: StoreLabel { domain, name },
            inner: RwLock::new(Inner::new(capacity)),
        }
    }

    /// The cached list for `key`, or an empty list on a miss.
    pub fn get<Q>(&self, key: &Q) -> Vec<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let items = rw_write(&self.inner, self.label.name, "get")
            .entries
            .get(key)
            .cloned();
        self.label.record_lookup(items.is_some());
        items.unwrap_or_default()
    }

    /// The first `limit` cached items for `key`.
    ///
    /// This truncates the fully materialized list; it cannot continue from
    /// an offset.
    pub fn get_limited<Q>(&self, key: &Q, limit: usize) -> Vec<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let items = rw_write(&self.inner, self.label.name, "get_limited")
            .entries
            .get(key)
            .map(|list| list.iter().take(limit).cloned().collect::<Vec<_>>());
        self.label.record_lookup(items.is_some());
        items.unwrap_or_default()
    }

    pub fn put(&self, key: K, items: Vec<T>) {
        let evicted = rw_write(&self.inner, self.label.name, "put").insert(key, items);
        if evicted {
            self.label.record_eviction();
        }
    }

    /// Insert `item` at the head, replacing any earlier copy with the same id.
    pub fn prepend(&self, key: K, item: T) {
        self.mutate_or_insert("prepend", key, |list| {
            list.retain(|existing| existing.id() != item.id());
            list.insert(0, item);
        });
    }

    /// Like `prepend`, then keep only the first `cap` items.
    pub fn prepend_capped(&self, key: K, item: T, cap: usize) {
        self.mutate_or_insert("prepend_capped", key, |list| {
            list.retain(|existing| existing.id() != item.id());
            list.insert(0, item);
            list.truncate(cap);
        });
    }

    /// Insert `item` at the tail, replacing any earlier copy with the same id.
    pub fn append(&self, key: K, item: T) {
        self.mutate_or_insert("append", key, |list| {
            list.retain(|existing| existing.id() != item.id());
            list.push(item);
        });
    }

    /// Append the items whose ids are not already present, keeping their order.
    ///
    /// Returns the number of items added.
    pub fn extend_unique(&self, key: K, items: Vec<T>) -> usize {
        let mut added = 0;
        self.mutate_or_insert("extend_unique", key, |list| {
            for item in items {
                if list.iter().all(|existing| existing.id() != item.id()) {
                    list.push(item);
                    added += 1;
                }
            }
        });
        added
    }

    /// Remove the item with `id` from one list. Absent keys are left absent.
    pub fn remove_item<Q>(&self, key: &Q, id: &str) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_where(key, |item| item.id() == id) > 0
    }

    pub fn remove_where<Q, F>(&self, key: &Q, mut pred: F) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnMut(&T) -> bool,
    {
        let mut inner = rw_write(&self.inner, self.label.name, "remove_where");
        let Some(list) = inner.entries.get_mut(key) else {
            return 0;
        };
        let before = list.len();
        list.retain(|item| !pred(item));
        let removed = before - list.len();
        if removed > 0 {
            inner.touch();
        }
        removed
    }

    /// Replace every copy of `item` (matched by id) across all lists.
    ///
    /// Returns the number of lists that changed.
    pub fn replace_everywhere(&self, item: &T) -> usize {
        self.update_matching(|_| true, item.id(), |existing| *existing = item.clone())
    }

    pub fn update_everywhere<F>(&self, id: &str, f: F) -> usize
    where
        F: FnMut(&mut T),
    {
        self.update_matching(|_| true, id, f)
    }

    /// Apply `f` to every item with `id` in lists whose key passes `key_filter`.
    ///
    /// Returns the number of lists that changed. Recency order is untouched.
    pub fn update_matching<P, F>(&self, key_filter: P, id: &str, mut f: F) -> usize
    where
        P: Fn(&K) -> bool,
        F: FnMut(&mut T),
    {
        let mut inner = rw_write(&self.inner, self.label.name, "update_matching");
        let mut touched = 0;
        for (key, list) in inner.entries.iter_mut() {
            if !key_filter(key) {
                continue;
            }
            let mut changed = false;
            for item in list.iter_mut().filter(|item| item.id() == id) {
                f(item);
                changed = true;
            }
            if changed {
                touched += 1;
            }
        }
        if touched > 0 {
            inner.touch();
        }
        touched
    }

    /// Remove the item with `id` from every list. Returns the lists touched.
    pub fn remove_item_everywhere(&self, id: &str) -> usize {
        self.remove_everywhere_where(|item| item.id() == id)
    }

    /// Remove every item matching `pred` from every list. Returns the lists
    /// touched.
    pub fn remove_everywhere_where<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut inner = rw_write(&self.inner, self.label.name, "remove_everywhere_where");
        let mut touched = 0;
        for (_, list) in inner.entries.iter_mut() {
            let before = list.len();
            list.retain(|item| !pred(item));
            if list.len() != before {
                touched += 1;
            }
        }
        if touched > 0 {
            inner.touch();
        }
        touched
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<Vec<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = rw_write(&self.inner, self.label.name, "remove");
        let removed = inner.entries.pop(key);
        if removed.is_some() {
            inner.touch();
        }
        removed
    }

    /// Drop every list whose key matches `pred`. Returns the lists dropped.
    pub fn remove_keys_where<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        self.remove_lists_where(|key, _| pred(key)).len()
    }

    /// Drop every list matching `pred`, handing the removed lists back.
    pub fn remove_lists_where<F>(&self, mut pred: F) -> Vec<(K, Vec<T>)>
    where
        F: FnMut(&K, &[T]) -> bool,
    {
        let mut inner = rw_write(&self.inner, self.label.name, "remove_lists_where");
        let doomed: Vec<K> = inner
            .entries
            .iter()
            .filter(|(key, list)| pred(*key, list.as_slice()))
            .map(|(key, _)| key.clone())
            .collect();
        let removed: Vec<_> = doomed
            .into_iter()
            .filter_map(|key| inner.entries.pop(&key).map(|list| (key, list)))
            .collect();
        if !removed.is_empty() {
            inner.touch();
        }
        removed
    }

    pub fn clear(&self) {
        rw_write(&self.inner, self.label.name, "clear").reset();
    }

    /// Number of cached lists.
    pub fn len(&self) -> usize {
        rw_read(&self.inner, self.label.name, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of items across every cached list.
    pub fn item_count(&self) -> usize {
        rw_read(&self.inner, self.label.name, "item_count")
            .entries
            .iter()
            .map(|(_, list)| list.len())
            .sum()
    }

    pub fn last_write(&self) -> Option<OffsetDateTime> {
        rw_read(&self.inner, self.label.name, "last_write").last_write
    }

    fn mutate_or_insert<F>(&self, op: &'static str, key: K, f: F)
    where
        F: FnOnce(&mut Vec<T>),
    {
        let mut inner = rw_write(&self.inner, self.label.name, op);
        if let Some(list) = inner.entries.get_mut(&key) {
            f(list);
            inner.touch();
            return;
        }

        let mut list = Vec::new();
        f(&mut list);
        let evicted = inner.insert(key, list);
        drop(inner);
        if evicted {
            self.label.record_eviction();
        }
    }
}

/// Latest of several optional write clocks.
pub(crate) fn latest<I>(clocks: I) -> Option<OffsetDateTime>
where
    I: IntoIterator<Item = Option<OffsetDateTime>>,
{
    clocks.into_iter().flatten().max()
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        label: &'static str,
    }

    impl Identified for Item {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn item(id: &str, label: &'static str) -> Item {
        Item {
            id: id.to_string(),
            label,
        }
    }

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero capacity")
    }

    fn list_store(cap: usize) -> ListStore<String, Item> {
        ListStore::new(CacheDomain::Post, "test_lists", capacity(cap))
    }

    #[test]
    fn keyed_store_roundtrip() {
        let store: KeyedStore<String, u32> =
            KeyedStore::new(CacheDomain::Analytics, "test_values", capacity(4));

        assert!(store.get("a").is_none());
        assert!(store.last_write().is_none());

        store.put("a".to_string(), 1);
        assert_eq!(store.get("a"), Some(1));
        assert!(store.last_write().is_some());

        assert!(store.update("a", |value| *value += 1));
        assert_eq!(store.get("a"), Some(2));
        assert!(!store.update("missing", |value| *value += 1));

        assert_eq!(store.remove("a"), Some(2));
        assert!(store.get("a").is_none());
    }

    #[test]
    fn keyed_store_upsert_seeds_missing_values() {
        let store: KeyedStore<String, u32> =
            KeyedStore::new(CacheDomain::Analytics, "test_counts", capacity(4));

        assert_eq!(store.upsert("views".to_string(), || 0, |v| *v += 1), 1);
        assert_eq!(store.upsert("views".to_string(), || 0, |v| *v += 1), 2);
    }

    #[test]
    fn keyed_store_remove_where_counts_matches() {
        let store: KeyedStore<String, bool> =
            KeyedStore::new(CacheDomain::Interaction, "test_flags", capacity(8));
        store.put("u1:p1".to_string(), true);
        store.put("u2:p1".to_string(), false);
        store.put("u1:p2".to_string(), true);

        assert_eq!(store.remove_where(|key, _| key.ends_with(":p1")), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keyed_store_evicts_least_recently_used() {
        let store: KeyedStore<String, u32> =
            KeyedStore::new(CacheDomain::Cookbook, "test_lru", capacity(2));
        store.put("a".to_string(), 1);
        store.put("b".to_string(), 2);

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(store.get("a"), Some(1));
        store.put("c".to_string(), 3);

        assert_eq!(store.get("a"), Some(1));
        assert!(store.get("b").is_none());
        assert_eq!(store.get("c"), Some(3));
    }

    #[test]
    fn clear_resets_clock_and_is_idempotent() {
        let store = list_store(4);
        store.prepend("k".to_string(), item("1", "one"));
        assert!(store.last_write().is_some());

        store.clear();
        store.clear();
        assert!(store.is_empty());
        assert!(store.last_write().is_none());
    }

    #[test]
    fn list_miss_is_empty() {
        let store = list_store(4);
        assert!(store.get("nobody").is_empty());
        assert!(store.get_limited("nobody", 3).is_empty());
    }

    #[test]
    fn prepend_deduplicates_and_orders_most_recent_first() {
        let store = list_store(4);
        let key = "k".to_string();
        store.prepend(key.clone(), item("1", "first"));
        store.prepend(key.clone(), item("2", "second"));
        store.prepend(key.clone(), item("1", "again"));

        let list = store.get(&key);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], item("1", "again"));
        assert_eq!(list[1].id, "2");
    }

    #[test]
    fn append_and_extend_unique() {
        let store = list_store(4);
        let key = "k".to_string();
        store.append(key.clone(), item("1", "one"));
        let added = store.extend_unique(
            key.clone(),
            vec![item("1", "dup"), item("2", "two"), item("3", "three")],
        );

        assert_eq!(added, 2);
        let ids: Vec<_> = store.get(&key).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn get_limited_truncates() {
        let store = list_store(4);
        let key = "k".to_string();
        store.put(
            key.clone(),
            vec![item("1", "a"), item("2", "b"), item("3", "c")],
        );
        assert_eq!(store.get_limited(&key, 2).len(), 2);
        assert_eq!(store.get_limited(&key, 10).len(), 3);
        assert!(store.get_limited(&key, 0).is_empty());
    }

    #[test]
    fn remove_item_on_missing_key_does_not_create_list() {
        let store = list_store(4);
        assert!(!store.remove_item("ghost", "1"));
        assert!(store.is_empty());
    }

    #[test]
    fn everywhere_operations_touch_every_list() {
        let store = list_store(4);
        store.put("a".to_string(), vec![item("1", "old"), item("2", "keep")]);
        store.put("b".to_string(), vec![item("1", "old")]);
        store.put("c".to_string(), vec![item("3", "other")]);

        assert_eq!(store.replace_everywhere(&item("1", "new")), 2);
        assert_eq!(store.get("a")[0].label, "new");
        assert_eq!(store.get("b")[0].label, "new");

        let touched = store.update_matching(|key| key == "a", "1", |i| i.label = "only-a");
        assert_eq!(touched, 1);
        assert_eq!(store.get("b")[0].label, "new");

        assert_eq!(store.remove_item_everywhere("1"), 2);
        assert_eq!(store.item_count(), 2);
        assert_eq!(store.remove_keys_where(|key| key != "a"), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_prepends_do_not_lose_updates() {
        let store = Arc::new(list_store(4));
        let handles: Vec<_> = (0..16)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for m in 0..25 {
                        let id = format!("{n}-{m}");
                        store.prepend("shared".to_string(), Item { id, label: "x" });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        assert_eq!(store.get("shared").len(), 16 * 25);
    }

    #[test]
    fn list_store_recovers_from_poisoned_lock() {
        let store = list_store(4);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.inner.write().expect("lists lock should be acquired");
            panic!("poison lists lock");
        }));

        store.prepend("k".to_string(), item("1", "one"));
        assert_eq!(store.get("k").len(), 1);
    }

    #[test]
    fn latest_picks_max_clock() {
        let early = OffsetDateTime::UNIX_EPOCH;
        let late = OffsetDateTime::now_utc();
        assert_eq!(latest([None, Some(early), Some(late)]), Some(late));
        assert_eq!(latest([None, None]), None);
    }
}
