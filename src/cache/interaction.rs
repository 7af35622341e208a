//! Per-(user, post) like/share/save table.

use time::OffsetDateTime;

use crate::domain::entities::InteractionFlags;
use crate::domain::types::InteractionKind;

use super::config::CacheConfig;
use super::keys::{CacheDomain, UserEntityKey};
use super::store::KeyedStore;

pub struct InteractionCache {
    flags: KeyedStore<UserEntityKey, InteractionFlags>,
}

impl InteractionCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            flags: KeyedStore::new(
                CacheDomain::Interaction,
                "interaction.flags",
                config.interaction_capacity(),
            ),
        }
    }

    pub fn get_flags(&self, user_id: &str, post_id: &str) -> InteractionFlags {
        self.flags
            .get(&UserEntityKey::new(user_id, post_id))
            .unwrap_or_default()
    }

    pub fn get_status(&self, user_id: &str, post_id: &str, kind: InteractionKind) -> bool {
        self.get_flags(user_id, post_id).get(kind)
    }

    /// Set one flag, returning whether the stored value changed.
    ///
    /// The compare and the write happen under one lock, so two callers racing
    /// to flip the same flag see exactly one change between them.
    pub fn set_status(
        &self,
        user_id: &str,
        post_id: &str,
        kind: InteractionKind,
        value: bool,
    ) -> bool {
        let mut changed = false;
        self.flags.upsert(
            UserEntityKey::new(user_id, post_id),
            InteractionFlags::default,
            |flags| changed = flags.set(kind, value),
        );
        changed
    }

    /// Drop every user's row for `post_id`.
    pub fn remove_post(&self, post_id: &str) -> usize {
        self.flags.remove_where(|key, _| key.entity_id == post_id)
    }

    /// Drop every row for `user_id`, returning `(post id, flags)` for each.
    pub fn clear_user(&self, user_id: &str) -> Vec<(String, InteractionFlags)> {
        self.flags
            .take_where(|key, _| key.user_id == user_id)
            .into_iter()
            .map(|(key, flags)| (key.entity_id, flags))
            .collect()
    }

    pub fn clear(&self) {
        self.flags.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.flags.len()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        self.flags.last_write()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn cache() -> InteractionCache {
        InteractionCache::new(&CacheConfig::default())
    }

    #[test]
    fn miss_is_all_false() {
        let cache = cache();
        assert_eq!(cache.get_flags("u1", "p1"), InteractionFlags::default());
        assert!(!cache.get_status("u1", "p1", InteractionKind::Like));
    }

    #[test]
    fn set_status_reports_changes() {
        let cache = cache();
        assert!(cache.set_status("u1", "p1", InteractionKind::Like, true));
        assert!(!cache.set_status("u1", "p1", InteractionKind::Like, true));
        assert!(cache.set_status("u1", "p1", InteractionKind::Save, true));

        let flags = cache.get_flags("u1", "p1");
        assert!(flags.liked && flags.saved && !flags.shared);

        // Unsetting an absent row is not a change.
        assert!(!cache.set_status("u2", "p1", InteractionKind::Share, false));
    }

    #[test]
    fn rows_are_isolated_per_user() {
        let cache = cache();
        cache.set_status("u1", "p1", InteractionKind::Like, true);
        assert!(!cache.get_status("u2", "p1", InteractionKind::Like));
    }

    #[test]
    fn remove_post_and_clear_user() {
        let cache = cache();
        cache.set_status("u1", "p1", InteractionKind::Like, true);
        cache.set_status("u2", "p1", InteractionKind::Like, true);
        cache.set_status("u1", "p2", InteractionKind::Save, true);

        assert_eq!(cache.remove_post("p1"), 2);
        let cleared = cache.clear_user("u1");
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].0, "p2");
        assert!(cleared[0].1.saved);
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn racing_toggles_report_one_change() {
        let cache = Arc::new(cache());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.set_status("u1", "p1", InteractionKind::Like, true))
            })
            .collect();

        let changes = handles
            .into_iter()
            .map(|handle| handle.join().expect("toggle thread"))
            .filter(|changed| *changed)
            .count();
        assert_eq!(changes, 1);
    }
}
