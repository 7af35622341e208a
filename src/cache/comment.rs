//! Comment cache: per-post threads, reply lists and comment like status.

use std::collections::HashSet;

use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::Comment;

use super::config::CacheConfig;
use super::keys::{CacheDomain, UserEntityKey};
use super::store::{KeyedStore, ListStore, latest};

const DOMAIN: CacheDomain = CacheDomain::Comment;

pub struct CommentCache {
    /// post id -> top-level comments, oldest first
    post_comments: ListStore<String, Comment>,
    /// parent comment id -> replies, oldest first
    replies: ListStore<String, Comment>,
    like_status: KeyedStore<UserEntityKey, bool>,
}

impl CommentCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.comment_capacity();
        Self {
            post_comments: ListStore::new(DOMAIN, "comment.threads", capacity),
            replies: ListStore::new(DOMAIN, "comment.replies", capacity),
            like_status: KeyedStore::new(
                DOMAIN,
                "comment.like_status",
                config.interaction_capacity(),
            ),
        }
    }

    pub fn get_post_comments(&self, post_id: &str) -> Vec<Comment> {
        self.post_comments.get(post_id)
    }

    pub fn save_post_comments(&self, post_id: &str, comments: Vec<Comment>) {
        self.post_comments.put(post_id.to_string(), comments);
    }

    /// Append a comment in chronological position.
    ///
    /// Replies go to their parent's reply list, top-level comments to the
    /// post thread.
    pub fn add_comment(&self, comment: Comment) {
        match comment.parent_id.clone() {
            Some(parent_id) => self.replies.append(parent_id, comment),
            None => self.post_comments.append(comment.post_id.clone(), comment),
        }
    }

    /// Remove a comment along with its replies and like rows.
    pub fn remove_comment(&self, post_id: &str, comment_id: &str) -> bool {
        let in_thread = self.post_comments.remove_item(post_id, comment_id);
        let as_reply = self.replies.remove_item_everywhere(comment_id) > 0;

        let mut doomed: HashSet<String> = HashSet::from([comment_id.to_string()]);
        if let Some(replies) = self.replies.remove(comment_id) {
            doomed.extend(replies.into_iter().map(|reply| reply.id));
        }
        self.like_status
            .remove_where(|key, _| doomed.contains(&key.entity_id));

        in_thread || as_reply
    }

    pub fn get_comment_replies(&self, comment_id: &str) -> Vec<Comment> {
        self.replies.get(comment_id)
    }

    pub fn save_comment_replies(&self, comment_id: &str, replies: Vec<Comment>) {
        self.replies.put(comment_id.to_string(), replies);
    }

    pub fn get_comment_like_status(&self, user_id: &str, comment_id: &str) -> bool {
        self.like_status
            .get(&UserEntityKey::new(user_id, comment_id))
            .unwrap_or(false)
    }

    pub fn set_comment_like_status(&self, user_id: &str, comment_id: &str, liked: bool) {
        self.like_status
            .put(UserEntityKey::new(user_id, comment_id), liked);
    }

    /// Drop the post's thread, every reply list under it and their like rows.
    pub fn remove_post_comments(&self, post_id: &str) {
        let mut doomed: HashSet<String> = HashSet::new();
        if let Some(thread) = self.post_comments.remove(post_id) {
            doomed.extend(thread.into_iter().map(|comment| comment.id));
        }

        let reply_lists = self.replies.remove_lists_where(|parent_id, replies| {
            doomed.contains(parent_id) || replies.iter().any(|reply| reply.post_id == post_id)
        });
        for (parent_id, replies) in reply_lists {
            doomed.insert(parent_id);
            doomed.extend(replies.into_iter().map(|reply| reply.id));
        }

        let likes = self
            .like_status
            .remove_where(|key, _| doomed.contains(&key.entity_id));
        debug!(
            post_id,
            comments = doomed.len(),
            likes,
            "Removed post comments from cache"
        );
    }

    pub fn clear_user(&self, user_id: &str) {
        self.like_status
            .remove_where(|key, _| key.user_id == user_id);
    }

    pub fn clear(&self) {
        self.post_comments.clear();
        self.replies.clear();
        self.like_status.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.post_comments.item_count() + self.replies.item_count() + self.like_status.len()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        latest([
            self.post_comments.last_write(),
            self.replies.last_write(),
            self.like_status.last_write(),
        ])
    }
}
