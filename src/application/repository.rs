//! Read-through and write-through access to the remote document store.
//!
//! The cache stays advisory: reads fall back to the remote on a miss and fill
//! the cache with what came back; writes go to the remote first and only touch
//! the cache once the remote confirmed them.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheTrigger, FeedKey, LocalCache};
use crate::domain::entities::{Comment, CookbookListItem, FeedItem, Post};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("{entity} `{id}` not found in remote store")]
    NotFound { entity: &'static str, id: String },
    #[error("remote store rejected the request: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("remote `{op}` failed: {source}")]
    Remote {
        op: &'static str,
        #[source]
        source: RemoteError,
    },
}

impl RepositoryError {
    fn remote(op: &'static str) -> impl FnOnce(RemoteError) -> Self {
        move |source| Self::Remote { op, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Remote {
                source: RemoteError::NotFound { .. },
                ..
            }
        )
    }
}

/// The remote document store the cache mirrors.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_user_cookbooks(
        &self,
        user_id: &str,
    ) -> Result<Vec<CookbookListItem>, RemoteError>;

    async fn fetch_post(&self, post_id: &str) -> Result<Option<Post>, RemoteError>;

    async fn fetch_post_comments(&self, post_id: &str) -> Result<Vec<Comment>, RemoteError>;

    async fn fetch_feed(&self, key: &FeedKey, limit: usize) -> Result<Vec<FeedItem>, RemoteError>;

    async fn set_post_like(
        &self,
        user_id: &str,
        post_id: &str,
        liked: bool,
    ) -> Result<(), RemoteError>;

    async fn delete_post(&self, post_id: &str) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Serve from the cache when it has data.
    #[default]
    CacheFirst,
    /// Always ask the remote and overwrite the cached copy.
    Refresh,
}

pub struct CachedRepository<R> {
    remote: R,
    cache: Arc<LocalCache>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl<R: RemoteSource> CachedRepository<R> {
    pub fn new(remote: R, cache: Arc<LocalCache>) -> Self {
        Self {
            remote,
            cache,
            cache_trigger: None,
        }
    }

    /// Route deletions and sign-outs through the invalidation queue.
    pub fn with_cache_trigger(mut self, trigger: Arc<CacheTrigger>) -> Self {
        self.cache_trigger = Some(trigger);
        self
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    // ========================================================================
    // Reads
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn user_cookbooks(
        &self,
        user_id: &str,
        policy: ReadPolicy,
    ) -> Result<Vec<CookbookListItem>, RepositoryError> {
        if policy == ReadPolicy::CacheFirst {
            let cached = self.cache.cookbooks().get_user_cookbooks(user_id);
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let items = self
            .remote
            .fetch_user_cookbooks(user_id)
            .await
            .map_err(RepositoryError::remote("fetch_user_cookbooks"))?;
        debug!(user_id, count = items.len(), "Filled user cookbooks from remote");
        self.cache
            .cookbooks()
            .save_user_cookbooks(user_id, items.clone());
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn post(
        &self,
        post_id: &str,
        policy: ReadPolicy,
    ) -> Result<Option<Post>, RepositoryError> {
        if policy == ReadPolicy::CacheFirst
            && let Some(post) = self.cache.posts().get_post(post_id)
        {
            return Ok(Some(post));
        }

        let fetched = self
            .remote
            .fetch_post(post_id)
            .await
            .map_err(RepositoryError::remote("fetch_post"))?;

        match fetched {
            Some(post) => {
                self.cache.update_post(post.clone());
                Ok(Some(post))
            }
            None => {
                // Gone remotely; make sure no stale copy lingers.
                self.cache.delete_post(post_id);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn post_comments(
        &self,
        post_id: &str,
        policy: ReadPolicy,
    ) -> Result<Vec<Comment>, RepositoryError> {
        if policy == ReadPolicy::CacheFirst {
            let cached = self.cache.comments().get_post_comments(post_id);
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let comments = self
            .remote
            .fetch_post_comments(post_id)
            .await
            .map_err(RepositoryError::remote("fetch_post_comments"))?;
        self.cache
            .comments()
            .save_post_comments(post_id, comments.clone());
        Ok(comments)
    }

    #[instrument(skip(self))]
    pub async fn feed(
        &self,
        key: &FeedKey,
        limit: usize,
        policy: ReadPolicy,
    ) -> Result<Vec<FeedItem>, RepositoryError> {
        if policy == ReadPolicy::CacheFirst {
            let cached = self.cache.feeds().get_feed(key, limit);
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let items = self
            .remote
            .fetch_feed(key, limit)
            .await
            .map_err(RepositoryError::remote("fetch_feed"))?;
        debug!(feed = %key, count = items.len(), "Filled feed from remote");
        self.cache.feeds().save_feed(key.clone(), items.clone());
        Ok(items)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Like or unlike a post. Returns whether the cached status changed.
    #[instrument(skip(self))]
    pub async fn set_post_like(
        &self,
        user_id: &str,
        post_id: &str,
        liked: bool,
    ) -> Result<bool, RepositoryError> {
        self.remote
            .set_post_like(user_id, post_id, liked)
            .await
            .map_err(RepositoryError::remote("set_post_like"))?;

        Ok(self.cache.set_post_like_status(user_id, post_id, liked))
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, post_id: &str) -> Result<(), RepositoryError> {
        if let Err(err) = self.remote.delete_post(post_id).await {
            warn!(post_id, error = %err, "Remote post delete failed; cache left untouched");
            return Err(RepositoryError::remote("delete_post")(err));
        }

        match &self.cache_trigger {
            Some(trigger) => trigger.post_deleted(post_id),
            None => self.cache.delete_post(post_id),
        }
        Ok(())
    }

    /// Drop everything cached for a user.
    pub fn sign_out(&self, user_id: &str) {
        match &self.cache_trigger {
            Some(trigger) => trigger.signed_out(user_id),
            None => self.cache.clear_user(user_id),
        }
    }
}
