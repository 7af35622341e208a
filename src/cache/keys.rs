//! Cache key definitions.
//!
//! Relational lookups use structured keys rather than delimited strings, so
//! identifiers containing any character can never collide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::types::SearchScope;

/// Key for per-(user, entity) tables such as follow, like and favorite status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserEntityKey {
    pub user_id: String,
    pub entity_id: String,
}

impl UserEntityKey {
    pub fn new(user_id: &str, entity_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            entity_id: entity_id.to_string(),
        }
    }
}

/// Identifies one cached feed list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum FeedKey {
    /// A user's personalised home feed.
    Home(String),
    /// Posts from accounts the user follows.
    Following(String),
    Trending,
    Popular,
    Discover,
}

impl FeedKey {
    /// The user owning this feed, or `None` for feeds shared by every viewer.
    pub fn owner(&self) -> Option<&str> {
        match self {
            FeedKey::Home(user) | FeedKey::Following(user) => Some(user),
            FeedKey::Trending | FeedKey::Popular | FeedKey::Discover => None,
        }
    }

    /// Whether the per-viewer flags on this feed belong to `viewer`.
    pub fn is_visible_to(&self, viewer: &str) -> bool {
        self.owner().is_none_or(|owner| owner == viewer)
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKey::Home(user) => write!(f, "home:{user}"),
            FeedKey::Following(user) => write!(f, "following:{user}"),
            FeedKey::Trending => f.write_str("trending"),
            FeedKey::Popular => f.write_str("popular"),
            FeedKey::Discover => f.write_str("discover"),
        }
    }
}

/// Key for a cached search result list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub scope: SearchScope,
    pub query: String,
}

impl SearchKey {
    /// Build a key from a raw query, normalizing case and whitespace.
    pub fn new(scope: SearchScope, raw_query: &str) -> Self {
        Self {
            scope,
            query: normalize_query(raw_query),
        }
    }
}

/// Trim, lowercase and collapse inner whitespace runs to a single space.
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The per-domain façades making up the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheDomain {
    Cookbook,
    Recipe,
    Post,
    Comment,
    Feed,
    Interaction,
    Analytics,
    Reference,
    Search,
}

impl CacheDomain {
    pub const ALL: [CacheDomain; 9] = [
        CacheDomain::Cookbook,
        CacheDomain::Recipe,
        CacheDomain::Post,
        CacheDomain::Comment,
        CacheDomain::Feed,
        CacheDomain::Interaction,
        CacheDomain::Analytics,
        CacheDomain::Reference,
        CacheDomain::Search,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheDomain::Cookbook => "cookbook",
            CacheDomain::Recipe => "recipe",
            CacheDomain::Post => "post",
            CacheDomain::Comment => "comment",
            CacheDomain::Feed => "feed",
            CacheDomain::Interaction => "interaction",
            CacheDomain::Analytics => "analytics",
            CacheDomain::Reference => "reference",
            CacheDomain::Search => "search",
        }
    }
}

impl fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
