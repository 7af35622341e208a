//! Shared domain enumerations mirrored from the remote document store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Per-viewer interaction a user can have with a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Share,
    Save,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [
        InteractionKind::Like,
        InteractionKind::Share,
        InteractionKind::Save,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Share => "share",
            InteractionKind::Save => "save",
        }
    }

    /// The public post counter moved by this interaction, if any.
    ///
    /// Saves are private bookmarks and never touch a visible count.
    pub fn counter(self) -> Option<PostCounter> {
        match self {
            InteractionKind::Like => Some(PostCounter::Likes),
            InteractionKind::Share => Some(PostCounter::Shares),
            InteractionKind::Save => None,
        }
    }
}

/// Advisory counters carried on posts and their list projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostCounter {
    Likes,
    Comments,
    Shares,
}

/// Entity family a search result list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    Recipes,
    Cookbooks,
    Posts,
    Users,
}

impl SearchScope {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchScope::Recipes => "recipes",
            SearchScope::Cookbooks => "cookbooks",
            SearchScope::Posts => "posts",
            SearchScope::Users => "users",
        }
    }
}
