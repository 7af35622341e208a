//! Domain entities mirrored from the remote document store.
//!
//! The cache stores these records as-is. Counters are advisory copies of the
//! remote values and are only adjusted locally by explicit deltas.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{Difficulty, InteractionKind, PostCounter, SearchScope};

/// Length, in characters, of the content preview carried by list items.
pub const CONTENT_PREVIEW_CHARS: usize = 140;

/// Anything stored in a cached list that can be matched by identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for String {
    fn id(&self) -> &str {
        self.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookbook {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub is_collaborative: bool,
    pub recipe_count: u32,
    pub follower_count: u32,
    pub like_count: u32,
    pub view_count: u32,
    pub tags: Vec<String>,
    pub cover_image_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookbookListItem {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub cover_image_url: Option<String>,
    pub recipe_count: u32,
    pub is_public: bool,
    pub updated_at: OffsetDateTime,
}

impl From<&Cookbook> for CookbookListItem {
    fn from(cookbook: &Cookbook) -> Self {
        Self {
            id: cookbook.id.clone(),
            owner_id: cookbook.owner_id.clone(),
            title: cookbook.title.clone(),
            cover_image_url: cookbook.cover_image_url.clone(),
            recipe_count: cookbook.recipe_count,
            is_public: cookbook.is_public,
            updated_at: cookbook.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub prep_minutes: u32,
    pub cook_minutes: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub is_public: bool,
    pub like_count: u32,
    pub save_count: u32,
    pub tags: Vec<String>,
    pub image_urls: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeListItem {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub prep_minutes: u32,
    pub cook_minutes: u32,
    pub difficulty: Difficulty,
    pub like_count: u32,
}

impl From<&Recipe> for RecipeListItem {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.clone(),
            owner_id: recipe.owner_id.clone(),
            title: recipe.title.clone(),
            image_url: recipe.image_urls.first().cloned(),
            prep_minutes: recipe.prep_minutes,
            cook_minutes: recipe.cook_minutes,
            difficulty: recipe.difficulty,
            like_count: recipe.like_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub recipe_ids: Vec<String>,
    pub cookbook_ids: Vec<String>,
    pub like_count: u32,
    pub comment_count: u32,
    pub share_count: u32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Post {
    pub fn counter_mut(&mut self, counter: PostCounter) -> &mut u32 {
        match counter {
            PostCounter::Likes => &mut self.like_count,
            PostCounter::Comments => &mut self.comment_count,
            PostCounter::Shares => &mut self.share_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostListItem {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content_preview: String,
    pub image_url: Option<String>,
    pub like_count: u32,
    pub comment_count: u32,
    pub share_count: u32,
    pub created_at: OffsetDateTime,
}

impl PostListItem {
    pub fn from_post(post: &Post, author_name: impl Into<String>) -> Self {
        Self {
            id: post.id.clone(),
            author_id: post.author_id.clone(),
            author_name: author_name.into(),
            content_preview: content_preview(&post.content),
            image_url: post.image_urls.first().cloned(),
            like_count: post.like_count,
            comment_count: post.comment_count,
            share_count: post.share_count,
            created_at: post.created_at,
        }
    }

    /// Copy the mutable parts of a full post record onto this projection.
    pub fn refresh_from(&mut self, post: &Post) {
        self.content_preview = content_preview(&post.content);
        self.image_url = post.image_urls.first().cloned();
        self.like_count = post.like_count;
        self.comment_count = post.comment_count;
        self.share_count = post.share_count;
    }

    pub fn counter_mut(&mut self, counter: PostCounter) -> &mut u32 {
        match counter {
            PostCounter::Likes => &mut self.like_count,
            PostCounter::Comments => &mut self.comment_count,
            PostCounter::Shares => &mut self.share_count,
        }
    }
}

/// A post as rendered in a feed, with the viewer's interaction flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub post: PostListItem,
    pub is_liked: bool,
    pub is_shared: bool,
    pub is_saved: bool,
}

impl FeedItem {
    pub fn new(post: PostListItem) -> Self {
        Self {
            post,
            is_liked: false,
            is_shared: false,
            is_saved: false,
        }
    }

    pub fn set_flag(&mut self, kind: InteractionKind, value: bool) {
        match kind {
            InteractionKind::Like => self.is_liked = value,
            InteractionKind::Share => self.is_shared = value,
            InteractionKind::Save => self.is_saved = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    /// Comment this one replies to; `None` for top-level comments.
    pub parent_id: Option<String>,
    pub content: String,
    pub like_count: u32,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAnalytics {
    pub post_id: String,
    pub view_count: u64,
    pub impression_count: u64,
    pub unique_viewers: u64,
    pub updated_at: OffsetDateTime,
}

impl PostAnalytics {
    pub fn empty(post_id: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            view_count: 0,
            impression_count: 0,
            unique_viewers: 0,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Recipes and cookbooks a post links to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostReferences {
    pub post_id: String,
    pub recipe_ids: Vec<String>,
    pub cookbook_ids: Vec<String>,
}

impl From<&Post> for PostReferences {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.id.clone(),
            recipe_ids: post.recipe_ids.clone(),
            cookbook_ids: post.cookbook_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub kind: SearchScope,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
}

/// Per-(user, post) interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InteractionFlags {
    pub liked: bool,
    pub shared: bool,
    pub saved: bool,
}

impl InteractionFlags {
    pub fn get(&self, kind: InteractionKind) -> bool {
        match kind {
            InteractionKind::Like => self.liked,
            InteractionKind::Share => self.shared,
            InteractionKind::Save => self.saved,
        }
    }

    /// Set one flag, returning whether it changed.
    pub fn set(&mut self, kind: InteractionKind, value: bool) -> bool {
        let slot = match kind {
            InteractionKind::Like => &mut self.liked,
            InteractionKind::Share => &mut self.shared,
            InteractionKind::Save => &mut self.saved,
        };
        let changed = *slot != value;
        *slot = value;
        changed
    }
}

impl Identified for Cookbook {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for CookbookListItem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Recipe {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for RecipeListItem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for PostListItem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for FeedItem {
    fn id(&self) -> &str {
        &self.post.id
    }
}

impl Identified for Comment {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for SearchHit {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Truncate post content to the preview length on a character boundary.
pub fn content_preview(content: &str) -> String {
    content.chars().take(CONTENT_PREVIEW_CHARS).collect()
}
