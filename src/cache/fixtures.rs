//! Entity builders shared by the cache unit tests.

use time::OffsetDateTime;
use time::macros::datetime;

use crate::domain::entities::{
    Comment, Cookbook, CookbookListItem, FeedItem, Post, PostListItem, Recipe, RecipeListItem,
    SearchHit, content_preview,
};
use crate::domain::types::{Difficulty, SearchScope};

pub(crate) const CREATED: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

pub(crate) fn cookbook(id: &str, owner: &str) -> Cookbook {
    Cookbook {
        id: id.to_string(),
        owner_id: owner.to_string(),
        title: format!("Cookbook {id}"),
        description: String::new(),
        is_public: true,
        is_collaborative: false,
        recipe_count: 0,
        follower_count: 0,
        like_count: 0,
        view_count: 0,
        tags: Vec::new(),
        cover_image_url: None,
        created_at: CREATED,
        updated_at: CREATED,
    }
}

pub(crate) fn cookbook_item(id: &str, owner: &str) -> CookbookListItem {
    CookbookListItem::from(&cookbook(id, owner))
}

pub(crate) fn recipe(id: &str, owner: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        owner_id: owner.to_string(),
        title: format!("Recipe {id}"),
        description: String::new(),
        ingredients: Vec::new(),
        instructions: Vec::new(),
        prep_minutes: 10,
        cook_minutes: 20,
        servings: 2,
        difficulty: Difficulty::Easy,
        is_public: true,
        like_count: 0,
        save_count: 0,
        tags: Vec::new(),
        image_urls: Vec::new(),
        created_at: CREATED,
        updated_at: CREATED,
    }
}

pub(crate) fn recipe_item(id: &str, owner: &str) -> RecipeListItem {
    RecipeListItem::from(&recipe(id, owner))
}

pub(crate) fn post(id: &str, author: &str) -> Post {
    Post {
        id: id.to_string(),
        author_id: author.to_string(),
        content: format!("Post {id}"),
        image_urls: Vec::new(),
        recipe_ids: Vec::new(),
        cookbook_ids: Vec::new(),
        like_count: 0,
        comment_count: 0,
        share_count: 0,
        created_at: CREATED,
        updated_at: CREATED,
    }
}

pub(crate) fn post_item(id: &str, author: &str) -> PostListItem {
    PostListItem {
        id: id.to_string(),
        author_id: author.to_string(),
        author_name: author.to_uppercase(),
        content_preview: content_preview(&format!("Post {id}")),
        image_url: None,
        like_count: 0,
        comment_count: 0,
        share_count: 0,
        created_at: CREATED,
    }
}

pub(crate) fn feed_item(id: &str, author: &str) -> FeedItem {
    FeedItem::new(post_item(id, author))
}

pub(crate) fn comment(id: &str, post_id: &str, parent: Option<&str>) -> Comment {
    Comment {
        id: id.to_string(),
        post_id: post_id.to_string(),
        author_id: "commenter".to_string(),
        parent_id: parent.map(str::to_string),
        content: format!("Comment {id}"),
        like_count: 0,
        created_at: CREATED,
    }
}

pub(crate) fn hit(id: &str, kind: SearchScope) -> SearchHit {
    SearchHit {
        id: id.to_string(),
        kind,
        title: format!("Hit {id}"),
        subtitle: None,
        image_url: None,
    }
}
