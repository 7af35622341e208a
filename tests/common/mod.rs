//! Entity builders shared by the integration tests.
#![allow(dead_code)]

use larder::domain::entities::{
    Comment, CookbookListItem, FeedItem, Post, PostListItem, RecipeListItem, SearchHit,
};
use larder::domain::types::{Difficulty, SearchScope};
use time::OffsetDateTime;
use time::macros::datetime;

pub const CREATED: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

pub fn cookbook_item(id: &str, owner: &str) -> CookbookListItem {
    CookbookListItem {
        id: id.to_string(),
        owner_id: owner.to_string(),
        title: format!("Cookbook {id}"),
        cover_image_url: None,
        recipe_count: 0,
        is_public: true,
        updated_at: CREATED,
    }
}

pub fn recipe_item(id: &str, owner: &str) -> RecipeListItem {
    RecipeListItem {
        id: id.to_string(),
        owner_id: owner.to_string(),
        title: format!("Recipe {id}"),
        image_url: None,
        prep_minutes: 10,
        cook_minutes: 20,
        difficulty: Difficulty::Easy,
        like_count: 0,
    }
}

pub fn post(id: &str, author: &str) -> Post {
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

pub fn post_item(id: &str, author: &str) -> PostListItem {
    PostListItem::from_post(&post(id, author), author.to_uppercase())
}

pub fn feed_item(id: &str, author: &str) -> FeedItem {
    FeedItem::new(post_item(id, author))
}

pub fn comment(id: &str, post_id: &str) -> Comment {
    Comment {
        id: id.to_string(),
        post_id: post_id.to_string(),
        author_id: "commenter".to_string(),
        parent_id: None,
        content: format!("Comment {id}"),
        like_count: 0,
        created_at: CREATED,
    }
}

pub fn hit(id: &str, kind: SearchScope) -> SearchHit {
    SearchHit {
        id: id.to_string(),
        kind,
        title: format!("Hit {id}"),
        subtitle: None,
        image_url: None,
    }
}
