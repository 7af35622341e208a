//! Concurrent soak workload for the local cache.
//!
//! Writer tasks hammer shared lists and interaction fan-out while the
//! invalidation consumer runs on its interval. Afterwards every list and
//! counter is checked against what the tasks actually wrote.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::error::AppError;
use crate::cache::{CacheSize, CacheTrigger, FeedKey, LocalCache};
use crate::domain::entities::{CookbookListItem, FeedItem, Post, PostListItem};

const SHARED_POSTS: usize = 8;
const REFRESH_EVERY: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct SoakPlan {
    pub tasks: usize,
    pub ops: usize,
    pub users: usize,
}

impl SoakPlan {
    fn validate(&self) -> Result<(), AppError> {
        if self.tasks == 0 || self.ops == 0 || self.users == 0 {
            return Err(AppError::validation(
                "soak requires --tasks, --ops and --users to be at least 1",
            ));
        }
        Ok(())
    }

    fn shared_posts(&self) -> usize {
        self.ops.min(SHARED_POSTS)
    }

    fn user_for(&self, task: usize, op: usize) -> String {
        format!("user-{}", (task + op) % self.users)
    }
}

#[derive(Debug, Clone)]
pub struct SoakReport {
    pub cookbooks_written: usize,
    pub likes_expected: u32,
    pub size: CacheSize,
}

/// Run the workload against `cache`, consuming invalidation events on
/// `consume_interval`. Fails with a verification error on any lost update.
pub async fn run_soak(
    cache: Arc<LocalCache>,
    trigger: Arc<CacheTrigger>,
    plan: SoakPlan,
    consume_interval: Duration,
) -> Result<SoakReport, AppError> {
    plan.validate()?;

    let posts = seed_shared_posts(&cache, plan.shared_posts());
    info!(
        tasks = plan.tasks,
        ops = plan.ops,
        users = plan.users,
        shared_posts = posts.len(),
        "Starting soak workload"
    );

    let consumer_handle = {
        let trigger = trigger.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(consume_interval);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                trigger.consumer().consume();
            }
        })
    };

    let handles = (0..plan.tasks).map(|task| {
        let cache = cache.clone();
        let trigger = trigger.clone();
        let posts = posts.clone();
        tokio::spawn(async move { run_task(task, plan, &cache, &trigger, &posts).await })
    });

    let mut written: BTreeMap<String, usize> = BTreeMap::new();
    for joined in join_all(handles).await {
        let task_writes =
            joined.map_err(|err| AppError::unexpected(format!("soak task failed: {err}")))?;
        for (user_id, count) in task_writes {
            *written.entry(user_id).or_default() += count;
        }
    }

    consumer_handle.abort();
    let _ = consumer_handle.await;
    while trigger.consumer().consume() {}

    verify(&cache, &written, &posts, plan)?;

    let report = SoakReport {
        cookbooks_written: written.values().sum(),
        likes_expected: plan.tasks as u32,
        size: cache.cache_size(),
    };
    info!(
        cookbooks_written = report.cookbooks_written,
        likes_expected = report.likes_expected,
        size = ?report.size,
        total = report.size.total(),
        "Soak workload verified"
    );
    Ok(report)
}

async fn run_task(
    task: usize,
    plan: SoakPlan,
    cache: &LocalCache,
    trigger: &CacheTrigger,
    posts: &[String],
) -> BTreeMap<String, usize> {
    let liker = format!("liker-{task}");
    let mut written = BTreeMap::new();

    for op in 0..plan.ops {
        let user_id = plan.user_for(task, op);
        cache
            .cookbooks()
            .add_to_user_cookbooks(&user_id, cookbook_item(&user_id, task, op));
        *written.entry(user_id).or_insert(0) += 1;

        let post_id = &posts[op % posts.len()];
        cache.set_post_like_status(&liker, post_id, true);

        if op % REFRESH_EVERY == REFRESH_EVERY - 1 {
            trigger.feed_refreshed(FeedKey::Trending);
        }

        tokio::task::yield_now().await;
    }

    debug!(task, ops = plan.ops, "Soak task finished");
    written
}

fn seed_shared_posts(cache: &LocalCache, count: usize) -> Vec<String> {
    let now = OffsetDateTime::now_utc();
    (0..count)
        .map(|index| {
            let post = Post {
                id: format!("soak-post-{index}"),
                author_id: "soak".to_string(),
                content: format!("Soak post {index}"),
                image_urls: Vec::new(),
                recipe_ids: Vec::new(),
                cookbook_ids: Vec::new(),
                like_count: 0,
                comment_count: 0,
                share_count: 0,
                created_at: now,
                updated_at: now,
            };
            let item = FeedItem::new(PostListItem::from_post(&post, "Soak"));
            cache.feeds().prepend_to_feed(FeedKey::Trending, item);
            let id = post.id.clone();
            cache.posts().save_post(post);
            id
        })
        .collect()
}

fn cookbook_item(user_id: &str, task: usize, op: usize) -> CookbookListItem {
    CookbookListItem {
        id: format!("cb-{task}-{op}"),
        owner_id: user_id.to_string(),
        title: format!("Cookbook {task}/{op}"),
        cover_image_url: None,
        recipe_count: 0,
        is_public: true,
        updated_at: OffsetDateTime::now_utc(),
    }
}

fn verify(
    cache: &LocalCache,
    written: &BTreeMap<String, usize>,
    posts: &[String],
    plan: SoakPlan,
) -> Result<(), AppError> {
    let mut failures = Vec::new();

    for (user_id, expected) in written {
        let cached = cache.cookbooks().get_user_cookbooks(user_id).len();
        if cached != *expected {
            warn!(user_id, expected, cached, "Lost cookbook list update");
            failures.push(format!("{user_id}: {cached}/{expected} cookbooks"));
        }
    }

    for post_id in posts {
        let likes = cache
            .posts()
            .get_post(post_id)
            .map(|post| post.like_count)
            .unwrap_or_default();
        if likes as usize != plan.tasks {
            warn!(post_id, expected = plan.tasks, likes, "Lost like update");
            failures.push(format!("{post_id}: {likes}/{} likes", plan.tasks));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(AppError::verification(failures.join(", ")))
    }
}
