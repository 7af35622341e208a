//! Cache event system.
//!
//! Defines invalidation events and a bounded in-memory queue for them.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::keys::{CacheDomain, FeedKey};
use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";
pub const METRIC_EVENT_QUEUE_LEN: &str = "larder_cache_event_queue_len";
pub const METRIC_EVENT_DROPPED: &str = "larder_cache_event_dropped_total";

/// Monotonic epoch for ordering events.
///
/// Each event gets a unique, monotonically increasing epoch number.
pub type Epoch = u64;

/// Cache event with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotency (UUIDv4).
    pub id: Uuid,
    /// Monotonic epoch for ordering within this process.
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Things that make cached state obsolete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    // Session
    /// A user signed out; their per-user state must go.
    SignedOut { user_id: String },

    // Refresh
    /// Pull-to-refresh on a whole domain.
    DomainRefreshed { domain: CacheDomain },
    /// Pull-to-refresh on one feed.
    FeedRefreshed { key: FeedKey },

    // Deletions confirmed by the remote store
    PostDeleted { post_id: String },
    CookbookDeleted { cookbook_id: String },
    RecipeDeleted { recipe_id: String },

    /// Drop everything.
    ResetRequested,
}

/// In-memory event queue for cache invalidation.
///
/// Events are published by repositories and session handling and drained by
/// the cache consumer. When a limit is set and the queue is full, the oldest
/// event is dropped to make room.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
    limit: Option<usize>,
}

impl EventQueue {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
            limit: None,
        }
    }

    /// Create a queue holding at most `limit` pending events (minimum one).
    pub fn new_with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new()
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish an event to the queue.
    pub fn publish(&self, kind: EventKind) {
        let epoch = self.next_epoch();
        let event = CacheEvent::new(kind, epoch);

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?event.kind,
            "Cache event enqueued"
        );

        let mut queue = mutex_lock(&self.queue, SOURCE, "publish");
        if let Some(limit) = self.limit {
            while queue.len() >= limit {
                let Some(dropped) = queue.pop_front() else {
                    break;
                };
                counter!(METRIC_EVENT_DROPPED).increment(1);
                warn!(
                    event_id = %dropped.id,
                    event_epoch = dropped.epoch,
                    limit,
                    "Cache event queue full; dropped oldest event"
                );
            }
        }
        queue.push_back(event);
        gauge!(METRIC_EVENT_QUEUE_LEN).set(queue.len() as f64);
    }

    /// Drain up to `limit` events from the queue in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let events: Vec<_> = queue.drain(..count).collect();
        gauge!(METRIC_EVENT_QUEUE_LEN).set(queue.len() as f64);
        events
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
        gauge!(METRIC_EVENT_QUEUE_LEN).set(0.0);
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
