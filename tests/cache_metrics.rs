mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::post;
use larder::cache::metric_names::{
    METRIC_CACHE_CONSUME_MS, METRIC_CACHE_EVICT, METRIC_CACHE_FANOUT_MS, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS, METRIC_EVENT_DROPPED, METRIC_EVENT_QUEUE_LEN,
};
use larder::cache::{CacheConfig, CacheConsumer, EventKind, EventQueue, LocalCache};
use larder::infra::telemetry;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serial_test::serial;

fn exercise_cache() {
    let config = CacheConfig {
        post_limit: 1,
        ..Default::default()
    };
    let cache = Arc::new(LocalCache::new(&config));

    // miss, hit, then an eviction when the second post lands
    assert!(cache.posts().get_post("p1").is_none());
    cache.posts().save_post(post("p1", "u1"));
    assert!(cache.posts().get_post("p1").is_some());
    cache.posts().save_post(post("p2", "u1"));

    let bounded = EventQueue::new_with_limit(1);
    bounded.publish(EventKind::ResetRequested);
    bounded.publish(EventKind::ResetRequested);
    let _ = bounded.drain(1);

    let queue = Arc::new(EventQueue::new());
    let consumer = CacheConsumer::new(config, cache.clone(), queue.clone());
    queue.publish(EventKind::PostDeleted {
        post_id: "p2".to_string(),
    });
    assert!(consumer.consume());
}

#[test]
#[serial]
fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, exercise_cache);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for expected in [
        METRIC_CACHE_HIT,
        METRIC_CACHE_MISS,
        METRIC_CACHE_EVICT,
        METRIC_EVENT_QUEUE_LEN,
        METRIC_EVENT_DROPPED,
        METRIC_CACHE_CONSUME_MS,
        METRIC_CACHE_FANOUT_MS,
    ] {
        assert!(names.contains(expected), "missing metric `{expected}`");
    }
}

#[test]
#[serial]
fn lookups_are_labelled_by_domain_and_store() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, exercise_cache);

    let post_misses: u64 = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(composite_key, _, _, _)| {
            let key = composite_key.key();
            key.name() == METRIC_CACHE_MISS
                && key
                    .labels()
                    .any(|label| label.key() == "domain" && label.value() == "post")
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => count,
            _ => 0,
        })
        .sum();

    assert_eq!(post_misses, 1);
}

#[test]
#[serial]
fn describing_metrics_twice_is_harmless() {
    telemetry::describe_metrics();
    telemetry::describe_metrics();
}
