use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names::{
    METRIC_CACHE_CONSUME_MS, METRIC_CACHE_EVICT, METRIC_CACHE_FANOUT_MS, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS, METRIC_EVENT_DROPPED, METRIC_EVENT_QUEUE_LEN, METRIC_LOCK_POISONED,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber for `larder`.
///
/// `RUST_LOG` refines the configured level; the format is JSON or compact per
/// `[logging] json`.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Describe the `larder_cache_*` metrics to whichever recorder is installed.
///
/// Covers store hits, misses and evictions (labelled `domain` and `store`),
/// recovered lock poisoning, the invalidation queue gauge and its drop
/// counter, consume latency, and fan-out latency labelled by `op`. Only the
/// first call registers anything.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of local cache hits, labelled by domain and store."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of local cache misses, labelled by domain and store."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Total number of local cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_LOCK_POISONED,
            Unit::Count,
            "Total number of poisoned cache locks recovered."
        );
        describe_gauge!(
            METRIC_EVENT_QUEUE_LEN,
            Unit::Count,
            "Current number of pending cache events in the queue."
        );
        describe_counter!(
            METRIC_EVENT_DROPPED,
            Unit::Count,
            "Total number of cache events dropped due to queue overflow."
        );
        describe_histogram!(
            METRIC_CACHE_CONSUME_MS,
            Unit::Milliseconds,
            "Cache consumption latency in milliseconds."
        );
        describe_histogram!(
            METRIC_CACHE_FANOUT_MS,
            Unit::Milliseconds,
            "Cross-domain fan-out latency in milliseconds, labelled by operation."
        );
    });
}
