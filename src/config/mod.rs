//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "larder";
const ENV_PREFIX: &str = "LARDER";
const DEFAULT_SOAK_TASKS: usize = 8;
const DEFAULT_SOAK_OPS: usize = 200;
const DEFAULT_SOAK_USERS: usize = 4;

/// Command-line arguments for the Larder binary.
#[derive(Debug, Parser)]
#[command(name = "larder", version, about = "Larder local cache tooling")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LARDER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a concurrent workload against the local cache and verify it.
    Soak(Box<SoakArgs>),
    /// Print the resolved cache configuration as JSON.
    #[command(name = "config")]
    ShowConfig(ShowConfigArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SoakArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Number of concurrent writer tasks.
    #[arg(long, default_value_t = DEFAULT_SOAK_TASKS)]
    pub tasks: usize,

    /// Operations performed by each task.
    #[arg(long, default_value_t = DEFAULT_SOAK_OPS)]
    pub ops: usize,

    /// Distinct users the tasks write on behalf of.
    #[arg(long, default_value_t = DEFAULT_SOAK_USERS)]
    pub users: usize,
}

impl Default for SoakArgs {
    fn default() -> Self {
        Self {
            overrides: RuntimeOverrides::default(),
            tasks: DEFAULT_SOAK_TASKS,
            ops: DEFAULT_SOAK_OPS,
            users: DEFAULT_SOAK_USERS,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ShowConfigArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RuntimeOverrides {
    #[command(flatten)]
    pub cache: CacheOverrides,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON instead of the compact format.
    #[arg(long = "log-json", value_parser = BoolishValueParser::new())]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Toggle event-driven invalidation.
    #[arg(long = "cache-enabled", value_parser = BoolishValueParser::new())]
    pub enabled: Option<bool>,

    /// Override the post store capacity.
    #[arg(long = "cache-post-limit", value_name = "COUNT")]
    pub post_limit: Option<u64>,

    /// Override the number of cached feeds.
    #[arg(long = "cache-feed-limit", value_name = "COUNT")]
    pub feed_limit: Option<u64>,

    /// Override the interaction flag capacity.
    #[arg(long = "cache-interaction-limit", value_name = "COUNT")]
    pub interaction_limit: Option<u64>,

    /// Override the auto-consume interval.
    #[arg(long = "cache-consume-interval-ms", value_name = "MILLIS")]
    pub consume_interval_ms: Option<u64>,

    /// Override the pending event ceiling.
    #[arg(long = "cache-event-queue-limit", value_name = "COUNT")]
    pub event_queue_limit: Option<u64>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Validated `[cache]` section; every capacity is non-zero.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub cookbook_limit: NonZeroUsize,
    pub recipe_limit: NonZeroUsize,
    pub post_limit: NonZeroUsize,
    pub comment_limit: NonZeroUsize,
    pub feed_limit: NonZeroUsize,
    pub interaction_limit: NonZeroUsize,
    pub analytics_limit: NonZeroUsize,
    pub reference_limit: NonZeroUsize,
    pub search_limit: NonZeroUsize,
    pub recent_query_limit: NonZeroUsize,
    pub consume_interval: Duration,
    pub consume_batch_limit: NonZeroUsize,
    pub event_queue_limit: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Soak(args)) => raw.apply_runtime_overrides(&args.overrides),
        Some(Command::ShowConfig(args)) => raw.apply_runtime_overrides(&args.overrides),
        None => raw.apply_runtime_overrides(&RuntimeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_runtime_overrides(&mut self, overrides: &RuntimeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        self.apply_cache_overrides(&overrides.cache);
    }

    fn apply_cache_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(enabled) = overrides.enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(limit) = overrides.post_limit {
            self.cache.post_limit = Some(limit);
        }
        if let Some(limit) = overrides.feed_limit {
            self.cache.feed_limit = Some(limit);
        }
        if let Some(limit) = overrides.interaction_limit {
            self.cache.interaction_limit = Some(limit);
        }
        if let Some(millis) = overrides.consume_interval_ms {
            self.cache.consume_interval_ms = Some(millis);
        }
        if let Some(limit) = overrides.event_queue_limit {
            self.cache.event_queue_limit = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let logging = build_logging_settings(raw.logging)?;
        let cache = build_cache_settings(raw.cache)?;
        Ok(Self { logging, cache })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let defaults = CacheConfig::default();
    let limit = |value: Option<u64>, fallback: usize, key: &'static str| {
        non_zero_usize(value.unwrap_or(fallback as u64), key)
    };

    let interval_ms = cache
        .consume_interval_ms
        .unwrap_or(defaults.consume_interval_ms);
    let interval = NonZeroU64::new(interval_ms).ok_or_else(|| {
        LoadError::invalid("cache.consume_interval_ms", "must be greater than zero")
    })?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(defaults.enabled),
        cookbook_limit: limit(
            cache.cookbook_limit,
            defaults.cookbook_limit,
            "cache.cookbook_limit",
        )?,
        recipe_limit: limit(cache.recipe_limit, defaults.recipe_limit, "cache.recipe_limit")?,
        post_limit: limit(cache.post_limit, defaults.post_limit, "cache.post_limit")?,
        comment_limit: limit(
            cache.comment_limit,
            defaults.comment_limit,
            "cache.comment_limit",
        )?,
        feed_limit: limit(cache.feed_limit, defaults.feed_limit, "cache.feed_limit")?,
        interaction_limit: limit(
            cache.interaction_limit,
            defaults.interaction_limit,
            "cache.interaction_limit",
        )?,
        analytics_limit: limit(
            cache.analytics_limit,
            defaults.analytics_limit,
            "cache.analytics_limit",
        )?,
        reference_limit: limit(
            cache.reference_limit,
            defaults.reference_limit,
            "cache.reference_limit",
        )?,
        search_limit: limit(cache.search_limit, defaults.search_limit, "cache.search_limit")?,
        recent_query_limit: limit(
            cache.recent_query_limit,
            defaults.recent_query_limit,
            "cache.recent_query_limit",
        )?,
        consume_interval: Duration::from_millis(interval.get()),
        consume_batch_limit: limit(
            cache.consume_batch_limit,
            defaults.consume_batch_limit,
            "cache.consume_batch_limit",
        )?,
        event_queue_limit: limit(
            cache.event_queue_limit,
            defaults.event_queue_limit,
            "cache.event_queue_limit",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    cookbook_limit: Option<u64>,
    recipe_limit: Option<u64>,
    post_limit: Option<u64>,
    comment_limit: Option<u64>,
    feed_limit: Option<u64>,
    interaction_limit: Option<u64>,
    analytics_limit: Option<u64>,
    reference_limit: Option<u64>,
    search_limit: Option<u64>,
    recent_query_limit: Option<u64>,
    consume_interval_ms: Option<u64>,
    consume_batch_limit: Option<u64>,
    event_queue_limit: Option<u64>,
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_usize: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value_usize)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
