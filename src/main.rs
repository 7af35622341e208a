use std::{process, sync::Arc};

use larder::{
    application::{
        error::AppError,
        soak::{SoakPlan, run_soak},
    },
    cache::{CacheConfig, CacheConsumer, CacheTrigger, EventQueue, LocalCache},
    config,
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Soak(Box::<config::SoakArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Soak(args) => run_soak_command(settings, *args).await,
        config::Command::ShowConfig(_) => show_config(&settings),
    }
}

async fn run_soak_command(
    settings: config::Settings,
    args: config::SoakArgs,
) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(LocalCache::new(&cache_config));
    let queue = Arc::new(EventQueue::new_with_limit(cache_config.event_queue_limit));
    let consumer = Arc::new(CacheConsumer::new(
        cache_config.clone(),
        cache.clone(),
        queue.clone(),
    ));
    let trigger = Arc::new(CacheTrigger::new(cache_config, queue, consumer));

    let plan = SoakPlan {
        tasks: args.tasks,
        ops: args.ops,
        users: args.users,
    };

    let report = run_soak(cache, trigger, plan, settings.cache.consume_interval).await?;
    info!(
        target = "larder::soak",
        total = report.size.total(),
        cookbooks_written = report.cookbooks_written,
        "Soak finished"
    );
    Ok(())
}

fn show_config(settings: &config::Settings) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let rendered = serde_json::to_string_pretty(&cache_config)
        .map_err(|err| AppError::unexpected(format!("failed to render configuration: {err}")))?;
    println!("{rendered}");
    Ok(())
}
