//! Bike box collector CLI
//!
//! Local execution entry point: scheduled collection, single runs and
//! store inspection.

use std::path::PathBuf;
use std::sync::Arc;

use bikebox_collector::{
    error::Result,
    models::Config,
    pipeline::{Collector, CollectorSettings, RunReport, Scheduler},
    services::HttpResourceApi,
    storage::{BulkWriter, LocalStorage, MemoryStorage},
    utils::schedule::parse_schedule,
};
use clap::{Parser, Subcommand};

/// Bike box collector
#[derive(Parser, Debug)]
#[command(
    name = "bikebox-collector",
    version,
    about = "Snapshots bike box locations and stations into a document store"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect on the configured schedule until interrupted
    Run,

    /// Execute a single collection run
    Once {
        /// Keep documents in memory instead of writing the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration
    Validate,

    /// Show store collections and document counts
    Info,
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn build_collector(config: &Config, writer: Arc<dyn BulkWriter>) -> Result<Collector> {
    let api = HttpResourceApi::new(&config.api)?;
    Ok(Collector::new(
        Arc::new(api),
        writer,
        CollectorSettings::from_config(config),
    ))
}

fn log_report(report: &RunReport) {
    log::info!(
        "Run summary: {} locations (persisted: {}), {} stations fetched, {} failed, \
         {} locations failed, {} stored in {} batches, {} dropped",
        report.locations,
        report.locations_persisted,
        report.stations_fetched,
        report.station_failures,
        report.failed_locations,
        report.batches.persisted,
        report.batches.flushes,
        report.batches.dropped
    );
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                log::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    config.apply_env();
    init_logging(cli.verbose, &config.logging.level);

    match &loaded {
        Ok(_) => log::info!("Loaded configuration from {}", cli.config.display()),
        Err(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
    }

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    match cli.command {
        Command::Run => {
            let schedule = parse_schedule(&config.schedule.cron)?;
            let storage = Arc::new(LocalStorage::new(&config.store.root_dir));
            let collector = Arc::new(build_collector(&config, storage.clone())?);

            log::info!(
                "Bike box collector started, schedule '{}', store {}",
                config.schedule.cron,
                config.store.root_dir
            );

            let scheduler = Scheduler::start(schedule, move || {
                let collector = Arc::clone(&collector);
                async move {
                    // Failures are logged inside the run.
                    if let Ok(report) = collector.run().await {
                        log_report(&report);
                    }
                }
            });

            shutdown_signal().await;
            log::info!("Shutdown requested");
            scheduler.stop(storage.as_ref()).await?;
        }

        Command::Once { dry_run } => {
            let report = if dry_run {
                let memory = Arc::new(MemoryStorage::new());
                let report = build_collector(&config, memory.clone())?.run().await?;
                for collection in memory.collection_names() {
                    log::info!(
                        "Dry run: {} documents for {}",
                        memory.document_count(&collection),
                        collection
                    );
                }
                report
            } else {
                let storage = Arc::new(LocalStorage::new(&config.store.root_dir));
                let report = build_collector(&config, storage.clone())?.run().await?;
                storage.close().await?;
                report
            };
            log_report(&report);
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!("Endpoint: {}", config.api.endpoint);
            log::info!(
                "Credentials: {}",
                if config.api.has_credentials() {
                    format!("client '{}', secret ****", config.api.client_id)
                } else {
                    "none (unauthenticated requests)".to_string()
                }
            );
            log::info!(
                "Languages: {} + {:?}",
                config.languages.default,
                config.languages.others()
            );
            log::info!("Schedule: {}", config.schedule.cron);
            log::info!(
                "Batching: {} stations or {}s",
                config.batch.size,
                config.batch.flush_interval_secs
            );
            log::info!("All validations passed!");
        }

        Command::Info => {
            let storage = LocalStorage::new(&config.store.root_dir);
            log::info!("Store directory: {}", config.store.root_dir);

            let collections = storage.collections().await?;
            if collections.is_empty() {
                log::info!("No collections found yet.");
            }
            for collection in collections {
                let documents = storage.load_collection(&collection).await?;
                let latest = documents
                    .iter()
                    .filter_map(|d| d.get("collectedAt").and_then(|v| v.as_str()))
                    .max()
                    .unwrap_or("-");
                log::info!(
                    "{}: {} documents, latest collectedAt {}",
                    collection,
                    documents.len(),
                    latest
                );
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
