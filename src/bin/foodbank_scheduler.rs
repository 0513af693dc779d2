//! foodbank-scheduler: Background cleanup jobs
//!
//! Runs the warehouse cleanup and pantry retention jobs on their configured
//! intervals until interrupted.
//!
//! ## Configuration
//! - FOODBANK_CONFIG: YAML config file path
//! - FOODBANK__STORAGE__PATH: SQLite database path
//! - FOODBANK__RETENTION__PANTRY_RETENTION_YEARS: years of visits kept
//! - FOODBANK__SCHEDULER__ENABLED: set to false to start without jobs
//! - FOODBANK_LOG: tracing filter (default: info)

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use foodbank_rollup::config::Config;
use foodbank_rollup::jobs::{JobRunner, PantryRetentionJob, WarehouseCleanupJob};
use foodbank_rollup::rollup::RollupEngine;
use foodbank_rollup::storage::init_storage;
use foodbank_rollup::utils::bootstrap::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "foodbank-scheduler", about = "Run scheduled cleanup jobs")]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if !config.scheduler.enabled {
        info!("scheduler disabled by configuration, exiting");
        return Ok(());
    }

    let stores = init_storage(&config.storage).await?;
    let rollups = RollupEngine::new(Arc::clone(&stores.rollup));

    let warehouse = JobRunner::new(Arc::new(WarehouseCleanupJob::new(
        Arc::clone(&stores.retention),
        rollups.clone(),
    )))
    .with_interval(Duration::from_secs(
        config.scheduler.warehouse_check_interval_secs,
    ));

    let pantry = JobRunner::new(Arc::new(PantryRetentionJob::new(
        Arc::clone(&stores.retention),
        rollups,
        config.retention.pantry_retention_years,
    )?))
    .with_interval(Duration::from_secs(config.scheduler.pantry_check_interval_secs));

    let handles = [warehouse.spawn(), pantry.spawn()];

    info!("scheduler running, press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;

    for handle in handles {
        handle.abort();
    }
    info!("scheduler stopped");

    Ok(())
}
