//! foodbank-purge: Retention maintenance CLI
//!
//! Purges aged source rows after refreshing the aggregates they feed, and
//! exposes the maintenance operations around it. Results are printed to
//! stdout as JSON; logs go to stderr.

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::error;

use foodbank_rollup::config::Config;
use foodbank_rollup::model::AggregationDomain;
use foodbank_rollup::retention::{AllowList, PurgeOrchestrator, PurgeRequest};
use foodbank_rollup::rollup::RollupEngine;
use foodbank_rollup::storage::init_storage;
use foodbank_rollup::utils::bootstrap::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "foodbank-purge", about = "Purge aged source rows")]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh aggregates, then delete rows dated before the cutoff
    Purge {
        /// Rows dated strictly before this date (YYYY-MM-DD) are deleted
        #[arg(long)]
        before: NaiveDate,
        /// Tables to purge
        #[arg(required = true, num_args = 1..)]
        tables: Vec<String>,
    },
    /// Show which months a purge would cover, without changing anything
    Preview {
        #[arg(long)]
        before: NaiveDate,
        #[arg(required = true, num_args = 1..)]
        tables: Vec<String>,
    },
    /// Reclaim storage left by earlier deletions
    Reclaim {
        #[arg(required = true, num_args = 1..)]
        tables: Vec<String>,
    },
    /// Recompute a month's aggregates from source rows
    Rebuild {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Domain to rebuild; all domains when omitted
        #[arg(long, value_parser = parse_domain)]
        domain: Option<AggregationDomain>,
    },
}

fn parse_domain(value: &str) -> Result<AggregationDomain, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pantry" => Ok(AggregationDomain::Pantry),
        "warehouse" => Ok(AggregationDomain::Warehouse),
        "sunshine" => Ok(AggregationDomain::Sunshine),
        other => Err(format!("unknown domain: {other}")),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let stores = init_storage(&config.storage).await?;
    let rollups = RollupEngine::new(Arc::clone(&stores.rollup));
    let allow_list = AllowList::from_names(&config.retention.purge_tables)?;
    let orchestrator =
        PurgeOrchestrator::new(allow_list, Arc::clone(&stores.retention), rollups.clone());

    match cli.command {
        Command::Purge { before, tables } => {
            let report = orchestrator.purge(&PurgeRequest { tables, before }).await?;
            print_json(&report)?;
        }
        Command::Preview { before, tables } => {
            let preview = orchestrator.preview(&PurgeRequest { tables, before }).await?;
            print_json(&preview)?;
        }
        Command::Reclaim { tables } => {
            let reclaimed = orchestrator.reclaim(&tables).await?;
            print_json(&reclaimed)?;
        }
        Command::Rebuild {
            year,
            month,
            domain,
        } => {
            let domains = match domain {
                Some(domain) => vec![domain],
                None => vec![
                    AggregationDomain::Pantry,
                    AggregationDomain::Warehouse,
                    AggregationDomain::Sunshine,
                ],
            };
            for domain in &domains {
                match domain {
                    AggregationDomain::Pantry => {
                        rollups.pantry().rebuild_month(year, month).await?;
                        rollups.pantry().refresh_year(year).await?;
                    }
                    _ => rollups.refresh_month(*domain, year, month).await?,
                }
            }
            print_json(&domains)?;
        }
    }

    Ok(())
}
