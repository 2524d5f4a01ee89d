#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime archive ETL pipeline.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use uk_crime_database::{db, run_migrations, seed_reference_data, summary};
use uk_crime_etl::{resolve_forces, run_pipeline};
use uk_crime_models::ReportingMonth;
use uk_crime_source::client::HttpArchiveClient;

/// Default number of recent months to ingest per run.
const DEFAULT_MONTHS: usize = 12;

#[derive(Parser)]
#[command(name = "uk_crime_etl", about = "Monthly crime archive ETL pipeline")]
struct Cli {
    /// SQLite database path (falls back to `CRIME_DB_PATH`, then
    /// `data/crime_data.db`).
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, load, and summarize archives for recent months
    Run {
        /// Ingest a single month (`YYYY-MM`) instead of the recent window
        #[arg(long)]
        month: Option<String>,
        /// Number of recent months to ingest when no `--month` is given
        #[arg(long, default_value_t = DEFAULT_MONTHS)]
        months: usize,
        /// Comma-separated force identifiers (default: all registered)
        #[arg(long)]
        forces: Option<String>,
    },
    /// Run database migrations and seed reference data
    Migrate,
    /// List the months the source has published
    Months,
    /// List the registered police forces
    Forces,
    /// Rebuild the summary table from stored incidents
    Summary {
        /// Limit the rebuild to one month (`YYYY-MM`)
        #[arg(long)]
        month: Option<String>,
    },
}

fn database_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path
        .or_else(|| std::env::var("CRIME_DB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data/crime_data.db"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            month,
            months,
            forces,
        } => {
            let start = Instant::now();

            let database = db::connect(&database_path(cli.db))?;
            run_migrations(&*database).await?;
            seed_reference_data(&*database).await?;

            let client = HttpArchiveClient::new()?;
            let forces = resolve_forces(forces.as_deref())?;

            let target_months: Vec<ReportingMonth> = if let Some(month) = month {
                vec![month.parse()?]
            } else {
                let published = client.available_months().await?;
                if published.is_empty() {
                    log::warn!(
                        "Source published no months listing; falling back to calendar window"
                    );
                    ReportingMonth::current().prev().last_n(months)
                } else {
                    published.into_iter().take(months).collect()
                }
            };

            log::info!(
                "Starting run: {} months x {} forces",
                target_months.len(),
                forces.len()
            );

            let run = run_pipeline(&*database, &client, &forces, &target_months).await?;

            for report in &run.reports {
                log::info!("{report}");
            }
            log::info!(
                "Run finished in {:.1?}: {} archives loaded, {} failed, {} rows written, {} records skipped",
                start.elapsed(),
                run.succeeded(),
                run.failed(),
                run.total_loaded(),
                run.total_skipped(),
            );
        }
        Commands::Migrate => {
            let database = db::connect(&database_path(cli.db))?;
            run_migrations(&*database).await?;
            seed_reference_data(&*database).await?;
        }
        Commands::Months => {
            let client = HttpArchiveClient::new()?;
            for month in client.available_months().await? {
                println!("{month}");
            }
        }
        Commands::Forces => {
            for force in uk_crime_models::FORCES {
                println!("{}: {}", force.id, force.name);
            }
        }
        Commands::Summary { month } => {
            let database = db::connect(&database_path(cli.db))?;
            let scope: Option<ReportingMonth> = month.map(|m| m.parse()).transpose()?;
            let rows = summary::rebuild_summary(&*database, scope).await?;
            println!("Rebuilt {rows} summary rows");
        }
    }

    Ok(())
}
