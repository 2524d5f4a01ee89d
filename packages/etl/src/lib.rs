#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline orchestration: fetch force-month archives, load them, and
//! rebuild the summary table.
//!
//! Archives for one month are fetched in parallel (independent I/O) and
//! loaded sequentially — the database is the single shared resource and
//! each archive loads in its own transaction. A force whose fetch fails is
//! reported in the run summary without blocking the others; only database
//! failures abort the run.

use switchy_database::Database;
use uk_crime_database::{DbError, loader, summary};
use uk_crime_models::{
    ForceMonthStatus, PoliceForce, ReportingMonth, RunSummary, force_by_id,
};
use uk_crime_source::parse::parse_archive;
use uk_crime_source::{ArchiveSource, FetchOutcome};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Database failure. Per-force fetch failures are *not* fatal and are
    /// reported in the run summary instead.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A `--forces` argument referenced an unregistered force.
    #[error("unknown force `{id}`")]
    UnknownForce {
        /// The unrecognized identifier.
        id: String,
    },
}

/// Resolves a comma-separated force filter to registered forces, or all
/// registered forces when no filter is given.
///
/// # Errors
///
/// Returns [`EtlError::UnknownForce`] if an identifier is not registered.
pub fn resolve_forces(filter: Option<&str>) -> Result<Vec<&'static PoliceForce>, EtlError> {
    let Some(filter) = filter else {
        return Ok(uk_crime_models::FORCES.iter().collect());
    };

    filter
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            force_by_id(id).ok_or_else(|| EtlError::UnknownForce { id: id.to_string() })
        })
        .collect()
}

/// Runs the fetch → parse → load → aggregate sequence for every force and
/// month, returning the per-archive run summary.
///
/// The summary table is rebuilt once per month, after that month's archives
/// have loaded (skipped when nothing new was loaded for the month).
///
/// # Errors
///
/// Returns [`EtlError`] only on database failure; fetch and parse failures
/// are recorded per force-month and the run continues.
pub async fn run_pipeline(
    db: &dyn Database,
    source: &dyn ArchiveSource,
    forces: &[&'static PoliceForce],
    months: &[ReportingMonth],
) -> Result<RunSummary, EtlError> {
    let mut run = RunSummary::default();

    for &month in months {
        log::info!("Processing month {month} ({} forces)", forces.len());

        // Independent downloads; loads below serialize on the database.
        let fetches =
            futures::future::join_all(forces.iter().map(|force| source.fetch_archive(force, month)))
                .await;

        let mut loaded_any = false;

        for (force, fetched) in forces.iter().zip(fetches) {
            let status = match fetched {
                Err(e) => {
                    log::error!("Fetch failed for {} {month}: {e}", force.id);
                    ForceMonthStatus::Failed {
                        reason: e.to_string(),
                    }
                }
                Ok(FetchOutcome::NotFound) => ForceMonthStatus::NoData,
                Ok(FetchOutcome::Archive(bytes)) => match parse_archive(&bytes) {
                    Err(e) => {
                        log::error!("Unusable archive for {} {month}: {e}", force.id);
                        ForceMonthStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                    Ok(rows) => {
                        let stats = loader::load_archive(db, rows).await?;
                        loaded_any = true;
                        ForceMonthStatus::Loaded(stats)
                    }
                },
            };

            run.record(force.id, month, status);
        }

        if loaded_any {
            summary::rebuild_summary(db, Some(month)).await?;
        }
    }

    Ok(run)
}
