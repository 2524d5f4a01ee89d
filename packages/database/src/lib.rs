#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection, migrations, the incident loader, and the summary
//! aggregator.
//!
//! Uses `switchy_database` over SQLite with raw parameterized SQL and
//! `switchy_schema` for embedded migrations. Each force-month archive loads
//! inside a single transaction; the summary table is rebuilt per scope with
//! delete + insert in one transaction.

pub mod db;
pub mod loader;
pub mod summary;

use include_dir::{Dir, include_dir};
use switchy_database::{Database, DatabaseValue};
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;
use uk_crime_models::CrimeCategory;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

/// Seeds the static reference tables (`police_forces`, `crime_categories`)
/// from the registered forces and the category taxonomy.
///
/// Idempotent: existing rows are left untouched.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn seed_reference_data(db: &dyn Database) -> Result<(), DbError> {
    for force in uk_crime_models::FORCES {
        db.exec_raw_params(
            "INSERT OR IGNORE INTO police_forces (force_id, force_name) VALUES ($1, $2)",
            &[
                DatabaseValue::String(force.id.to_string()),
                DatabaseValue::String(force.name.to_string()),
            ],
        )
        .await?;
    }

    for category in CrimeCategory::all() {
        db.exec_raw_params(
            "INSERT OR IGNORE INTO crime_categories
                 (category_id, category_name, severity_level)
             VALUES ($1, $2, $3)",
            &[
                DatabaseValue::String(category.as_ref().to_string()),
                DatabaseValue::String(category.display_name().to_string()),
                DatabaseValue::Int32(i32::from(category.severity().value())),
            ],
        )
        .await?;
    }

    log::info!(
        "Seeded {} forces and {} categories",
        uk_crime_models::FORCES.len(),
        CrimeCategory::all().len()
    );
    Ok(())
}
