//! Incident loader: transactional upsert of one force-month archive.

use switchy_database::{Database, DatabaseValue};
use uk_crime_models::{CrimeRecord, LoadStats};
use uk_crime_source::parse::RecordError;

use crate::DbError;

/// Loads the rows of one force-month archive inside a single transaction.
///
/// Rows are upserted keyed on `crime_api_id`: an existing incident has its
/// mutable fields (persistent id, context, outcome status/date, load
/// timestamp) updated in place, so re-ingesting a month never duplicates
/// rows and later snapshots win. Malformed rows (`Err` items from the
/// parser) are counted as skipped and do not abort the batch.
///
/// Every referenced street is upserted into `street_reference`: unseen
/// streets are inserted with `first_seen = last_seen = now`, known streets
/// get `last_seen` refreshed and the name updated when the record carries
/// one (a nameless sighting never erases a known name).
///
/// # Errors
///
/// Returns [`DbError`] on any database failure; the transaction is rolled
/// back and no rows from this archive remain visible.
pub async fn load_archive(
    db: &dyn Database,
    rows: impl IntoIterator<Item = Result<CrimeRecord, RecordError>>,
) -> Result<LoadStats, DbError> {
    let txn = db.begin_transaction().await?;
    let txn_db: &dyn Database = &*txn;

    let mut stats = LoadStats::default();

    let result = load_rows(txn_db, rows, &mut stats).await;

    match result {
        Ok(()) => {
            txn.commit().await?;
            log::info!(
                "Archive committed: {} inserted, {} updated, {} skipped",
                stats.inserted,
                stats.updated,
                stats.skipped
            );
            Ok(stats)
        }
        Err(e) => {
            log::error!("Archive load failed, rolling back: {e}");
            txn.rollback().await?;
            Err(e)
        }
    }
}

async fn load_rows(
    db: &dyn Database,
    rows: impl IntoIterator<Item = Result<CrimeRecord, RecordError>>,
    stats: &mut LoadStats,
) -> Result<(), DbError> {
    let loaded_at = chrono::Utc::now().naive_utc();

    for row in rows {
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping malformed record: {e}");
                stats.skipped += 1;
                continue;
            }
        };

        if upsert_incident(db, &record, loaded_at).await? {
            stats.inserted += 1;
        } else {
            stats.updated += 1;
        }

        if let Some(street_id) = record.street_id {
            upsert_street(db, street_id, record.street_name.as_deref(), loaded_at).await?;
        }
    }

    Ok(())
}

/// Inserts or updates one incident. Returns `true` if a new row was
/// inserted, `false` if an existing row was updated.
async fn upsert_incident(
    db: &dyn Database,
    record: &CrimeRecord,
    loaded_at: chrono::NaiveDateTime,
) -> Result<bool, DbError> {
    let existing = db
        .query_raw_params(
            "SELECT id FROM crime_incidents WHERE crime_api_id = $1",
            &[DatabaseValue::Int64(record.crime_api_id)],
        )
        .await?;

    if existing.is_empty() {
        db.exec_raw_params(
            "INSERT INTO crime_incidents (
                crime_api_id, persistent_id, category, location_type,
                location_subtype, context, latitude, longitude,
                street_id, street_name, outcome_status_category,
                outcome_status_date, month, date_loaded
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            &[
                DatabaseValue::Int64(record.crime_api_id),
                opt_string(record.persistent_id.as_deref()),
                DatabaseValue::String(record.category.clone()),
                opt_string(record.location_type.as_deref()),
                opt_string(record.location_subtype.as_deref()),
                opt_string(record.context.as_deref()),
                record.latitude.map_or(DatabaseValue::Null, DatabaseValue::Real64),
                record.longitude.map_or(DatabaseValue::Null, DatabaseValue::Real64),
                record.street_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
                opt_string(record.street_name.as_deref()),
                opt_string(record.outcome_status_category.as_deref()),
                opt_string(record.outcome_status_date.as_deref()),
                DatabaseValue::String(record.month.to_string()),
                DatabaseValue::DateTime(loaded_at),
            ],
        )
        .await?;
        return Ok(true);
    }

    // Outcome data trickles in across monthly snapshots; the most recently
    // loaded snapshot wins.
    db.exec_raw_params(
        "UPDATE crime_incidents SET
            persistent_id = $2,
            context = $3,
            outcome_status_category = $4,
            outcome_status_date = $5,
            date_loaded = $6
         WHERE crime_api_id = $1",
        &[
            DatabaseValue::Int64(record.crime_api_id),
            opt_string(record.persistent_id.as_deref()),
            opt_string(record.context.as_deref()),
            opt_string(record.outcome_status_category.as_deref()),
            opt_string(record.outcome_status_date.as_deref()),
            DatabaseValue::DateTime(loaded_at),
        ],
    )
    .await?;

    Ok(false)
}

async fn upsert_street(
    db: &dyn Database,
    street_id: i64,
    street_name: Option<&str>,
    seen_at: chrono::NaiveDateTime,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO street_reference (street_id, street_name, first_seen, last_seen)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (street_id) DO UPDATE SET
             street_name = COALESCE(excluded.street_name, street_reference.street_name),
             last_seen = excluded.last_seen",
        &[
            DatabaseValue::Int64(street_id),
            opt_string(street_name),
            DatabaseValue::DateTime(seen_at),
            DatabaseValue::DateTime(seen_at),
        ],
    )
    .await?;

    Ok(())
}

fn opt_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.to_string()))
}
