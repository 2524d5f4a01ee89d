//! Summary aggregator: recomputes `crime_summary` from `crime_incidents`.

use std::collections::BTreeMap;
use std::str::FromStr as _;

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use uk_crime_models::{CrimeCategory, ReportingMonth, nearest_force};

use crate::DbError;

/// Recomputes the summary rows for a scope (one month, or everything),
/// replacing any prior rows for that scope in a single transaction.
///
/// Summary rows are keyed by (month, force, category). The incidents table
/// carries no force column, so each incident is attributed to the nearest
/// registered force centre by its coordinates; incidents without a location
/// cannot be attributed and are left out of the summary.
///
/// Pure function of the incidents table and the static force registry:
/// rebuilding twice over unchanged data produces identical rows.
///
/// # Errors
///
/// Returns [`DbError`] on any database failure; the previous summary rows
/// for the scope remain untouched.
pub async fn rebuild_summary(
    db: &dyn Database,
    month: Option<ReportingMonth>,
) -> Result<u64, DbError> {
    let incidents = match month {
        Some(month) => {
            db.query_raw_params(
                "SELECT category, month, latitude, longitude
                 FROM crime_incidents WHERE month = $1",
                &[DatabaseValue::String(month.to_string())],
            )
            .await?
        }
        None => {
            db.query_raw_params(
                "SELECT category, month, latitude, longitude FROM crime_incidents",
                &[],
            )
            .await?
        }
    };

    // BTreeMap iteration order keeps the rebuilt rows deterministic.
    let mut counts: BTreeMap<(String, &'static str, String), (i64, i64)> = BTreeMap::new();
    let mut unattributed: u64 = 0;

    for row in &incidents {
        let category: String = row.to_value("category").unwrap_or_default();
        let row_month: String = row.to_value("month").unwrap_or_default();
        let latitude: Option<f64> = row.to_value("latitude").unwrap_or(None);
        let longitude: Option<f64> = row.to_value("longitude").unwrap_or(None);

        let (Some(lat), Some(lng)) = (latitude, longitude) else {
            unattributed += 1;
            continue;
        };

        let force = nearest_force(lat, lng);
        let high =
            CrimeCategory::from_str(&category).is_ok_and(|c| c.severity().is_high());

        let entry = counts.entry((row_month, force.id, category)).or_insert((0, 0));
        entry.0 += 1;
        if high {
            entry.1 += 1;
        }
    }

    if unattributed > 0 {
        log::debug!("{unattributed} incidents without coordinates left out of summary");
    }

    let updated_at = chrono::Utc::now().naive_utc();

    let txn = db.begin_transaction().await?;

    match month {
        Some(month) => {
            txn.exec_raw_params(
                "DELETE FROM crime_summary WHERE month = $1",
                &[DatabaseValue::String(month.to_string())],
            )
            .await?;
        }
        None => {
            txn.exec_raw_params("DELETE FROM crime_summary", &[]).await?;
        }
    }

    let row_count = counts.len() as u64;

    for ((row_month, force_id, category), (incident_count, high_severity_count)) in counts {
        txn.exec_raw_params(
            "INSERT INTO crime_summary
                 (month, police_force, crime_category, incident_count,
                  high_severity_count, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                DatabaseValue::String(row_month),
                DatabaseValue::String(force_id.to_string()),
                DatabaseValue::String(category),
                DatabaseValue::Int64(incident_count),
                DatabaseValue::Int64(high_severity_count),
                DatabaseValue::DateTime(updated_at),
            ],
        )
        .await?;
    }

    txn.commit().await?;

    match month {
        Some(month) => log::info!("Rebuilt {row_count} summary rows for {month}"),
        None => log::info!("Rebuilt {row_count} summary rows (all months)"),
    }

    Ok(row_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_archive;
    use uk_crime_models::CrimeRecord;

    async fn setup() -> Box<dyn Database> {
        let db = crate::db::connect_in_memory().unwrap();
        crate::run_migrations(&*db).await.unwrap();
        crate::seed_reference_data(&*db).await.unwrap();
        db
    }

    fn record(crime_api_id: i64, category: &str, month: &str, lat: f64, lng: f64) -> CrimeRecord {
        CrimeRecord {
            crime_api_id,
            persistent_id: None,
            category: category.to_string(),
            location_type: Some("Force".to_string()),
            location_subtype: None,
            context: None,
            latitude: Some(lat),
            longitude: Some(lng),
            street_id: None,
            street_name: None,
            outcome_status_category: None,
            outcome_status_date: None,
            month: month.parse().unwrap(),
        }
    }

    async fn summary_rows(db: &dyn Database) -> Vec<(String, String, String, i64, i64)> {
        let rows = db
            .query_raw_params(
                "SELECT month, police_force, crime_category, incident_count,
                        high_severity_count
                 FROM crime_summary
                 ORDER BY month, police_force, crime_category",
                &[],
            )
            .await
            .unwrap();

        rows.iter()
            .map(|row| {
                (
                    row.to_value("month").unwrap(),
                    row.to_value("police_force").unwrap(),
                    row.to_value("crime_category").unwrap(),
                    row.to_value("incident_count").unwrap(),
                    row.to_value("high_severity_count").unwrap(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn counts_incidents_and_high_severity_per_force() {
        let db = setup().await;

        // Two in central London, one in Birmingham. Burglary (severity 4)
        // and drugs (severity 3) count as high, shoplifting (2) does not.
        load_archive(
            &*db,
            vec![
                Ok(record(1, "burglary", "2024-01", 51.51, -0.12)),
                Ok(record(2, "shoplifting", "2024-01", 51.5, -0.13)),
                Ok(record(3, "drugs", "2024-01", 52.48, -1.9)),
            ],
        )
        .await
        .unwrap();

        rebuild_summary(&*db, Some("2024-01".parse().unwrap())).await.unwrap();

        let rows = summary_rows(&*db).await;
        assert_eq!(
            rows,
            vec![
                (
                    "2024-01".to_string(),
                    "metropolitan".to_string(),
                    "burglary".to_string(),
                    1,
                    1
                ),
                (
                    "2024-01".to_string(),
                    "metropolitan".to_string(),
                    "shoplifting".to_string(),
                    1,
                    0
                ),
                (
                    "2024-01".to_string(),
                    "west-midlands".to_string(),
                    "drugs".to_string(),
                    1,
                    1
                ),
            ]
        );
    }

    #[tokio::test]
    async fn rebuild_twice_is_identical() {
        let db = setup().await;

        load_archive(
            &*db,
            vec![
                Ok(record(1, "robbery", "2024-02", 53.48, -2.24)),
                Ok(record(2, "robbery", "2024-02", 53.49, -2.25)),
                Ok(record(3, "other-crime", "2024-02", 53.47, -2.23)),
            ],
        )
        .await
        .unwrap();

        rebuild_summary(&*db, None).await.unwrap();
        let first = summary_rows(&*db).await;

        rebuild_summary(&*db, None).await.unwrap();
        let second = summary_rows(&*db).await;

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                (
                    "2024-02".to_string(),
                    "greater-manchester".to_string(),
                    "other-crime".to_string(),
                    1,
                    0
                ),
                (
                    "2024-02".to_string(),
                    "greater-manchester".to_string(),
                    "robbery".to_string(),
                    2,
                    2
                ),
            ]
        );
    }

    #[tokio::test]
    async fn scoped_rebuild_leaves_other_months_untouched() {
        let db = setup().await;

        load_archive(
            &*db,
            vec![
                Ok(record(1, "burglary", "2024-01", 51.51, -0.12)),
                Ok(record(2, "burglary", "2024-02", 51.51, -0.12)),
            ],
        )
        .await
        .unwrap();

        rebuild_summary(&*db, None).await.unwrap();
        assert_eq!(summary_rows(&*db).await.len(), 2);

        // Another January incident arrives; only January is rebuilt.
        load_archive(
            &*db,
            vec![Ok(record(3, "burglary", "2024-01", 51.52, -0.11))],
        )
        .await
        .unwrap();
        rebuild_summary(&*db, Some("2024-01".parse().unwrap())).await.unwrap();

        let rows = summary_rows(&*db).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].3, 2); // 2024-01 burglary count
        assert_eq!(rows[1].3, 1); // 2024-02 untouched
    }

    #[tokio::test]
    async fn incidents_without_coordinates_are_excluded() {
        let db = setup().await;

        let mut unlocated = record(1, "burglary", "2024-01", 0.0, 0.0);
        unlocated.latitude = None;
        unlocated.longitude = None;

        load_archive(&*db, vec![Ok(unlocated)]).await.unwrap();
        let count = rebuild_summary(&*db, None).await.unwrap();

        assert_eq!(count, 0);
        assert!(summary_rows(&*db).await.is_empty());
    }
}
