//! Archive decoding and record normalization.
//!
//! An archive is a gzip-compressed CSV whose column headers encode the
//! nested record paths of the source format (`location.latitude`,
//! `outcome_status.category`, ...). [`parse_archive`] decompresses the
//! archive and returns a lazy, single-pass iterator of normalized rows.
//! Malformed records are yielded as [`RecordError`]s so the consumer can
//! count skips without aborting the batch.

use std::io::Read as _;

use uk_crime_models::CrimeRecord;

use crate::SourceError;

/// A record that could not be normalized and was skipped.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// A mandatory field (`id`, `category`, `month`) is missing or empty.
    #[error("missing mandatory field `{field}`")]
    MissingField {
        /// Name of the missing column.
        field: &'static str,
    },

    /// A field is present but its value cannot be interpreted.
    #[error("invalid value for `{field}`: {message}")]
    InvalidField {
        /// Name of the offending column.
        field: &'static str,
        /// What was wrong with the value.
        message: String,
    },

    /// The CSV reader could not decode the raw record.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Decompresses an archive and prepares a lazy row iterator over it.
///
/// The returned [`IncidentRows`] makes exactly one pass over the archive;
/// re-reading requires parsing the archive again.
///
/// # Errors
///
/// Returns [`SourceError`] if the gzip stream is corrupt or the CSV has no
/// header row. Per-record problems are *not* errors here — they surface as
/// [`RecordError`] items from the iterator.
pub fn parse_archive(bytes: &[u8]) -> Result<IncidentRows, SourceError> {
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut csv_bytes = Vec::new();
    decoder.read_to_end(&mut csv_bytes)?;

    log::debug!(
        "Decompressed archive: {} -> {} bytes",
        bytes.len(),
        csv_bytes.len()
    );

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::Cursor::new(csv_bytes));

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| SourceError::Archive {
            message: format!("failed to read CSV header row: {e}"),
        })?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err(SourceError::Archive {
            message: "archive contains no header row".to_string(),
        });
    }

    Ok(IncidentRows {
        columns,
        records: reader.into_records(),
    })
}

/// Lazy iterator over the rows of one decoded archive.
///
/// Yields `Ok` for each normalized record and `Err` for each record that
/// had to be skipped. Finite, one pass, not restartable.
pub struct IncidentRows {
    columns: Vec<String>,
    records: csv::StringRecordsIntoIter<std::io::Cursor<Vec<u8>>>,
}

impl IncidentRows {
    /// Returns the trimmed value of a named column, or `None` when the
    /// column is absent or empty. Empty strings are nulls.
    fn field<'a>(&self, record: &'a csv::StringRecord, name: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|c| c == name)?;
        let value = record.get(index)?.trim();
        if value.is_empty() { None } else { Some(value) }
    }

    fn normalize(&self, record: &csv::StringRecord) -> Result<CrimeRecord, RecordError> {
        let crime_api_id = self
            .field(record, "id")
            .ok_or(RecordError::MissingField { field: "id" })?
            .parse::<i64>()
            .map_err(|e| RecordError::InvalidField {
                field: "id",
                message: e.to_string(),
            })?;

        let category = self
            .field(record, "category")
            .ok_or(RecordError::MissingField { field: "category" })?
            .to_owned();

        let month = self
            .field(record, "month")
            .ok_or(RecordError::MissingField { field: "month" })?
            .parse()
            .map_err(|e: uk_crime_models::InvalidMonthError| RecordError::InvalidField {
                field: "month",
                message: e.to_string(),
            })?;

        // Coordinates only make sense as a finite pair. A half-present,
        // unparseable, or non-finite pair means the location is unknown
        // (`NaN`/`inf` parse as f64 but are meaningless as coordinates).
        let latitude = self.field(record, "location.latitude").and_then(parse_coordinate);
        let longitude = self.field(record, "location.longitude").and_then(parse_coordinate);
        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lng)) => (Some(lat), Some(lng)),
            _ => (None, None),
        };

        Ok(CrimeRecord {
            crime_api_id,
            persistent_id: self.field(record, "persistent_id").map(str::to_owned),
            category,
            location_type: self.field(record, "location_type").map(str::to_owned),
            location_subtype: self.field(record, "location_subtype").map(str::to_owned),
            context: self.field(record, "context").map(str::to_owned),
            latitude,
            longitude,
            street_id: self
                .field(record, "location.street.id")
                .and_then(|v| v.parse().ok()),
            street_name: self.field(record, "location.street.name").map(str::to_owned),
            outcome_status_category: self
                .field(record, "outcome_status.category")
                .map(str::to_owned),
            outcome_status_date: self.field(record, "outcome_status.date").map(str::to_owned),
            month,
        })
    }
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl Iterator for IncidentRows {
    type Item = Result<CrimeRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };

        Some(self.normalize(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const HEADERS: &str = "id,persistent_id,category,location_type,location_subtype,context,\
                           month,location.latitude,location.longitude,location.street.id,\
                           location.street.name,outcome_status.category,outcome_status.date";

    fn gzip(csv: &str) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(csv.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn archive(rows: &[&str]) -> Vec<u8> {
        let mut csv = String::from(HEADERS);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        gzip(&csv)
    }

    #[test]
    fn normalizes_complete_record() {
        let bytes = archive(&[
            "101,abc123,burglary,Force,,some context,2024-01,51.5072,-0.1276,884227,\
             On or near Oxford Street,Investigation complete; no suspect identified,2024-03",
        ]);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();
        assert_eq!(rows.len(), 1);

        let record = rows[0].as_ref().unwrap();
        assert_eq!(record.crime_api_id, 101);
        assert_eq!(record.persistent_id.as_deref(), Some("abc123"));
        assert_eq!(record.category, "burglary");
        assert_eq!(record.location_type.as_deref(), Some("Force"));
        assert_eq!(record.location_subtype, None);
        assert_eq!(record.context.as_deref(), Some("some context"));
        assert_eq!(record.latitude, Some(51.5072));
        assert_eq!(record.longitude, Some(-0.1276));
        assert_eq!(record.street_id, Some(884_227));
        assert_eq!(record.street_name.as_deref(), Some("On or near Oxford Street"));
        assert_eq!(
            record.outcome_status_category.as_deref(),
            Some("Investigation complete; no suspect identified")
        );
        assert_eq!(record.outcome_status_date.as_deref(), Some("2024-03"));
        assert_eq!(record.month.to_string(), "2024-01");
    }

    #[test]
    fn missing_optional_fields_become_nulls() {
        let bytes = archive(&["102,,anti-social-behaviour,,,,2024-01,,,,,,"]);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();

        let record = rows[0].as_ref().unwrap();
        assert_eq!(record.persistent_id, None);
        assert_eq!(record.latitude, None);
        assert_eq!(record.longitude, None);
        assert_eq!(record.street_id, None);
        assert_eq!(record.street_name, None);
        assert_eq!(record.outcome_status_category, None);
        assert_eq!(record.outcome_status_date, None);
    }

    #[test]
    fn record_missing_mandatory_field_is_yielded_as_error() {
        let bytes = archive(&[
            "103,,burglary,,,,2024-01,,,,,,",
            ",,burglary,,,,2024-01,,,,,,",      // no id
            "104,,,,,,2024-01,,,,,,",           // no category
            "105,,burglary,,,,,,,,,,",          // no month
            "106,,theft-from-the-person,,,,2024-01,,,,,,",
        ]);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();
        assert_eq!(rows.len(), 5);

        let skipped = rows.iter().filter(|r| r.is_err()).count();
        assert_eq!(skipped, 3);

        assert!(matches!(
            rows[1],
            Err(RecordError::MissingField { field: "id" })
        ));
        assert!(matches!(
            rows[2],
            Err(RecordError::MissingField { field: "category" })
        ));
        assert!(matches!(
            rows[3],
            Err(RecordError::MissingField { field: "month" })
        ));
    }

    #[test]
    fn unparseable_id_and_month_are_invalid() {
        let bytes = archive(&[
            "not-a-number,,burglary,,,,2024-01,,,,,,",
            "107,,burglary,,,,January,,,,,,",
        ]);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();
        assert!(matches!(rows[0], Err(RecordError::InvalidField { field: "id", .. })));
        assert!(matches!(rows[1], Err(RecordError::InvalidField { field: "month", .. })));
    }

    #[test]
    fn half_present_coordinates_mean_location_unknown() {
        let bytes = archive(&["108,,drugs,,,,2024-01,51.5,,,,,"]);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();

        let record = rows[0].as_ref().unwrap();
        assert_eq!(record.latitude, None);
        assert_eq!(record.longitude, None);
    }

    #[test]
    fn non_finite_coordinates_mean_location_unknown() {
        let bytes = archive(&[
            "110,,robbery,,,,2024-01,NaN,-0.1276,,,,",
            "111,,robbery,,,,2024-01,51.5,inf,,,,",
        ]);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();

        for row in &rows {
            let record = row.as_ref().unwrap();
            assert_eq!(record.latitude, None);
            assert_eq!(record.longitude, None);
        }
    }

    #[test]
    fn empty_archive_yields_no_rows() {
        let bytes = gzip(HEADERS);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();
        assert!(rows.is_empty());
    }

    #[test]
    fn corrupt_gzip_is_an_archive_error() {
        assert!(parse_archive(b"definitely not gzip").is_err());
    }

    #[test]
    fn short_rows_are_tolerated() {
        // flexible CSV: a truncated row just has its tail columns missing
        let bytes = archive(&["109,,public-order,,,,2024-01"]);
        let rows: Vec<_> = parse_archive(&bytes).unwrap().collect();

        let record = rows[0].as_ref().unwrap();
        assert_eq!(record.crime_api_id, 109);
        assert_eq!(record.street_name, None);
    }
}
