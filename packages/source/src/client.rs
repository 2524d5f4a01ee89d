//! HTTP client for the remote crime data source.

use std::time::Duration;

use async_trait::async_trait;
use uk_crime_models::{PoliceForce, ReportingMonth};

use crate::{ArchiveSource, FetchOutcome, SourceError, retry};

/// Default base URL of the data source.
pub const DEFAULT_BASE_URL: &str = "https://data.police.uk";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// HTTP client that downloads force-month archives and the published-months
/// listing.
#[derive(Debug, Clone)]
pub struct HttpArchiveClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl HttpArchiveClient {
    /// Creates a client with the default base URL, timeout, and retry count.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against a specific base URL (no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn with_base_url(base_url: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the retry count for transient failures.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// URL of the archive for one force and month.
    #[must_use]
    pub fn archive_url(&self, force: &PoliceForce, month: ReportingMonth) -> String {
        format!("{}/archive/{month}/{}.csv.gz", self.base_url, force.id)
    }

    /// Fetches the listing of months the source has published, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the listing cannot be
    /// parsed.
    pub async fn available_months(&self) -> Result<Vec<ReportingMonth>, SourceError> {
        let url = format!("{}/api/crimes-street-dates", self.base_url);

        let Some(body) =
            retry::send_json(|| self.client.get(&url).timeout(self.timeout), self.max_retries)
                .await?
        else {
            log::warn!("Published-months listing not found at {url}");
            return Ok(Vec::new());
        };

        let entries = body.as_array().ok_or_else(|| SourceError::Archive {
            message: "months listing is not a JSON array".to_string(),
        })?;

        let mut months: Vec<ReportingMonth> = entries
            .iter()
            .filter_map(|entry| entry.get("date")?.as_str()?.parse().ok())
            .collect();

        months.sort_unstable_by(|a, b| b.cmp(a));
        months.dedup();

        log::info!("Source has published {} months", months.len());
        Ok(months)
    }
}

#[async_trait]
impl ArchiveSource for HttpArchiveClient {
    async fn fetch_archive(
        &self,
        force: &PoliceForce,
        month: ReportingMonth,
    ) -> Result<FetchOutcome, SourceError> {
        let url = self.archive_url(force, month);
        log::info!("Fetching archive for {} {month}: {url}", force.id);

        let request = || self.client.get(&url).timeout(self.timeout);
        match retry::send_bytes(request, self.max_retries).await? {
            Some(bytes) => {
                log::debug!("Downloaded {} bytes for {} {month}", bytes.len(), force.id);
                Ok(FetchOutcome::Archive(bytes))
            }
            None => {
                log::info!("No archive published for {} {month}", force.id);
                Ok(FetchOutcome::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uk_crime_models::force_by_id;

    #[test]
    fn archive_url_includes_month_and_force() {
        let client = HttpArchiveClient::with_base_url("https://example.org/").unwrap();
        let force = force_by_id("metropolitan").unwrap();
        let month: ReportingMonth = "2024-01".parse().unwrap();
        assert_eq!(
            client.archive_url(force, month),
            "https://example.org/archive/2024-01/metropolitan.csv.gz"
        );
    }

    #[test]
    fn builders_override_timeout_and_retries() {
        let client = HttpArchiveClient::new().unwrap();
        assert_eq!(client.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(client.max_retries, DEFAULT_MAX_RETRIES);

        let client = client
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(1);
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.max_retries, 1);
    }
}
