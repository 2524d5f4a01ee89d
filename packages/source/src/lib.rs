#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Archive fetching and record normalization for monthly crime archives.
//!
//! The remote source publishes one gzip-compressed CSV archive per police
//! force per month. [`ArchiveSource`] is the fetch seam: the real
//! [`client::HttpArchiveClient`] implements it over HTTP with bounded
//! retries, and tests substitute an in-memory source.

pub mod client;
pub mod parse;
pub mod retry;

use async_trait::async_trait;
use uk_crime_models::{PoliceForce, ReportingMonth};

/// Errors that can occur while fetching or decoding an archive.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (after retries, for transient failures).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-retryable error status.
    #[error("HTTP {status}")]
    Status {
        /// The status code returned by the server.
        status: reqwest::StatusCode,
    },

    /// JSON parsing failed (available-months listing).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (archive decompression).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive itself is unusable (bad compression, no header row).
    #[error("Archive error: {message}")]
    Archive {
        /// Description of what went wrong.
        message: String,
    },
}

/// Result of fetching one force-month archive.
///
/// A month the source has not published yet is a normal condition
/// ([`FetchOutcome::NotFound`]), not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Raw archive bytes (gzip-compressed CSV).
    Archive(Vec<u8>),
    /// The source has no data for this force and month.
    NotFound,
}

/// Trait for anything that can produce force-month archives.
///
/// The pipeline depends on this seam rather than on HTTP directly so the
/// fetch/load/aggregate flow can be exercised without a network.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetches the archive for one force and month.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails permanently (transient
    /// failures are retried internally).
    async fn fetch_archive(
        &self,
        force: &PoliceForce,
        month: ReportingMonth,
    ) -> Result<FetchOutcome, SourceError>;
}
