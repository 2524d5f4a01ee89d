//! Per-archive load statistics and the end-of-run report.

use std::fmt;

use serde::Serialize;

use crate::ReportingMonth;

/// Row counts from loading one force-month archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    /// Rows inserted for the first time.
    pub inserted: u64,
    /// Rows whose mutable fields were updated in place.
    pub updated: u64,
    /// Malformed records skipped during parsing.
    pub skipped: u64,
}

impl LoadStats {
    /// Total rows written (inserted or updated).
    #[must_use]
    pub const fn loaded(self) -> u64 {
        self.inserted + self.updated
    }
}

/// Outcome of processing one force-month archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "status")]
pub enum ForceMonthStatus {
    /// Archive fetched, parsed, and committed.
    Loaded(LoadStats),
    /// The source has no archive for this force and month.
    NoData,
    /// Fetch failed after exhausting retries; other forces continue.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Report entry for one force-month archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceMonthReport {
    /// Force identifier.
    pub force_id: String,
    /// Reporting month.
    pub month: ReportingMonth,
    /// What happened.
    pub status: ForceMonthStatus,
}

impl fmt::Display for ForceMonthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ForceMonthStatus::Loaded(stats) => write!(
                f,
                "{} {}: {} inserted, {} updated, {} skipped",
                self.force_id, self.month, stats.inserted, stats.updated, stats.skipped
            ),
            ForceMonthStatus::NoData => {
                write!(f, "{} {}: no data published", self.force_id, self.month)
            }
            ForceMonthStatus::Failed { reason } => {
                write!(f, "{} {}: FAILED ({reason})", self.force_id, self.month)
            }
        }
    }
}

/// Summary of a whole pipeline run, one entry per force-month archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Per-archive outcomes, in processing order.
    pub reports: Vec<ForceMonthReport>,
}

impl RunSummary {
    /// Records the outcome for one force-month archive.
    pub fn record(&mut self, force_id: &str, month: ReportingMonth, status: ForceMonthStatus) {
        self.reports.push(ForceMonthReport {
            force_id: force_id.to_string(),
            month,
            status,
        });
    }

    /// Number of archives that loaded successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, ForceMonthStatus::Loaded(_)))
            .count()
    }

    /// Number of archives that failed to fetch.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, ForceMonthStatus::Failed { .. }))
            .count()
    }

    /// Total rows written across all archives.
    #[must_use]
    pub fn total_loaded(&self) -> u64 {
        self.reports
            .iter()
            .map(|r| match r.status {
                ForceMonthStatus::Loaded(stats) => stats.loaded(),
                _ => 0,
            })
            .sum()
    }

    /// Total malformed records skipped across all archives.
    #[must_use]
    pub fn total_skipped(&self) -> u64 {
        self.reports
            .iter()
            .map(|r| match r.status {
                ForceMonthStatus::Loaded(stats) => stats.skipped,
                _ => 0,
            })
            .sum()
    }
}
