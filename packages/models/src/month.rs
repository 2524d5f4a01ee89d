//! Year-month values as used by the source archives (`YYYY-MM`).

use std::fmt;
use std::str::FromStr;

use chrono::Datelike as _;
use serde::{Deserialize, Serialize};

/// A reporting month at year-month granularity.
///
/// Serializes as the `YYYY-MM` string used in archive URLs, record fields,
/// and the `month` database columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportingMonth {
    year: i32,
    month: u32,
}

impl ReportingMonth {
    /// Creates a reporting month from a year and a 1-based month number.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMonthError`] if `month` is not in 1-12.
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidMonthError> {
        if !(1..=12).contains(&month) {
            return Err(InvalidMonthError {
                input: format!("{year}-{month}"),
            });
        }
        Ok(Self { year, month })
    }

    /// Returns the current calendar month (UTC).
    #[must_use]
    pub fn current() -> Self {
        let now = chrono::Utc::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// Returns the month immediately before this one.
    #[must_use]
    pub const fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Returns the `count` most recent months ending with `self`, newest
    /// first. Used to select the fetch window for a scheduled run.
    #[must_use]
    pub fn last_n(self, count: usize) -> Vec<Self> {
        let mut months = Vec::with_capacity(count);
        let mut current = self;
        for _ in 0..count {
            months.push(current);
            current = current.prev();
        }
        months
    }

    /// Returns the year component.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Returns the 1-based month component.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }
}

impl fmt::Display for ReportingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReportingMonth {
    type Err = InvalidMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidMonthError {
            input: s.to_string(),
        };

        let (year_str, month_str) = s.split_once('-').ok_or_else(err)?;
        if year_str.len() != 4 || month_str.len() != 2 {
            return Err(err());
        }

        let year: i32 = year_str.parse().map_err(|_| err())?;
        let month: u32 = month_str.parse().map_err(|_| err())?;

        Self::new(year, month).map_err(|_| err())
    }
}

impl TryFrom<String> for ReportingMonth {
    type Error = InvalidMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReportingMonth> for String {
    fn from(value: ReportingMonth) -> Self {
        value.to_string()
    }
}

/// Error returned when a month string is not a valid `YYYY-MM` value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid reporting month {input:?}: expected YYYY-MM")]
pub struct InvalidMonthError {
    /// The rejected input.
    pub input: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let month: ReportingMonth = "2024-01".parse().unwrap();
        assert_eq!(month.year(), 2024);
        assert_eq!(month.month(), 1);
        assert_eq!(month.to_string(), "2024-01");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("2024".parse::<ReportingMonth>().is_err());
        assert!("2024-13".parse::<ReportingMonth>().is_err());
        assert!("2024-00".parse::<ReportingMonth>().is_err());
        assert!("2024-1".parse::<ReportingMonth>().is_err());
        assert!("24-01".parse::<ReportingMonth>().is_err());
        assert!("2024-01-15".parse::<ReportingMonth>().is_err());
    }

    #[test]
    fn prev_wraps_year_boundary() {
        let jan: ReportingMonth = "2024-01".parse().unwrap();
        assert_eq!(jan.prev().to_string(), "2023-12");
    }

    #[test]
    fn last_n_counts_backwards() {
        let mar: ReportingMonth = "2024-03".parse().unwrap();
        let months: Vec<String> = mar.last_n(4).iter().map(ToString::to_string).collect();
        assert_eq!(months, ["2024-03", "2024-02", "2024-01", "2023-12"]);
    }
}
