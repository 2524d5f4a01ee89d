#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Police force registry, crime category taxonomy, and the normalized
//! incident record produced by the archive parser.
//!
//! Category identifiers and severity levels mirror the reference data seeded
//! into `crime_categories`; force identifiers and centre coordinates mirror
//! `police_forces`.

pub mod month;
pub mod report;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use month::{InvalidMonthError, ReportingMonth};
pub use report::{ForceMonthReport, ForceMonthStatus, LoadStats, RunSummary};

/// Severity level for a crime category, from 1 (minimal) to 5 (critical).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CrimeSeverity {
    /// Level 1: Residual categories with no meaningful ranking
    Minimal = 1,
    /// Level 2: Low-level offenses (shoplifting, bicycle theft)
    Low = 2,
    /// Level 3: Moderate offenses (drugs, criminal damage)
    Moderate = 3,
    /// Level 4: Serious offenses (burglary, theft from the person)
    High = 4,
    /// Level 5: Most severe offenses (robbery, violent crime, weapons)
    Critical = 5,
}

impl CrimeSeverity {
    /// Minimum severity level counted as high severity in the summary table.
    pub const HIGH_SEVERITY_MIN: u8 = 3;

    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-5.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Minimal),
            2 => Ok(Self::Low),
            3 => Ok(Self::Moderate),
            4 => Ok(Self::High),
            5 => Ok(Self::Critical),
            _ => Err(InvalidSeverityError { value }),
        }
    }

    /// Returns whether this severity counts toward `high_severity_count`.
    #[must_use]
    pub const fn is_high(self) -> bool {
        self.value() >= Self::HIGH_SEVERITY_MIN
    }
}

/// Error returned when attempting to create a [`CrimeSeverity`] from an
/// invalid numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid severity value {value}: expected 1-5")]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

/// The street-crime categories published by data.police.uk.
///
/// Serialized forms use the kebab-case identifiers the API publishes
/// (e.g. `anti-social-behaviour`), which are also the `category_id` values
/// in the `crime_categories` table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CrimeCategory {
    AntiSocialBehaviour,
    BicycleTheft,
    Burglary,
    CriminalDamageArson,
    Drugs,
    OtherCrime,
    OtherTheft,
    PossessionOfWeapons,
    PublicOrder,
    Robbery,
    Shoplifting,
    TheftFromThePerson,
    VehicleCrime,
    ViolentCrime,
}

impl CrimeCategory {
    /// Returns the human-readable display name for this category.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AntiSocialBehaviour => "Anti-social behaviour",
            Self::BicycleTheft => "Bicycle theft",
            Self::Burglary => "Burglary",
            Self::CriminalDamageArson => "Criminal damage and arson",
            Self::Drugs => "Drugs",
            Self::OtherCrime => "Other crime",
            Self::OtherTheft => "Other theft",
            Self::PossessionOfWeapons => "Possession of weapons",
            Self::PublicOrder => "Public order",
            Self::Robbery => "Robbery",
            Self::Shoplifting => "Shoplifting",
            Self::TheftFromThePerson => "Theft from the person",
            Self::VehicleCrime => "Vehicle crime",
            Self::ViolentCrime => "Violent crime",
        }
    }

    /// Returns the severity level for this category.
    #[must_use]
    pub const fn severity(self) -> CrimeSeverity {
        match self {
            Self::PossessionOfWeapons | Self::Robbery | Self::ViolentCrime => {
                CrimeSeverity::Critical
            }
            Self::Burglary | Self::TheftFromThePerson => CrimeSeverity::High,
            Self::CriminalDamageArson | Self::Drugs | Self::PublicOrder | Self::VehicleCrime => {
                CrimeSeverity::Moderate
            }
            Self::AntiSocialBehaviour | Self::BicycleTheft | Self::OtherTheft | Self::Shoplifting => {
                CrimeSeverity::Low
            }
            Self::OtherCrime => CrimeSeverity::Minimal,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::AntiSocialBehaviour,
            Self::BicycleTheft,
            Self::Burglary,
            Self::CriminalDamageArson,
            Self::Drugs,
            Self::OtherCrime,
            Self::OtherTheft,
            Self::PossessionOfWeapons,
            Self::PublicOrder,
            Self::Robbery,
            Self::Shoplifting,
            Self::TheftFromThePerson,
            Self::VehicleCrime,
            Self::ViolentCrime,
        ]
    }
}

/// A police force tracked by the pipeline.
///
/// The centre coordinates serve two purposes: they parameterize the archive
/// fetch for the force's coverage area, and they attribute stored incidents
/// back to a force when building the summary table (the `crime_incidents`
/// schema carries no force column).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliceForce {
    /// Force identifier (e.g. `"metropolitan"`), the `force_id` column.
    pub id: &'static str,
    /// Human-readable force name.
    pub name: &'static str,
    /// Latitude of the force's centre point (WGS84).
    pub centre_lat: f64,
    /// Longitude of the force's centre point (WGS84).
    pub centre_lng: f64,
}

/// The statically registered police forces.
pub const FORCES: &[PoliceForce] = &[
    PoliceForce {
        id: "metropolitan",
        name: "Metropolitan Police",
        centre_lat: 51.5074,
        centre_lng: -0.1278,
    },
    PoliceForce {
        id: "west-midlands",
        name: "West Midlands Police",
        centre_lat: 52.4895,
        centre_lng: -1.898,
    },
    PoliceForce {
        id: "greater-manchester",
        name: "Greater Manchester Police",
        centre_lat: 53.4808,
        centre_lng: -2.2426,
    },
];

/// Looks up a force by its identifier.
#[must_use]
pub fn force_by_id(id: &str) -> Option<&'static PoliceForce> {
    FORCES.iter().find(|f| f.id == id)
}

/// Attributes a coordinate to the nearest registered force centre.
///
/// Uses equirectangular squared distance, which is accurate enough for
/// nearest-centre selection at UK latitudes given how far apart the force
/// centres are.
#[must_use]
pub fn nearest_force(latitude: f64, longitude: f64) -> &'static PoliceForce {
    let mut best = &FORCES[0];
    let mut best_dist = f64::MAX;

    for force in FORCES {
        let dlat = latitude - force.centre_lat;
        // Longitude degrees shrink with latitude.
        let dlng = (longitude - force.centre_lng) * latitude.to_radians().cos();
        let dist = dlat.mul_add(dlat, dlng * dlng);
        if dist < best_dist {
            best_dist = dist;
            best = force;
        }
    }

    best
}

/// A crime incident normalized from one archive record.
///
/// Field names follow the flattened column layout of the source archives;
/// optional sub-objects (location, street, outcome) are `None` when the
/// source record lacks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeRecord {
    /// Unique incident identifier from the source API (`crime_api_id`).
    pub crime_api_id: i64,
    /// Identifier stable across an incident's lifecycle as outcomes update.
    /// Absent for some categories (notably anti-social behaviour).
    pub persistent_id: Option<String>,
    /// Category identifier (kebab-case, e.g. `"burglary"`).
    pub category: String,
    /// Type of location (e.g. `"Force"` or `"BTP"`).
    pub location_type: Option<String>,
    /// Location subtype, rarely populated.
    pub location_subtype: Option<String>,
    /// Free-text context supplied by the force.
    pub context: Option<String>,
    /// Latitude (WGS84). `None` when the location is unknown.
    pub latitude: Option<f64>,
    /// Longitude (WGS84). `None` when the location is unknown.
    pub longitude: Option<f64>,
    /// Identifier of the nearest street.
    pub street_id: Option<i64>,
    /// Name of the nearest street.
    pub street_name: Option<String>,
    /// Outcome category (e.g. `"Investigation complete; no suspect identified"`).
    /// `None` while the case is unresolved.
    pub outcome_status_category: Option<String>,
    /// Month the outcome was recorded (`YYYY-MM`).
    pub outcome_status_date: Option<String>,
    /// Reporting month (`YYYY-MM`).
    pub month: ReportingMonth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn category_ids_are_kebab_case() {
        assert_eq!(CrimeCategory::AntiSocialBehaviour.as_ref(), "anti-social-behaviour");
        assert_eq!(CrimeCategory::TheftFromThePerson.as_ref(), "theft-from-the-person");
        assert_eq!(
            CrimeCategory::from_str("criminal-damage-arson").unwrap(),
            CrimeCategory::CriminalDamageArson
        );
        assert!(CrimeCategory::from_str("jaywalking").is_err());
    }

    #[test]
    fn severity_range_valid() {
        for category in CrimeCategory::all() {
            let val = category.severity().value();
            assert!((1..=5).contains(&val), "{category:?} severity {val} out of range");
        }
    }

    #[test]
    fn severity_from_value_roundtrip() {
        for v in 1..=5u8 {
            let severity = CrimeSeverity::from_value(v).unwrap();
            assert_eq!(severity.value(), v);
        }
        assert!(CrimeSeverity::from_value(0).is_err());
        assert!(CrimeSeverity::from_value(6).is_err());
    }

    #[test]
    fn moderate_and_above_is_high_severity() {
        assert!(!CrimeSeverity::Minimal.is_high());
        assert!(!CrimeSeverity::Low.is_high());
        assert!(CrimeSeverity::Moderate.is_high());
        assert!(CrimeSeverity::High.is_high());
        assert!(CrimeSeverity::Critical.is_high());
    }

    #[test]
    fn nearest_force_picks_centre() {
        // Birmingham city centre
        assert_eq!(nearest_force(52.48, -1.9).id, "west-midlands");
        // Central London
        assert_eq!(nearest_force(51.51, -0.13).id, "metropolitan");
        // Salford
        assert_eq!(nearest_force(53.49, -2.29).id, "greater-manchester");
    }

    #[test]
    fn force_lookup_by_id() {
        assert_eq!(force_by_id("metropolitan").unwrap().name, "Metropolitan Police");
        assert!(force_by_id("gotham").is_none());
    }
}
