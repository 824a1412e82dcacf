//! Shared data types for the EpiMap engines.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CountParseError, GeoError};

/// A validated geographic coordinate pair, in degrees.
///
/// Construction is the validation gate for the whole crate: every
/// latitude/longitude entering the engines passes through [`LatLng::new`]
/// (deserialization included), so the distance and sampling code never sees
/// an out-of-range or non-finite coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLatLng")]
pub struct LatLng {
    lat: f64,
    lng: f64,
}

/// Unvalidated mirror that funnels deserialization through [`LatLng::new`].
#[derive(Debug, Clone, Copy, Deserialize)]
struct RawLatLng {
    lat: f64,
    lng: f64,
}

impl LatLng {
    /// Creates a coordinate pair, rejecting out-of-range or non-finite values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeoError::NonFinite { lat, lng });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Builds a coordinate already known to be in range (means of validated
    /// inputs, wrapped sampler output).
    pub(crate) fn from_raw(lat: f64, lng: f64) -> Self {
        debug_assert!((-90.0..=90.0).contains(&lat), "latitude {lat}");
        debug_assert!((-180.0..=180.0).contains(&lng), "longitude {lng}");
        Self { lat, lng }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl TryFrom<RawLatLng> for LatLng {
    type Error = GeoError;

    fn try_from(raw: RawLatLng) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// Infection status attached to a case point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseState {
    Positive,
    Negative,
    Recovered,
    Unknown,
}

/// A single epidemic case on the map.
///
/// Case points are immutable snapshots: the engines read them and never
/// mutate them; synthesized points are new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasePoint {
    /// Where the case was reported
    pub position: LatLng,

    /// Reporting date
    pub date: NaiveDate,

    /// Infection status
    pub state: CaseState,

    /// Region (municipality) label
    pub region: String,
}

impl CasePoint {
    /// Creates a case point snapshot.
    pub fn new(
        position: LatLng,
        date: NaiveDate,
        state: CaseState,
        region: impl Into<String>,
    ) -> Self {
        Self {
            position,
            date,
            state,
            region: region.into(),
        }
    }
}

/// Static reference data for a geographic region (municipality).
///
/// Supplied externally; the engines never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Name as it appears in the case-count records
    pub name: String,

    /// Static center of the region's bounding circle
    pub center: LatLng,

    /// Bounding-circle radius in meters
    pub radius_m: f64,
}

impl Region {
    /// Creates a region, rejecting a non-finite or negative radius.
    pub fn new(name: impl Into<String>, center: LatLng, radius_m: f64) -> Result<Self, GeoError> {
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(GeoError::InvalidRadius(radius_m));
        }
        Ok(Self {
            name: name.into(),
            center,
            radius_m,
        })
    }
}

/// A derived display cluster.
///
/// Always recomputed from the current point set and label vector, never
/// persisted. The radius is the maximum geodesic distance from the centroid
/// to any member, not an independently stored property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Arithmetic-mean centroid of the member coordinates
    pub centroid: LatLng,

    /// Number of member points
    pub member_count: usize,

    /// Maximum geodesic distance from centroid to any member, kilometers
    pub radius_km: f64,
}

/// A recorded case count for one (date, region) pair.
///
/// Aggregate sources suppress small values and publish the literal "<5"
/// instead of a number; the sentinel is carried as-is rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CaseCount {
    /// Exact reported count
    Exact(u32),

    /// Suppressed small count, published as "<5"
    FewerThanFive,
}

impl CaseCount {
    /// Number of points to synthesize for this count. A suppressed count
    /// resolves to the fixed `suppressed_count` convention (see
    /// [`crate::config::SynthConfig`]).
    pub fn resolve(&self, suppressed_count: u32) -> u32 {
        match self {
            Self::Exact(n) => *n,
            Self::FewerThanFive => suppressed_count,
        }
    }
}

impl FromStr for CaseCount {
    type Err = CountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "<5" {
            return Ok(Self::FewerThanFive);
        }
        s.parse::<u32>()
            .map(Self::Exact)
            .map_err(|_| CountParseError(s.to_string()))
    }
}

impl TryFrom<String> for CaseCount {
    type Error = CountParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CaseCount> for String {
    fn from(count: CaseCount) -> String {
        count.to_string()
    }
}

impl fmt::Display for CaseCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::FewerThanFive => write!(f, "<5"),
        }
    }
}

/// How synthesized coordinates are distributed within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Bearing ~ U[0°, 360°), radius ~ U[0, region radius], around the
    /// static region center. Used when recent history is thin.
    Uniform,

    /// Bearing ~ U[0°, 180°), radius ~ N(0, region radius / 2), around the
    /// centroid of recent history.
    Normal,
}

/// The synthesis decision for one (region, date) pair.
///
/// Transient: computed once per call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Region label attached to every synthesized point
    pub region: String,

    /// Number of points to synthesize
    pub points_to_generate: u32,

    /// Spatial distribution choice
    pub strategy: SamplingStrategy,

    /// Circle center the draws are anchored on
    pub center: LatLng,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_accepts_valid_range() {
        let p = LatLng::new(50.85, 4.35).unwrap();
        assert_eq!(p.lat(), 50.85);
        assert_eq!(p.lng(), 4.35);

        assert!(LatLng::new(90.0, 180.0).is_ok());
        assert!(LatLng::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_latlng_rejects_out_of_range() {
        assert!(matches!(
            LatLng::new(90.5, 0.0),
            Err(GeoError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            LatLng::new(0.0, -180.5),
            Err(GeoError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            LatLng::new(f64::NAN, 0.0),
            Err(GeoError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_latlng_deserialization_validates() {
        let ok: Result<LatLng, _> = serde_json::from_str(r#"{"lat": 50.85, "lng": 4.35}"#);
        assert!(ok.is_ok());

        let bad: Result<LatLng, _> = serde_json::from_str(r#"{"lat": 123.0, "lng": 4.35}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_region_rejects_bad_radius() {
        let center = LatLng::new(50.85, 4.35).unwrap();
        assert!(Region::new("Bruxelles", center, -1.0).is_err());
        assert!(Region::new("Bruxelles", center, f64::NAN).is_err());
        assert!(Region::new("Bruxelles", center, 500.0).is_ok());
    }

    #[test]
    fn test_case_count_parsing() {
        assert_eq!("12".parse::<CaseCount>().unwrap(), CaseCount::Exact(12));
        assert_eq!("<5".parse::<CaseCount>().unwrap(), CaseCount::FewerThanFive);
        assert_eq!(" <5 ".parse::<CaseCount>().unwrap(), CaseCount::FewerThanFive);
        assert!("many".parse::<CaseCount>().is_err());
        assert!("-3".parse::<CaseCount>().is_err());
    }

    #[test]
    fn test_case_count_resolution() {
        assert_eq!(CaseCount::Exact(12).resolve(3), 12);
        assert_eq!(CaseCount::FewerThanFive.resolve(3), 3);
    }

    #[test]
    fn test_case_point_serde_round_trip() {
        let point = CasePoint::new(
            LatLng::new(50.85, 4.35).unwrap(),
            NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
            CaseState::Positive,
            "Bruxelles",
        );
        let json = serde_json::to_string(&point).unwrap();
        let back: CasePoint = serde_json::from_str(&json).unwrap();
        assert_eq!(point, back);
    }
}
