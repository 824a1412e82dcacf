//! Error types for the EpiMap engines.

use thiserror::Error;

/// Errors from coordinate validation and spherical geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90]
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180]
    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// NaN or infinite coordinate
    #[error("non-finite coordinate ({lat}, {lng})")]
    NonFinite { lat: f64, lng: f64 },

    /// Region radius must be finite and non-negative
    #[error("invalid region radius {0} m")]
    InvalidRadius(f64),

    /// Sampling origin at a pole: the reverse-haversine step divides by cos(lat)
    #[error("sampling origin at latitude {0} is too close to a pole")]
    PoleProximity(f64),

    /// No point at the requested distance shares the origin's latitude
    #[error("distance {distance_m} m is not reachable along latitude {lat}")]
    UnreachableDistance { lat: f64, distance_m: f64 },

    /// The auxiliary-vector basis construction is undefined at latitude 0
    #[error("circle basis degenerates at latitude {0}")]
    DegenerateBasis(f64),
}

/// Region catalog lookup failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// The region name is not in the catalog. Indicates a data-consistency
    /// problem upstream; callers should not retry.
    #[error("unknown region: {0}")]
    NotFound(String),
}

/// Errors from the point-synthesis engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The normal-mode radius distribution could not be built
    #[error("invalid radius distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),
}

/// Failure to parse a recorded case count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable case count {0:?} (expected an integer or \"<5\")")]
pub struct CountParseError(pub String);
