//! Tunable configuration for both engines.
//!
//! Every constant that was found by experimentation on field data is a named
//! field with a default, so deployments can retune without code edits.

/// Mean Earth radius in meters.
///
/// The single radius constant shared by both engines. Earlier variants of
/// these algorithms mixed the 6371 km mean radius with the 6378137 m
/// equatorial radius; all distances here use the mean radius.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Configuration for the spatiotemporal cluster engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Weight of the spatial term in the fused dissimilarity; the temporal
    /// term gets `1 - spatial_weight`. Space dominates, dates break ties.
    pub spatial_weight: f64,

    /// Neighborhood threshold on the fused dissimilarity.
    pub epsilon: f64,

    /// Minimum neighborhood size (the point itself included) for a point
    /// to count as a cluster core.
    pub min_points: usize,

    /// Divisor normalizing the day delta between two case dates.
    pub temporal_divisor: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            spatial_weight: 0.98,
            epsilon: 0.014,
            min_points: 5,
            temporal_divisor: 10.0,
        }
    }
}

impl ClusterConfig {
    /// Legacy pure-spatial configuration: all weight on the spatial term,
    /// so dates never separate otherwise-coincident groups.
    pub fn spatial_only() -> Self {
        Self {
            spatial_weight: 1.0,
            ..Self::default()
        }
    }
}

/// Configuration for the point-synthesis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Minimum number of recent history points a region needs before the
    /// history-weighted normal strategy replaces uniform sampling.
    pub history_threshold: usize,

    /// How many days back from the target date count as recent history.
    pub lookback_days: i64,

    /// Stand-in count when the source reports the suppressed "<5" sentinel.
    /// A fixed convention, not a statistical estimate.
    pub suppressed_count: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            history_threshold: 20,
            lookback_days: 10,
            suppressed_count: 3,
        }
    }
}
