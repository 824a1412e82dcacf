//! EpiMap Core - Spatiotemporal Clustering & Spherical Point Synthesis
//!
//! This library holds the two algorithmic engines behind an epidemic case map:
//! 1. **CLUSTER Engine**: groups geographically and temporally related cases
//!    via density clustering over a fused spatial+temporal dissimilarity
//! 2. **SYNTH Engine**: synthesizes plausible case coordinates for dates where
//!    only per-region aggregate counts are known

pub mod config;
pub mod epimap_cluster;
pub mod epimap_synth;
pub mod error;
pub mod geodesic;
pub mod sources;
pub mod types;

// Re-export key types for convenience
pub use epimap_cluster::SpatiotemporalClusterer;
pub use epimap_synth::{RegionAllocator, SphericalPointSampler};
pub use error::{CatalogError, CountParseError, GeoError, SynthError};
pub use types::{
    AllocationPlan, CaseCount, CasePoint, CaseState, Cluster, LatLng, Region, SamplingStrategy,
};
