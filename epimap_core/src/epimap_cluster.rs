//! The "CLUSTER" Engine - Spatiotemporal Density Grouping
//!
//! Partitions case points into display clusters using BOTH geographic and
//! temporal proximity: density clustering (DBSCAN) over a fused
//! dissimilarity matrix that blends max-normalized haversine distances
//! with day deltas.

use std::collections::VecDeque;

use nalgebra::DMatrix;

use crate::config::ClusterConfig;
use crate::geodesic::{haversine_km, pairwise_matrix};
use crate::types::{CasePoint, Cluster, LatLng};

/// Label assigned to points that never become density-reachable.
pub const NOISE: i32 = -1;

const UNVISITED: i32 = -2;

/// Density clustering of case points over space and time.
///
/// Stateless between calls: every invocation rebuilds its matrices from the
/// input snapshot, so no run leaks into the next and no point list is shared
/// across instances.
#[derive(Debug, Clone)]
pub struct SpatiotemporalClusterer {
    config: ClusterConfig,
}

impl SpatiotemporalClusterer {
    /// Creates a clusterer with the given tuning.
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Clusters the points and summarizes each discovered group.
    ///
    /// Fewer than 2 points cannot form a cluster; the result is an empty
    /// list, not an error.
    pub fn cluster(&self, points: &[CasePoint]) -> Vec<Cluster> {
        if points.len() < 2 {
            return Vec::new();
        }
        let labels = self.assign_labels(points);
        summarize_clusters(points, &labels)
    }

    /// Runs DBSCAN over the fused dissimilarity and returns one label per
    /// input point ([`NOISE`] for unclustered points). Deterministic for
    /// identical input order.
    pub fn assign_labels(&self, points: &[CasePoint]) -> Vec<i32> {
        if points.is_empty() {
            return Vec::new();
        }
        let fused = self.fused_matrix(points);
        dbscan(&fused, self.config.epsilon, self.config.min_points)
    }

    /// Weighted blend of the normalized spatial matrix and the temporal
    /// matrix: `w * spatial + (1 - w) * temporal`.
    fn fused_matrix(&self, points: &[CasePoint]) -> DMatrix<f64> {
        let positions: Vec<LatLng> = points.iter().map(|p| p.position).collect();
        let mut spatial = pairwise_matrix(&positions);

        // Normalize spatial distances into [0, 1]. A zero maximum means
        // every point sits on the same coordinate and the matrix is
        // already all zeros.
        let max = spatial.max();
        if max > 0.0 {
            spatial /= max;
        }

        let temporal = self.temporal_matrix(points);
        let w = self.config.spatial_weight;
        spatial * w + temporal * (1.0 - w)
    }

    /// Pairwise day deltas scaled by the temporal divisor.
    fn temporal_matrix(&self, points: &[CasePoint]) -> DMatrix<f64> {
        let n = points.len();
        let mut temporal = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let days = (points[i].date - points[j].date).num_days().abs() as f64;
                let d = days / self.config.temporal_divisor;
                temporal[(i, j)] = d;
                temporal[(j, i)] = d;
            }
        }
        temporal
    }
}

impl Default for SpatiotemporalClusterer {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}

/// Classic DBSCAN over a precomputed dissimilarity matrix.
///
/// The neighborhood of a point includes the point itself, so a point with
/// `min_points - 1` true neighbors is still a core. Expansion is
/// breadth-first in index order, which keeps labels deterministic for a
/// given input order.
fn dbscan(dist: &DMatrix<f64>, epsilon: f64, min_points: usize) -> Vec<i32> {
    let n = dist.nrows();
    let mut labels = vec![UNVISITED; n];
    let mut next_cluster = 0;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        let neighbors = neighborhood(dist, i, epsilon);
        if neighbors.len() < min_points {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = next_cluster;
        let mut frontier: VecDeque<usize> = neighbors.into();
        while let Some(j) = frontier.pop_front() {
            if labels[j] == NOISE {
                // Border point: reachable from a core, adopt its cluster.
                labels[j] = next_cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = next_cluster;
            let expansion = neighborhood(dist, j, epsilon);
            if expansion.len() >= min_points {
                frontier.extend(expansion);
            }
        }
        next_cluster += 1;
    }

    labels
}

/// Indices within `epsilon` of `i`, `i` itself included.
fn neighborhood(dist: &DMatrix<f64>, i: usize, epsilon: f64) -> Vec<usize> {
    (0..dist.nrows()).filter(|&j| dist[(i, j)] <= epsilon).collect()
}

/// Derives centroid, member count, and spatial extent for each non-noise
/// label, in ascending label order.
///
/// No clusters means an empty list, never an error.
pub fn summarize_clusters(points: &[CasePoint], labels: &[i32]) -> Vec<Cluster> {
    debug_assert_eq!(points.len(), labels.len());
    let max_label = labels.iter().copied().max().unwrap_or(NOISE);
    let mut clusters = Vec::new();

    for label in 0..=max_label {
        let members: Vec<&CasePoint> = points
            .iter()
            .zip(labels)
            .filter(|(_, &l)| l == label)
            .map(|(point, _)| point)
            .collect();
        if members.is_empty() {
            continue;
        }

        // Arithmetic mean of latitudes and longitudes independently: a
        // small-radius approximation, fine for clusters a few km wide.
        let n = members.len() as f64;
        let lat = members.iter().map(|p| p.position.lat()).sum::<f64>() / n;
        let lng = members.iter().map(|p| p.position.lng()).sum::<f64>() / n;
        let centroid = LatLng::from_raw(lat, lng);

        let radius_km = members
            .iter()
            .map(|p| haversine_km(&centroid, &p.position))
            .fold(0.0, f64::max);

        clusters.push(Cluster {
            centroid,
            member_count: members.len(),
            radius_km,
        });
    }

    clusters
}
