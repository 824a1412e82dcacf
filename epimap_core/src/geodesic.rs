//! Great-circle distance on the Earth sphere.
//!
//! Shared by both engines: the cluster engine builds its pairwise matrices
//! here, and the synth engine is tested against these distances.

use nalgebra::DMatrix;

use crate::config::EARTH_RADIUS_M;
use crate::types::LatLng;

/// Haversine distance between two coordinates, in meters.
pub fn haversine_m(a: &LatLng, b: &LatLng) -> f64 {
    let lat_a = a.lat().to_radians();
    let lat_b = b.lat().to_radians();
    let d_lat = lat_b - lat_a;
    let d_lng = (b.lng() - a.lng()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    // h can drift above 1 by rounding for near-antipodal pairs.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Haversine distance in kilometers.
pub fn haversine_km(a: &LatLng, b: &LatLng) -> f64 {
    haversine_m(a, b) / 1000.0
}

/// Dense pairwise distance matrix in meters.
///
/// Symmetric with a zero diagonal; rebuilt per clustering call and never
/// reused across inputs.
pub fn pairwise_matrix(points: &[LatLng]) -> DMatrix<f64> {
    let n = points.len();
    let mut dist = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = haversine_m(&points[i], &points[j]);
            dist[(i, j)] = d;
            dist[(j, i)] = d;
        }
    }
    dist
}
