//! The "SYNTH" Engine - Spherical Point Synthesis
//!
//! Synthesizes plausible case coordinates for dates where only per-region
//! aggregate counts are known. A sampler places points on a circle of a
//! requested geodesic radius using 3-D cartesian vector algebra (planar
//! approximations drift at municipality scale), and an allocator decides
//! per region how many points to draw and from which distribution.

use chrono::{Duration, NaiveDate};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::config::{SynthConfig, EARTH_RADIUS_M};
use crate::error::{GeoError, SynthError};
use crate::sources::{CaseCountTable, PointSource, RegionCatalog};
use crate::types::{
    AllocationPlan, CaseCount, CasePoint, CaseState, LatLng, Region, SamplingStrategy,
};

/// Places points on the sphere at exact geodesic distances.
///
/// Works entirely on the sphere of radius [`EARTH_RADIUS_M`]; no planar
/// shortcuts, so wide municipality circles keep their true size.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalPointSampler;

impl SphericalPointSampler {
    /// Converts a degree coordinate pair to cartesian coordinates on the
    /// Earth sphere.
    pub fn latlng_to_cartesian(p: &LatLng) -> Vector3<f64> {
        let lat = p.lat().to_radians();
        let lng = p.lng().to_radians();
        Vector3::new(
            EARTH_RADIUS_M * lat.cos() * lng.cos(),
            EARTH_RADIUS_M * lat.cos() * lng.sin(),
            EARTH_RADIUS_M * lat.sin(),
        )
    }

    /// Converts cartesian coordinates on the Earth sphere back to degrees.
    pub fn cartesian_to_latlng(v: &Vector3<f64>) -> Result<LatLng, GeoError> {
        let lat = (v.z / EARTH_RADIUS_M).clamp(-1.0, 1.0).asin();
        let lng = v.y.atan2(v.x);
        LatLng::new(lat.to_degrees(), lng.to_degrees())
    }

    /// Point at geodesic distance `distance_m` from `origin` along bearing
    /// `bearing_deg`.
    ///
    /// A negative distance means the same magnitude on the opposite
    /// bearing, which is where normal-mode radius draws below zero land.
    ///
    /// The construction: fix one point Q on the circle of radius
    /// `distance_m` around the origin (reverse haversine at equal
    /// latitude), build an orthonormal basis (u, v) of the circle's plane,
    /// then project onto the circle at the requested angle.
    pub fn circle_point(
        origin: &LatLng,
        distance_m: f64,
        bearing_deg: f64,
    ) -> Result<LatLng, GeoError> {
        let (distance_m, bearing_deg) = if distance_m < 0.0 {
            (-distance_m, bearing_deg + 180.0)
        } else {
            (distance_m, bearing_deg)
        };
        if origin.lat() == 0.0 {
            return Err(GeoError::DegenerateBasis(origin.lat()));
        }

        let q_latlng = Self::reverse_haversine(origin, distance_m)?;

        let p = Self::latlng_to_cartesian(origin);
        let q = Self::latlng_to_cartesian(&q_latlng);
        let (u, v) = Self::circle_basis(&p, &q);

        // Projection of Q onto the P axis is the planar center of the
        // circle; the circle lives in the plane through it normal to P.
        let c = (p.dot(&q) / p.norm_squared()) * p;

        let t = bearing_deg.to_radians();
        let s = c + distance_m * (t.cos() * u + t.sin() * v);

        Self::cartesian_to_latlng(&s)
    }

    /// Finds the point at haversine distance `distance_m` from `p` sharing
    /// its latitude (the westward one of the two).
    ///
    /// Solves the haversine equation at fixed latitude:
    /// `d_lng = 2 * asin( sqrt( sin^2(d / 2R) / cos^2(lat) ) )`.
    fn reverse_haversine(p: &LatLng, distance_m: f64) -> Result<LatLng, GeoError> {
        if p.lat().abs() >= 90.0 {
            return Err(GeoError::PoleProximity(p.lat()));
        }
        let cos_lat = p.lat().to_radians().cos();

        let half_angle = distance_m / EARTH_RADIUS_M / 2.0;
        let frac = half_angle.sin().powi(2) / cos_lat.powi(2);
        if frac > 1.0 {
            // No point this far away shares the latitude; also the failure
            // mode of near-pole origins.
            return Err(GeoError::UnreachableDistance {
                lat: p.lat(),
                distance_m,
            });
        }

        let d_lng = 2.0 * frac.sqrt().asin();
        let mut lng = p.lng() - d_lng.to_degrees();
        if lng < -180.0 {
            lng += 360.0;
        }
        Ok(LatLng::from_raw(p.lat(), lng))
    }

    /// Orthonormal basis (u, v) of the plane through `q` normal to the `p`
    /// axis, derived from an auxiliary vector of the form (1, 1, z).
    fn circle_basis(p: &Vector3<f64>, q: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        debug_assert!(p.z != 0.0, "caller rejects equatorial origins");

        // (1, 1, z_aux) satisfies the plane equation p . x = p . q, so it
        // shares the circle's plane with q.
        let z_aux = (p.dot(q) - p.x - p.y) / p.z;
        let aux = Vector3::new(1.0, 1.0, z_aux);

        let u = (q - aux).normalize();
        let v = p.cross(&u).normalize();
        (u, v)
    }
}

/// Decides how many points to synthesize per region and drives the sampler.
///
/// Owns its RNG: one seed at construction makes a whole run reproducible,
/// and nothing is shared between allocator instances.
#[derive(Debug, Clone)]
pub struct RegionAllocator {
    config: SynthConfig,
    rng: ChaCha8Rng,
}

impl RegionAllocator {
    /// Creates an allocator with the given tuning and RNG seed.
    pub fn new(config: SynthConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Computes the allocation decision for one (region, date) pair.
    ///
    /// Regions with thin recent history get uniform draws around the
    /// static region center; regions with at least
    /// `history_threshold` recent points get normal draws around the
    /// centroid of that history.
    pub fn plan(
        &self,
        region: &Region,
        date: NaiveDate,
        history: &[CasePoint],
        count: CaseCount,
    ) -> AllocationPlan {
        let recent = self.recent_history(region, date, history);
        let points_to_generate = count.resolve(self.config.suppressed_count);

        if recent.len() < self.config.history_threshold {
            AllocationPlan {
                region: region.name.clone(),
                points_to_generate,
                strategy: SamplingStrategy::Uniform,
                center: region.center,
            }
        } else {
            // Recenter on where recent cases actually happened.
            let n = recent.len() as f64;
            let lat = recent.iter().map(|p| p.position.lat()).sum::<f64>() / n;
            let lng = recent.iter().map(|p| p.position.lng()).sum::<f64>() / n;
            AllocationPlan {
                region: region.name.clone(),
                points_to_generate,
                strategy: SamplingStrategy::Normal,
                center: LatLng::from_raw(lat, lng),
            }
        }
    }

    /// Synthesizes the points for one region and date.
    ///
    /// The output length always equals the resolved case count; order
    /// carries no meaning. Every synthesized point gets the region label
    /// and the target date, with state `Positive`.
    pub fn synthesize(
        &mut self,
        region: &Region,
        date: NaiveDate,
        history: &[CasePoint],
        count: CaseCount,
    ) -> Result<Vec<CasePoint>, SynthError> {
        if !region.radius_m.is_finite() || region.radius_m < 0.0 {
            return Err(GeoError::InvalidRadius(region.radius_m).into());
        }

        let plan = self.plan(region, date, history, count);
        debug!(
            "{}: {:?} strategy, {} points",
            plan.region, plan.strategy, plan.points_to_generate
        );

        let n = plan.points_to_generate as usize;
        let mut points = Vec::with_capacity(n);

        match plan.strategy {
            SamplingStrategy::Uniform => {
                for _ in 0..n {
                    let bearing = self.rng.gen_range(0.0..360.0);
                    let radius = self.rng.gen_range(0.0..=region.radius_m);
                    let position =
                        SphericalPointSampler::circle_point(&plan.center, radius, bearing)?;
                    points.push(CasePoint::new(
                        position,
                        date,
                        CaseState::Positive,
                        &plan.region,
                    ));
                }
            }
            SamplingStrategy::Normal => {
                let radius_distr = Normal::new(0.0, region.radius_m / 2.0)?;
                for _ in 0..n {
                    let bearing = self.rng.gen_range(0.0..180.0);
                    let radius = radius_distr.sample(&mut self.rng);
                    let position =
                        SphericalPointSampler::circle_point(&plan.center, radius, bearing)?;
                    points.push(CasePoint::new(
                        position,
                        date,
                        CaseState::Positive,
                        &plan.region,
                    ));
                }
            }
        }

        Ok(points)
    }

    /// Runs synthesis for every region the count table reports on `date`.
    ///
    /// Unknown regions in the catalog propagate as errors; they signal an
    /// upstream data problem, not something to retry here. Per-region runs
    /// are independent of each other.
    pub fn synthesize_for_date(
        &mut self,
        date: NaiveDate,
        source: &impl PointSource,
        catalog: &impl RegionCatalog,
        counts: &impl CaseCountTable,
    ) -> Result<Vec<CasePoint>, SynthError> {
        let window_start = date - Duration::days(self.config.lookback_days);
        let history = source.points_between(window_start, date);

        let mut all_points = Vec::new();
        for (region_name, count) in counts.counts_on(date) {
            let region = catalog.lookup(&region_name)?;
            let mut points = self.synthesize(&region, date, &history, count)?;
            all_points.append(&mut points);
        }
        Ok(all_points)
    }

    /// History points that inform the strategy for `region` on `date`:
    /// same region (case-insensitive) with dates inside the lookback
    /// window, the target date excluded.
    fn recent_history<'a>(
        &self,
        region: &Region,
        date: NaiveDate,
        history: &'a [CasePoint],
    ) -> Vec<&'a CasePoint> {
        let window_start = date - Duration::days(self.config.lookback_days);
        history
            .iter()
            .filter(|p| p.region.eq_ignore_ascii_case(&region.name))
            .filter(|p| p.date >= window_start && p.date < date)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesic::haversine_m;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn brussels() -> LatLng {
        LatLng::new(50.85, 4.35).unwrap()
    }

    fn region(radius_m: f64) -> Region {
        Region::new("Bruxelles", brussels(), radius_m).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, 15).unwrap()
    }

    fn history_point(lat: f64, lng: f64, day: u32) -> CasePoint {
        CasePoint::new(
            LatLng::new(lat, lng).unwrap(),
            NaiveDate::from_ymd_opt(2020, 4, day).unwrap(),
            CaseState::Positive,
            "Bruxelles",
        )
    }

    #[test]
    fn test_cartesian_round_trip() {
        for (lat, lng) in [(50.85, 4.35), (-33.87, 151.21), (0.01, -78.47), (89.0, 0.0)] {
            let p = LatLng::new(lat, lng).unwrap();
            let v = SphericalPointSampler::latlng_to_cartesian(&p);
            let back = SphericalPointSampler::cartesian_to_latlng(&v).unwrap();
            assert_relative_eq!(back.lat(), lat, epsilon = 1e-6);
            assert_relative_eq!(back.lng(), lng, epsilon = 1e-6);
        }
    }

    proptest! {
        #[test]
        fn prop_cartesian_round_trip(lat in -89.0f64..89.0, lng in -179.0f64..179.0) {
            let p = LatLng::new(lat, lng).unwrap();
            let v = SphericalPointSampler::latlng_to_cartesian(&p);
            let back = SphericalPointSampler::cartesian_to_latlng(&v).unwrap();
            prop_assert!((back.lat() - lat).abs() < 1e-6);
            prop_assert!((back.lng() - lng).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sampler_distance_fidelity() {
        let origin = brussels();
        for radius_m in [100.0, 500.0, 5_000.0] {
            for step in 0..16 {
                let bearing = f64::from(step) * 22.5;
                let s = SphericalPointSampler::circle_point(&origin, radius_m, bearing).unwrap();
                let d = haversine_m(&origin, &s);
                assert!(
                    (d - radius_m).abs() / radius_m < 1e-3,
                    "r={radius_m} t={bearing}: got {d}"
                );
            }
        }
    }

    #[test]
    fn test_zero_distance_returns_origin() {
        let origin = brussels();
        let s = SphericalPointSampler::circle_point(&origin, 0.0, 45.0).unwrap();
        assert!(haversine_m(&origin, &s) < 1e-6);
    }

    #[test]
    fn test_negative_distance_is_opposite_bearing() {
        let origin = brussels();
        let flipped = SphericalPointSampler::circle_point(&origin, -500.0, 90.0).unwrap();
        let opposite = SphericalPointSampler::circle_point(&origin, 500.0, 270.0).unwrap();
        assert_relative_eq!(flipped.lat(), opposite.lat(), epsilon = 1e-9);
        assert_relative_eq!(flipped.lng(), opposite.lng(), epsilon = 1e-9);
    }

    #[test]
    fn test_polar_origin_is_rejected() {
        let pole = LatLng::new(90.0, 0.0).unwrap();
        let err = SphericalPointSampler::circle_point(&pole, 500.0, 0.0).unwrap_err();
        assert!(matches!(err, GeoError::PoleProximity(_)));

        // Near the pole the equal-latitude circle cannot reach 500 m.
        let near_pole = LatLng::new(89.99999, 0.0).unwrap();
        let err = SphericalPointSampler::circle_point(&near_pole, 500.0, 0.0).unwrap_err();
        assert!(matches!(err, GeoError::UnreachableDistance { .. }));
    }

    #[test]
    fn test_equatorial_origin_is_rejected() {
        let equator = LatLng::new(0.0, 10.0).unwrap();
        let err = SphericalPointSampler::circle_point(&equator, 500.0, 0.0).unwrap_err();
        assert!(matches!(err, GeoError::DegenerateBasis(_)));
    }

    #[test]
    fn test_uniform_synthesis_stays_inside_region() {
        let region = region(500.0);
        let mut allocator = RegionAllocator::new(SynthConfig::default(), 42);

        let points = allocator
            .synthesize(&region, date(), &[], CaseCount::Exact(10))
            .unwrap();

        assert_eq!(points.len(), 10);
        for point in &points {
            assert!(point.position.lat().is_finite() && point.position.lng().is_finite());
            assert!(haversine_m(&region.center, &point.position) <= 500.0 * 1.001);
            assert_eq!(point.region, "Bruxelles");
            assert_eq!(point.date, date());
            assert_eq!(point.state, CaseState::Positive);
        }
    }

    #[test]
    fn test_suppressed_count_resolves_to_three() {
        let region = region(500.0);
        let mut allocator = RegionAllocator::new(SynthConfig::default(), 42);
        let points = allocator
            .synthesize(&region, date(), &[], CaseCount::FewerThanFive)
            .unwrap();
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_strategy_boundary_at_history_threshold() {
        let region = region(500.0);
        let allocator = RegionAllocator::new(SynthConfig::default(), 42);

        let nineteen: Vec<CasePoint> = (0..19)
            .map(|i| history_point(50.85 + 0.0001 * f64::from(i), 4.35, 10))
            .collect();
        let plan = allocator.plan(&region, date(), &nineteen, CaseCount::Exact(5));
        assert_eq!(plan.strategy, SamplingStrategy::Uniform);
        assert_eq!(plan.center, region.center);

        let twenty: Vec<CasePoint> = (0..20)
            .map(|i| history_point(50.85 + 0.0001 * f64::from(i), 4.35, 10))
            .collect();
        let plan = allocator.plan(&region, date(), &twenty, CaseCount::Exact(5));
        assert_eq!(plan.strategy, SamplingStrategy::Normal);
    }

    #[test]
    fn test_history_outside_lookback_window_is_ignored() {
        let region = region(500.0);
        let allocator = RegionAllocator::new(SynthConfig::default(), 42);

        // 2020-04-15 minus 10 days is 2020-04-05; day 2 is out of window.
        let stale: Vec<CasePoint> = (0..25).map(|_| history_point(50.85, 4.35, 2)).collect();
        let plan = allocator.plan(&region, date(), &stale, CaseCount::Exact(5));
        assert_eq!(plan.strategy, SamplingStrategy::Uniform);

        // The target date itself is not history either.
        let same_day: Vec<CasePoint> = (0..25).map(|_| history_point(50.85, 4.35, 15)).collect();
        let plan = allocator.plan(&region, date(), &same_day, CaseCount::Exact(5));
        assert_eq!(plan.strategy, SamplingStrategy::Uniform);
    }

    #[test]
    fn test_region_match_is_case_insensitive() {
        let region = region(500.0);
        let allocator = RegionAllocator::new(SynthConfig::default(), 42);

        let shouted: Vec<CasePoint> = (0..20)
            .map(|_| {
                let mut p = history_point(50.85, 4.35, 10);
                p.region = "BRUXELLES".to_string();
                p
            })
            .collect();
        let plan = allocator.plan(&region, date(), &shouted, CaseCount::Exact(5));
        assert_eq!(plan.strategy, SamplingStrategy::Normal);
    }

    #[test]
    fn test_normal_mode_centers_on_history_centroid() {
        let region = region(500.0);
        let mut allocator = RegionAllocator::new(SynthConfig::default(), 7);

        // Recent cases concentrate away from the static center.
        let history: Vec<CasePoint> = (0..20)
            .map(|i| history_point(50.90 + 0.0001 * f64::from(i % 5), 4.40, 10))
            .collect();

        let plan = allocator.plan(&region, date(), &history, CaseCount::Exact(8));
        assert_eq!(plan.strategy, SamplingStrategy::Normal);
        assert_relative_eq!(plan.center.lat(), 50.9002, epsilon = 1e-9);
        assert_relative_eq!(plan.center.lng(), 4.40, epsilon = 1e-9);

        let centroid = plan.center;
        let points = allocator
            .synthesize(&region, date(), &history, CaseCount::Exact(8))
            .unwrap();
        assert_eq!(points.len(), 8);
        for point in &points {
            // Draws come from N(0, 250 m); anything near the static center
            // (~4 km away) would mean the wrong anchor was used.
            assert!(haversine_m(&centroid, &point.position) < 2_000.0);
        }
    }

    #[test]
    fn test_same_seed_reproduces_output() {
        let region = region(500.0);
        let mut a = RegionAllocator::new(SynthConfig::default(), 42);
        let mut b = RegionAllocator::new(SynthConfig::default(), 42);

        let points_a = a.synthesize(&region, date(), &[], CaseCount::Exact(10)).unwrap();
        let points_b = b.synthesize(&region, date(), &[], CaseCount::Exact(10)).unwrap();
        assert_eq!(points_a, points_b);

        let mut c = RegionAllocator::new(SynthConfig::default(), 43);
        let points_c = c.synthesize(&region, date(), &[], CaseCount::Exact(10)).unwrap();
        assert_ne!(points_a, points_c);
    }
}
