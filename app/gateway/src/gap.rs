//! Pairwise gap computation.
//!
//! Pairs are enumerated over the positioned runners sorted ascending by
//! runner id: `(0, 1), (0, 2), .., (1, 2), ..`. The largest gap is the first
//! pair in that order whose rounded distance is strictly greater than every
//! earlier pair's, so identical inputs always report the same pair.

use crate::session::RunnerRecord;
use protocol::{Gap, Position};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// All gaps of a run plus the largest one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapReport {
    /// One entry per unordered pair of positioned runners.
    pub gaps: Vec<Gap>,
    /// The most separated pair, absent with fewer than two positioned
    /// runners.
    pub largest_gap: Option<Gap>,
}

/// Great-circle distance in meters between two positions.
pub fn haversine(from: Position, to: Position) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for near-antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Compute every pairwise gap between the positioned runners.
///
/// Runners without a position are skipped. Input order does not matter.
pub fn compute_gaps<'a>(runners: impl IntoIterator<Item = &'a RunnerRecord>) -> GapReport {
    let mut positioned: Vec<(&RunnerRecord, Position)> = runners
        .into_iter()
        .filter_map(|r| r.position.map(|p| (r, p)))
        .collect();
    if positioned.len() < 2 {
        return GapReport::default();
    }
    positioned.sort_by(|(a, _), (b, _)| a.id.cmp(&b.id));

    let mut gaps: Vec<Gap> = Vec::with_capacity(positioned.len() * (positioned.len() - 1) / 2);
    let mut largest: Option<usize> = None;
    for (i, (a, pa)) in positioned.iter().enumerate() {
        for (b, pb) in &positioned[i + 1..] {
            let gap = Gap {
                runner_a: a.name.clone(),
                runner_b: b.name.clone(),
                distance_meters: haversine(*pa, *pb).round(),
                speed_difference_mps: round_tenths((a.speed - b.speed).abs()),
            };
            if largest.is_none_or(|l| gap.distance_meters > gaps[l].distance_meters) {
                largest = Some(gaps.len());
            }
            gaps.push(gap);
        }
    }

    let largest_gap = largest.map(|l| gaps[l].clone());
    GapReport { gaps, largest_gap }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_same_point() {
        let p = Position::new(37.7749, -122.4194);
        assert_eq!(haversine(p, p), 0.0);
    }

    #[test]
    fn haversine_one_degree_of_latitude() {
        let d = haversine(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = Position::new(51.5074, -0.1278);
        let b = Position::new(48.8566, 2.3522);
        assert!((haversine(a, b) - haversine(b, a)).abs() < 1e-6);
    }

    #[test]
    fn haversine_near_antipodal_is_finite() {
        let half_circumference = EARTH_RADIUS_METERS * std::f64::consts::PI;
        for i in 0..2000 {
            let lat = -89.0 + f64::from(i) * 0.089;
            let lon = -179.0 + f64::from(i) * 0.179;
            let d = haversine(Position::new(lat, lon), Position::new(-lat, lon - 180.0));
            assert!(d.is_finite(), "NaN for latitude {lat}, longitude {lon}");
            assert!(d <= half_circumference + 1.0);
        }
        let d = haversine(Position::new(-88.107, 10.7), Position::new(88.107, -169.3));
        assert!((d - half_circumference).abs() < 1.0, "got {d}");
    }

    #[test]
    fn largest_gap_is_finite_for_antipodal_runners() {
        let mut far = RunnerRecord::live("a", "X");
        far.apply(Position::new(-88.107, 10.7), 0.0);
        let mut other = RunnerRecord::live("b", "Y");
        other.apply(Position::new(88.107, -169.3), 0.0);
        let mut near = RunnerRecord::live("c", "Z");
        near.apply(Position::new(88.0, -169.3), 0.0);

        let report = compute_gaps([&far, &other, &near]);
        assert!(report.gaps.iter().all(|g| g.distance_meters.is_finite()));
        let largest = report.largest_gap.unwrap();
        let max = report
            .gaps
            .iter()
            .map(|g| g.distance_meters)
            .fold(0.0, f64::max);
        assert_eq!(largest.distance_meters, max);
    }

    #[test]
    fn round_tenths_rounds_half_away() {
        assert_eq!(round_tenths(1.25), 1.3);
        assert_eq!(round_tenths(0.04), 0.0);
    }
}
