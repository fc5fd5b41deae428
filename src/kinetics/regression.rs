// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Least Squares & Threshold Crossing

use serde::{Deserialize, Serialize};

use super::ThresholdCrossing;
use crate::types::Observation;

/// Ordinary least squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// 1.0 for a perfect fit; 1.0 also when all `y` are equal (nothing to explain).
    pub r_squared: f64,
    pub n: usize,
}

/// Fits `points` as `(x, y)`. `None` with fewer than two points or when every
/// `x` is the same.
pub fn ordinary_least_squares(points: &[(f64, f64)]) -> Option<LinearFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for &(x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 { 1.0 } else { (sxy * sxy) / (sxx * syy) };

    Some(LinearFit { slope, intercept, r_squared, n })
}

/// First time the observed value drops strictly below `threshold`, linearly
/// interpolated between the bracketing observations. Never extrapolates.
///
/// `observations` must be non-empty and in time order.
pub fn first_downward_crossing(observations: &[Observation], threshold: f64) -> ThresholdCrossing {
    match observations.first() {
        Some(first) if first.value < threshold => return ThresholdCrossing::BelowAtStart,
        None => return ThresholdCrossing::NotReachedWithinWindow,
        _ => {}
    }

    for pair in observations.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.value >= threshold && b.value < threshold {
            // a.value > b.value here, so the span is non-zero
            let frac = (a.value - threshold) / (a.value - b.value);
            let time_days = a.time_days + frac * (b.time_days - a.time_days);
            return ThresholdCrossing::Reached { sample_index: b.index, time_days };
        }
    }
    ThresholdCrossing::NotReachedWithinWindow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(points: &[(f64, f64)]) -> Vec<Observation> {
        points
            .iter()
            .enumerate()
            .map(|(index, &(time_days, value))| Observation { index, time_days, value })
            .collect()
    }

    #[test]
    fn ols_recovers_exact_line() {
        let fit = ordinary_least_squares(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.n, 4);
    }

    #[test]
    fn ols_flat_line_is_perfect() {
        let fit = ordinary_least_squares(&[(0.0, 2.0), (5.0, 2.0)]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 1.0);
    }

    #[test]
    fn ols_needs_two_distinct_x() {
        assert!(ordinary_least_squares(&[(1.0, 1.0)]).is_none());
        assert!(ordinary_least_squares(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }

    #[test]
    fn crossing_interpolates_between_brackets() {
        let series = obs(&[(0.0, 13.7), (10.0, 12.9), (20.0, 12.1)]);
        match first_downward_crossing(&series, 12.5) {
            ThresholdCrossing::Reached { sample_index, time_days } => {
                assert_eq!(sample_index, 2);
                assert!((time_days - 15.0).abs() < 1e-9);
            }
            other => panic!("expected crossing, got {:?}", other),
        }
    }

    #[test]
    fn value_equal_to_threshold_is_not_a_crossing() {
        let series = obs(&[(0.0, 13.0), (10.0, 12.5)]);
        assert_eq!(first_downward_crossing(&series, 12.5), ThresholdCrossing::NotReachedWithinWindow);
    }

    #[test]
    fn already_below_at_start() {
        let series = obs(&[(0.0, 12.0), (10.0, 11.0)]);
        assert_eq!(first_downward_crossing(&series, 12.5), ThresholdCrossing::BelowAtStart);
    }

    #[test]
    fn recovery_after_dip_reports_first_crossing() {
        let series = obs(&[(0.0, 13.0), (2.0, 12.0), (4.0, 13.0), (6.0, 11.0)]);
        match first_downward_crossing(&series, 12.5) {
            ThresholdCrossing::Reached { sample_index, time_days } => {
                assert_eq!(sample_index, 1);
                assert!((time_days - 1.0).abs() < 1e-9);
            }
            other => panic!("expected crossing, got {:?}", other),
        }
    }
}
