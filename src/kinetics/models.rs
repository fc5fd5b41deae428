// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Rate Models

//! One function per model kind. Each takes the observations of a single
//! quantity (time-ordered, unobserved samples already skipped) and returns a
//! tagged estimate.

use super::regression::{first_downward_crossing, ordinary_least_squares};
use super::{
    BindingCapacityFit, DamageBand, DamageIndexFit, FirstOrderFit, HalfLife, LinearAverageFit, PhRateFit,
    PhaseDelta, PorosityChange, PH_FIELD,
};
use crate::config::{DamageBands, KineticsConfig};
use crate::types::{Estimate, NotComputable, Observation};

/// First and last observation, or why there are not two of them.
fn endpoints(field: &str, obs: &[Observation]) -> Result<(Observation, Observation), NotComputable> {
    match (obs.first(), obs.last()) {
        (None, _) | (_, None) => Err(NotComputable::NotObserved { field: field.to_string() }),
        (Some(_), Some(_)) if obs.len() < 2 => {
            Err(NotComputable::InsufficientPoints { required: 2, available: obs.len() })
        }
        (Some(first), Some(last)) => Ok((*first, *last)),
    }
}

/// (initial - final) / initial; zero initial has no meaningful fraction.
fn depletion(phase: &str, initial: f64, final_value: f64) -> Estimate<f64> {
    if initial == 0.0 {
        Estimate::NotComputable(NotComputable::zero(format!("initial {}", phase)))
    } else {
        Estimate::Computed((initial - final_value) / initial)
    }
}

// ─── FirstOrder ─────────────────────────────────────────────────────────────

/// OLS of ln C against t over the strictly positive observations.
pub fn fit_first_order(phase: &str, obs: &[Observation], exhaustion_fraction: f64) -> Estimate<FirstOrderFit> {
    let (first, last) = match endpoints(phase, obs) {
        Ok(e) => e,
        Err(r) => return Estimate::NotComputable(r),
    };

    let points: Vec<(f64, f64)> = obs
        .iter()
        .filter(|o| o.value > 0.0)
        .map(|o| (o.time_days, o.value.ln()))
        .collect();
    let excluded = obs.len() - points.len();

    let line = match ordinary_least_squares(&points) {
        Some(line) => line,
        None if excluded > 0 => {
            return Estimate::NotComputable(NotComputable::NonPositiveValues {
                excluded,
                remaining: points.len(),
            })
        }
        None => {
            return Estimate::NotComputable(NotComputable::InsufficientPoints {
                required: 2,
                available: points.len(),
            })
        }
    };

    let rate_constant = -line.slope;
    let half_life = if rate_constant > 0.0 {
        HalfLife::Days(std::f64::consts::LN_2 / rate_constant)
    } else {
        HalfLife::NoDepletion
    };

    let exhaustion = if first.value > 0.0 {
        Estimate::Computed(first_downward_crossing(obs, exhaustion_fraction * first.value))
    } else {
        Estimate::NotComputable(NotComputable::zero(format!("initial {}", phase)))
    };

    Estimate::Computed(FirstOrderFit {
        rate_constant,
        half_life,
        initial_value: first.value,
        final_value: last.value,
        depletion_fraction: depletion(phase, first.value, last.value),
        points_used: line.n,
        r_squared: line.r_squared,
        exhaustion,
    })
}

// ─── LinearAverage ──────────────────────────────────────────────────────────

/// Average loss rate between first and last observation.
pub fn fit_linear_average(phase: &str, obs: &[Observation]) -> Estimate<LinearAverageFit> {
    let (first, last) = match endpoints(phase, obs) {
        Ok(e) => e,
        Err(r) => return Estimate::NotComputable(r),
    };
    // Series times are strictly increasing, so elapsed > 0.
    let elapsed_days = last.time_days - first.time_days;

    Estimate::Computed(LinearAverageFit {
        average_rate: (first.value - last.value) / elapsed_days,
        elapsed_days,
        initial_value: first.value,
        final_value: last.value,
        depletion_fraction: depletion(phase, first.value, last.value),
    })
}

// ─── PhRate ─────────────────────────────────────────────────────────────────

pub fn fit_ph_rate(obs: &[Observation], threshold: f64) -> Estimate<PhRateFit> {
    let (first, last) = match endpoints(PH_FIELD, obs) {
        Ok(e) => e,
        Err(r) => return Estimate::NotComputable(r),
    };
    let ph_drop = first.value - last.value;

    Estimate::Computed(PhRateFit {
        average_rate: ph_drop / (last.time_days - first.time_days),
        ph_drop,
        initial_ph: first.value,
        final_ph: last.value,
        threshold,
        crossing: first_downward_crossing(obs, threshold),
    })
}

// ─── BindingCapacity ────────────────────────────────────────────────────────

/// Chloride bound in Friedel's salt at the end of exposure, per gram of paste.
pub fn fit_binding_capacity(
    phase: &str,
    obs: &[Observation],
    config: &KineticsConfig,
) -> Estimate<BindingCapacityFit> {
    let (_, last) = match endpoints(phase, obs) {
        Ok(e) => e,
        Err(r) => return Estimate::NotComputable(r),
    };

    let peak_friedel_salt_mol = obs.iter().map(|o| o.value).fold(f64::NEG_INFINITY, f64::max);
    let bound_chloride_mol = config.chloride_stoichiometry * last.value;
    // mol * g/mol * 1000 mg/g / g paste
    let capacity_mg_per_g =
        bound_chloride_mol * config.chloride_molar_mass_g_per_mol * 1000.0 / config.paste_mass_g;

    Estimate::Computed(BindingCapacityFit {
        friedel_salt_mol: last.value,
        peak_friedel_salt_mol,
        bound_chloride_mol,
        capacity_mg_per_g,
        utilization: capacity_mg_per_g / config.theoretical_max_capacity_mg_per_g,
    })
}

// ─── DamageIndex ────────────────────────────────────────────────────────────

pub fn damage_band(index: f64, bands: &DamageBands) -> DamageBand {
    if index >= bands.high_from {
        DamageBand::High
    } else if index >= bands.medium_from {
        DamageBand::Medium
    } else {
        DamageBand::Low
    }
}

/// Percent change of ettringite relative to its initial amount.
pub fn fit_damage_index(phase: &str, obs: &[Observation], bands: &DamageBands) -> Estimate<DamageIndexFit> {
    let (first, last) = match endpoints(phase, obs) {
        Ok(e) => e,
        Err(r) => return Estimate::NotComputable(r),
    };
    if first.value == 0.0 {
        return Estimate::NotComputable(NotComputable::zero(format!("initial {}", phase)));
    }

    let damage_index = 100.0 * (last.value - first.value) / first.value;
    Estimate::Computed(DamageIndexFit {
        damage_index,
        band: damage_band(damage_index, bands),
        initial_value: first.value,
        final_value: last.value,
    })
}

// ─── Pass-through Quantities ────────────────────────────────────────────────

pub fn porosity_change(obs: &[Observation]) -> Estimate<PorosityChange> {
    endpoints("porosity", obs)
        .map(|(first, last)| PorosityChange {
            initial: first.value,
            final_value: last.value,
            increase_pct_points: (last.value - first.value) * 100.0,
        })
        .into()
}

/// `None` when the phase was observed only once.
pub fn phase_delta(phase: &str, obs: &[Observation]) -> Option<PhaseDelta> {
    let (first, last) = endpoints(phase, obs).ok()?;
    let change_mol = last.value - first.value;
    let change_pct = if first.value == 0.0 {
        Estimate::NotComputable(NotComputable::zero(format!("initial {}", phase)))
    } else {
        Estimate::Computed(100.0 * change_mol / first.value)
    };
    Some(PhaseDelta {
        phase: phase.to_string(),
        initial_mol: first.value,
        final_mol: last.value,
        change_mol,
        change_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::ThresholdCrossing;

    fn obs(points: &[(f64, f64)]) -> Vec<Observation> {
        points
            .iter()
            .enumerate()
            .map(|(index, &(time_days, value))| Observation { index, time_days, value })
            .collect()
    }

    #[test]
    fn first_order_recovers_rate_and_half_life() {
        let k = 0.035;
        let data: Vec<(f64, f64)> = (0..6).map(|i| (i as f64 * 10.0, 4.2 * (-k * i as f64 * 10.0).exp())).collect();
        let fit = fit_first_order("portlandite", &obs(&data), 0.1).into_result().unwrap();
        assert!((fit.rate_constant - k).abs() < 1e-10);
        match fit.half_life {
            HalfLife::Days(h) => assert!((h * k - std::f64::consts::LN_2).abs() < 1e-9),
            HalfLife::NoDepletion => panic!("expected finite half-life"),
        }
        assert_eq!(fit.points_used, 6);
        assert!(fit.r_squared > 0.999_999);
    }

    #[test]
    fn first_order_exhaustion_crossing() {
        // 10% of 4.0 = 0.4 is crossed between t=20 (0.5) and t=30 (0.3)
        let data = obs(&[(0.0, 4.0), (10.0, 2.0), (20.0, 0.5), (30.0, 0.3)]);
        let fit = fit_first_order("portlandite", &data, 0.1).into_result().unwrap();
        match fit.exhaustion {
            Estimate::Computed(ThresholdCrossing::Reached { sample_index, time_days }) => {
                assert_eq!(sample_index, 3);
                assert!((time_days - 25.0).abs() < 1e-9);
            }
            ref other => panic!("unexpected exhaustion {:?}", other),
        }
    }

    #[test]
    fn first_order_skips_non_positive_values() {
        let data = obs(&[(0.0, 4.2), (10.0, 0.0), (20.0, 0.0)]);
        let fit = fit_first_order("portlandite", &data, 0.1);
        assert_eq!(
            fit.reason(),
            Some(&NotComputable::NonPositiveValues { excluded: 2, remaining: 1 })
        );

        let data = obs(&[(0.0, 4.2), (10.0, 2.0), (20.0, 0.0)]);
        let fit = fit_first_order("portlandite", &data, 0.1).into_result().unwrap();
        assert_eq!(fit.points_used, 2);
        assert_eq!(fit.depletion_fraction.value(), Some(1.0));
    }

    #[test]
    fn first_order_growth_has_no_half_life() {
        let data = obs(&[(0.0, 1.0), (10.0, 1.5)]);
        let fit = fit_first_order("friedels_salt", &data, 0.1).into_result().unwrap();
        assert!(fit.rate_constant < 0.0);
        assert_eq!(fit.half_life, HalfLife::NoDepletion);
    }

    #[test]
    fn linear_average_uses_endpoints_only() {
        let data = obs(&[(0.0, 12.5), (15.0, 5.0), (60.0, 10.0)]);
        let fit = fit_linear_average("CSH_gel", &data).into_result().unwrap();
        assert!((fit.average_rate - 2.5 / 60.0).abs() < 1e-12);
        assert_eq!(fit.elapsed_days, 60.0);
        assert!((fit.depletion_fraction.value().unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn constant_series_has_zero_depletion() {
        let data = obs(&[(0.0, 3.0), (30.0, 3.0), (60.0, 3.0)]);
        let lin = fit_linear_average("CSH_gel", &data).into_result().unwrap();
        assert_eq!(lin.depletion_fraction.value(), Some(0.0));
        let first = fit_first_order("portlandite", &data, 0.1).into_result().unwrap();
        assert_eq!(first.depletion_fraction.value(), Some(0.0));
        assert_eq!(first.half_life, HalfLife::NoDepletion);
    }

    #[test]
    fn zero_initial_depletion_is_not_computable() {
        let data = obs(&[(0.0, 0.0), (30.0, 1.0)]);
        let fit = fit_linear_average("CSH_gel", &data).into_result().unwrap();
        assert_eq!(
            fit.depletion_fraction.reason(),
            Some(&NotComputable::zero("initial CSH_gel"))
        );
    }

    #[test]
    fn single_observation_is_insufficient() {
        let data = obs(&[(0.0, 13.7)]);
        assert_eq!(
            fit_ph_rate(&data, 12.5).reason(),
            Some(&NotComputable::InsufficientPoints { required: 2, available: 1 })
        );
        assert_eq!(
            fit_ph_rate(&[], 12.5).reason(),
            Some(&NotComputable::NotObserved { field: "pH".into() })
        );
    }

    #[test]
    fn ph_rate_and_crossing() {
        let data = obs(&[(0.0, 13.72), (30.0, 12.72), (60.0, 12.22)]);
        let fit = fit_ph_rate(&data, 12.5).into_result().unwrap();
        assert!((fit.ph_drop - 1.5).abs() < 1e-9);
        assert!((fit.average_rate - 0.025).abs() < 1e-9);
        match fit.crossing {
            ThresholdCrossing::Reached { sample_index, time_days } => {
                assert_eq!(sample_index, 2);
                assert!((time_days - 43.2).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn ph_not_crossing_within_window() {
        let data = obs(&[(0.0, 13.72), (60.0, 13.60)]);
        let fit = fit_ph_rate(&data, 12.5).into_result().unwrap();
        assert_eq!(fit.crossing, ThresholdCrossing::NotReachedWithinWindow);
    }

    #[test]
    fn friedel_capacity_follows_stoichiometry() {
        let cfg = KineticsConfig::default();
        let data = obs(&[(0.0, 0.0), (30.0, 0.5), (60.0, 0.472)]);
        let fit = fit_binding_capacity("friedels_salt", &data, &cfg).into_result().unwrap();
        let expected = 0.472 * 2.0 * 35.45 * 1000.0 / 5.0;
        assert!((fit.capacity_mg_per_g - expected).abs() < 1e-6);
        assert!((fit.bound_chloride_mol - 0.944).abs() < 1e-12);
        assert_eq!(fit.peak_friedel_salt_mol, 0.5);
        assert!((fit.utilization - expected / 17_016.0).abs() < 1e-12);
    }

    #[test]
    fn damage_index_bands_have_inclusive_lower_bounds() {
        let bands = DamageBands::default();
        assert_eq!(damage_band(19.999, &bands), DamageBand::Low);
        assert_eq!(damage_band(20.0, &bands), DamageBand::Medium);
        assert_eq!(damage_band(50.0, &bands), DamageBand::High);
        assert_eq!(damage_band(-30.0, &bands), DamageBand::Low);

        let data = obs(&[(0.0, 2.0), (60.0, 3.0)]);
        let fit = fit_damage_index("ettringite", &data, &bands).into_result().unwrap();
        assert!((fit.damage_index - 50.0).abs() < 1e-9);
        assert_eq!(fit.band, DamageBand::High);

        let zero = obs(&[(0.0, 0.0), (60.0, 1.0)]);
        assert!(!fit_damage_index("ettringite", &zero, &bands).is_computed());
    }

    #[test]
    fn phase_delta_needs_two_observations() {
        assert!(phase_delta("gypsum", &obs(&[(0.0, 1.0)])).is_none());
        let d = phase_delta("gypsum", &obs(&[(0.0, 0.0), (9.0, 0.2)])).unwrap();
        assert_eq!(d.change_mol, 0.2);
        assert!(!d.change_pct.is_computed());
    }
}
