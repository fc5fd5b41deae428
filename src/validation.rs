// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Plausibility Checks

//! Physical-consistency checks on a normalized series: pH only falls,
//! portlandite only dissolves, C-S-H does not grow, chloride solutions form
//! Friedel's salt, sulfate solutions form ettringite, and solid mass is
//! conserved. A breach is a warning on the scenario report; the scenario is
//! still estimated and ranked.

use serde::Serialize;

use crate::config::{PlausibilityLimits, TrackedPhases};
use crate::types::{Observation, ScenarioId, ScenarioSeries};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum PlausibilityIssue {
    /// pH rose by more than the allowed step between consecutive samples.
    PhRise { from_days: f64, to_days: f64, from: f64, to: f64 },
    InitialPhOutOfRange { ph: f64, min: f64, max: f64 },
    /// Portlandite grew between consecutive samples.
    PortlanditeIncrease { from_days: f64, to_days: f64, from: f64, to: f64 },
    CshGain { initial: f64, final_value: f64 },
    /// Chloride exposure without net Friedel's salt formation.
    FriedelNotFormed { initial: f64, final_value: f64 },
    FriedelExcess { formed: f64, limit: f64 },
    /// Sulfate exposure without ettringite ever exceeding its initial amount.
    EttringiteNotFormed { initial: f64, peak: f64 },
    InitialMassOffBasis { mass_g: f64, basis_g: f64 },
    MassGain { time_days: f64, initial_g: f64, mass_g: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlausibilityWarning {
    pub scenario: ScenarioId,
    #[serde(flatten)]
    pub issue: PlausibilityIssue,
}

/// Runs every applicable check. Quantities with too few observations are skipped.
pub fn check_plausibility(
    series: &ScenarioSeries,
    phases: &TrackedPhases,
    limits: &PlausibilityLimits,
) -> Vec<PlausibilityWarning> {
    let scenario = series.scenario_id();
    let mut issues = Vec::new();

    let ph = series.ph_observations();
    if let Some(first) = ph.first() {
        if first.value < limits.initial_ph_min || first.value > limits.initial_ph_max {
            issues.push(PlausibilityIssue::InitialPhOutOfRange {
                ph: first.value,
                min: limits.initial_ph_min,
                max: limits.initial_ph_max,
            });
        }
    }
    for (a, b) in rises(&ph, limits.max_ph_rise) {
        issues.push(PlausibilityIssue::PhRise { from_days: a.time_days, to_days: b.time_days, from: a.value, to: b.value });
    }

    let ch = series.phase_observations(&phases.portlandite);
    for (a, b) in rises(&ch, limits.portlandite_tolerance_mol) {
        issues.push(PlausibilityIssue::PortlanditeIncrease {
            from_days: a.time_days,
            to_days: b.time_days,
            from: a.value,
            to: b.value,
        });
    }

    if let Some((initial, last)) = endpoints(&series.phase_observations(&phases.csh)) {
        if last.value > initial.value {
            issues.push(PlausibilityIssue::CshGain { initial: initial.value, final_value: last.value });
        }
    }

    if scenario.solution.is_chloride_bearing() {
        if let Some((initial, last)) = endpoints(&series.phase_observations(&phases.friedels_salt)) {
            let formed = last.value - initial.value;
            if formed <= 0.0 {
                issues.push(PlausibilityIssue::FriedelNotFormed { initial: initial.value, final_value: last.value });
            } else if formed > limits.max_friedel_formed_mol {
                issues.push(PlausibilityIssue::FriedelExcess { formed, limit: limits.max_friedel_formed_mol });
            }
        }
    }

    if scenario.solution.is_sulfate_bearing() {
        let ett = series.phase_observations(&phases.ettringite);
        if let Some((initial, _)) = endpoints(&ett) {
            let peak = ett.iter().map(|o| o.value).fold(f64::NEG_INFINITY, f64::max);
            if peak <= initial.value {
                issues.push(PlausibilityIssue::EttringiteNotFormed { initial: initial.value, peak });
            }
        }
    }

    let mass = series.observations(|s| s.solid_mass_g);
    if let Some(initial) = mass.first() {
        if (initial.value - limits.initial_mass_basis_g).abs() > limits.initial_mass_tolerance_g {
            issues.push(PlausibilityIssue::InitialMassOffBasis {
                mass_g: initial.value,
                basis_g: limits.initial_mass_basis_g,
            });
        }
        for later in &mass[1..] {
            if later.value > initial.value + limits.mass_gain_tolerance_g {
                issues.push(PlausibilityIssue::MassGain {
                    time_days: later.time_days,
                    initial_g: initial.value,
                    mass_g: later.value,
                });
            }
        }
    }

    issues
        .into_iter()
        .map(|issue| {
            tracing::warn!(scenario = %scenario, ?issue, "implausible trajectory");
            PlausibilityWarning { scenario, issue }
        })
        .collect()
}

/// Consecutive pairs where the value rose by more than `tolerance`.
fn rises(obs: &[Observation], tolerance: f64) -> impl Iterator<Item = (&Observation, &Observation)> {
    obs.windows(2).filter(move |w| w[1].value > w[0].value + tolerance).map(|w| (&w[0], &w[1]))
}

/// First and last observation, when there are at least two.
fn endpoints(obs: &[Observation]) -> Option<(&Observation, &Observation)> {
    match obs {
        [first, .., last] => Some((first, last)),
        _ => None,
    }
}
