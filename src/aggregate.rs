// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Cross-Scenario Aggregator

//! Relationships between scenarios: pressure acceleration per solution,
//! solution ordering per condition, and condition/solution summaries of the
//! severity table. All functions are pure over their inputs.

use serde::Serialize;

use crate::kinetics::{ModelKind, RateQuantity, ScenarioKinetics};
use crate::series::ExcludedScenario;
use crate::severity::{descending, SeverityInput, SeverityScore};
use crate::types::{Condition, Estimate, NotComputable, ScenarioId, Solution};

// ─── Scenario Lookup ────────────────────────────────────────────────────────

fn lookup<'a>(
    id: ScenarioId,
    assessed: &'a [ScenarioKinetics],
    excluded: &[ExcludedScenario],
) -> Result<&'a ScenarioKinetics, NotComputable> {
    if let Some(k) = assessed.iter().find(|k| k.scenario == id) {
        return Ok(k);
    }
    let cause = excluded
        .iter()
        .find(|e| e.scenario == id)
        .map(|e| e.reason.clone())
        .unwrap_or_else(|| "not supplied".to_string());
    Err(NotComputable::ScenarioExcluded { scenario: id, cause })
}

// ─── Acceleration Factors ───────────────────────────────────────────────────

/// Pressure rate over immersion rate for one solution and quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccelerationFactor {
    pub solution: Solution,
    pub phase: String,
    pub model_kind: ModelKind,
    pub rate_immersion: Estimate<f64>,
    pub rate_pressure: Estimate<f64>,
    pub factor: Estimate<f64>,
}

fn rate_of(
    id: ScenarioId,
    q: &RateQuantity,
    assessed: &[ScenarioKinetics],
    excluded: &[ExcludedScenario],
) -> Estimate<f64> {
    let kinetics = match lookup(id, assessed, excluded) {
        Ok(k) => k,
        Err(r) => return Estimate::NotComputable(r),
    };
    kinetics
        .fit(&q.phase, q.model_kind)
        .and_then(|fit| fit.rate())
        .unwrap_or_else(|| Estimate::NotComputable(NotComputable::NotObserved { field: q.phase.clone() }))
}

/// One factor per solution and rate-bearing quantity. Each solution uses
/// only its own immersion/pressure pair.
pub fn acceleration_factors(
    quantities: &[RateQuantity],
    assessed: &[ScenarioKinetics],
    excluded: &[ExcludedScenario],
) -> Vec<AccelerationFactor> {
    let mut out = Vec::with_capacity(Solution::ALL.len() * quantities.len());
    for solution in Solution::ALL {
        for q in quantities {
            let rate_immersion = rate_of(ScenarioId::new(solution, Condition::Immersion), q, assessed, excluded);
            let rate_pressure = rate_of(ScenarioId::new(solution, Condition::Pressure), q, assessed, excluded);

            let factor = match (&rate_immersion, &rate_pressure) {
                (Estimate::NotComputable(r), _) => {
                    Estimate::NotComputable(NotComputable::upstream("immersion rate", r))
                }
                (_, Estimate::NotComputable(r)) => {
                    Estimate::NotComputable(NotComputable::upstream("pressure rate", r))
                }
                (Estimate::Computed(imm), Estimate::Computed(_)) if *imm == 0.0 => {
                    Estimate::NotComputable(NotComputable::zero("immersion rate"))
                }
                (Estimate::Computed(imm), Estimate::Computed(press)) => Estimate::Computed(press / imm),
            };

            out.push(AccelerationFactor {
                solution,
                phase: q.phase.clone(),
                model_kind: q.model_kind,
                rate_immersion,
                rate_pressure,
                factor,
            });
        }
    }
    out
}

// ─── Solution Effects ───────────────────────────────────────────────────────

/// A value left out of an aggregate, with where and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTerm {
    pub scenario: ScenarioId,
    pub term: String,
    pub reason: NotComputable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionEntry {
    pub solution: Solution,
    /// Sum of the computed CH and C-S-H depletion fractions.
    pub depletion_sum: f64,
    pub ch_depletion: Estimate<f64>,
    pub csh_depletion: Estimate<f64>,
    pub ph_drop: Estimate<f64>,
}

/// The three solutions at one condition, most severe first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionEffect {
    pub condition: Condition,
    pub ordering: Vec<SolutionEntry>,
    pub skipped: Vec<SkippedTerm>,
}

pub fn solution_effects(inputs: &[SeverityInput], excluded: &[ExcludedScenario]) -> Vec<SolutionEffect> {
    Condition::ALL
        .iter()
        .map(|&condition| {
            let mut ordering = Vec::new();
            let mut skipped = Vec::new();

            for solution in Solution::ALL {
                let id = ScenarioId::new(solution, condition);
                let input = match inputs.iter().find(|i| i.scenario == id) {
                    Some(i) => i,
                    None => {
                        let cause = excluded
                            .iter()
                            .find(|e| e.scenario == id)
                            .map(|e| e.reason.clone())
                            .unwrap_or_else(|| "not supplied".to_string());
                        skipped.push(SkippedTerm {
                            scenario: id,
                            term: "scenario".to_string(),
                            reason: NotComputable::ScenarioExcluded { scenario: id, cause },
                        });
                        continue;
                    }
                };

                let ch_depletion = input.ch_loss_pct.clone().map(|p| p / 100.0);
                let csh_depletion = input.csh_loss_pct.clone().map(|p| p / 100.0);
                let mut depletion_sum = 0.0;
                for (term, value) in [("ch_depletion", &ch_depletion), ("csh_depletion", &csh_depletion)] {
                    match value {
                        Estimate::Computed(v) => depletion_sum += v,
                        Estimate::NotComputable(r) => skipped.push(SkippedTerm {
                            scenario: id,
                            term: term.to_string(),
                            reason: r.clone(),
                        }),
                    }
                }
                if let Some(r) = input.ph_drop.reason() {
                    skipped.push(SkippedTerm { scenario: id, term: "ph_drop".to_string(), reason: r.clone() });
                }

                ordering.push(SolutionEntry {
                    solution,
                    depletion_sum,
                    ch_depletion,
                    csh_depletion,
                    ph_drop: input.ph_drop.clone(),
                });
            }

            ordering.sort_by(|a, b| {
                b.depletion_sum
                    .total_cmp(&a.depletion_sum)
                    .then_with(|| descending(a.ph_drop.value(), b.ph_drop.value()))
                    .then_with(|| a.solution.as_str().cmp(b.solution.as_str()))
            });

            SolutionEffect { condition, ordering, skipped }
        })
        .collect()
}

// ─── Severity Summaries ─────────────────────────────────────────────────────

fn mean(values: &[f64]) -> Estimate<f64> {
    if values.is_empty() {
        Estimate::NotComputable(NotComputable::InsufficientPoints { required: 1, available: 0 })
    } else {
        Estimate::Computed(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean composite score under each condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionEffect {
    pub mean_immersion: Estimate<f64>,
    pub mean_pressure: Estimate<f64>,
    /// Pressure mean over immersion mean.
    pub ratio: Estimate<f64>,
    pub scenarios_immersion: usize,
    pub scenarios_pressure: usize,
}

pub fn condition_effect(scores: &[SeverityScore]) -> ConditionEffect {
    let of = |c: Condition| -> Vec<f64> {
        scores.iter().filter(|s| s.scenario.condition == c).map(|s| s.composite_score).collect()
    };
    let immersion = of(Condition::Immersion);
    let pressure = of(Condition::Pressure);
    let mean_immersion = mean(&immersion);
    let mean_pressure = mean(&pressure);

    let ratio = match (&mean_immersion, &mean_pressure) {
        (Estimate::NotComputable(r), _) => Estimate::NotComputable(NotComputable::upstream("immersion mean", r)),
        (_, Estimate::NotComputable(r)) => Estimate::NotComputable(NotComputable::upstream("pressure mean", r)),
        (Estimate::Computed(i), Estimate::Computed(_)) if *i == 0.0 => {
            Estimate::NotComputable(NotComputable::zero("immersion mean score"))
        }
        (Estimate::Computed(i), Estimate::Computed(p)) => Estimate::Computed(p / i),
    };

    ConditionEffect {
        mean_immersion,
        mean_pressure,
        ratio,
        scenarios_immersion: immersion.len(),
        scenarios_pressure: pressure.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionSeverity {
    pub solution: Solution,
    pub mean_score: Estimate<f64>,
    pub scenarios: usize,
    pub rank: usize,
}

/// Solutions by mean composite score, highest first. Solutions without a
/// scored scenario rank last.
pub fn solution_severity(scores: &[SeverityScore]) -> Vec<SolutionSeverity> {
    let mut out: Vec<SolutionSeverity> = Solution::ALL
        .iter()
        .map(|&solution| {
            let values: Vec<f64> =
                scores.iter().filter(|s| s.scenario.solution == solution).map(|s| s.composite_score).collect();
            SolutionSeverity { solution, mean_score: mean(&values), scenarios: values.len(), rank: 0 }
        })
        .collect();

    out.sort_by(|a, b| {
        descending(a.mean_score.value(), b.mean_score.value())
            .then_with(|| a.solution.as_str().cmp(b.solution.as_str()))
    });
    for (i, s) in out.iter_mut().enumerate() {
        s.rank = i + 1;
    }
    out
}

// ─── Tests ──────────────────────────────────────────────────────────────────
