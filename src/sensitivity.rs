// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Weight Sensitivity

//! How much the severity table depends on the policy weights.
//!
//! Each weight is shifted by `+step` and `-step` (clamped to [0, 1]) and the
//! other three are rescaled so the set still sums to 1. For every scenario
//! the sensitivity index is `(max - min) / baseline * 100` over the three
//! scores; a term's index is the largest over scenarios.

use serde::Serialize;

use crate::severity::{SeverityInput, SeverityScorer, Term};
use crate::types::{Estimate, NotComputable, ScenarioId};

const HIGH_ABOVE_PCT: f64 = 30.0;
const MEDIUM_ABOVE_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    High,
    Medium,
    Low,
}

impl SensitivityLevel {
    pub fn from_index(index_pct: f64) -> Self {
        if index_pct > HIGH_ABOVE_PCT {
            Self::High
        } else if index_pct > MEDIUM_ABOVE_PCT {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Perturbation {
    pub direction: Direction,
    /// Canonical term order.
    pub weights: [f64; 4],
    pub ranking: Vec<ScenarioId>,
    pub ranking_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSensitivity {
    pub term: Term,
    pub baseline_weight: f64,
    pub increase: Perturbation,
    pub decrease: Perturbation,
    pub sensitivity_index_pct: Estimate<f64>,
    pub level: Estimate<SensitivityLevel>,
}

/// Shift one weight by `delta` and rescale the rest to keep the sum at 1.
pub fn perturbed_weights(weights: [f64; 4], term: Term, delta: f64) -> [f64; 4] {
    let i = term.index();
    let shifted = (weights[i] + delta).clamp(0.0, 1.0);
    let remaining = 1.0 - shifted;
    let others: f64 = weights.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, w)| w).sum();

    let mut out = [0.0; 4];
    for (j, w) in weights.iter().enumerate() {
        out[j] = if j == i {
            shifted
        } else if others > 0.0 {
            w * remaining / others
        } else {
            remaining / 3.0
        };
    }
    out
}

pub fn weight_sensitivity(scorer: &SeverityScorer, inputs: &[SeverityInput], step: f64) -> Vec<TermSensitivity> {
    let baseline = scorer.score(inputs);
    let baseline_order: Vec<ScenarioId> = baseline.iter().map(|s| s.scenario).collect();
    let weights = scorer.weights();

    Term::ALL
        .iter()
        .map(|&term| {
            let run = |direction: Direction| {
                let delta = match direction {
                    Direction::Increase => step,
                    Direction::Decrease => -step,
                };
                let w = perturbed_weights(weights, term, delta);
                let scores = scorer.with_weights(w).score(inputs);
                let ranking: Vec<ScenarioId> = scores.iter().map(|s| s.scenario).collect();
                let perturbation = Perturbation {
                    direction,
                    weights: w,
                    ranking_changed: ranking != baseline_order,
                    ranking,
                };
                (perturbation, scores)
            };
            let (increase, up_scores) = run(Direction::Increase);
            let (decrease, down_scores) = run(Direction::Decrease);

            let index = baseline
                .iter()
                .filter(|b| b.composite_score > 0.0)
                .filter_map(|b| {
                    let up = up_scores.iter().find(|s| s.scenario == b.scenario)?.composite_score;
                    let down = down_scores.iter().find(|s| s.scenario == b.scenario)?.composite_score;
                    let hi = b.composite_score.max(up).max(down);
                    let lo = b.composite_score.min(up).min(down);
                    Some((hi - lo) / b.composite_score * 100.0)
                })
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

            let sensitivity_index_pct = match index {
                Some(v) => Estimate::Computed(v),
                None => Estimate::NotComputable(NotComputable::zero("baseline composite score")),
            };
            tracing::debug!(term = term.as_str(), index = ?sensitivity_index_pct.value(), "weight sensitivity");

            TermSensitivity {
                term,
                baseline_weight: weights[term.index()],
                increase,
                decrease,
                level: sensitivity_index_pct.clone().map(SensitivityLevel::from_index),
                sensitivity_index_pct,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeverityConfig;
    use crate::types::{Condition, Solution};

    fn input(sol: Solution, cond: Condition, ch: f64, csh: f64, ph: f64, por: f64) -> SeverityInput {
        SeverityInput {
            scenario: ScenarioId::new(sol, cond),
            ch_loss_pct: Estimate::Computed(ch),
            csh_loss_pct: Estimate::Computed(csh),
            ph_drop: Estimate::Computed(ph),
            porosity_increase_pct: Estimate::Computed(por),
        }
    }

    #[test]
    fn perturbed_weights_still_sum_to_one() {
        let base = [0.4, 0.3, 0.2, 0.1];
        for term in Term::ALL {
            for delta in [0.05, -0.05, 0.9, -0.9] {
                let w = perturbed_weights(base, term, delta);
                assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
                assert!(w.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
        let w = perturbed_weights(base, Term::ChLoss, 0.05);
        assert!((w[0] - 0.45).abs() < 1e-12);
        assert!((w[1] / w[2] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn full_weight_spreads_remainder_evenly() {
        let w = perturbed_weights([1.0, 0.0, 0.0, 0.0], Term::ChLoss, -0.3);
        assert!((w[0] - 0.7).abs() < 1e-12);
        assert!((w[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn levels_bucket_by_index() {
        assert_eq!(SensitivityLevel::from_index(31.0), SensitivityLevel::High);
        assert_eq!(SensitivityLevel::from_index(30.0), SensitivityLevel::Medium);
        assert_eq!(SensitivityLevel::from_index(10.5), SensitivityLevel::Medium);
        assert_eq!(SensitivityLevel::from_index(10.0), SensitivityLevel::Low);
    }

    #[test]
    fn dominant_scenario_keeps_ranking() {
        let scorer = SeverityScorer::new(&SeverityConfig::default()).unwrap();
        let inputs = vec![
            input(Solution::Mixed, Condition::Pressure, 4.0, 60.0, 0.6, 10.0),
            input(Solution::PureWater, Condition::Immersion, 1.0, 20.0, 0.1, 2.0),
        ];
        let result = weight_sensitivity(&scorer, &inputs, 0.05);
        assert_eq!(result.len(), 4);
        for t in &result {
            assert!(!t.increase.ranking_changed);
            assert!(!t.decrease.ranking_changed);
            assert!(t.sensitivity_index_pct.is_computed());
        }
        // mixed_pressure scores 1.0 under every weighting; PW moves.
        assert!(result[0].sensitivity_index_pct.value().unwrap() > 0.0);
    }

    #[test]
    fn all_zero_scores_have_no_index() {
        let scorer = SeverityScorer::new(&SeverityConfig::default()).unwrap();
        let inputs = vec![input(Solution::NaCl, Condition::Immersion, 0.0, 0.0, 0.0, 0.0)];
        let result = weight_sensitivity(&scorer, &inputs, 0.05);
        assert!(!result[0].sensitivity_index_pct.is_computed());
        assert!(!result[0].level.is_computed());
    }
}
