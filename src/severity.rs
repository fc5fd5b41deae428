// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Severity Scorer & Ranker

//! Composite severity score over four raw components:
//!
//! ```text
//! score = 0.40 * n(CH loss %) + 0.30 * n(C-S-H loss %) + 0.20 * n(pH drop) + 0.10 * n(porosity increase)
//! ```
//!
//! `n` brings each component onto [0, 1] (campaign maximum or fixed reference
//! scale). Terms are always summed in the order above, so the score of a
//! scenario does not depend on the order scenarios are supplied in. A term
//! that is not computable contributes zero and marks the score partial.

use serde::Serialize;
use std::cmp::Ordering;

use crate::adapter;
use crate::config::{ConfigError, Normalization, SeverityConfig, TrackedPhases};
use crate::kinetics::{FitOutcome, ModelKind, ScenarioKinetics, PH_FIELD};
use crate::types::{Estimate, NotComputable, ScenarioId};

// ─── Terms ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    ChLoss,
    CshLoss,
    PhDrop,
    PorosityIncrease,
}

impl Term {
    /// Canonical summation order.
    pub const ALL: [Term; 4] = [Self::ChLoss, Self::CshLoss, Self::PhDrop, Self::PorosityIncrease];

    pub fn index(&self) -> usize {
        match self {
            Self::ChLoss => 0,
            Self::CshLoss => 1,
            Self::PhDrop => 2,
            Self::PorosityIncrease => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChLoss => "ch_loss",
            Self::CshLoss => "csh_loss",
            Self::PhDrop => "ph_drop",
            Self::PorosityIncrease => "porosity_increase",
        }
    }
}

// ─── Inputs ─────────────────────────────────────────────────────────────────

/// Raw severity components of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityInput {
    pub scenario: ScenarioId,
    pub ch_loss_pct: Estimate<f64>,
    pub csh_loss_pct: Estimate<f64>,
    pub ph_drop: Estimate<f64>,
    /// Percentage points.
    pub porosity_increase_pct: Estimate<f64>,
}

impl SeverityInput {
    pub fn component(&self, term: Term) -> &Estimate<f64> {
        match term {
            Term::ChLoss => &self.ch_loss_pct,
            Term::CshLoss => &self.csh_loss_pct,
            Term::PhDrop => &self.ph_drop,
            Term::PorosityIncrease => &self.porosity_increase_pct,
        }
    }

    pub fn from_kinetics(kinetics: &ScenarioKinetics, phases: &TrackedPhases) -> Self {
        let loss_pct = |phase: &str, model: ModelKind| match kinetics.fit(phase, model) {
            Some(fit) => fit.depletion_fraction().map(|f| f * 100.0),
            None => Estimate::NotComputable(NotComputable::NotObserved { field: phase.to_string() }),
        };

        let ph_drop = match kinetics.fit(PH_FIELD, ModelKind::PhRate) {
            Some(fit) => match &fit.result {
                Estimate::Computed(FitOutcome::PhRate(ph)) => Estimate::Computed(ph.ph_drop),
                Estimate::Computed(_) => Estimate::NotComputable(NotComputable::NotObserved { field: PH_FIELD.into() }),
                Estimate::NotComputable(r) => Estimate::NotComputable(NotComputable::upstream(fit.label(), r)),
            },
            None => Estimate::NotComputable(NotComputable::NotObserved { field: PH_FIELD.into() }),
        };

        Self {
            scenario: kinetics.scenario,
            ch_loss_pct: loss_pct(&phases.portlandite, ModelKind::FirstOrder),
            csh_loss_pct: loss_pct(&phases.csh, ModelKind::LinearAverage),
            ph_drop,
            porosity_increase_pct: kinetics.porosity.clone().map(|p| p.increase_pct_points),
        }
    }
}

// ─── Scores ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermScore {
    pub term: Term,
    pub raw: Estimate<f64>,
    pub normalized: Estimate<f64>,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityScore {
    pub scenario: ScenarioId,
    /// Canonical term order.
    pub terms: Vec<TermScore>,
    pub composite_score: f64,
    pub degraded_terms: Vec<Term>,
    pub partial: bool,
    /// 1 = most severe.
    pub rank: usize,
    pub severity_label: String,
}

impl SeverityScore {
    pub fn raw(&self, term: Term) -> Option<f64> {
        self.terms.get(term.index()).and_then(|t| t.raw.value())
    }
}

/// Scenarios ordered by one raw component alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRanking {
    pub term: Term,
    pub ranked: Vec<MetricEntry>,
    pub not_computable: Vec<ScenarioId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    pub scenario: ScenarioId,
    pub value: f64,
}

// ─── Scorer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SeverityScorer {
    weights: [f64; 4],
    bands: Vec<(String, f64)>,
    normalization: Normalization,
}

impl SeverityScorer {
    pub fn new(config: &SeverityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            weights: adapter::weights_to_f64(&config.weights)?,
            bands: adapter::bands_to_f64(&config.bands)?,
            normalization: config.normalization.clone(),
        })
    }

    pub fn weights(&self) -> [f64; 4] {
        self.weights
    }

    /// Same bands and normalization, different weights.
    pub fn with_weights(&self, weights: [f64; 4]) -> Self {
        Self { weights, ..self.clone() }
    }

    /// First band whose threshold the score reaches; below every threshold
    /// takes the least severe band.
    pub fn label(&self, score: f64) -> &str {
        self.bands
            .iter()
            .find(|(_, min)| score >= *min)
            .or_else(|| self.bands.last())
            .map(|(label, _)| label.as_str())
            .unwrap_or("")
    }

    fn scales(&self, inputs: &[SeverityInput]) -> [f64; 4] {
        match &self.normalization {
            Normalization::CampaignMax => {
                let mut scales = [0.0; 4];
                for term in Term::ALL {
                    scales[term.index()] = inputs
                        .iter()
                        .filter_map(|i| i.component(term).value())
                        .filter(|v| *v > 0.0)
                        .fold(0.0, f64::max);
                }
                scales
            }
            Normalization::Reference { ch_loss_pct, csh_loss_pct, ph_drop, porosity_increase_pct } => {
                [*ch_loss_pct, *csh_loss_pct, *ph_drop, *porosity_increase_pct]
            }
        }
    }

    /// Scores and ranks every input. Output is in rank order.
    pub fn score(&self, inputs: &[SeverityInput]) -> Vec<SeverityScore> {
        let scales = self.scales(inputs);

        let mut scores: Vec<SeverityScore> = inputs
            .iter()
            .map(|input| {
                let mut terms = Vec::with_capacity(Term::ALL.len());
                let mut degraded_terms = Vec::new();
                let mut composite_score = 0.0;

                for term in Term::ALL {
                    let raw = input.component(term).clone();
                    let weight = self.weights[term.index()];
                    let normalized = raw.clone().map(|v| normalize(v, scales[term.index()]));
                    let contribution = match normalized.value() {
                        Some(n) => weight * n,
                        None => {
                            degraded_terms.push(term);
                            0.0
                        }
                    };
                    composite_score += contribution;
                    terms.push(TermScore { term, raw, normalized, weight, contribution });
                }

                SeverityScore {
                    scenario: input.scenario,
                    terms,
                    composite_score,
                    partial: !degraded_terms.is_empty(),
                    degraded_terms,
                    rank: 0,
                    severity_label: String::new(),
                }
            })
            .collect();

        scores.sort_by(severity_order);
        for (i, s) in scores.iter_mut().enumerate() {
            s.rank = i + 1;
            s.severity_label = self.label(s.composite_score).to_string();
        }
        scores
    }
}

/// Positive part of `raw / scale`, capped at 1. A zero scale means no
/// scenario degraded on this term.
fn normalize(raw: f64, scale: f64) -> f64 {
    if raw > 0.0 && scale > 0.0 {
        (raw / scale).min(1.0)
    } else {
        0.0
    }
}

/// Descending score; ties by higher CH loss, higher C-S-H loss, then label.
pub fn severity_order(a: &SeverityScore, b: &SeverityScore) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| descending(a.raw(Term::ChLoss), b.raw(Term::ChLoss)))
        .then_with(|| descending(a.raw(Term::CshLoss), b.raw(Term::CshLoss)))
        .then_with(|| a.scenario.label().cmp(&b.scenario.label()))
}

/// Larger first; a computed value outranks a missing one.
pub(crate) fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn metric_rankings(inputs: &[SeverityInput]) -> Vec<MetricRanking> {
    Term::ALL
        .iter()
        .map(|&term| {
            let mut ranked: Vec<MetricEntry> = inputs
                .iter()
                .filter_map(|i| i.component(term).value().map(|value| MetricEntry { scenario: i.scenario, value }))
                .collect();
            ranked.sort_by(|a, b| {
                b.value.total_cmp(&a.value).then_with(|| a.scenario.label().cmp(&b.scenario.label()))
            });

            let mut not_computable: Vec<ScenarioId> =
                inputs.iter().filter(|i| !i.component(term).is_computed()).map(|i| i.scenario).collect();
            not_computable.sort_by_key(|s| s.label());

            MetricRanking { term, ranked, not_computable }
        })
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
