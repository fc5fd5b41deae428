// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Campaign Report

//! The produced record. `CampaignReport` is the only thing downstream
//! collaborators (plotting, document formatting) consume; it serializes to
//! JSON with every not-computable value tagged in place and also listed in
//! the flat `gaps` index.

use serde::Serialize;

use crate::aggregate::{AccelerationFactor, ConditionEffect, SolutionEffect, SolutionSeverity};
use crate::config::EngineConfig;
use crate::kinetics::{FitOutcome, KineticFit, PhaseDelta, PorosityChange};
use crate::sensitivity::TermSensitivity;
use crate::series::{ExcludedScenario, PartialDataWarning};
use crate::severity::{MetricRanking, SeverityScore};
use crate::types::{Estimate, NotComputable, ScenarioId};
use crate::validation::PlausibilityWarning;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything derived for one included scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: ScenarioId,
    pub warnings: Vec<PartialDataWarning>,
    /// Physical-consistency breaches; informational, never exclusions.
    pub plausibility: Vec<PlausibilityWarning>,
    pub fits: Vec<KineticFit>,
    pub porosity: Estimate<PorosityChange>,
    pub phase_deltas: Vec<PhaseDelta>,
}

impl ScenarioReport {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// One not-computable value and where it sits in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    pub location: String,
    pub reason: NotComputable,
}

/// Report sections produced by the engine, before the gap index is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSections {
    pub scenarios: Vec<ScenarioReport>,
    pub excluded: Vec<ExcludedScenario>,
    pub acceleration_factors: Vec<AccelerationFactor>,
    pub solution_effects: Vec<SolutionEffect>,
    pub severity: Vec<SeverityScore>,
    pub metric_rankings: Vec<MetricRanking>,
    pub condition_effect: ConditionEffect,
    pub solution_severity: Vec<SolutionSeverity>,
    pub sensitivity: Vec<TermSensitivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignReport {
    pub engine_version: String,
    pub config: EngineConfig,
    pub scenarios: Vec<ScenarioReport>,
    pub excluded: Vec<ExcludedScenario>,
    pub acceleration_factors: Vec<AccelerationFactor>,
    pub solution_effects: Vec<SolutionEffect>,
    /// Rank order.
    pub severity: Vec<SeverityScore>,
    pub metric_rankings: Vec<MetricRanking>,
    pub condition_effect: ConditionEffect,
    pub solution_severity: Vec<SolutionSeverity>,
    pub sensitivity: Vec<TermSensitivity>,
    pub gaps: Vec<Gap>,
}

impl CampaignReport {
    pub fn assemble(config: EngineConfig, sections: ReportSections) -> Self {
        let gaps = collect_gaps(&sections);
        let ReportSections {
            scenarios,
            excluded,
            acceleration_factors,
            solution_effects,
            severity,
            metric_rankings,
            condition_effect,
            solution_severity,
            sensitivity,
        } = sections;

        Self {
            engine_version: ENGINE_VERSION.to_string(),
            config,
            scenarios,
            excluded,
            acceleration_factors,
            solution_effects,
            severity,
            metric_rankings,
            condition_effect,
            solution_severity,
            sensitivity,
            gaps,
        }
    }

    /// Scenario ids, most severe first.
    pub fn ranking(&self) -> Vec<ScenarioId> {
        self.severity.iter().map(|s| s.scenario).collect()
    }

    pub fn score(&self, scenario: ScenarioId) -> Option<&SeverityScore> {
        self.severity.iter().find(|s| s.scenario == scenario)
    }

    pub fn scenario(&self, scenario: ScenarioId) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.scenario == scenario)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ─── Gap Index ──────────────────────────────────────────────────────────────

fn push_gap<T>(gaps: &mut Vec<Gap>, location: impl FnOnce() -> String, estimate: &Estimate<T>) {
    if let Some(reason) = estimate.reason() {
        gaps.push(Gap { location: location(), reason: reason.clone() });
    }
}

fn collect_gaps(s: &ReportSections) -> Vec<Gap> {
    let mut gaps = Vec::new();

    for e in &s.excluded {
        gaps.push(Gap {
            location: format!("scenarios/{}", e.scenario),
            reason: NotComputable::ScenarioExcluded { scenario: e.scenario, cause: e.reason.clone() },
        });
    }

    for sc in &s.scenarios {
        for fit in &sc.fits {
            let base = format!("scenarios/{}/fits/{}/{:?}", sc.scenario, fit.phase, fit.model_kind);
            match &fit.result {
                Estimate::NotComputable(reason) => gaps.push(Gap { location: base, reason: reason.clone() }),
                Estimate::Computed(FitOutcome::FirstOrder(f)) => {
                    push_gap(&mut gaps, || format!("{}/depletion_fraction", base), &f.depletion_fraction);
                    push_gap(&mut gaps, || format!("{}/exhaustion", base), &f.exhaustion);
                }
                Estimate::Computed(FitOutcome::LinearAverage(f)) => {
                    push_gap(&mut gaps, || format!("{}/depletion_fraction", base), &f.depletion_fraction);
                }
                Estimate::Computed(_) => {}
            }
        }
        push_gap(&mut gaps, || format!("scenarios/{}/porosity", sc.scenario), &sc.porosity);
        for d in &sc.phase_deltas {
            push_gap(&mut gaps, || format!("scenarios/{}/phase_deltas/{}", sc.scenario, d.phase), &d.change_pct);
        }
    }

    for f in &s.acceleration_factors {
        push_gap(
            &mut gaps,
            || format!("acceleration_factors/{}/{}/{:?}", f.solution, f.phase, f.model_kind),
            &f.factor,
        );
    }

    for score in &s.severity {
        for t in &score.terms {
            push_gap(&mut gaps, || format!("severity/{}/{}", score.scenario, t.term.as_str()), &t.raw);
        }
    }

    push_gap(&mut gaps, || "condition_effect/ratio".to_string(), &s.condition_effect.ratio);
    for sol in &s.solution_severity {
        push_gap(&mut gaps, || format!("solution_severity/{}", sol.solution), &sol.mean_score);
    }
    for t in &s.sensitivity {
        push_gap(&mut gaps, || format!("sensitivity/{}", t.term.as_str()), &t.sensitivity_index_pct);
    }

    for gap in &gaps {
        tracing::debug!(location = %gap.location, reason = %gap.reason, "not computable");
    }
    gaps
}

// ─── Tests ──────────────────────────────────────────────────────────────────
