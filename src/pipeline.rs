// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Campaign Pipeline

//! Fan-out / fan-in driver.
//!
//! Each of the six scenarios is loaded and estimated independently (on the
//! rayon pool when available); the results are joined in canonical scenario
//! order and handed to one sequential aggregation and scoring step. A data
//! error in one scenario becomes an excluded entry and never touches its
//! siblings.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::aggregate;
use crate::config::{ConfigError, EngineConfig};
use crate::kinetics::{KineticEstimator, ScenarioKinetics};
use crate::report::{CampaignReport, ReportSections, ScenarioReport};
use crate::sensitivity;
use crate::series::{self, DataError, ExcludedScenario, PartialDataWarning, RawScenarioRecord};
use crate::severity::{self, SeverityInput, SeverityScorer};
use crate::types::ScenarioId;
use crate::validation::{self, PlausibilityWarning};

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Failures at the harness boundary. Scenario-level problems are not engine
/// errors; they end up in the report.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse {context}: {source}")]
    Json { context: String, source: serde_json::Error },

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
}

// ─── Inputs ─────────────────────────────────────────────────────────────────

/// What the upstream produced for one scenario.
#[derive(Debug, Clone)]
pub enum RecordSource {
    Supplied(RawScenarioRecord),
    /// Nothing was produced.
    Missing,
    /// Something was produced but could not be read; carries the reason.
    Unreadable(String),
}

/// One upstream record, addressed to a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioInput {
    pub id: ScenarioId,
    pub source: RecordSource,
}

impl ScenarioInput {
    pub fn new(id: ScenarioId, record: RawScenarioRecord) -> Self {
        Self { id, source: RecordSource::Supplied(record) }
    }

    pub fn missing(id: ScenarioId) -> Self {
        Self { id, source: RecordSource::Missing }
    }

    pub fn unreadable(id: ScenarioId, reason: impl Into<String>) -> Self {
        Self { id, source: RecordSource::Unreadable(reason.into()) }
    }

    /// Parses a record. A parse failure excludes this scenario only.
    pub fn from_json_str(id: ScenarioId, json: &str) -> Self {
        match RawScenarioRecord::from_json_str(json) {
            Ok(record) => Self::new(id, record),
            Err(e) => {
                tracing::warn!(scenario = %id, error = %e, "record unreadable");
                Self::unreadable(id, e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// rayon fan-out; sequential on wasm32.
    Parallel,
    Sequential,
}

struct AssessedScenario {
    warnings: Vec<PartialDataWarning>,
    plausibility: Vec<PlausibilityWarning>,
    kinetics: ScenarioKinetics,
}

type ScenarioOutcome = Result<AssessedScenario, DataError>;

// ─── Engine ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DegradationEngine {
    config: EngineConfig,
    estimator: KineticEstimator,
    scorer: SeverityScorer,
}

impl DegradationEngine {
    /// Validates the configuration; any violation is fatal here.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let estimator = KineticEstimator::new(config.kinetics.clone());
        let scorer = SeverityScorer::new(&config.severity)?;
        Ok(Self { config, estimator, scorer })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn estimator(&self) -> &KineticEstimator {
        &self.estimator
    }

    pub fn scorer(&self) -> &SeverityScorer {
        &self.scorer
    }

    pub fn assess(&self, inputs: &[ScenarioInput]) -> CampaignReport {
        self.assess_with(inputs, ExecutionMode::Parallel)
    }

    pub fn assess_with(&self, inputs: &[ScenarioInput], mode: ExecutionMode) -> CampaignReport {
        let span = tracing::info_span!("assess_campaign", inputs = inputs.len(), ?mode);
        let _enter = span.enter();

        // Resolve each canonical scenario to exactly one record.
        let jobs: Vec<(ScenarioId, Result<Option<&RawScenarioRecord>, DataError>)> = ScenarioId::all()
            .into_iter()
            .map(|id| {
                let mut matching = inputs.iter().filter(|i| i.id == id);
                let job = match (matching.next(), matching.next()) {
                    (None, _) => Err(DataError::MissingSeries { scenario: id }),
                    (Some(_), Some(_)) => Err(DataError::DuplicateScenario { scenario: id }),
                    (Some(input), None) => match &input.source {
                        RecordSource::Supplied(record) => Ok(Some(record)),
                        RecordSource::Missing => Ok(None),
                        RecordSource::Unreadable(reason) => {
                            Err(DataError::Unreadable { scenario: id, reason: reason.clone() })
                        }
                    },
                };
                (id, job)
            })
            .collect();

        let outcomes: Vec<(ScenarioId, ScenarioOutcome)> = match mode {
            #[cfg(not(target_arch = "wasm32"))]
            ExecutionMode::Parallel => {
                jobs.par_iter().map(|(id, job)| (*id, self.run_scenario(*id, job))).collect()
            }
            _ => jobs.iter().map(|(id, job)| (*id, self.run_scenario(*id, job))).collect(),
        };

        self.fan_in(outcomes)
    }

    fn run_scenario(&self, id: ScenarioId, job: &Result<Option<&RawScenarioRecord>, DataError>) -> ScenarioOutcome {
        let record = job.as_ref().map_err(Clone::clone)?;
        let loaded = series::normalize(id, *record, self.estimator.config())?;
        let kinetics = self.estimator.estimate(&loaded.series);
        let cfg = self.estimator.config();
        let plausibility = validation::check_plausibility(&loaded.series, &cfg.phases, &cfg.plausibility);
        Ok(AssessedScenario { warnings: loaded.warnings, plausibility, kinetics })
    }

    fn fan_in(&self, outcomes: Vec<(ScenarioId, ScenarioOutcome)>) -> CampaignReport {
        let mut assessed: Vec<ScenarioKinetics> = Vec::new();
        let mut scenarios: Vec<ScenarioReport> = Vec::new();
        let mut excluded: Vec<ExcludedScenario> = Vec::new();

        for (id, outcome) in outcomes {
            match outcome {
                Ok(AssessedScenario { warnings, plausibility, kinetics }) => {
                    scenarios.push(ScenarioReport {
                        scenario: id,
                        warnings,
                        plausibility,
                        fits: kinetics.fits.clone(),
                        porosity: kinetics.porosity.clone(),
                        phase_deltas: kinetics.phase_deltas.clone(),
                    });
                    assessed.push(kinetics);
                }
                Err(err) => {
                    tracing::warn!(scenario = %id, error = %err, "scenario excluded");
                    excluded.push(ExcludedScenario::from(&err));
                }
            }
        }

        let phases = &self.config.kinetics.phases;
        let inputs: Vec<SeverityInput> =
            assessed.iter().map(|k| SeverityInput::from_kinetics(k, phases)).collect();

        let severity = self.scorer.score(&inputs);
        let acceleration_factors =
            aggregate::acceleration_factors(&self.estimator.rate_quantities(), &assessed, &excluded);
        let solution_effects = aggregate::solution_effects(&inputs, &excluded);
        let condition_effect = aggregate::condition_effect(&severity);
        let solution_severity = aggregate::solution_severity(&severity);
        let metric_rankings = severity::metric_rankings(&inputs);
        let sensitivity =
            sensitivity::weight_sensitivity(&self.scorer, &inputs, self.config.severity.sensitivity_step);

        tracing::info!(
            assessed = scenarios.len(),
            excluded = excluded.len(),
            top = ?severity.first().map(|s| s.scenario.label()),
            "campaign assessed"
        );

        CampaignReport::assemble(
            self.config.clone(),
            ReportSections {
                scenarios,
                excluded,
                acceleration_factors,
                solution_effects,
                severity,
                metric_rankings,
                condition_effect,
                solution_severity,
                sensitivity,
            },
        )
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Condition, Solution};

    fn record(ch_final: f64) -> RawScenarioRecord {
        let json = format!(
            r#"{{ "time_series": [
                {{ "time_days": 0, "phases": {{ "portlandite": 4.2, "CSH_gel": 12.5, "ettringite": 0.85 }},
                   "pH": 13.72, "porosity": 0.28 }},
                {{ "time_days": 60, "phases": {{ "portlandite": {}, "CSH_gel": 11.0, "ettringite": 0.9 }},
                   "pH": 13.5, "porosity": 0.30 }}
            ] }}"#,
            ch_final
        );
        RawScenarioRecord::from_json_str(&json).unwrap()
    }

    #[test]
    fn invalid_config_is_fatal_at_construction() {
        let mut config = EngineConfig::default();
        config.kinetics.paste_mass_g = 0.0;
        assert!(matches!(DegradationEngine::new(config), Err(ConfigError::InvalidConstant { .. })));
    }

    #[test]
    fn missing_scenarios_are_excluded_not_fatal() {
        let engine = DegradationEngine::new(EngineConfig::default()).unwrap();
        let inputs = vec![
            ScenarioInput::new(ScenarioId::new(Solution::NaCl, Condition::Pressure), record(3.9)),
            ScenarioInput::new(ScenarioId::new(Solution::NaCl, Condition::Immersion), record(4.1)),
        ];
        let report = engine.assess_with(&inputs, ExecutionMode::Sequential);
        assert_eq!(report.scenarios.len(), 2);
        assert_eq!(report.excluded.len(), 4);
        assert_eq!(report.ranking()[0].label(), "NaCl_pressure");
        assert!(report.gaps.iter().any(|g| g.location == "scenarios/PW_immersion"));
    }

    #[test]
    fn duplicate_records_exclude_the_scenario() {
        let engine = DegradationEngine::new(EngineConfig::default()).unwrap();
        let id = ScenarioId::new(Solution::Mixed, Condition::Immersion);
        let inputs = vec![ScenarioInput::new(id, record(4.0)), ScenarioInput::new(id, record(4.1))];
        let report = engine.assess_with(&inputs, ExecutionMode::Sequential);
        assert!(report.scenarios.is_empty());
        let dup = report.excluded.iter().find(|e| e.scenario == id).unwrap();
        assert!(dup.reason.contains("more than once"));
    }

    #[test]
    fn unparseable_record_excludes_only_its_scenario() {
        let engine = DegradationEngine::new(EngineConfig::default()).unwrap();
        let bad = ScenarioId::new(Solution::PureWater, Condition::Pressure);
        let good = ScenarioId::new(Solution::NaCl, Condition::Pressure);
        let inputs = vec![
            ScenarioInput::from_json_str(bad, r#"{ "time_series": [ { "time_days": NaN } ] }"#),
            ScenarioInput::new(good, record(3.9)),
        ];
        assert!(matches!(inputs[0].source, RecordSource::Unreadable(_)));

        let report = engine.assess_with(&inputs, ExecutionMode::Sequential);
        let e = report.excluded.iter().find(|e| e.scenario == bad).unwrap();
        assert!(e.reason.contains("unreadable"), "reason: {}", e.reason);
        assert!(report.gaps.iter().any(|g| g.location == "scenarios/PW_pressure"));
        assert_eq!(report.ranking(), vec![good]);
    }

    #[test]
    fn implausible_trajectory_is_warned_not_excluded() {
        let engine = DegradationEngine::new(EngineConfig::default()).unwrap();
        let id = ScenarioId::new(Solution::PureWater, Condition::Immersion);
        // 4.2 -> 4.6 mol portlandite: regrowth.
        let report = engine.assess_with(&[ScenarioInput::new(id, record(4.6))], ExecutionMode::Sequential);
        let scenario = report.scenario(id).unwrap();
        assert!(scenario
            .plausibility
            .iter()
            .any(|w| matches!(w.issue, validation::PlausibilityIssue::PortlanditeIncrease { .. })));
        assert!(!scenario.is_partial());
        assert_eq!(report.ranking(), vec![id]);
    }

    #[test]
    fn explicit_missing_record_is_excluded() {
        let engine = DegradationEngine::new(EngineConfig::default()).unwrap();
        let id = ScenarioId::new(Solution::PureWater, Condition::Pressure);
        let report = engine.assess_with(&[ScenarioInput::missing(id)], ExecutionMode::Sequential);
        let e = report.excluded.iter().find(|e| e.scenario == id).unwrap();
        assert_eq!(e.reason, DataError::MissingSeries { scenario: id }.to_string());
    }
}
