// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Type Definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ─── Exposure Solution ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Solution {
    /// Pure water: leaching baseline.
    #[serde(rename = "PW")]
    PureWater,
    /// 70 g/L NaCl: chloride attack plus leaching.
    #[serde(rename = "NaCl")]
    NaCl,
    /// NaCl + Na2SO4: coupled chloride/sulfate attack.
    #[serde(rename = "mixed")]
    Mixed,
}

impl Solution {
    pub const ALL: [Solution; 3] = [Self::PureWater, Self::NaCl, Self::Mixed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PureWater => "PW",
            Self::NaCl => "NaCl",
            Self::Mixed => "mixed",
        }
    }

    /// Solutions that supply chloride and can form Friedel's salt.
    pub fn is_chloride_bearing(&self) -> bool {
        matches!(self, Self::NaCl | Self::Mixed)
    }

    /// Solutions that supply sulfate and should form ettringite.
    pub fn is_sulfate_bearing(&self) -> bool {
        matches!(self, Self::Mixed)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Mechanical Condition ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Immersion,
    /// Hydraulic pressure (1.2 MPa): roughly 4x water contact per step.
    Pressure,
}

impl Condition {
    pub const ALL: [Condition; 2] = [Self::Immersion, Self::Pressure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immersion => "immersion",
            Self::Pressure => "pressure",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Scenario Identifier ────────────────────────────────────────────────────

/// One of the six exposure scenarios, e.g. `mixed_pressure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenarioId {
    pub solution: Solution,
    pub condition: Condition,
}

impl ScenarioId {
    pub const fn new(solution: Solution, condition: Condition) -> Self {
        Self { solution, condition }
    }

    /// All six scenarios, solution-major.
    pub fn all() -> Vec<ScenarioId> {
        Solution::ALL
            .iter()
            .flat_map(|&s| Condition::ALL.iter().map(move |&c| ScenarioId::new(s, c)))
            .collect()
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.solution.as_str(), self.condition.as_str())
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.solution, self.condition)
    }
}

impl FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sol, cond) = s
            .rsplit_once('_')
            .ok_or_else(|| format!("scenario id '{}' is not <solution>_<condition>", s))?;
        let solution = match sol.to_ascii_lowercase().as_str() {
            "pw" => Solution::PureWater,
            "nacl" => Solution::NaCl,
            "mixed" => Solution::Mixed,
            _ => return Err(format!("unknown solution '{}' in scenario id '{}'", sol, s)),
        };
        let condition = match cond.to_ascii_lowercase().as_str() {
            "immersion" => Condition::Immersion,
            "pressure" => Condition::Pressure,
            _ => return Err(format!("unknown condition '{}' in scenario id '{}'", cond, s)),
        };
        Ok(Self { solution, condition })
    }
}

impl TryFrom<String> for ScenarioId {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ScenarioId> for String {
    fn from(id: ScenarioId) -> Self {
        id.label()
    }
}

// ─── Not Computable ─────────────────────────────────────────────────────────

/// Why a quantity could not be derived. `Display` is the human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotComputable {
    #[error("{available} usable point(s), at least {required} needed")]
    InsufficientPoints { required: usize, available: usize },

    #[error("{excluded} non-positive value(s) cannot be log-transformed, {remaining} point(s) left")]
    NonPositiveValues { excluded: usize, remaining: usize },

    #[error("{denominator} is zero")]
    ZeroDenominator { denominator: String },

    #[error("'{field}' not observed in this scenario")]
    NotObserved { field: String },

    #[error("{input} not computable: {cause}")]
    Upstream { input: String, cause: Box<NotComputable> },

    #[error("scenario {scenario} excluded: {cause}")]
    ScenarioExcluded { scenario: ScenarioId, cause: String },
}

impl NotComputable {
    pub fn upstream(input: impl Into<String>, cause: &NotComputable) -> Self {
        Self::Upstream { input: input.into(), cause: Box::new(cause.clone()) }
    }

    pub fn zero(denominator: impl Into<String>) -> Self {
        Self::ZeroDenominator { denominator: denominator.into() }
    }
}

// ─── Estimate ───────────────────────────────────────────────────────────────

/// A derived value that is either computed or explicitly absent with a reason.
///
/// There is no numeric fallback: downstream code must match on the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Estimate<T> {
    Computed(T),
    NotComputable(NotComputable),
}

impl<T> Estimate<T> {
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn computed(&self) -> Option<&T> {
        match self {
            Self::Computed(v) => Some(v),
            Self::NotComputable(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&NotComputable> {
        match self {
            Self::Computed(_) => None,
            Self::NotComputable(r) => Some(r),
        }
    }

    pub fn as_ref(&self) -> Estimate<&T> {
        match self {
            Self::Computed(v) => Estimate::Computed(v),
            Self::NotComputable(r) => Estimate::NotComputable(r.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Estimate<U> {
        match self {
            Self::Computed(v) => Estimate::Computed(f(v)),
            Self::NotComputable(r) => Estimate::NotComputable(r),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Estimate<U>) -> Estimate<U> {
        match self {
            Self::Computed(v) => f(v),
            Self::NotComputable(r) => Estimate::NotComputable(r),
        }
    }

    pub fn into_result(self) -> Result<T, NotComputable> {
        match self {
            Self::Computed(v) => Ok(v),
            Self::NotComputable(r) => Err(r),
        }
    }
}

impl<T: Copy> Estimate<T> {
    pub fn value(&self) -> Option<T> {
        self.computed().copied()
    }
}

impl<T> From<Result<T, NotComputable>> for Estimate<T> {
    fn from(r: Result<T, NotComputable>) -> Self {
        match r {
            Ok(v) => Self::Computed(v),
            Err(e) => Self::NotComputable(e),
        }
    }
}

// ─── Sample ─────────────────────────────────────────────────────────────────

/// One observation time point. Optional fields are "not observed" when `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time_days: f64,
    /// Phase name -> molar amount (mol).
    pub phase_amounts: BTreeMap<String, f64>,
    #[serde(rename = "pH")]
    pub ph: Option<f64>,
    pub porosity: Option<f64>,
    /// Summed solid phase mass (g), when the record reports per-phase masses.
    pub solid_mass_g: Option<f64>,
}

impl Sample {
    pub fn new(time_days: f64) -> Self {
        Self { time_days, phase_amounts: BTreeMap::new(), ph: None, porosity: None, solid_mass_g: None }
    }

    pub fn with_phase(mut self, name: impl Into<String>, amount_mol: f64) -> Self {
        self.phase_amounts.insert(name.into(), amount_mol);
        self
    }

    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = Some(ph);
        self
    }

    pub fn with_porosity(mut self, porosity: f64) -> Self {
        self.porosity = Some(porosity);
        self
    }

    pub fn with_solid_mass(mut self, mass_g: f64) -> Self {
        self.solid_mass_g = Some(mass_g);
        self
    }

    pub fn phase(&self, name: &str) -> Option<f64> {
        self.phase_amounts.get(name).copied()
    }
}

/// A single-quantity observation: `(sample index, time_days, value)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub index: usize,
    pub time_days: f64,
    pub value: f64,
}

// ─── Scenario Series ────────────────────────────────────────────────────────

/// Canonical, validated time series of one scenario. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSeries {
    scenario_id: ScenarioId,
    samples: Vec<Sample>,
}

impl ScenarioSeries {
    /// Builds a series, enforcing: >= 2 samples, first at t = 0, strictly
    /// increasing non-negative times.
    pub fn new(scenario_id: ScenarioId, samples: Vec<Sample>) -> Result<Self, crate::series::DataError> {
        use crate::series::DataError;

        if samples.is_empty() {
            return Err(DataError::EmptySeries { scenario: scenario_id });
        }
        if samples[0].time_days != 0.0 {
            return Err(DataError::MissingBaseline {
                scenario: scenario_id,
                first_time_days: samples[0].time_days,
            });
        }
        if samples.len() < 2 {
            return Err(DataError::InsufficientSamples {
                scenario: scenario_id,
                usable: samples.len(),
            });
        }
        for pair in samples.windows(2) {
            if !(pair[1].time_days > pair[0].time_days) || !pair[1].time_days.is_finite() {
                return Err(DataError::NonMonotonicTime {
                    scenario: scenario_id,
                    time_days: pair[1].time_days,
                });
            }
        }
        Ok(Self { scenario_id, samples })
    }

    pub fn scenario_id(&self) -> ScenarioId {
        self.scenario_id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Observations of one field, skipping samples where it was not observed.
    pub fn observations(&self, field: impl Fn(&Sample) -> Option<f64>) -> Vec<Observation> {
        self.samples
            .iter()
            .enumerate()
            .filter_map(|(index, s)| {
                field(s).map(|value| Observation { index, time_days: s.time_days, value })
            })
            .collect()
    }

    pub fn phase_observations(&self, phase: &str) -> Vec<Observation> {
        self.observations(|s| s.phase(phase))
    }

    pub fn ph_observations(&self) -> Vec<Observation> {
        self.observations(|s| s.ph)
    }

    pub fn porosity_observations(&self) -> Vec<Observation> {
        self.observations(|s| s.porosity)
    }

    /// Every phase name observed in at least one sample, sorted.
    pub fn phase_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .samples
            .iter()
            .flat_map(|s| s.phase_amounts.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_id_round_trips_through_label() {
        for id in ScenarioId::all() {
            let parsed: ScenarioId = id.label().parse().unwrap();
            assert_eq!(parsed, id);
        }
        assert_eq!(ScenarioId::new(Solution::Mixed, Condition::Pressure).label(), "mixed_pressure");
        assert_eq!(ScenarioId::new(Solution::PureWater, Condition::Immersion).label(), "PW_immersion");
    }

    #[test]
    fn scenario_id_rejects_unknown_parts() {
        assert!("seawater_immersion".parse::<ScenarioId>().is_err());
        assert!("PW_soaked".parse::<ScenarioId>().is_err());
        assert!("PW".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn all_scenarios_are_six_and_distinct() {
        let all = ScenarioId::all();
        assert_eq!(all.len(), 6);
        let mut labels: Vec<String> = all.iter().map(|s| s.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn estimate_serializes_with_status_tag() {
        let ok: Estimate<f64> = Estimate::Computed(1.5);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "computed");
        assert_eq!(json["value"], 1.5);

        let missing: Estimate<f64> = Estimate::NotComputable(NotComputable::zero("initial ettringite"));
        let json = serde_json::to_value(&missing).unwrap();
        assert_eq!(json["status"], "not_computable");
        assert_eq!(json["value"]["kind"], "zero_denominator");
    }

    #[test]
    fn not_computable_reason_is_readable() {
        let r = NotComputable::InsufficientPoints { required: 2, available: 1 };
        assert_eq!(r.to_string(), "1 usable point(s), at least 2 needed");
        let up = NotComputable::upstream("immersion rate", &r);
        assert!(up.to_string().starts_with("immersion rate not computable"));
    }

    #[test]
    fn series_rejects_missing_baseline_and_disorder() {
        let id = ScenarioId::new(Solution::NaCl, Condition::Immersion);
        let late = vec![Sample::new(1.0), Sample::new(2.0)];
        assert!(ScenarioSeries::new(id, late).is_err());

        let disorder = vec![Sample::new(0.0), Sample::new(5.0), Sample::new(5.0)];
        assert!(ScenarioSeries::new(id, disorder).is_err());

        let single = vec![Sample::new(0.0)];
        assert!(ScenarioSeries::new(id, single).is_err());
    }

    #[test]
    fn observations_skip_unobserved_fields() {
        let id = ScenarioId::new(Solution::PureWater, Condition::Immersion);
        let series = ScenarioSeries::new(
            id,
            vec![
                Sample::new(0.0).with_phase("portlandite", 4.2).with_ph(13.7),
                Sample::new(3.0).with_ph(13.6),
                Sample::new(6.0).with_phase("portlandite", 4.0),
            ],
        )
        .unwrap();

        let ch = series.phase_observations("portlandite");
        assert_eq!(ch.len(), 2);
        assert_eq!(ch[1].index, 2);
        assert_eq!(series.ph_observations().len(), 2);
        assert!(series.porosity_observations().is_empty());
        assert_eq!(series.phase_names(), vec!["portlandite".to_string()]);
    }
}
