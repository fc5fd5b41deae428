// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Scenario Series Loader

//! Converts an upstream, already-parsed scenario record into a validated
//! [`ScenarioSeries`].
//!
//! The loader never fabricates values. A sample without a usable time is
//! dropped; an out-of-range optional field is discarded for that field only,
//! so the sample still feeds fits over its other fields. Every discard is
//! recorded as a [`PartialDataWarning`].
//!
//! Both upstream record shapes are accepted:
//!
//! ```text
//! { "time_days": 3.0, "phases": { "portlandite": 4.1 }, "pH": 13.6, "porosity": 0.28 }
//! { "time_days": 3.0, "phase_assemblage": { "portlandite": { "amount_mol": 4.1 } },
//!   "pore_solution": { "pH": 13.6 } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::KineticsConfig;
use crate::kinetics::PH_FIELD;
use crate::types::{Sample, ScenarioId, ScenarioSeries};

pub const POROSITY_FIELD: &str = "porosity";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Scenario-level data failure. The scenario is excluded from ranking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("{scenario}: no series supplied")]
    MissingSeries { scenario: ScenarioId },

    #[error("{scenario}: series contains no samples")]
    EmptySeries { scenario: ScenarioId },

    #[error("{scenario}: only {usable} usable sample(s), at least 2 required")]
    InsufficientSamples { scenario: ScenarioId, usable: usize },

    #[error("{scenario}: first usable sample is at t = {first_time_days} d, expected a t = 0 baseline")]
    MissingBaseline { scenario: ScenarioId, first_time_days: f64 },

    #[error("{scenario}: sample time {time_days} d is not strictly after its predecessor")]
    NonMonotonicTime { scenario: ScenarioId, time_days: f64 },

    #[error("record labelled '{found}' supplied for scenario {expected}")]
    ScenarioMismatch { expected: ScenarioId, found: String },

    #[error("{scenario}: supplied more than once")]
    DuplicateScenario { scenario: ScenarioId },

    #[error("{scenario}: record unreadable: {reason}")]
    Unreadable { scenario: ScenarioId, reason: String },
}

impl DataError {
    pub fn scenario(&self) -> ScenarioId {
        match self {
            Self::MissingSeries { scenario }
            | Self::EmptySeries { scenario }
            | Self::InsufficientSamples { scenario, .. }
            | Self::MissingBaseline { scenario, .. }
            | Self::NonMonotonicTime { scenario, .. }
            | Self::DuplicateScenario { scenario }
            | Self::Unreadable { scenario, .. } => *scenario,
            Self::ScenarioMismatch { expected, .. } => *expected,
        }
    }
}

/// A scenario dropped from ranking, with the data error that caused it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedScenario {
    pub scenario: ScenarioId,
    pub reason: String,
}

impl From<&DataError> for ExcludedScenario {
    fn from(err: &DataError) -> Self {
        Self { scenario: err.scenario(), reason: err.to_string() }
    }
}

// ---------------------------------------------------------------------------
// Raw (consumed) record
// ---------------------------------------------------------------------------

/// Upstream scenario record. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawScenarioRecord {
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub time_series: Option<Vec<RawSample>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub time_days: Option<f64>,
    /// A `null` entry is an unobserved phase, not a malformed record.
    #[serde(default, alias = "phase_assemblage")]
    pub phases: Option<BTreeMap<String, Option<RawPhaseAmount>>>,
    #[serde(default, rename = "pH")]
    pub ph: Option<f64>,
    #[serde(default)]
    pub pore_solution: Option<RawPoreSolution>,
    #[serde(default)]
    pub porosity: Option<f64>,
}

/// A phase entry: either a bare molar amount or a detail object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPhaseAmount {
    Molar(f64),
    Detailed {
        #[serde(default)]
        amount_mol: Option<f64>,
        #[serde(default)]
        mass_g: Option<f64>,
    },
}

impl RawPhaseAmount {
    fn amount_mol(&self) -> Option<f64> {
        match self {
            Self::Molar(v) => Some(*v),
            Self::Detailed { amount_mol, .. } => *amount_mol,
        }
    }

    fn mass_g(&self) -> Option<f64> {
        match self {
            Self::Molar(_) => None,
            Self::Detailed { mass_g, .. } => mass_g.filter(|m| m.is_finite() && *m >= 0.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPoreSolution {
    #[serde(default, rename = "pH")]
    pub ph: Option<f64>,
}

impl RawScenarioRecord {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataIssue {
    /// Whole sample dropped: no usable time.
    MissingTime,
    /// Whole sample dropped: negative or non-finite time.
    InvalidTime,
    /// Whole sample dropped: repeats an earlier time.
    DuplicateTime,
    /// Field discarded: value outside its physical range.
    OutOfRange,
    /// Field discarded: phase entry carries no molar amount.
    MissingAmount,
    /// Field discarded: an alias names a phase the sample already reports.
    DuplicatePhase,
    /// Sample kept: a tracked field other samples report is absent here.
    FieldAbsent,
    /// Sample kept: it appears in the record before an earlier time.
    Reordered,
}

/// Some data was discarded but the scenario remains usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialDataWarning {
    pub scenario: ScenarioId,
    /// Position in the raw record.
    pub raw_index: usize,
    pub time_days: Option<f64>,
    /// `None` when the issue concerns the whole sample.
    pub field: Option<String>,
    pub issue: DataIssue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub series: ScenarioSeries,
    pub warnings: Vec<PartialDataWarning>,
}

impl LoadOutcome {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Validate and canonicalize one scenario's record.
pub fn normalize(
    expected: ScenarioId,
    record: Option<&RawScenarioRecord>,
    config: &KineticsConfig,
) -> Result<LoadOutcome, DataError> {
    let record = record.ok_or(DataError::MissingSeries { scenario: expected })?;

    if let Some(label) = &record.scenario {
        match label.parse::<ScenarioId>() {
            Ok(id) if id == expected => {}
            _ => {
                return Err(DataError::ScenarioMismatch { expected, found: label.clone() });
            }
        }
    }

    let raw = match &record.time_series {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Err(DataError::EmptySeries { scenario: expected }),
    };

    let mut warnings = Vec::new();
    let mut warn = |raw_index: usize, time_days: Option<f64>, field: Option<&str>, issue: DataIssue| {
        tracing::warn!(
            scenario = %expected,
            raw_index,
            field = field.unwrap_or("<sample>"),
            ?issue,
            "partial data"
        );
        warnings.push(PartialDataWarning {
            scenario: expected,
            raw_index,
            time_days,
            field: field.map(str::to_string),
            issue,
        });
    };

    let mut timed: Vec<(usize, Sample)> = Vec::with_capacity(raw.len());
    // (raw index, canonical field) pairs already warned about.
    let mut discarded: BTreeSet<(usize, String)> = BTreeSet::new();

    for (raw_index, rs) in raw.iter().enumerate() {
        let time = match rs.time_days {
            None => {
                warn(raw_index, None, None, DataIssue::MissingTime);
                continue;
            }
            Some(t) if !t.is_finite() || t < 0.0 => {
                warn(raw_index, Some(t), None, DataIssue::InvalidTime);
                continue;
            }
            Some(t) => t,
        };

        let mut sample = Sample::new(time);

        if let Some(phases) = &rs.phases {
            // Canonically named entries first, so an alias never overrides them.
            let mut entries: Vec<(&String, &Option<RawPhaseAmount>)> = phases.iter().collect();
            entries.sort_by_key(|(name, _)| config.canonical_phase(name) != name.as_str());

            for (name, entry) in entries {
                let canonical = config.canonical_phase(name);
                match entry.as_ref().and_then(RawPhaseAmount::amount_mol) {
                    None => {
                        warn(raw_index, Some(time), Some(name.as_str()), DataIssue::MissingAmount);
                        discarded.insert((raw_index, canonical.to_string()));
                    }
                    Some(v) if !v.is_finite() || v < 0.0 => {
                        warn(raw_index, Some(time), Some(name.as_str()), DataIssue::OutOfRange);
                        discarded.insert((raw_index, canonical.to_string()));
                    }
                    Some(_) if sample.phase_amounts.contains_key(canonical) => {
                        warn(raw_index, Some(time), Some(name.as_str()), DataIssue::DuplicatePhase);
                    }
                    Some(v) => {
                        sample.phase_amounts.insert(canonical.to_string(), v);
                        if let Some(m) = entry.as_ref().and_then(RawPhaseAmount::mass_g) {
                            *sample.solid_mass_g.get_or_insert(0.0) += m;
                        }
                    }
                }
            }
        }

        let ph = rs.ph.or_else(|| rs.pore_solution.as_ref().and_then(|p| p.ph));
        match ph {
            Some(v) if (0.0..=14.0).contains(&v) => sample.ph = Some(v),
            Some(_) => {
                warn(raw_index, Some(time), Some(PH_FIELD), DataIssue::OutOfRange);
                discarded.insert((raw_index, PH_FIELD.to_string()));
            }
            None => {}
        }

        match rs.porosity {
            Some(v) if (0.0..=1.0).contains(&v) => sample.porosity = Some(v),
            Some(_) => {
                warn(raw_index, Some(time), Some(POROSITY_FIELD), DataIssue::OutOfRange);
                discarded.insert((raw_index, POROSITY_FIELD.to_string()));
            }
            None => {}
        }

        timed.push((raw_index, sample));
    }

    let mut latest = f64::NEG_INFINITY;
    for (raw_index, sample) in &timed {
        if sample.time_days < latest {
            warn(*raw_index, Some(sample.time_days), None, DataIssue::Reordered);
        }
        latest = latest.max(sample.time_days);
    }

    // Stable: equal times keep record order, so the first occurrence wins.
    timed.sort_by(|a, b| a.1.time_days.total_cmp(&b.1.time_days));

    let mut kept: Vec<(usize, Sample)> = Vec::with_capacity(timed.len());
    for (raw_index, sample) in timed {
        if kept.last().map_or(false, |(_, prev)| prev.time_days == sample.time_days) {
            warn(raw_index, Some(sample.time_days), None, DataIssue::DuplicateTime);
            continue;
        }
        kept.push((raw_index, sample));
    }

    if kept.is_empty() {
        return Err(DataError::InsufficientSamples { scenario: expected, usable: 0 });
    }

    // A tracked field some samples report and others lack is a gap in those others.
    let phases = &config.phases;
    let tracked: [(&str, fn(&Sample, &str) -> bool); 6] = [
        (phases.portlandite.as_str(), has_phase),
        (phases.csh.as_str(), has_phase),
        (phases.ettringite.as_str(), has_phase),
        (phases.friedels_salt.as_str(), has_phase),
        (PH_FIELD, |s, _| s.ph.is_some()),
        (POROSITY_FIELD, |s, _| s.porosity.is_some()),
    ];
    for (field, present) in tracked {
        if !kept.iter().any(|(_, s)| present(s, field)) {
            continue;
        }
        for (raw_index, sample) in &kept {
            if !present(sample, field) && !discarded.contains(&(*raw_index, field.to_string())) {
                warn(*raw_index, Some(sample.time_days), Some(field), DataIssue::FieldAbsent);
            }
        }
    }

    let samples = kept.into_iter().map(|(_, s)| s).collect();
    let series = ScenarioSeries::new(expected, samples)?;
    Ok(LoadOutcome { series, warnings })
}

fn has_phase(sample: &Sample, phase: &str) -> bool {
    sample.phase_amounts.contains_key(phase)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
