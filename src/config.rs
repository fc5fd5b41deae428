// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Engine Configuration

//! Weights, thresholds and physical constants consumed by the estimator and
//! the scorer.
//!
//! Everything that used to be a literal in the analysis scripts lives here and
//! is passed in at construction time. Configuration files must spell out every
//! field: there are no serde defaults, so a missing entry is a parse error
//! rather than a silently substituted value. `Default` exists for
//! programmatic use and documents the reference campaign's constants.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::kinetics::ModelKind;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid or missing configuration. Fatal at engine construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("severity weights sum to {sum}, expected exactly 1")]
    WeightsDoNotSumToOne { sum: Decimal },

    #[error("severity weight '{term}' is negative ({value})")]
    NegativeWeight { term: &'static str, value: Decimal },

    #[error("'{name}' = {value} is invalid: expected {expected}")]
    InvalidConstant { name: &'static str, value: f64, expected: &'static str },

    #[error("severity band table is empty")]
    EmptyBands,

    #[error("severity band '{label}' does not have a strictly lower threshold than the band above it")]
    BandsNotDescending { label: String },

    #[error("severity band with threshold {min_score} has an empty label")]
    EmptyBandLabel { min_score: Decimal },

    #[error("damage bands must satisfy 0 <= medium ({medium}) < high ({high})")]
    InvalidDamageBands { medium: f64, high: f64 },

    #[error("additional fit for '{phase}' uses {model:?}; only FirstOrder and LinearAverage are supported")]
    UnsupportedAdditionalFit { phase: String, model: ModelKind },

    #[error("tracked phase name for {role} is empty")]
    EmptyPhaseName { role: &'static str },

    #[error("decimal value for '{name}' ({value}) has no f64 representation")]
    Unrepresentable { name: String, value: Decimal },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Tracked phases
// ---------------------------------------------------------------------------

/// Canonical names of the phases the estimator fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPhases {
    pub portlandite: String,
    pub csh: String,
    pub ettringite: String,
    pub friedels_salt: String,
}

impl Default for TrackedPhases {
    fn default() -> Self {
        Self {
            portlandite: "portlandite".to_string(),
            csh: "CSH_gel".to_string(),
            ettringite: "ettringite".to_string(),
            friedels_salt: "friedels_salt".to_string(),
        }
    }
}

/// Extra per-phase fit beyond the built-in tracked set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalFit {
    pub phase: String,
    pub model: ModelKind,
}

// ---------------------------------------------------------------------------
// Damage bands
// ---------------------------------------------------------------------------

/// Sulfate damage index bands (percent), inclusive lower bounds:
/// Low < `medium_from` <= Medium < `high_from` <= High.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageBands {
    pub medium_from: f64,
    pub high_from: f64,
}

impl Default for DamageBands {
    fn default() -> Self {
        Self { medium_from: 20.0, high_from: 50.0 }
    }
}

// ---------------------------------------------------------------------------
// Plausibility limits
// ---------------------------------------------------------------------------

/// Physical-consistency thresholds for upstream output. Breaches are reported
/// per scenario and never exclude it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityLimits {
    /// Largest pH rise between consecutive samples treated as numerical noise.
    pub max_ph_rise: f64,
    pub initial_ph_min: f64,
    pub initial_ph_max: f64,
    /// Portlandite rise between consecutive samples treated as noise (mol).
    pub portlandite_tolerance_mol: f64,
    /// Largest plausible Friedel's salt formation over the exposure (mol).
    pub max_friedel_formed_mol: f64,
    /// Solid mass basis of the initial sample (g) and its allowed deviation.
    pub initial_mass_basis_g: f64,
    pub initial_mass_tolerance_g: f64,
    /// Solid mass gain over the initial sample treated as noise (g).
    pub mass_gain_tolerance_g: f64,
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            max_ph_rise: 0.1,
            initial_ph_min: 13.0,
            initial_ph_max: 14.0,
            portlandite_tolerance_mol: 1e-6,
            max_friedel_formed_mol: 0.5,
            initial_mass_basis_g: 100.0,
            initial_mass_tolerance_g: 5.0,
            mass_gain_tolerance_g: 1.0,
        }
    }
}

impl PlausibilityLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("plausibility.max_ph_rise", self.max_ph_rise)?;
        check_range("plausibility.initial_ph_min", self.initial_ph_min, 0.0, 14.0, "a pH within [0, 14]")?;
        check_range("plausibility.initial_ph_max", self.initial_ph_max, self.initial_ph_min, 14.0,
            "a pH within [initial_ph_min, 14]")?;
        check_non_negative("plausibility.portlandite_tolerance_mol", self.portlandite_tolerance_mol)?;
        check_positive("plausibility.max_friedel_formed_mol", self.max_friedel_formed_mol)?;
        check_positive("plausibility.initial_mass_basis_g", self.initial_mass_basis_g)?;
        check_non_negative("plausibility.initial_mass_tolerance_g", self.initial_mass_tolerance_g)?;
        check_non_negative("plausibility.mass_gain_tolerance_g", self.mass_gain_tolerance_g)
    }
}

// ---------------------------------------------------------------------------
// KineticsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticsConfig {
    /// Depassivation threshold for the pH crossing time.
    pub ph_threshold: f64,
    /// mol Cl bound per mol Friedel's salt (3CaO·Al2O3·CaCl2·10H2O).
    pub chloride_stoichiometry: f64,
    pub chloride_molar_mass_g_per_mol: f64,
    /// Specimen paste mass used to express capacity per gram.
    pub paste_mass_g: f64,
    /// Aluminate-limited ceiling on chloride binding (mg Cl / g paste).
    pub theoretical_max_capacity_mg_per_g: f64,
    pub damage_bands: DamageBands,
    /// Fraction of initial amount below which a first-order phase counts as exhausted.
    pub exhaustion_fraction: f64,
    pub phases: TrackedPhases,
    /// Upstream phase name -> canonical name.
    pub phase_aliases: BTreeMap<String, String>,
    pub additional_fits: Vec<AdditionalFit>,
    pub plausibility: PlausibilityLimits,
}

impl Default for KineticsConfig {
    fn default() -> Self {
        let phases = TrackedPhases::default();
        let mut phase_aliases = BTreeMap::new();
        phase_aliases.insert("CH".to_string(), phases.portlandite.clone());
        phase_aliases.insert("CSH".to_string(), phases.csh.clone());
        phase_aliases.insert("friedel_salt".to_string(), phases.friedels_salt.clone());

        Self {
            ph_threshold: 12.5,
            chloride_stoichiometry: 2.0,
            chloride_molar_mass_g_per_mol: 35.45,
            paste_mass_g: 5.0,
            // 0.6 mol aluminate -> 1.2 mol Friedel's salt -> 2.4 mol Cl on a 5 g specimen
            theoretical_max_capacity_mg_per_g: 17_016.0,
            damage_bands: DamageBands::default(),
            exhaustion_fraction: 0.10,
            phases,
            phase_aliases,
            additional_fits: Vec::new(),
            plausibility: PlausibilityLimits::default(),
        }
    }
}

impl KineticsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("ph_threshold", self.ph_threshold, 0.0, 14.0, "a pH within [0, 14]")?;
        check_positive("chloride_stoichiometry", self.chloride_stoichiometry)?;
        check_positive("chloride_molar_mass_g_per_mol", self.chloride_molar_mass_g_per_mol)?;
        check_positive("paste_mass_g", self.paste_mass_g)?;
        check_positive("theoretical_max_capacity_mg_per_g", self.theoretical_max_capacity_mg_per_g)?;

        if !(self.exhaustion_fraction > 0.0 && self.exhaustion_fraction < 1.0) {
            return Err(ConfigError::InvalidConstant {
                name: "exhaustion_fraction",
                value: self.exhaustion_fraction,
                expected: "a fraction strictly between 0 and 1",
            });
        }

        let bands = &self.damage_bands;
        if !(bands.medium_from >= 0.0 && bands.medium_from < bands.high_from && bands.high_from.is_finite()) {
            return Err(ConfigError::InvalidDamageBands {
                medium: bands.medium_from,
                high: bands.high_from,
            });
        }

        for (role, name) in [
            ("portlandite", &self.phases.portlandite),
            ("C-S-H", &self.phases.csh),
            ("ettringite", &self.phases.ettringite),
            ("Friedel's salt", &self.phases.friedels_salt),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyPhaseName { role });
            }
        }

        self.plausibility.validate()?;

        for fit in &self.additional_fits {
            if !matches!(fit.model, ModelKind::FirstOrder | ModelKind::LinearAverage) {
                return Err(ConfigError::UnsupportedAdditionalFit {
                    phase: fit.phase.clone(),
                    model: fit.model,
                });
            }
        }
        Ok(())
    }

    /// Canonical name for an upstream phase key.
    pub fn canonical_phase<'a>(&'a self, name: &'a str) -> &'a str {
        self.phase_aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidConstant { name, value, expected: "a finite positive number" })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidConstant { name, value, expected: "a finite non-negative number" })
    }
}

fn check_range(name: &'static str, value: f64, lo: f64, hi: f64, expected: &'static str) -> Result<(), ConfigError> {
    if value >= lo && value <= hi {
        Ok(())
    } else {
        Err(ConfigError::InvalidConstant { name, value, expected })
    }
}

// ---------------------------------------------------------------------------
// Severity weights, bands, normalization
// ---------------------------------------------------------------------------

/// Fixed-policy composite weights. Must sum to exactly 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub ch_loss: Decimal,
    pub csh_loss: Decimal,
    pub ph_drop: Decimal,
    pub porosity_increase: Decimal,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            ch_loss: dec!(0.40),
            csh_loss: dec!(0.30),
            ph_drop: dec!(0.20),
            porosity_increase: dec!(0.10),
        }
    }
}

impl SeverityWeights {
    pub fn terms(&self) -> [(&'static str, Decimal); 4] {
        [
            ("ch_loss", self.ch_loss),
            ("csh_loss", self.csh_loss),
            ("ph_drop", self.ph_drop),
            ("porosity_increase", self.porosity_increase),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (term, value) in self.terms() {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(ConfigError::NegativeWeight { term, value });
            }
        }
        let sum: Decimal = self.terms().iter().map(|(_, w)| *w).sum();
        if sum != Decimal::ONE {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }
}

/// One row of the severity label table: scores `>= min_score` get `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityBand {
    pub label: String,
    pub min_score: Decimal,
}

pub fn default_bands() -> Vec<SeverityBand> {
    [
        ("Very Severe", dec!(0.8)),
        ("Severe", dec!(0.6)),
        ("Moderate", dec!(0.35)),
        ("Mild", dec!(0)),
    ]
    .into_iter()
    .map(|(label, min_score)| SeverityBand { label: label.to_string(), min_score })
    .collect()
}

/// How raw components are brought onto a comparable 0..1 scale before weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Normalization {
    /// Divide each term by its maximum over the scored scenarios.
    CampaignMax,
    /// Divide each term by a fixed reference magnitude.
    Reference {
        ch_loss_pct: f64,
        csh_loss_pct: f64,
        ph_drop: f64,
        porosity_increase_pct: f64,
    },
}

impl Normalization {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Self::Reference { ch_loss_pct, csh_loss_pct, ph_drop, porosity_increase_pct } = self {
            check_positive("reference.ch_loss_pct", *ch_loss_pct)?;
            check_positive("reference.csh_loss_pct", *csh_loss_pct)?;
            check_positive("reference.ph_drop", *ph_drop)?;
            check_positive("reference.porosity_increase_pct", *porosity_increase_pct)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityConfig {
    pub weights: SeverityWeights,
    /// Ordered from most to least severe.
    pub bands: Vec<SeverityBand>,
    pub normalization: Normalization,
    /// Weight shift used by the sensitivity analysis.
    pub sensitivity_step: f64,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            weights: SeverityWeights::default(),
            bands: default_bands(),
            normalization: Normalization::CampaignMax,
            sensitivity_step: 0.05,
        }
    }
}

impl SeverityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.normalization.validate()?;

        if self.bands.is_empty() {
            return Err(ConfigError::EmptyBands);
        }
        for band in &self.bands {
            if band.label.trim().is_empty() {
                return Err(ConfigError::EmptyBandLabel { min_score: band.min_score });
            }
        }
        for pair in self.bands.windows(2) {
            if pair[1].min_score >= pair[0].min_score {
                return Err(ConfigError::BandsNotDescending { label: pair[1].label.clone() });
            }
        }

        if !(self.sensitivity_step > 0.0 && self.sensitivity_step < 1.0) {
            return Err(ConfigError::InvalidConstant {
                name: "sensitivity_step",
                value: self.sensitivity_step,
                expected: "a weight shift strictly between 0 and 1",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub kinetics: KineticsConfig,
    pub severity: SeverityConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kinetics.validate()?;
        self.severity.validate()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
