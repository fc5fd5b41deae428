// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Kinetic Estimator

//! Per-scenario rate estimation.
//!
//! `KineticEstimator::estimate` fits every tracked quantity of one
//! [`ScenarioSeries`]:
//!
//! | Quantity        | Model           | Scenarios              |
//! |-----------------|-----------------|------------------------|
//! | portlandite     | FirstOrder      | all                    |
//! | C-S-H gel       | LinearAverage   | all                    |
//! | pore solution   | PhRate          | all                    |
//! | Friedel's salt  | BindingCapacity | chloride-bearing only  |
//! | ettringite      | DamageIndex     | all                    |
//!
//! plus any configured additional FirstOrder/LinearAverage fits. A fit that
//! cannot be derived is an `Estimate::NotComputable` carrying the reason;
//! no number is ever substituted.

pub mod models;
pub mod regression;

use serde::{Deserialize, Serialize};

use crate::config::KineticsConfig;
use crate::types::{Estimate, NotComputable, ScenarioId, ScenarioSeries};

/// Field name used for pH fits and acceleration factors.
pub const PH_FIELD: &str = "pH";

// ─── Model Kinds & Outcomes ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    FirstOrder,
    LinearAverage,
    PhRate,
    BindingCapacity,
    DamageIndex,
}

impl ModelKind {
    /// Models whose outcome is a rate comparable across conditions.
    pub fn is_rate_bearing(&self) -> bool {
        matches!(self, Self::FirstOrder | Self::LinearAverage | Self::PhRate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum HalfLife {
    Days(f64),
    /// Rate constant is zero or negative: the phase is not being consumed.
    NoDepletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdCrossing {
    /// Interpolated time; `sample_index` is the first sample below the threshold.
    Reached { sample_index: usize, time_days: f64 },
    NotReachedWithinWindow,
    BelowAtStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstOrderFit {
    /// k in C(t) = C0 exp(-k t), day^-1.
    pub rate_constant: f64,
    pub half_life: HalfLife,
    pub initial_value: f64,
    pub final_value: f64,
    pub depletion_fraction: Estimate<f64>,
    pub points_used: usize,
    pub r_squared: f64,
    /// Time the amount first drops below the configured fraction of its initial value.
    pub exhaustion: Estimate<ThresholdCrossing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearAverageFit {
    /// Amount lost per day between first and last observation.
    pub average_rate: f64,
    pub elapsed_days: f64,
    pub initial_value: f64,
    pub final_value: f64,
    pub depletion_fraction: Estimate<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhRateFit {
    /// Neutralization rate, pH units per day; positive while pH falls.
    pub average_rate: f64,
    pub ph_drop: f64,
    pub initial_ph: f64,
    pub final_ph: f64,
    pub threshold: f64,
    pub crossing: ThresholdCrossing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingCapacityFit {
    pub friedel_salt_mol: f64,
    pub peak_friedel_salt_mol: f64,
    pub bound_chloride_mol: f64,
    pub capacity_mg_per_g: f64,
    /// Fraction of the aluminate-limited theoretical capacity.
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageIndexFit {
    /// Percent change of ettringite relative to its initial amount.
    pub damage_index: f64,
    pub band: DamageBand,
    pub initial_value: f64,
    pub final_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FitOutcome {
    FirstOrder(FirstOrderFit),
    LinearAverage(LinearAverageFit),
    PhRate(PhRateFit),
    BindingCapacity(BindingCapacityFit),
    DamageIndex(DamageIndexFit),
}

// ─── Kinetic Fit ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KineticFit {
    pub scenario: ScenarioId,
    pub phase: String,
    pub model_kind: ModelKind,
    pub result: Estimate<FitOutcome>,
}

impl KineticFit {
    /// The rate this fit reports, for rate-bearing models. `None` otherwise.
    pub fn rate(&self) -> Option<Estimate<f64>> {
        if !self.model_kind.is_rate_bearing() {
            return None;
        }
        Some(match &self.result {
            Estimate::Computed(FitOutcome::FirstOrder(f)) => Estimate::Computed(f.rate_constant),
            Estimate::Computed(FitOutcome::LinearAverage(f)) => Estimate::Computed(f.average_rate),
            Estimate::Computed(FitOutcome::PhRate(f)) => Estimate::Computed(f.average_rate),
            Estimate::Computed(_) => return None,
            Estimate::NotComputable(r) => Estimate::NotComputable(NotComputable::upstream(self.label(), r)),
        })
    }

    /// Fractional loss for FirstOrder and LinearAverage fits.
    pub fn depletion_fraction(&self) -> Estimate<f64> {
        match &self.result {
            Estimate::Computed(FitOutcome::FirstOrder(f)) => f.depletion_fraction.clone(),
            Estimate::Computed(FitOutcome::LinearAverage(f)) => f.depletion_fraction.clone(),
            Estimate::Computed(_) => Estimate::NotComputable(NotComputable::NotObserved {
                field: format!("depletion fraction of {}", self.label()),
            }),
            Estimate::NotComputable(r) => Estimate::NotComputable(NotComputable::upstream(self.label(), r)),
        }
    }

    /// e.g. `portlandite FirstOrder fit`.
    pub fn label(&self) -> String {
        format!("{} {:?} fit", self.phase, self.model_kind)
    }
}

// ─── Scenario-Level Output ──────────────────────────────────────────────────

/// First and last observed porosity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PorosityChange {
    pub initial: f64,
    pub final_value: f64,
    /// (final - initial) in percentage points.
    pub increase_pct_points: f64,
}

/// Net change of any observed phase, scored or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseDelta {
    pub phase: String,
    pub initial_mol: f64,
    pub final_mol: f64,
    pub change_mol: f64,
    /// Relative change in percent; not computable when the phase starts at zero.
    pub change_pct: Estimate<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioKinetics {
    pub scenario: ScenarioId,
    pub fits: Vec<KineticFit>,
    pub porosity: Estimate<PorosityChange>,
    pub phase_deltas: Vec<PhaseDelta>,
}

impl ScenarioKinetics {
    pub fn fit(&self, phase: &str, model_kind: ModelKind) -> Option<&KineticFit> {
        self.fits.iter().find(|f| f.phase == phase && f.model_kind == model_kind)
    }
}

/// A (phase, model) pair whose rate is compared across conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuantity {
    pub phase: String,
    pub model_kind: ModelKind,
}

// ─── Estimator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct KineticEstimator {
    config: KineticsConfig,
}

impl KineticEstimator {
    pub fn new(config: KineticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KineticsConfig {
        &self.config
    }

    /// Fits in evaluation order: tracked quantities, then additional fits.
    fn plan(&self, scenario: ScenarioId) -> Vec<RateQuantity> {
        let phases = &self.config.phases;
        let mut plan = vec![
            RateQuantity { phase: phases.portlandite.clone(), model_kind: ModelKind::FirstOrder },
            RateQuantity { phase: phases.csh.clone(), model_kind: ModelKind::LinearAverage },
            RateQuantity { phase: PH_FIELD.to_string(), model_kind: ModelKind::PhRate },
        ];
        if scenario.solution.is_chloride_bearing() {
            plan.push(RateQuantity {
                phase: phases.friedels_salt.clone(),
                model_kind: ModelKind::BindingCapacity,
            });
        }
        plan.push(RateQuantity { phase: phases.ettringite.clone(), model_kind: ModelKind::DamageIndex });

        for extra in &self.config.additional_fits {
            let q = RateQuantity { phase: extra.phase.clone(), model_kind: extra.model };
            if !plan.contains(&q) {
                plan.push(q);
            }
        }
        plan
    }

    /// Every rate-bearing quantity, for acceleration factors.
    pub fn rate_quantities(&self) -> Vec<RateQuantity> {
        // Rate-bearing entries do not depend on the solution.
        self.plan(ScenarioId::new(crate::types::Solution::PureWater, crate::types::Condition::Immersion))
            .into_iter()
            .filter(|q| q.model_kind.is_rate_bearing())
            .collect()
    }

    pub fn estimate(&self, series: &ScenarioSeries) -> ScenarioKinetics {
        let scenario = series.scenario_id();
        let _span = tracing::debug_span!("estimate", scenario = %scenario).entered();

        let fits: Vec<KineticFit> = self
            .plan(scenario)
            .into_iter()
            .map(|q| {
                let result = self.fit_one(series, &q);
                if let Estimate::NotComputable(reason) = &result {
                    tracing::debug!(phase = %q.phase, model = ?q.model_kind, %reason, "fit not computable");
                }
                KineticFit { scenario, phase: q.phase, model_kind: q.model_kind, result }
            })
            .collect();

        let porosity = models::porosity_change(&series.porosity_observations());

        let phase_deltas = series
            .phase_names()
            .into_iter()
            .filter_map(|name| {
                let obs = series.phase_observations(&name);
                models::phase_delta(&name, &obs)
            })
            .collect();

        tracing::debug!(
            fits = fits.len(),
            computed = fits.iter().filter(|f| f.result.is_computed()).count(),
            "scenario estimated"
        );

        ScenarioKinetics { scenario, fits, porosity, phase_deltas }
    }

    fn fit_one(&self, series: &ScenarioSeries, q: &RateQuantity) -> Estimate<FitOutcome> {
        let cfg = &self.config;
        match q.model_kind {
            ModelKind::FirstOrder => {
                models::fit_first_order(&q.phase, &series.phase_observations(&q.phase), cfg.exhaustion_fraction)
                    .map(FitOutcome::FirstOrder)
            }
            ModelKind::LinearAverage => {
                models::fit_linear_average(&q.phase, &series.phase_observations(&q.phase))
                    .map(FitOutcome::LinearAverage)
            }
            ModelKind::PhRate => {
                models::fit_ph_rate(&series.ph_observations(), cfg.ph_threshold).map(FitOutcome::PhRate)
            }
            ModelKind::BindingCapacity => {
                models::fit_binding_capacity(&q.phase, &series.phase_observations(&q.phase), cfg)
                    .map(FitOutcome::BindingCapacity)
            }
            ModelKind::DamageIndex => {
                models::fit_damage_index(&q.phase, &series.phase_observations(&q.phase), &cfg.damage_bands)
                    .map(FitOutcome::DamageIndex)
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
