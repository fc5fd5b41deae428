// Synthetic Exposure Campaign: six scenarios from literature rate constants
// Phase curves follow first-order dissolution with solution and pressure factors

use durability_engine::{Condition, RawScenarioRecord, ScenarioId, ScenarioInput, Solution};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};

// ─── Campaign Constants ─────────────────────────────────────────────────────

pub const DURATION_DAYS: f64 = 60.0;
pub const STEP_DAYS: f64 = 3.0;

const PH_INITIAL: f64 = 13.72;
const POROSITY_INITIAL: f64 = 0.28;

const CH_INITIAL: f64 = 4.20;
const CSH_INITIAL: f64 = 12.50;
const ETTRINGITE_INITIAL: f64 = 0.85;
const MONOSULFATE_INITIAL: f64 = 0.45;

/// Aluminate available for Friedel's salt (mol).
const AL_AVAILABLE: f64 = 0.6;
const CL_CONC_MOL_L: f64 = 1.197;
const SO4_CONC_MOL_L: f64 = 0.070;

// ─── Scenario Definition ────────────────────────────────────────────────────

/// Rate constants (day^-1) for one condition.
#[derive(Debug, Clone, Copy)]
pub struct RateSet {
    pub portlandite: f64,
    pub csh: f64,
    pub ettringite: f64,
    pub friedel: f64,
}

pub const IMMERSION: RateSet = RateSet { portlandite: 0.012, csh: 0.008, ettringite: 0.015, friedel: 0.025 };
pub const PRESSURE: RateSet = RateSet { portlandite: 0.035, csh: 0.022, ettringite: 0.040, friedel: 0.065 };

pub struct Scenario {
    pub id: ScenarioId,
    pub rates: RateSet,
    /// Multiplies portlandite dissolution.
    pub ch_factor: f64,
    /// Multiplies C-S-H decalcification.
    pub csh_factor: f64,
    /// Multiplies the sqrt-time pH drop.
    pub ph_factor: f64,
    pub chloride: bool,
    pub sulfate: bool,
}

pub fn scenarios() -> Vec<Scenario> {
    ScenarioId::all()
        .into_iter()
        .map(|id| {
            let (ch_factor, csh_factor, solution_ph) = match id.solution {
                Solution::PureWater => (1.0, 1.0, 1.0),
                Solution::NaCl => (1.35, 1.25, 1.4),
                Solution::Mixed => (1.75, 1.60, 1.9),
            };
            let (rates, condition_ph) = match id.condition {
                Condition::Immersion => (IMMERSION, 1.0),
                Condition::Pressure => (PRESSURE, 2.5),
            };
            Scenario {
                id,
                rates,
                ch_factor,
                csh_factor,
                ph_factor: solution_ph * condition_ph,
                chloride: id.solution.is_chloride_bearing(),
                sulfate: id.solution == Solution::Mixed,
            }
        })
        .collect()
}

// ─── Curves ─────────────────────────────────────────────────────────────────

/// Pore solution pH, buffered by portlandite then by C-S-H.
fn pore_solution_ph(ch: f64, csh: f64, t: f64, factor: f64) -> f64 {
    let leach = 0.015 * factor * t.sqrt();
    let ph = if ch > 3.0 {
        PH_INITIAL - leach
    } else if ch > 0.5 {
        let remaining = (ch - 0.5) / 3.5;
        12.5 + remaining * (PH_INITIAL - leach - 12.5)
    } else if csh > 8.0 {
        11.5 + (csh - 8.0) / 4.5 - 0.02 * factor * t.sqrt()
    } else {
        10.0 + csh / 8.0 * 1.5 - 0.03 * factor * t.sqrt()
    };
    ph.max(10.0)
}

/// Relative noise in [-noise, noise].
fn jitter(rng: &mut ChaCha8Rng, noise: f64) -> f64 {
    if noise > 0.0 {
        1.0 + rng.gen_range(-noise..=noise)
    } else {
        1.0
    }
}

/// Upstream record for one scenario, in the `phase_assemblage` shape.
pub fn generate_record(scenario: &Scenario, noise: f64, seed: u64) -> Value {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let r = scenario.rates;
    let friedel_max = (AL_AVAILABLE * 2.0).min(CL_CONC_MOL_L / 2.0);
    let steps = (DURATION_DAYS / STEP_DAYS).round() as usize;

    let mut series = Vec::with_capacity(steps + 1);
    for step in 0..=steps {
        let t = step as f64 * STEP_DAYS;
        // Baseline is measured, not simulated.
        let n = |rng: &mut ChaCha8Rng| if step == 0 { 1.0 } else { jitter(rng, noise) };

        let ch = CH_INITIAL * (-r.portlandite * scenario.ch_factor * t).exp() * n(&mut rng);
        let csh = CSH_INITIAL * (-r.csh * scenario.csh_factor * t).exp() * n(&mut rng);
        let ettringite = n(&mut rng)
            * if scenario.sulfate {
                ETTRINGITE_INITIAL + r.ettringite * SO4_CONC_MOL_L * 0.5 * t
            } else {
                ETTRINGITE_INITIAL * (-0.005 * r.ettringite * t).exp()
            };
        let monosulfate = MONOSULFATE_INITIAL * (-0.5 * r.ettringite * t).exp();
        let friedel = if scenario.chloride {
            friedel_max * (1.0 - (-r.friedel * CL_CONC_MOL_L / 1.2 * t).exp()) * n(&mut rng)
        } else {
            0.0
        };
        let ph = pore_solution_ph(ch, csh, t, scenario.ph_factor) * n(&mut rng).powf(0.1);
        let degradation = 1.0 - csh / CSH_INITIAL;
        let porosity = (POROSITY_INITIAL + 0.10 * degradation.max(0.0)).min(1.0);

        let mut phases = json!({
            "portlandite": { "amount_mol": ch },
            "CSH_gel": { "amount_mol": csh },
            "ettringite": { "amount_mol": ettringite },
            "monosulfate": { "amount_mol": monosulfate },
        });
        if scenario.chloride {
            phases["friedels_salt"] = json!({ "amount_mol": friedel });
        }

        series.push(json!({
            "step": step,
            "time_days": t,
            "phase_assemblage": phases,
            "pore_solution": { "pH": ph },
            "porosity": porosity,
        }));
    }

    json!({
        "scenario": scenario.id.label(),
        "simulation_info": { "duration_days": DURATION_DAYS, "timestep_days": STEP_DAYS },
        "time_series": series,
    })
}

/// All six scenarios as engine inputs. Each scenario gets its own stream.
pub fn synthetic_inputs(noise: f64, seed: u64) -> Result<Vec<ScenarioInput>, serde_json::Error> {
    scenarios()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let value = generate_record(s, noise, seed.wrapping_mul(31).wrapping_add(i as u64));
            let record: RawScenarioRecord = serde_json::from_value(value)?;
            Ok(ScenarioInput::new(s.id, record))
        })
        .collect()
}
