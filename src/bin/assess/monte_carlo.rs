// Monte Carlo Robustness: N noisy replicates of the synthetic campaign
// Replicate i uses seed base+i; per-scenario score spread and rank histogram

use durability_engine::{DegradationEngine, EngineError, ScenarioId};

use crate::report::{RankStability, RobustnessReport, ScenarioRobustness, ScoreSpread};
use crate::scenarios::synthetic_inputs;

pub fn run_monte_carlo(
    engine: &DegradationEngine,
    baseline_ranking: &[ScenarioId],
    runs: usize,
    noise: f64,
    base_seed: u64,
) -> Result<RobustnessReport, EngineError> {
    let mut scores: Vec<Vec<f64>> = vec![Vec::with_capacity(runs); baseline_ranking.len()];
    let mut ranks: Vec<Vec<usize>> = vec![Vec::with_capacity(runs); baseline_ranking.len()];
    let mut excluded_runs = vec![0usize; baseline_ranking.len()];
    let mut reproduced = 0usize;
    let mut top_reproduced = 0usize;

    for run in 0..runs {
        let seed = base_seed.wrapping_add(run as u64);
        let inputs = synthetic_inputs(noise, seed)
            .map_err(|source| EngineError::Json { context: format!("replicate {}", run), source })?;
        let report = engine.assess(&inputs);
        let ranking = report.ranking();

        let same = ranking == baseline_ranking;
        if same {
            reproduced += 1;
        }
        if ranking.first() == baseline_ranking.first() {
            top_reproduced += 1;
        }

        for (i, id) in baseline_ranking.iter().enumerate() {
            match report.score(*id) {
                Some(s) => {
                    scores[i].push(s.composite_score);
                    ranks[i].push(s.rank);
                }
                None => excluded_runs[i] += 1,
            }
        }
        tracing::debug!(run, seed, reproduced = same, "replicate assessed");
    }

    let fraction = |count: usize| if runs == 0 { 0.0 } else { count as f64 / runs as f64 };

    Ok(RobustnessReport {
        runs,
        noise,
        base_seed,
        baseline_ranking: baseline_ranking.iter().map(|id| id.label()).collect(),
        ranking_reproduced: fraction(reproduced),
        top_reproduced: fraction(top_reproduced),
        scenarios: baseline_ranking
            .iter()
            .enumerate()
            .map(|(i, id)| ScenarioRobustness {
                scenario: id.label(),
                baseline_rank: i + 1,
                score: ScoreSpread::of(&scores[i]),
                rank: RankStability::of(&ranks[i], ScenarioId::all().len()),
                excluded_runs: excluded_runs[i],
            })
            .collect(),
    })
}
