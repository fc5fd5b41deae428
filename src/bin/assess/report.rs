// Assessment Run Report Types
// Campaign report plus Monte Carlo robustness, written as one JSON document

use durability_engine::CampaignReport;
use serde::Serialize;

// ─── Score Spread ───────────────────────────────────────────────────────────

/// Composite-score spread over replicates (Welford single pass, sample variance).
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSpread {
    pub mean: f64,
    pub std_dev: f64,
    /// Normal-approximation 95% interval of the mean.
    pub ci95: [f64; 2],
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl ScoreSpread {
    pub fn of(scores: &[f64]) -> Option<Self> {
        let (first, _) = scores.split_first()?;
        let (mut mean, mut m2) = (0.0, 0.0);
        let (mut min, mut max) = (*first, *first);
        for (i, &x) in scores.iter().enumerate() {
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
            min = min.min(x);
            max = max.max(x);
        }
        let n = scores.len();
        let std_dev = if n > 1 { (m2 / (n - 1) as f64).sqrt() } else { 0.0 };
        let half = 1.96 * std_dev / (n as f64).sqrt();
        Some(Self { mean, std_dev, ci95: [mean - half, mean + half], min, max, n })
    }

    pub fn half_width(&self) -> f64 {
        (self.ci95[1] - self.ci95[0]) / 2.0
    }
}

// ─── Rank Stability ─────────────────────────────────────────────────────────

/// How often a scenario landed at each rank.
#[derive(Debug, Clone, Serialize)]
pub struct RankStability {
    /// `histogram[r - 1]` = replicates ranked `r`.
    pub histogram: Vec<usize>,
    /// Most frequent rank; ties go to the more severe rank.
    pub modal_rank: usize,
    pub modal_share: f64,
}

impl RankStability {
    pub fn of(ranks: &[usize], scenario_count: usize) -> Option<Self> {
        if ranks.is_empty() {
            return None;
        }
        let mut histogram = vec![0usize; scenario_count.max(1)];
        for &r in ranks {
            if let Some(slot) = r.checked_sub(1).and_then(|i| histogram.get_mut(i)) {
                *slot += 1;
            }
        }
        let (modal_index, modal_count) = histogram
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
        Some(Self {
            modal_rank: modal_index + 1,
            modal_share: modal_count as f64 / ranks.len() as f64,
            histogram,
        })
    }
}

// ─── Robustness ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRobustness {
    pub scenario: String,
    pub baseline_rank: usize,
    /// `None` when the scenario was excluded from every replicate.
    pub score: Option<ScoreSpread>,
    pub rank: Option<RankStability>,
    /// Replicates in which the scenario was excluded.
    pub excluded_runs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RobustnessReport {
    pub runs: usize,
    pub noise: f64,
    pub base_seed: u64,
    pub baseline_ranking: Vec<String>,
    /// Fraction of replicates reproducing the baseline order exactly.
    pub ranking_reproduced: f64,
    /// Fraction of replicates with the same most severe scenario.
    pub top_reproduced: f64,
    pub scenarios: Vec<ScenarioRobustness>,
}

// ─── Full Run ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRun {
    pub timestamp: String,
    pub source: String,
    pub prng: &'static str,
    pub campaign: CampaignReport,
    pub robustness: Option<RobustnessReport>,
}
