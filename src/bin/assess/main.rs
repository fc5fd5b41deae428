// Campaign Assessment Runner: kinetics, severity ranking, Monte Carlo robustness
// Writes results to assessment-results/assessment-{timestamp}.json
//
// Usage:
//   cargo run --release --bin assess                           # Synthetic campaign, 30 replicates
//   cargo run --release --bin assess -- --input data/          # Upstream records, <label>.json per scenario
//   cargo run --release --bin assess -- --config engine.json   # Custom constants, weights, bands
//   cargo run --release --bin assess -- --runs 0               # Skip robustness replicates
//   cargo run --release --bin assess -- --noise 0.05 --seed 7  # Noisier replicates, custom base seed

mod monte_carlo;
mod report;
mod scenarios;

use durability_engine::{
    CampaignReport, DegradationEngine, EngineConfig, EngineError, Estimate, ScenarioId, ScenarioInput,
};
use report::AssessmentRun;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    out: PathBuf,
    runs: usize,
    noise: f64,
    seed: u64,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            input: None,
            config: None,
            out: PathBuf::from("assessment-results"),
            runs: 30,
            noise: 0.02,
            seed: 0,
        }
    }
}

/// Parses a flag value, keeping `current` when the value is absent or malformed.
fn parsed<T: FromStr>(flag: &str, value: Option<String>, current: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(flag, value = %raw, "invalid value, keeping default");
            current
        }),
        None => {
            tracing::warn!(flag, "missing value");
            current
        }
    }
}

fn parse_args_from(args: impl IntoIterator<Item = String>) -> CliArgs {
    let mut cli = CliArgs::default();
    let mut it = args.into_iter();
    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--input" => cli.input = it.next().map(PathBuf::from),
            "--config" => cli.config = it.next().map(PathBuf::from),
            "--out" => cli.out = parsed(&flag, it.next(), cli.out),
            "--runs" => cli.runs = parsed(&flag, it.next(), cli.runs),
            "--noise" => cli.noise = parsed(&flag, it.next(), cli.noise),
            "--seed" => cli.seed = parsed(&flag, it.next(), cli.seed),
            other => tracing::warn!(argument = other, "unknown argument"),
        }
    }
    cli
}

fn parse_args() -> CliArgs {
    parse_args_from(std::env::args().skip(1))
}

// ─── Input Loading ──────────────────────────────────────────────────────────

/// `<label>.json`, falling back to the upstream `<label>_60d.json` naming.
/// A scenario with no file, or one that cannot be read or parsed, is excluded
/// from the campaign rather than aborting it.
fn load_directory(dir: &Path) -> Vec<ScenarioInput> {
    ScenarioId::all()
        .into_iter()
        .map(|id| {
            let candidates = [dir.join(format!("{}.json", id.label())), dir.join(format!("{}_60d.json", id.label()))];
            let Some(path) = candidates.iter().find(|p| p.is_file()) else {
                tracing::warn!(scenario = %id, dir = %dir.display(), "no record file");
                return ScenarioInput::missing(id);
            };
            match std::fs::read_to_string(path) {
                Ok(json) => {
                    tracing::info!(scenario = %id, path = %path.display(), "loaded record");
                    ScenarioInput::from_json_str(id, &json)
                }
                Err(e) => {
                    tracing::warn!(scenario = %id, path = %path.display(), error = %e, "record read failed");
                    ScenarioInput::unreadable(id, format!("{}: {}", path.display(), e))
                }
            }
        })
        .collect()
}

fn fmt_estimate(e: &Estimate<f64>, precision: usize) -> String {
    match e {
        Estimate::Computed(v) => format!("{:.*}", precision, v),
        Estimate::NotComputable(_) => "n/c".to_string(),
    }
}

// ─── Output ─────────────────────────────────────────────────────────────────

fn print_campaign(report: &CampaignReport) {
    println!("  {:<18} {:>4} {:>8} {:>8} {:>8} {:>8} {:>8}  {:<12}",
        "Scenario", "Rank", "Score", "CH%", "CSH%", "dpH", "dPor", "Severity");
    println!("  {}", "-".repeat(88));
    for s in &report.severity {
        let cell = |i: usize| s.terms.get(i).map(|t| fmt_estimate(&t.raw, 2)).unwrap_or_default();
        println!("  {:<18} {:>4} {:>8.3} {:>8} {:>8} {:>8} {:>8}  {:<12}{}",
            s.scenario.label(),
            s.rank,
            s.composite_score,
            cell(0),
            cell(1),
            cell(2),
            cell(3),
            s.severity_label,
            if s.partial { " (partial)" } else { "" },
        );
    }
    for e in &report.excluded {
        println!("  {:<18} excluded: {}", e.scenario.label(), e.reason);
    }

    if !report.acceleration_factors.is_empty() {
        println!("\n  Pressure Acceleration (pressure rate / immersion rate):");
        for f in &report.acceleration_factors {
            println!("    {:<8} {:<16} {:<16} {:>8}",
                f.solution.as_str(),
                f.phase,
                format!("{:?}", f.model_kind),
                fmt_estimate(&f.factor, 2),
            );
        }
    }

    println!("\n  Condition effect: immersion {} | pressure {} | ratio {}",
        fmt_estimate(&report.condition_effect.mean_immersion, 3),
        fmt_estimate(&report.condition_effect.mean_pressure, 3),
        fmt_estimate(&report.condition_effect.ratio, 2),
    );

    println!("\n  Weight Sensitivity:");
    for t in &report.sensitivity {
        let level = match &t.level {
            Estimate::Computed(l) => format!("{:?}", l),
            Estimate::NotComputable(_) => "n/c".to_string(),
        };
        println!("    {:<20} w={:.2}  index {:>8}%  {}",
            t.term.as_str(),
            t.baseline_weight,
            fmt_estimate(&t.sensitivity_index_pct, 1),
            level,
        );
    }

    println!("\n  Not computable: {} value(s)", report.gaps.len());
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(cli: &CliArgs) -> Result<(), EngineError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let engine = DegradationEngine::new(config)?;

    let (inputs, source) = match &cli.input {
        Some(dir) => (load_directory(dir), dir.display().to_string()),
        None => (
            scenarios::synthetic_inputs(0.0, cli.seed)
                .map_err(|source| EngineError::Json { context: "synthetic campaign".to_string(), source })?,
            "synthetic".to_string(),
        ),
    };

    println!("\n  Campaign Assessment Runner v{}", durability_engine::report::ENGINE_VERSION);
    println!("  Source: {} | PRNG: ChaCha8Rng | Replicates: {} | Noise: ±{:.1}% | Base seed: {}\n",
        source, cli.runs, cli.noise * 100.0, cli.seed);

    let started = Instant::now();
    let campaign = engine.assess(&inputs);
    print_campaign(&campaign);

    // Replicates are synthetic; a loaded campaign has no generator to perturb.
    let robustness = if cli.input.is_none() && cli.runs > 0 {
        let baseline = campaign.ranking();
        let r = monte_carlo::run_monte_carlo(&engine, &baseline, cli.runs, cli.noise, cli.seed)?;
        println!("\n  Robustness ({} replicates):", r.runs);
        println!("    Ranking reproduced: {:.1}% | Top scenario reproduced: {:.1}%",
            r.ranking_reproduced * 100.0, r.top_reproduced * 100.0);
        for s in &r.scenarios {
            match (&s.score, &s.rank) {
                (Some(score), Some(rank)) => println!(
                    "    {:<18} score {:.3}±{:<6.3} baseline #{} modal #{} in {:.0}% of runs",
                    s.scenario, score.mean, score.half_width(), s.baseline_rank, rank.modal_rank, rank.modal_share * 100.0,
                ),
                _ => println!("    {:<18} excluded in all {} runs", s.scenario, s.excluded_runs),
            }
        }
        Some(r)
    } else {
        None
    };

    println!("\n  Elapsed: {:.1}ms", started.elapsed().as_secs_f64() * 1000.0);

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
    let timestamp = format!("{}", ts);

    let run = AssessmentRun {
        timestamp: timestamp.clone(),
        source,
        prng: "ChaCha8Rng",
        campaign,
        robustness,
    };

    std::fs::create_dir_all(&cli.out).map_err(|source| EngineError::Io { path: cli.out.clone(), source })?;
    let path = cli.out.join(format!("assessment-{}.json", timestamp));
    let json = serde_json::to_string_pretty(&run)
        .map_err(|source| EngineError::Json { context: "assessment report".to_string(), source })?;
    std::fs::write(&path, &json).map_err(|source| EngineError::Io { path: path.clone(), source })?;
    println!("  Results saved to: {}\n", path.display());

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    if let Err(e) = run(&cli) {
        eprintln!("  Error: {}", e);
        std::process::exit(1);
    }
}
