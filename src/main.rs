use anyhow::{Context, Result};
use clap::Parser;
use league_sim::config::{Config, ModelKind};
use league_sim::engine::{MonteCarloAggregator, SeasonProjection};
use league_sim::league::LeagueSnapshot;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.toml";

/// Command-line overrides on top of the config file.
#[derive(Debug, Parser)]
#[command(name = "league-sim")]
#[command(about = "Project final league standings by simulating the remaining fixtures", long_about = None)]
struct Args {
    /// Snapshot JSON: current table plus remaining fixtures
    snapshot: PathBuf,

    /// Config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Strength model: elo, poisson or hybrid
    #[arg(long, value_parser = ModelKind::from_str)]
    model: Option<ModelKind>,

    /// Number of simulated seasons
    #[arg(long)]
    sims: Option<u64>,

    /// Base seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Write the projection as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(Path::new(DEFAULT_CONFIG))?,
        None => Config::default(),
    };
    if let Some(model) = args.model {
        config.simulation.model = model;
    }
    if let Some(sims) = args.sims {
        config.simulation.num_simulations = sims;
    }
    if let Some(seed) = args.seed {
        config.simulation.random_seed = Some(seed);
    }
    if let Some(threads) = args.threads {
        config.simulation.threads = Some(threads);
    }
    config.validate()?;
    Ok(config)
}

fn print_projection(projection: &SeasonProjection) {
    println!();
    println!(
        "  {} trials, model {}, seed {}",
        projection.trials, projection.model, projection.seed
    );
    println!();
    println!(
        "  {:<3} {:<24} {:>6} {:>7} {:>7} {:>7} {:>7}",
        "#",
        "Team",
        "xPos",
        "xPts",
        "Title",
        format!("Top{}", projection.promotion_places),
        "Releg"
    );
    for (i, team) in projection.ranked().iter().enumerate() {
        println!(
            "  {:<3} {:<24} {:>6.2} {:>7.1} {:>6.1}% {:>6.1}% {:>6.1}%",
            i + 1,
            team.name,
            team.expected_position,
            team.expected_points,
            team.title_probability * 100.0,
            team.promotion_probability * 100.0,
            team.relegation_probability * 100.0,
        );
    }
    if !projection.reference_points.is_empty() {
        println!();
        for r in &projection.reference_points {
            println!(
                "  position {:>2}: mean {:.1} pts (p10 {}, median {}, p90 {})",
                r.position, r.mean_points, r.p10, r.median, r.p90
            );
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("league_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let snapshot = LeagueSnapshot::load(&args.snapshot)?;
    let aggregator = Arc::new(MonteCarloAggregator::new(snapshot, config)?);

    // Ctrl-C stops the run at the next trial boundary.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after current trials");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let worker = aggregator.clone();
    let flag = cancel.clone();
    let dist = tokio::task::spawn_blocking(move || worker.run_with_cancel(&flag))
        .await
        .context("simulation worker panicked")??;

    let projection = aggregator.project(&dist);
    print_projection(&projection);

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&projection)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write projection: {}", path.display()))?;
        tracing::info!(path = %path.display(), "projection written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("league-sim").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args_with_overrides() {
        let a = args(&["table.json", "--model", "elo", "--sims", "500", "--seed", "7"]).unwrap();
        assert_eq!(a.snapshot, PathBuf::from("table.json"));
        assert_eq!(a.model, Some(ModelKind::Elo));
        assert_eq!(a.sims, Some(500));
        assert_eq!(a.seed, Some(7));
        assert!(a.json.is_none());
        assert!(a.threads.is_none());
    }

    #[test]
    fn test_parse_args_rejects_unknown_model() {
        let err = args(&["table.json", "--model", "glicko"]).unwrap_err();
        assert!(err.to_string().contains("glicko"), "got {err}");
    }

    #[test]
    fn test_parse_args_requires_snapshot() {
        assert!(args(&["--seed", "1"]).is_err());
        assert!(args(&["table.json", "--seed"]).is_err());
        assert!(args(&["table.json", "--sims", "many"]).is_err());
    }
}
