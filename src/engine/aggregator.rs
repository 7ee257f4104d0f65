//! Monte Carlo driver: many independent seasons, one merged tally.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use super::projection::SeasonProjection;
use super::rating::{EloModel, HybridModel, ModelParams, PoissonModel, RatingModel};
use super::season::{SeasonOutcome, SeasonSimulator};
use crate::config::{Config, ModelKind};
use crate::error::{ConfigError, SimError};
use crate::league::LeagueSnapshot;

/// Finishing-position counts accumulated across trials.
///
/// Everything is stored as integers so partial tallies merge exactly in any
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeDistribution {
    teams: usize,
    trials: u64,
    /// `counts[team * teams + position - 1]`
    counts: Vec<u64>,
    points_sum: Vec<u64>,
    /// Final points histogram of whoever finished at each position.
    position_points: Vec<BTreeMap<u32, u64>>,
    neutral_substitutions: u64,
    /// Per-trial positions indexed by team, keyed by trial number so that
    /// merged partials come out in trial order. Only kept on request.
    trial_positions: Option<BTreeMap<u64, Vec<u16>>>,
}

impl OutcomeDistribution {
    pub fn new(teams: usize) -> Self {
        Self {
            teams,
            trials: 0,
            counts: vec![0; teams * teams],
            points_sum: vec![0; teams],
            position_points: vec![BTreeMap::new(); teams],
            neutral_substitutions: 0,
            trial_positions: None,
        }
    }

    /// Also keep every trial's final positions.
    pub fn keeping_trials(mut self) -> Self {
        self.trial_positions = Some(BTreeMap::new());
        self
    }

    pub fn record(&mut self, outcome: &SeasonOutcome) {
        for row in &outcome.standing.rows {
            self.counts[row.team * self.teams + row.position - 1] += 1;
            self.points_sum[row.team] += row.stats.points as u64;
            *self.position_points[row.position - 1]
                .entry(row.stats.points)
                .or_insert(0) += 1;
        }
        self.neutral_substitutions += outcome.neutral_substitutions;
        self.trials += 1;
    }

    /// [`record`](Self::record), also logging positions under `trial` when
    /// per-trial positions are kept.
    pub fn record_trial(&mut self, trial: u64, outcome: &SeasonOutcome) {
        self.record(outcome);
        if let Some(log) = self.trial_positions.as_mut() {
            let positions = outcome
                .standing
                .positions()
                .into_iter()
                .map(|p| p as u16)
                .collect();
            log.insert(trial, positions);
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        debug_assert_eq!(self.teams, other.teams);
        for (a, b) in self.counts.iter_mut().zip(other.counts) {
            *a += b;
        }
        for (a, b) in self.points_sum.iter_mut().zip(other.points_sum) {
            *a += b;
        }
        for (mine, theirs) in self.position_points.iter_mut().zip(other.position_points) {
            for (points, n) in theirs {
                *mine.entry(points).or_insert(0) += n;
            }
        }
        self.trials += other.trials;
        self.neutral_substitutions += other.neutral_substitutions;
        if let (Some(mine), Some(theirs)) = (self.trial_positions.as_mut(), other.trial_positions) {
            mine.extend(theirs);
        }
        self
    }

    pub fn teams(&self) -> usize {
        self.teams
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Times `team` finished at 1-based `position`.
    pub fn count(&self, team: usize, position: usize) -> u64 {
        self.counts[team * self.teams + position - 1]
    }

    /// Normalised position probabilities for `team`, index 0 = first place.
    pub fn probabilities(&self, team: usize) -> Vec<f64> {
        let row = &self.counts[team * self.teams..(team + 1) * self.teams];
        if self.trials == 0 {
            return vec![0.0; self.teams];
        }
        row.iter().map(|&c| c as f64 / self.trials as f64).collect()
    }

    pub fn total_points(&self, team: usize) -> u64 {
        self.points_sum[team]
    }

    pub fn points_at_position(&self, position: usize) -> &BTreeMap<u32, u64> {
        &self.position_points[position - 1]
    }

    pub fn neutral_substitutions(&self) -> u64 {
        self.neutral_substitutions
    }

    /// Trials × teams matrix of final positions, in trial order.
    /// `None` unless the distribution was built with [`keeping_trials`](Self::keeping_trials).
    pub fn trial_positions(&self) -> Option<Vec<Vec<u16>>> {
        self.trial_positions
            .as_ref()
            .map(|log| log.values().cloned().collect())
    }
}

/// Deterministic per-trial seed (splitmix64 over base seed and trial index).
pub fn trial_seed(base: u64, trial: u64) -> u64 {
    let mut z = base.wrapping_add(trial.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Owns the starting snapshot and runs trials against private copies of it.
pub struct MonteCarloAggregator {
    snapshot: LeagueSnapshot,
    config: Config,
    params: ModelParams,
    seed: u64,
}

impl MonteCarloAggregator {
    /// Validates the configuration against the league before anything runs.
    pub fn new(snapshot: LeagueSnapshot, config: Config) -> Result<Self, SimError> {
        config.validate_for_league(snapshot.team_count())?;
        let params = ModelParams::resolve(&config, &snapshot);
        let seed = config.simulation.random_seed.unwrap_or_else(rand::random::<u64>);
        info!(
            model = %params.kind,
            k_factor = params.k_factor,
            draw_probability = params.draw_probability,
            base_goal_rate = params.base_goal_rate,
            elo_influence_weight = params.elo_influence_weight,
            seed,
            "model parameters resolved"
        );
        Ok(Self {
            snapshot,
            config,
            params,
            seed,
        })
    }

    pub fn snapshot(&self) -> &LeagueSnapshot {
        &self.snapshot
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run(&self) -> Result<OutcomeDistribution, SimError> {
        self.run_with_cancel(&AtomicBool::new(false))
    }

    /// Run all trials. Setting `cancel` stops the run between trials.
    pub fn run_with_cancel(&self, cancel: &AtomicBool) -> Result<OutcomeDistribution, SimError> {
        match self.params.kind {
            ModelKind::Elo => self.run_model::<EloModel>(cancel),
            ModelKind::Poisson => self.run_model::<PoissonModel>(cancel),
            ModelKind::Hybrid => self.run_model::<HybridModel>(cancel),
        }
    }

    /// Summary metrics for a finished distribution.
    pub fn project(&self, dist: &OutcomeDistribution) -> SeasonProjection {
        SeasonProjection::from_distribution(
            dist,
            &self.snapshot.team_names(),
            &self.config.report,
            self.params.kind,
            self.seed,
        )
    }

    fn run_model<M: RatingModel>(&self, cancel: &AtomicBool) -> Result<OutcomeDistribution, SimError> {
        let requested = self.config.simulation.num_simulations;
        let keep_trials = self.config.simulation.keep_trials;
        let teams = self.snapshot.team_count();
        let empty = || {
            let dist = OutcomeDistribution::new(teams);
            if keep_trials {
                dist.keeping_trials()
            } else {
                dist
            }
        };
        let template = M::initialize(&self.snapshot, &self.params);
        let completed = AtomicU64::new(0);
        let started = Instant::now();

        info!(
            trials = requested,
            teams,
            fixtures = self.snapshot.fixtures().len(),
            model = %self.params.kind,
            "starting simulation"
        );

        let work = || {
            (0..requested)
                .into_par_iter()
                .try_fold(
                    empty,
                    |mut dist, trial| {
                        if cancel.load(Ordering::Relaxed) {
                            return Err(SimError::Aborted {
                                completed: completed.load(Ordering::Relaxed),
                                requested,
                            });
                        }
                        let rng = StdRng::seed_from_u64(trial_seed(self.seed, trial));
                        let outcome =
                            SeasonSimulator::new(&self.snapshot, template.clone(), rng).run()?;
                        dist.record_trial(trial, &outcome);
                        completed.fetch_add(1, Ordering::Relaxed);
                        Ok(dist)
                    },
                )
                .try_reduce(empty, |a, b| Ok(a.merge(b)))
        };

        let dist = match self.config.simulation.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|_| ConfigError::InvalidParameter {
                        name: "threads",
                        value: threads as f64,
                    })?;
                debug!(threads, "using dedicated thread pool");
                pool.install(work)?
            }
            None => work()?,
        };

        if dist.neutral_substitutions() > 0 {
            debug!(
                count = dist.neutral_substitutions(),
                "coefficients defaulted to 1.0 for teams without history"
            );
        }
        info!(
            trials = dist.trials(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation finished"
        );
        Ok(dist)
    }
}
