//! Team strength models.
//!
//! Every model answers two questions for the season loop: what does the next
//! fixture look like ([`MatchOutlook`]), and how does strength move once the
//! result is known. Three variants are provided:
//!
//! - [`EloModel`]: scalar ratings, logistic expected score, fixed draw rate.
//! - [`PoissonModel`]: attack/defense coefficients recomputed from the table
//!   after every match, expected goals = `base * attack * defense`.
//! - [`HybridModel`]: Poisson expected goals scaled by `10^(w * diff / 800)`
//!   where `diff` is the Elo gap, with both states updated per match.

use tracing::warn;

use super::match_sim::MatchResult;
use super::standings::StandingsTable;
use crate::config::{Config, EloSeedingConfig, ModelKind};
use crate::league::{LeagueSnapshot, Team, TeamStats};

/// Starting rating for a team with no history.
pub const BASE_RATING: f64 = 1500.0;
/// Draw rate used when neither configured nor observable.
pub const DEFAULT_DRAW_PROBABILITY: f64 = 0.25;
/// Goals per team per match used when nothing has been played.
pub const DEFAULT_BASE_GOAL_RATE: f64 = 1.5;
/// Bound on the hybrid exponent `w * diff / 800`, so the Elo factor stays
/// within `[0.01, 100]` whatever the weight or rating gap.
pub const MAX_ELO_EXPONENT: f64 = 2.0;

/// What a model predicts for one fixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutlook {
    /// Three-way outcome probabilities summing to 1.
    Probabilities { home_win: f64, draw: f64, away_win: f64 },
    /// Expected goals (Poisson means) for each side.
    ExpectedGoals { home: f64, away: f64 },
}

/// Model parameters with table-derived defaults filled in.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub kind: ModelKind,
    pub k_factor: f64,
    pub draw_probability: f64,
    pub base_goal_rate: f64,
    pub elo_influence_weight: f64,
    pub seeding: EloSeedingConfig,
}

impl ModelParams {
    /// Fill unset rates from the snapshot, falling back to league-neutral values.
    pub fn resolve(config: &Config, snapshot: &LeagueSnapshot) -> Self {
        let draw_probability = match config.elo.draw_probability {
            Some(p) => p,
            None => match snapshot.observed_draw_rate() {
                // A rate of 1.0 would leave no mass for decisive results.
                Some(p) if p < 1.0 => p,
                _ => {
                    if config.simulation.model != ModelKind::Poisson {
                        warn!(
                            default = DEFAULT_DRAW_PROBABILITY,
                            "no usable draw column, using default draw probability"
                        );
                    }
                    DEFAULT_DRAW_PROBABILITY
                }
            },
        };

        let base_goal_rate = match config.poisson.base_goal_rate {
            Some(rate) => rate,
            None => match snapshot.goals_per_team_match() {
                Some(rate) if rate > 0.0 => rate,
                _ => {
                    if config.simulation.model != ModelKind::Elo {
                        warn!(
                            default = DEFAULT_BASE_GOAL_RATE,
                            "no goals in table, using default base goal rate"
                        );
                    }
                    DEFAULT_BASE_GOAL_RATE
                }
            },
        };

        Self {
            kind: config.simulation.model,
            k_factor: config.elo.k_factor,
            draw_probability,
            base_goal_rate,
            elo_influence_weight: config.poisson.elo_influence_weight,
            seeding: config.elo.seeding.clone(),
        }
    }
}

/// Capability set shared by all strength models.
///
/// A model is built once from the snapshot and cloned into every trial, so
/// `Clone` must produce a fully independent copy.
pub trait RatingModel: Clone + Send + Sync {
    fn initialize(snapshot: &LeagueSnapshot, params: &ModelParams) -> Self;

    fn outlook(&self, home: usize, away: usize) -> MatchOutlook;

    /// Fold a played result back into the model. `table` already includes it.
    fn update(&mut self, home: usize, away: usize, result: &MatchResult, table: &StandingsTable);

    /// Coefficients forced to 1.0 because of missing history.
    fn neutral_substitutions(&self) -> u64 {
        0
    }
}

// ---------------------------------------------------------------------------
// Elo
// ---------------------------------------------------------------------------

/// Logistic expected score of `a` against `b`.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / 400.0))
}

/// Split `1 - draw` between the sides by expected score.
pub fn three_way_probabilities(rating_home: f64, rating_away: f64, draw: f64) -> MatchOutlook {
    let e_home = expected_score(rating_home, rating_away);
    let home_win = (1.0 - draw) * e_home;
    let away_win = (1.0 - draw) * (1.0 - e_home);
    let total = home_win + draw + away_win;
    MatchOutlook::Probabilities {
        home_win: home_win / total,
        draw: draw / total,
        away_win: away_win / total,
    }
}

/// Starting ratings from the current table.
///
/// Composite `S = alpha*ppg + beta*gd/g + gamma*gf/g`, z-scored over the
/// league and spread by `sigma` around 1500. Explicit ratings win.
pub fn seed_ratings(teams: &[Team], seeding: &EloSeedingConfig) -> Vec<f64> {
    let scores: Vec<f64> = teams
        .iter()
        .map(|t| {
            let m = if t.stats.played == 0 { 1.0 } else { t.stats.played as f64 };
            seeding.alpha * t.stats.points as f64 / m
                + seeding.beta * t.stats.goal_difference() as f64 / m
                + seeding.gamma * t.stats.goals_for as f64 / m
        })
        .collect();

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let std = if var == 0.0 { 1.0 } else { var.sqrt() };

    teams
        .iter()
        .zip(&scores)
        .map(|(team, s)| {
            team.rating
                .unwrap_or_else(|| (BASE_RATING + seeding.sigma * (s - mean) / std).round())
        })
        .collect()
}

/// Scalar Elo ratings with a fixed league draw rate.
///
/// Win probabilities come from [`three_way_probabilities`]; after each
/// fixture both ratings move by `K * (actual - expected)`, so the sum of all
/// ratings never changes.
#[derive(Debug, Clone)]
pub struct EloModel {
    ratings: Vec<f64>,
    k_factor: f64,
    draw_probability: f64,
}

impl EloModel {
    pub fn new(ratings: Vec<f64>, k_factor: f64, draw_probability: f64) -> Self {
        Self {
            ratings,
            k_factor,
            draw_probability,
        }
    }

    pub fn rating(&self, team: usize) -> f64 {
        self.ratings[team]
    }

    pub fn ratings(&self) -> &[f64] {
        &self.ratings
    }

    /// `score_home` is 1, 0.5 or 0.
    fn apply_score(&mut self, home: usize, away: usize, score_home: f64) {
        let e_home = expected_score(self.ratings[home], self.ratings[away]);
        self.ratings[home] += self.k_factor * (score_home - e_home);
        self.ratings[away] += self.k_factor * ((1.0 - score_home) - (1.0 - e_home));
    }
}

impl RatingModel for EloModel {
    fn initialize(snapshot: &LeagueSnapshot, params: &ModelParams) -> Self {
        Self::new(
            seed_ratings(snapshot.teams(), &params.seeding),
            params.k_factor,
            params.draw_probability,
        )
    }

    fn outlook(&self, home: usize, away: usize) -> MatchOutlook {
        three_way_probabilities(self.ratings[home], self.ratings[away], self.draw_probability)
    }

    fn update(&mut self, home: usize, away: usize, result: &MatchResult, _table: &StandingsTable) {
        self.apply_score(home, away, result.home_score());
    }
}

// ---------------------------------------------------------------------------
// Poisson attack/defense
// ---------------------------------------------------------------------------

/// Attack/defense coefficients plus the number of neutral substitutions made.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    pub attack: Vec<f64>,
    pub defense: Vec<f64>,
    pub neutral: u64,
}

/// Relative scoring and conceding rates, each normalised to a league mean of 1.
///
/// A team with no matches gets 1.0 for both. If the league has no goals at
/// all every coefficient is 1.0.
pub fn coefficients(stats: &[TeamStats]) -> Coefficients {
    let n = stats.len();
    let total_goals: u64 = stats.iter().map(|s| s.goals_for as u64).sum();
    let total_played: u64 = stats.iter().map(|s| s.played as u64).sum();

    if total_goals == 0 || total_played == 0 {
        return Coefficients {
            attack: vec![1.0; n],
            defense: vec![1.0; n],
            neutral: 2 * n as u64,
        };
    }
    let league_rate = total_goals as f64 / total_played as f64;

    let mut neutral = 0u64;
    let mut attack = Vec::with_capacity(n);
    let mut defense = Vec::with_capacity(n);
    for s in stats {
        if s.played == 0 {
            attack.push(1.0);
            defense.push(1.0);
            neutral += 2;
        } else {
            let m = s.played as f64;
            attack.push(s.goals_for as f64 / m / league_rate);
            defense.push(s.goals_against as f64 / m / league_rate);
        }
    }
    neutral += normalise(&mut attack);
    neutral += normalise(&mut defense);

    Coefficients {
        attack,
        defense,
        neutral,
    }
}

/// Scale to mean 1. Returns the number of values reset when the mean is zero.
fn normalise(values: &mut [f64]) -> u64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 || !mean.is_finite() {
        values.iter_mut().for_each(|v| *v = 1.0);
        return values.len() as u64;
    }
    values.iter_mut().for_each(|v| *v /= mean);
    0
}

/// Attack/defense coefficients over a fixed base goal rate.
///
/// `base_lambda` is set once per run. The coefficients are rebuilt from the
/// trial's own table after every fixture, so they track simulated form.
/// `neutral` accumulates every coefficient defaulted to 1.0 along the way,
/// including those of the starting template.
#[derive(Debug, Clone)]
pub struct PoissonModel {
    base_lambda: f64,
    attack: Vec<f64>,
    defense: Vec<f64>,
    neutral: u64,
}

impl PoissonModel {
    pub fn from_stats(base_lambda: f64, stats: &[TeamStats]) -> Self {
        let c = coefficients(stats);
        Self {
            base_lambda,
            attack: c.attack,
            defense: c.defense,
            neutral: c.neutral,
        }
    }

    /// Fixed coefficients, used as given.
    pub fn with_coefficients(base_lambda: f64, attack: Vec<f64>, defense: Vec<f64>) -> Self {
        Self {
            base_lambda,
            attack,
            defense,
            neutral: 0,
        }
    }

    pub fn attack(&self) -> &[f64] {
        &self.attack
    }

    /// `(λ_home, λ_away)`.
    pub fn expected_goals(&self, home: usize, away: usize) -> (f64, f64) {
        (
            self.base_lambda * self.attack[home] * self.defense[away],
            self.base_lambda * self.attack[away] * self.defense[home],
        )
    }

    fn recompute(&mut self, stats: &[TeamStats]) {
        let c = coefficients(stats);
        self.attack = c.attack;
        self.defense = c.defense;
        self.neutral += c.neutral;
    }
}

impl RatingModel for PoissonModel {
    fn initialize(snapshot: &LeagueSnapshot, params: &ModelParams) -> Self {
        Self::from_stats(params.base_goal_rate, &snapshot.initial_stats())
    }

    fn outlook(&self, home: usize, away: usize) -> MatchOutlook {
        let (home, away) = self.expected_goals(home, away);
        MatchOutlook::ExpectedGoals { home, away }
    }

    fn update(&mut self, _home: usize, _away: usize, _result: &MatchResult, table: &StandingsTable) {
        self.recompute(table.stats());
    }

    fn neutral_substitutions(&self) -> u64 {
        self.neutral
    }
}

// ---------------------------------------------------------------------------
// Hybrid
// ---------------------------------------------------------------------------

/// Poisson expected goals shifted towards the side with the higher Elo.
///
/// Both halves are updated after every fixture: the Poisson half from the
/// table, the Elo half from the scoreline's W/D/L.
#[derive(Debug, Clone)]
pub struct HybridModel {
    poisson: PoissonModel,
    elo: EloModel,
    weight: f64,
}

impl HybridModel {
    pub fn new(poisson: PoissonModel, elo: EloModel, weight: f64) -> Self {
        Self {
            poisson,
            elo,
            weight,
        }
    }

    pub fn elo(&self) -> &EloModel {
        &self.elo
    }

    pub fn poisson(&self) -> &PoissonModel {
        &self.poisson
    }

    /// Multiplier applied to the home mean; the away mean gets its reciprocal.
    ///
    /// The exponent is clamped to `±MAX_ELO_EXPONENT`.
    pub fn elo_factor(&self, home: usize, away: usize) -> f64 {
        let diff = self.elo.rating(home) - self.elo.rating(away);
        let exponent = self.weight * diff / 800.0;
        if exponent.is_nan() {
            return 1.0;
        }
        10f64.powf(exponent.clamp(-MAX_ELO_EXPONENT, MAX_ELO_EXPONENT))
    }
}

impl RatingModel for HybridModel {
    fn initialize(snapshot: &LeagueSnapshot, params: &ModelParams) -> Self {
        Self::new(
            PoissonModel::initialize(snapshot, params),
            EloModel::initialize(snapshot, params),
            params.elo_influence_weight,
        )
    }

    fn outlook(&self, home: usize, away: usize) -> MatchOutlook {
        let (lambda_home, lambda_away) = self.poisson.expected_goals(home, away);
        let factor = self.elo_factor(home, away);
        MatchOutlook::ExpectedGoals {
            home: lambda_home * factor,
            away: lambda_away / factor,
        }
    }

    fn update(&mut self, home: usize, away: usize, result: &MatchResult, table: &StandingsTable) {
        self.poisson.update(home, away, result, table);
        self.elo.update(home, away, result, table);
    }

    fn neutral_substitutions(&self) -> u64 {
        self.poisson.neutral_substitutions()
    }
}
