//! Single-fixture sampling.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use super::rating::MatchOutlook;

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

/// Scoreline of one simulated fixture.
///
/// In probability mode only the outcome is drawn and the scoreline is the
/// minimal margin that produces it (1-0, 0-0, 0-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub home_goals: u32,
    pub away_goals: u32,
}

impl MatchResult {
    pub fn new(home_goals: u32, away_goals: u32) -> Self {
        Self {
            home_goals,
            away_goals,
        }
    }

    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::HomeWin => Self::new(1, 0),
            Outcome::Draw => Self::new(0, 0),
            Outcome::AwayWin => Self::new(0, 1),
        }
    }

    pub fn outcome(&self) -> Outcome {
        use std::cmp::Ordering::*;
        match self.home_goals.cmp(&self.away_goals) {
            Greater => Outcome::HomeWin,
            Equal => Outcome::Draw,
            Less => Outcome::AwayWin,
        }
    }

    pub fn home_points(&self) -> u32 {
        match self.outcome() {
            Outcome::HomeWin => WIN_POINTS,
            Outcome::Draw => DRAW_POINTS,
            Outcome::AwayWin => 0,
        }
    }

    pub fn away_points(&self) -> u32 {
        match self.outcome() {
            Outcome::HomeWin => 0,
            Outcome::Draw => DRAW_POINTS,
            Outcome::AwayWin => WIN_POINTS,
        }
    }

    /// Elo actual score for the home side: 1, 0.5 or 0.
    pub fn home_score(&self) -> f64 {
        match self.outcome() {
            Outcome::HomeWin => 1.0,
            Outcome::Draw => 0.5,
            Outcome::AwayWin => 0.0,
        }
    }
}

/// Largest Poisson mean ever sampled. Poisson sampling does not terminate
/// for an infinite mean, and no football side expects more than this.
pub const MAX_EXPECTED_GOALS: f64 = 20.0;

/// Draw one Poisson goal count. Non-positive means score nothing; means
/// above [`MAX_EXPECTED_GOALS`], infinity included, are capped.
pub fn sample_goals<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> u32 {
    if lambda.is_nan() || lambda <= 0.0 {
        return 0;
    }
    match Poisson::new(lambda.min(MAX_EXPECTED_GOALS)) {
        Ok(dist) => dist.sample(rng) as u32,
        Err(_) => 0,
    }
}

/// Pick an outcome from cumulative thresholds home → draw → away.
pub fn sample_outcome<R: Rng + ?Sized>(home_win: f64, draw: f64, rng: &mut R) -> Outcome {
    let u: f64 = rng.gen();
    if u < home_win {
        Outcome::HomeWin
    } else if u < home_win + draw {
        Outcome::Draw
    } else {
        Outcome::AwayWin
    }
}

/// Stateless: turns a model's outlook plus randomness into a result.
pub struct MatchSimulator;

impl MatchSimulator {
    pub fn simulate<R: Rng + ?Sized>(outlook: MatchOutlook, rng: &mut R) -> MatchResult {
        match outlook {
            MatchOutlook::Probabilities { home_win, draw, .. } => {
                MatchResult::from_outcome(sample_outcome(home_win, draw, rng))
            }
            MatchOutlook::ExpectedGoals { home, away } => {
                let home_goals = sample_goals(home, rng);
                let away_goals = sample_goals(away, rng);
                MatchResult::new(home_goals, away_goals)
            }
        }
    }
}
