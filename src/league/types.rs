use serde::{Deserialize, Serialize};

/// One row of the current table as handed over by the loader.
///
/// Counts are signed so that a corrupt feed surfaces as a `DataError`
/// instead of a deserialisation failure with no team name attached.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TeamRecord {
    pub name: String,
    pub played: i64,
    pub points: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    /// Draw column, only used to estimate the league draw rate.
    #[serde(default)]
    pub draws: Option<i64>,
    /// Explicit Elo rating. Seeded from the table when absent.
    #[serde(default)]
    pub rating: Option<f64>,
}

/// A remaining fixture by team name, in play order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixtureRecord {
    pub home: String,
    pub away: String,
}

/// Raw snapshot input: current table plus remaining fixtures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotInput {
    pub teams: Vec<TeamRecord>,
    #[serde(default)]
    pub fixtures: Vec<FixtureRecord>,
}

/// Cumulative table stats of one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeamStats {
    pub played: u32,
    pub points: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl TeamStats {
    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }
}

/// A validated team: name, non-negative table stats, and the optional draw
/// count and explicit rating carried over from its record.
#[derive(Debug, Clone)]
pub struct Team {
    pub name: String,
    pub stats: TeamStats,
    pub draws: Option<u32>,
    pub rating: Option<f64>,
}

/// A fixture resolved to team indices. `index` is the play-order sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixture {
    pub index: usize,
    pub home: usize,
    pub away: usize,
}
