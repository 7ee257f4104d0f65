//! Error taxonomy for snapshot validation, configuration and run control.

use thiserror::Error;

/// Configuration problems. Always raised before the first trial starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported model variant `{0}` (expected elo, poisson or hybrid)")]
    UnsupportedModel(String),
    #[error("num_simulations must be positive")]
    NonPositiveSimulations,
    #[error("{name} must lie in [0, 1), got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("{name} is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("{name} = {value} does not fit a league of {teams} teams")]
    PositionOutOfRange {
        name: &'static str,
        value: usize,
        teams: usize,
    },
}

/// Malformed snapshot data. Fatal for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("fixture #{index} references unknown team `{team}`")]
    UnknownTeam { index: usize, team: String },
    #[error("team `{0}` appears more than once in the table")]
    DuplicateTeam(String),
    #[error("team `{team}` has negative {field}: {value}")]
    NegativeValue {
        team: String,
        field: &'static str,
        value: i64,
    },
    #[error("fixture #{index} pairs `{team}` against itself")]
    SelfFixture { index: usize, team: String },
    #[error("a league needs at least two teams, got {0}")]
    TooFewTeams(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("run aborted after {completed} of {requested} trials")]
    Aborted { completed: u64, requested: u64 },
}
