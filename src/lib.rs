pub mod config;
pub mod engine;
pub mod error;
pub mod league;

pub use config::{Config, ModelKind};
pub use engine::{MonteCarloAggregator, OutcomeDistribution, SeasonProjection};
pub use error::{ConfigError, DataError, SimError};
pub use league::LeagueSnapshot;
