pub mod aggregator;
pub mod match_sim;
pub mod projection;
pub mod rating;
pub mod season;
pub mod standings;

pub use aggregator::{MonteCarloAggregator, OutcomeDistribution};
pub use match_sim::{MatchResult, MatchSimulator, Outcome};
pub use projection::{PositionPoints, SeasonProjection, TeamProjection};
pub use rating::{EloModel, HybridModel, MatchOutlook, ModelParams, PoissonModel, RatingModel};
pub use season::{SeasonOutcome, SeasonSimulator, SeasonState};
pub use standings::{FinalStanding, StandingRow, StandingsTable};
