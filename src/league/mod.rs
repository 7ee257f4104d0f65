pub mod snapshot;
pub mod types;

pub use snapshot::LeagueSnapshot;
pub use types::{Fixture, FixtureRecord, SnapshotInput, Team, TeamRecord, TeamStats};
