//! One trial: replay every remaining fixture in order.

use rand::Rng;

use super::match_sim::{MatchResult, MatchSimulator};
use super::rating::RatingModel;
use super::standings::{FinalStanding, StandingsTable};
use crate::error::{DataError, SimError};
use crate::league::{Fixture, LeagueSnapshot};

/// Where a season is in its fixture list. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonState {
    NotStarted,
    /// Next fixture to play, by position in the fixture list.
    Playing(usize),
    Completed,
}

/// A fixture together with the result it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayedFixture {
    pub fixture: Fixture,
    pub result: MatchResult,
}

/// Private per-trial state: its own table, its own model copy, its own RNG.
pub struct SeasonSimulator<'a, M, R> {
    fixtures: &'a [Fixture],
    table: StandingsTable,
    model: M,
    rng: R,
    state: SeasonState,
}

impl<'a, M: RatingModel, R: Rng> SeasonSimulator<'a, M, R> {
    /// `model` is consumed; pass a clone of the shared template.
    pub fn new(snapshot: &'a LeagueSnapshot, model: M, rng: R) -> Self {
        Self {
            fixtures: snapshot.fixtures(),
            table: StandingsTable::new(snapshot.initial_stats()),
            model,
            rng,
            state: SeasonState::NotStarted,
        }
    }

    pub fn state(&self) -> SeasonState {
        self.state
    }

    pub fn table(&self) -> &StandingsTable {
        &self.table
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Play the next fixture. `Ok(None)` once the season is complete.
    pub fn step(&mut self) -> Result<Option<PlayedFixture>, SimError> {
        let next = match self.state {
            SeasonState::NotStarted => 0,
            SeasonState::Playing(i) => i,
            SeasonState::Completed => return Ok(None),
        };
        let Some(&fixture) = self.fixtures.get(next) else {
            self.state = SeasonState::Completed;
            return Ok(None);
        };
        self.check_fixture(&fixture)?;

        let outlook = self.model.outlook(fixture.home, fixture.away);
        let result = MatchSimulator::simulate(outlook, &mut self.rng);
        self.table.apply(fixture.home, fixture.away, &result);
        self.model
            .update(fixture.home, fixture.away, &result, &self.table);

        self.state = if next + 1 < self.fixtures.len() {
            SeasonState::Playing(next + 1)
        } else {
            SeasonState::Completed
        };
        Ok(Some(PlayedFixture { fixture, result }))
    }

    /// Play everything that is left and rank the table.
    pub fn run(mut self) -> Result<SeasonOutcome, SimError> {
        while self.step()?.is_some() {}
        Ok(SeasonOutcome {
            standing: self.table.ranking(),
            neutral_substitutions: self.model.neutral_substitutions(),
        })
    }

    fn check_fixture(&self, fixture: &Fixture) -> Result<(), SimError> {
        let n = self.table.stats().len();
        for team in [fixture.home, fixture.away] {
            if team >= n {
                return Err(DataError::UnknownTeam {
                    index: fixture.index,
                    team: format!("#{team}"),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// What a finished trial hands to the aggregator.
#[derive(Debug, Clone)]
pub struct SeasonOutcome {
    pub standing: FinalStanding,
    pub neutral_substitutions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rating::{EloModel, HybridModel, ModelParams, PoissonModel};
    use crate::config::{Config, ModelKind};
    use crate::league::{FixtureRecord, SnapshotInput, TeamRecord};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot() -> LeagueSnapshot {
        let teams = [("A", 10, 20, 18, 9), ("B", 10, 16, 14, 11), ("C", 10, 12, 11, 13), ("D", 10, 6, 7, 17)]
            .into_iter()
            .map(|(name, played, points, gf, ga)| TeamRecord {
                name: name.to_string(),
                played,
                points,
                goals_for: gf,
                goals_against: ga,
                draws: None,
                rating: None,
            })
            .collect();
        let names = ["A", "B", "C", "D"];
        let mut fixtures = Vec::new();
        for h in names {
            for a in names {
                if h != a {
                    fixtures.push(FixtureRecord { home: h.into(), away: a.into() });
                }
            }
        }
        LeagueSnapshot::from_input(SnapshotInput { teams, fixtures }).unwrap()
    }

    fn params(kind: ModelKind) -> ModelParams {
        let mut config = Config::default();
        config.simulation.model = kind;
        ModelParams::resolve(&config, &snapshot())
    }

    #[test]
    fn test_state_machine_walks_fixtures_in_order() {
        let snap = snapshot();
        let model = EloModel::initialize(&snap, &params(ModelKind::Elo));
        let mut season = SeasonSimulator::new(&snap, model, StdRng::seed_from_u64(3));
        assert_eq!(season.state(), SeasonState::NotStarted);

        let mut seen = Vec::new();
        while let Some(played) = season.step().unwrap() {
            seen.push(played.fixture.index);
        }
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
        assert_eq!(season.state(), SeasonState::Completed);
        assert!(season.step().unwrap().is_none());
    }

    #[test]
    fn test_matches_played_increase_by_appearances() {
        let snap = snapshot();
        let model = PoissonModel::initialize(&snap, &params(ModelKind::Poisson));
        let mut season = SeasonSimulator::new(&snap, model, StdRng::seed_from_u64(11));
        while season.step().unwrap().is_some() {}

        let remaining = snap.remaining_per_team();
        let before = snap.initial_stats();
        let total_delta: u32 = season
            .table()
            .stats()
            .iter()
            .zip(&before)
            .zip(&remaining)
            .map(|((after, before), &r)| {
                assert_eq!(after.played - before.played, r);
                after.played - before.played
            })
            .sum();
        assert_eq!(total_delta as usize, 2 * snap.fixtures().len());
    }

    #[test]
    fn test_model_tracks_table_during_season() {
        let snap = snapshot();
        let model = HybridModel::initialize(&snap, &params(ModelKind::Hybrid));
        let start_elo = model.elo().ratings().to_vec();
        let mut season = SeasonSimulator::new(&snap, model, StdRng::seed_from_u64(5));
        season.step().unwrap();

        let attack = season.model().poisson().attack();
        let mean = attack.iter().sum::<f64>() / attack.len() as f64;
        assert!((mean - 1.0).abs() < 1e-12);
        assert_ne!(season.model().elo().ratings(), start_elo.as_slice());
    }

    #[test]
    fn test_same_seed_same_standing() {
        let snap = snapshot();
        let p = params(ModelKind::Hybrid);
        let run = |seed| {
            let model = HybridModel::initialize(&snap, &p);
            SeasonSimulator::new(&snap, model, StdRng::seed_from_u64(seed))
                .run()
                .unwrap()
                .standing
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_no_fixtures_ranks_current_table() {
        let snap = LeagueSnapshot::from_input(SnapshotInput {
            teams: snapshot()
                .teams()
                .iter()
                .map(|t| TeamRecord {
                    name: t.name.clone(),
                    played: t.stats.played as i64,
                    points: t.stats.points as i64,
                    goals_for: t.stats.goals_for as i64,
                    goals_against: t.stats.goals_against as i64,
                    draws: None,
                    rating: None,
                })
                .collect(),
            fixtures: vec![],
        })
        .unwrap();
        let model = EloModel::initialize(&snap, &params(ModelKind::Elo));
        let outcome = SeasonSimulator::new(&snap, model, StdRng::seed_from_u64(0))
            .run()
            .unwrap();
        assert_eq!(outcome.standing.positions(), vec![1, 2, 3, 4]);
    }
}
