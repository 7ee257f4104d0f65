use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use super::types::{Fixture, FixtureRecord, SnapshotInput, Team, TeamRecord, TeamStats};
use crate::error::DataError;

/// Read-only starting state shared by every trial.
///
/// Built once from loader output. Team order is the table order at snapshot
/// time and doubles as the final tie-break.
#[derive(Debug, Clone)]
pub struct LeagueSnapshot {
    teams: Vec<Team>,
    fixtures: Vec<Fixture>,
}

impl LeagueSnapshot {
    pub fn from_input(input: SnapshotInput) -> Result<Self, DataError> {
        if input.teams.len() < 2 {
            return Err(DataError::TooFewTeams(input.teams.len()));
        }

        let mut index: HashMap<String, usize> = HashMap::with_capacity(input.teams.len());
        let mut teams = Vec::with_capacity(input.teams.len());
        for record in input.teams {
            if index.contains_key(&record.name) {
                return Err(DataError::DuplicateTeam(record.name));
            }
            let team = validate_team(record)?;
            index.insert(team.name.clone(), teams.len());
            teams.push(team);
        }

        let fixtures = input
            .fixtures
            .iter()
            .enumerate()
            .map(|(i, f)| resolve_fixture(i, f, &index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { teams, fixtures })
    }

    /// Load a JSON snapshot (`{"teams": [...], "fixtures": [...]}`).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        let input: SnapshotInput = serde_json::from_str(&content)
            .with_context(|| "Failed to parse snapshot JSON")?;
        let snapshot = Self::from_input(input)
            .with_context(|| format!("Invalid snapshot: {}", path.display()))?;
        Ok(snapshot)
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn team_names(&self) -> Vec<String> {
        self.teams.iter().map(|t| t.name.clone()).collect()
    }

    /// Initial per-team stats, in table order.
    pub fn initial_stats(&self) -> Vec<TeamStats> {
        self.teams.iter().map(|t| t.stats).collect()
    }

    /// Number of remaining fixtures each team appears in.
    pub fn remaining_per_team(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.teams.len()];
        for f in &self.fixtures {
            counts[f.home] += 1;
            counts[f.away] += 1;
        }
        counts
    }

    /// Average goals per team per match over the table so far.
    /// `None` if nothing has been played yet.
    pub fn goals_per_team_match(&self) -> Option<f64> {
        let goals: u64 = self.teams.iter().map(|t| t.stats.goals_for as u64).sum();
        let played: u64 = self.teams.iter().map(|t| t.stats.played as u64).sum();
        if played == 0 {
            return None;
        }
        Some(goals as f64 / played as f64)
    }

    /// Share of matches drawn so far. `None` without a complete draw column
    /// or with no matches played.
    pub fn observed_draw_rate(&self) -> Option<f64> {
        let mut draws = 0u64;
        for team in &self.teams {
            draws += team.draws? as u64;
        }
        let played: u64 = self.teams.iter().map(|t| t.stats.played as u64).sum();
        if played == 0 {
            return None;
        }
        // Each match shows up twice in the table, once per side.
        Some((draws as f64 / 2.0) / (played as f64 / 2.0))
    }
}

fn non_negative(team: &str, field: &'static str, value: i64) -> Result<u32, DataError> {
    u32::try_from(value).map_err(|_| DataError::NegativeValue {
        team: team.to_string(),
        field,
        value,
    })
}

fn validate_team(record: TeamRecord) -> Result<Team, DataError> {
    let name = record.name;
    let stats = TeamStats {
        played: non_negative(&name, "played", record.played)?,
        points: non_negative(&name, "points", record.points)?,
        goals_for: non_negative(&name, "goals_for", record.goals_for)?,
        goals_against: non_negative(&name, "goals_against", record.goals_against)?,
    };
    let draws = record
        .draws
        .map(|d| non_negative(&name, "draws", d))
        .transpose()?;
    Ok(Team {
        name,
        stats,
        draws,
        rating: record.rating,
    })
}

fn resolve_fixture(
    index: usize,
    record: &FixtureRecord,
    teams: &HashMap<String, usize>,
) -> Result<Fixture, DataError> {
    let lookup = |name: &str| {
        teams.get(name).copied().ok_or_else(|| DataError::UnknownTeam {
            index,
            team: name.to_string(),
        })
    };
    let home = lookup(&record.home)?;
    let away = lookup(&record.away)?;
    if home == away {
        return Err(DataError::SelfFixture {
            index,
            team: record.home.clone(),
        });
    }
    Ok(Fixture { index, home, away })
}
