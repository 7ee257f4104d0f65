//! Per-trial league table and the tie-break ranking.

use std::cmp::Ordering;

use super::match_sim::MatchResult;
use crate::league::TeamStats;

/// One row of a ranked table. `position` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandingRow {
    pub team: usize,
    pub position: usize,
    pub stats: TeamStats,
}

/// Ranked table at the end of a trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStanding {
    pub rows: Vec<StandingRow>,
}

impl FinalStanding {
    /// Position of each team, indexed by team.
    pub fn positions(&self) -> Vec<usize> {
        let mut out = vec![0; self.rows.len()];
        for row in &self.rows {
            out[row.team] = row.position;
        }
        out
    }

    pub fn champion(&self) -> Option<usize> {
        self.rows.first().map(|r| r.team)
    }
}

/// Order two teams under the tie-break policy, best first:
/// points desc, goal difference desc, goals for desc, goals against asc,
/// then the original table order.
pub fn compare(a: (usize, &TeamStats), b: (usize, &TeamStats)) -> Ordering {
    let (ia, sa) = a;
    let (ib, sb) = b;
    sb.points
        .cmp(&sa.points)
        .then_with(|| sb.goal_difference().cmp(&sa.goal_difference()))
        .then_with(|| sb.goals_for.cmp(&sa.goals_for))
        .then_with(|| sa.goals_against.cmp(&sb.goals_against))
        .then_with(|| ia.cmp(&ib))
}

/// Mutable per-trial table, indexed like the snapshot's teams.
///
/// Starts from the snapshot's stats and only ever grows; each trial owns its
/// own copy.
#[derive(Debug, Clone)]
pub struct StandingsTable {
    stats: Vec<TeamStats>,
}

impl StandingsTable {
    pub fn new(stats: Vec<TeamStats>) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &[TeamStats] {
        &self.stats
    }

    /// Apply a result to both sides: one more match played, goals for and
    /// against from the scoreline, and 3/1/0 points.
    ///
    /// Caller guarantees valid, distinct indices.
    pub fn apply(&mut self, home: usize, away: usize, result: &MatchResult) {
        let h = &mut self.stats[home];
        h.played += 1;
        h.goals_for += result.home_goals;
        h.goals_against += result.away_goals;
        h.points += result.home_points();

        let a = &mut self.stats[away];
        a.played += 1;
        a.goals_for += result.away_goals;
        a.goals_against += result.home_goals;
        a.points += result.away_points();
    }

    /// Total ranking. Every team gets a distinct position 1..=N.
    pub fn ranking(&self) -> FinalStanding {
        let mut order: Vec<usize> = (0..self.stats.len()).collect();
        order.sort_by(|&a, &b| compare((a, &self.stats[a]), (b, &self.stats[b])));
        let rows = order
            .into_iter()
            .enumerate()
            .map(|(i, team)| StandingRow {
                team,
                position: i + 1,
                stats: self.stats[team],
            })
            .collect();
        FinalStanding { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(points: u32, gf: u32, ga: u32) -> TeamStats {
        TeamStats {
            played: 10,
            points,
            goals_for: gf,
            goals_against: ga,
        }
    }

    fn order(table: &StandingsTable) -> Vec<usize> {
        table.ranking().rows.iter().map(|r| r.team).collect()
    }

    #[test]
    fn test_apply_home_win() {
        let mut table = StandingsTable::new(vec![TeamStats::default(); 2]);
        table.apply(0, 1, &MatchResult::new(2, 1));
        assert_eq!(
            table.stats()[0],
            TeamStats { played: 1, points: 3, goals_for: 2, goals_against: 1 }
        );
        assert_eq!(
            table.stats()[1],
            TeamStats { played: 1, points: 0, goals_for: 1, goals_against: 2 }
        );
    }

    #[test]
    fn test_apply_draw() {
        let mut table = StandingsTable::new(vec![stats(5, 4, 4), stats(7, 6, 3)]);
        table.apply(1, 0, &MatchResult::new(1, 1));
        assert_eq!(table.stats()[0].points, 6);
        assert_eq!(table.stats()[1].points, 8);
        assert_eq!(table.stats()[0].played, 11);
    }

    #[test]
    fn test_points_first() {
        let table = StandingsTable::new(vec![stats(10, 30, 5), stats(11, 5, 30)]);
        assert_eq!(order(&table), vec![1, 0]);
    }

    #[test]
    fn test_goal_difference_breaks_points_tie() {
        let table = StandingsTable::new(vec![stats(20, 15, 10), stats(20, 14, 6)]);
        assert_eq!(order(&table), vec![1, 0]);
    }

    #[test]
    fn test_goals_for_breaks_goal_difference_tie() {
        let table = StandingsTable::new(vec![stats(20, 10, 5), stats(20, 12, 7)]);
        assert_eq!(order(&table), vec![1, 0]);
    }

    #[test]
    fn test_full_tie_uses_table_order() {
        let table = StandingsTable::new(vec![stats(9, 9, 9), stats(9, 9, 9), stats(9, 9, 9)]);
        assert_eq!(order(&table), vec![0, 1, 2]);
    }

    #[test]
    fn test_positions_are_a_permutation() {
        let table = StandingsTable::new(vec![
            stats(12, 10, 8),
            stats(12, 10, 8),
            stats(30, 25, 10),
            stats(3, 4, 20),
        ]);
        let standing = table.ranking();
        let mut positions = standing.positions();
        assert_eq!(positions, vec![2, 3, 1, 4]);
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert_eq!(standing.champion(), Some(2));
    }
}
