//! Summary metrics derived from a finished [`OutcomeDistribution`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::aggregator::OutcomeDistribution;
use crate::config::{ModelKind, ReportConfig};

#[derive(Debug, Clone, Serialize)]
pub struct TeamProjection {
    pub name: String,
    /// Index 0 is first place.
    pub position_probabilities: Vec<f64>,
    pub title_probability: f64,
    pub promotion_probability: f64,
    pub relegation_probability: f64,
    pub expected_position: f64,
    pub expected_points: f64,
}

/// Final points of whichever team ended at `position`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionPoints {
    pub position: usize,
    pub mean_points: f64,
    pub p10: u32,
    pub median: u32,
    pub p90: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonProjection {
    pub model: ModelKind,
    pub seed: u64,
    pub trials: u64,
    pub generated_at: DateTime<Utc>,
    pub neutral_substitutions: u64,
    pub relegation_places: usize,
    pub promotion_places: usize,
    pub teams: Vec<TeamProjection>,
    pub reference_points: Vec<PositionPoints>,
    /// Final position of every team in every trial, when kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_positions: Option<Vec<Vec<u16>>>,
}

impl SeasonProjection {
    pub fn from_distribution(
        dist: &OutcomeDistribution,
        names: &[String],
        report: &ReportConfig,
        model: ModelKind,
        seed: u64,
    ) -> Self {
        let n = dist.teams();
        let trials = dist.trials().max(1) as f64;
        let safe_from = n.saturating_sub(report.relegation_places);

        let teams = names
            .iter()
            .enumerate()
            .map(|(team, name)| {
                let probs = dist.probabilities(team);
                let promotion_probability: f64 = probs[..report.promotion_places.min(n)].iter().sum();
                let relegation_probability: f64 = probs[safe_from..].iter().sum();
                let expected_position: f64 = probs
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i + 1) as f64 * p)
                    .sum();
                TeamProjection {
                    name: name.clone(),
                    title_probability: probs[0],
                    promotion_probability,
                    relegation_probability,
                    expected_position,
                    expected_points: dist.total_points(team) as f64 / trials,
                    position_probabilities: probs,
                }
            })
            .collect();

        let reference_points = report
            .reference_positions
            .iter()
            .filter(|&&p| (1..=n).contains(&p))
            .map(|&position| {
                let hist = dist.points_at_position(position);
                PositionPoints {
                    position,
                    mean_points: histogram_mean(hist),
                    p10: histogram_quantile(hist, 0.10),
                    median: histogram_quantile(hist, 0.50),
                    p90: histogram_quantile(hist, 0.90),
                }
            })
            .collect();

        Self {
            model,
            seed,
            trials: dist.trials(),
            generated_at: Utc::now(),
            neutral_substitutions: dist.neutral_substitutions(),
            relegation_places: report.relegation_places,
            promotion_places: report.promotion_places,
            teams,
            reference_points,
            trial_positions: dist.trial_positions(),
        }
    }

    /// Teams ordered by expected position, best first.
    pub fn ranked(&self) -> Vec<&TeamProjection> {
        let mut out: Vec<&TeamProjection> = self.teams.iter().collect();
        out.sort_by(|a, b| a.expected_position.total_cmp(&b.expected_position));
        out
    }

    pub fn team(&self, name: &str) -> Option<&TeamProjection> {
        self.teams.iter().find(|t| t.name == name)
    }
}

pub fn histogram_mean(hist: &BTreeMap<u32, u64>) -> f64 {
    let total: u64 = hist.values().sum();
    if total == 0 {
        return 0.0;
    }
    let weighted: u64 = hist.iter().map(|(&v, &n)| v as u64 * n).sum();
    weighted as f64 / total as f64
}

/// Nearest-rank quantile: smallest value whose cumulative count reaches `q * total`.
pub fn histogram_quantile(hist: &BTreeMap<u32, u64>, q: f64) -> u32 {
    let total: u64 = hist.values().sum();
    if total == 0 {
        return 0;
    }
    let rank = ((q * total as f64).ceil() as u64).clamp(1, total);
    let mut seen = 0u64;
    for (&value, &n) in hist {
        seen += n;
        if seen >= rank {
            return value;
        }
    }
    hist.keys().next_back().copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::season::SeasonOutcome;
    use crate::engine::standings::StandingsTable;
    use crate::league::TeamStats;

    fn outcome(points: &[u32]) -> SeasonOutcome {
        let stats = points
            .iter()
            .map(|&p| TeamStats {
                played: 38,
                points: p,
                goals_for: 40,
                goals_against: 40,
            })
            .collect();
        SeasonOutcome {
            standing: StandingsTable::new(stats).ranking(),
            neutral_substitutions: 0,
        }
    }

    fn report() -> ReportConfig {
        ReportConfig {
            relegation_places: 1,
            promotion_places: 2,
            reference_positions: vec![1, 3],
        }
    }

    #[test]
    fn test_quantiles() {
        let hist: BTreeMap<u32, u64> = [(10, 1), (20, 3), (30, 5), (40, 1)].into_iter().collect();
        assert_eq!(histogram_quantile(&hist, 0.05), 10);
        assert_eq!(histogram_quantile(&hist, 0.35), 20);
        assert_eq!(histogram_quantile(&hist, 0.50), 30);
        assert_eq!(histogram_quantile(&hist, 0.85), 30);
        assert_eq!(histogram_quantile(&hist, 1.0), 40);
        assert!((histogram_mean(&hist) - 26.0).abs() < 1e-12);
        assert_eq!(histogram_quantile(&BTreeMap::new(), 0.5), 0);
    }

    #[test]
    fn test_projection_metrics() {
        let mut dist = OutcomeDistribution::new(3);
        // Team 0 wins three of four seasons, team 2 always last.
        dist.record(&outcome(&[80, 70, 30]));
        dist.record(&outcome(&[75, 72, 31]));
        dist.record(&outcome(&[60, 71, 29]));
        dist.record(&outcome(&[90, 50, 40]));

        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let proj = SeasonProjection::from_distribution(&dist, &names, &report(), ModelKind::Elo, 1);

        let a = proj.team("A").unwrap();
        assert!((a.title_probability - 0.75).abs() < 1e-12);
        assert!((a.promotion_probability - 1.0).abs() < 1e-12);
        assert!((a.expected_position - 1.25).abs() < 1e-12);
        assert!((a.expected_points - 76.25).abs() < 1e-12);

        let c = proj.team("C").unwrap();
        assert!((c.relegation_probability - 1.0).abs() < 1e-12);
        assert_eq!(c.title_probability, 0.0);

        for t in &proj.teams {
            let sum: f64 = t.position_probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }

        let champion_points = &proj.reference_points[0];
        assert_eq!(champion_points.position, 1);
        assert!((champion_points.mean_points - (80.0 + 75.0 + 71.0 + 90.0) / 4.0).abs() < 1e-12);
        let last = &proj.reference_points[1];
        assert_eq!(last.median, 30);

        let order: Vec<&str> = proj.ranked().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_projection_serialises() {
        let mut dist = OutcomeDistribution::new(3);
        dist.record(&outcome(&[50, 40, 30]));
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let proj = SeasonProjection::from_distribution(&dist, &names, &report(), ModelKind::Hybrid, 9);
        let json = serde_json::to_value(&proj).unwrap();
        assert_eq!(json["model"], "hybrid");
        assert_eq!(json["trials"], 1);
        assert_eq!(json["teams"][0]["name"], "A");
        assert!(json.get("trial_positions").is_none());
    }
}
