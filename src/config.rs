use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub elo: EloConfig,
    pub poisson: PoissonConfig,
    pub report: ReportConfig,
}

/// Strength model used to simulate fixtures.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    /// Elo ratings, W/D/L only.
    Elo,
    /// Attack/defense coefficients with Poisson scorelines.
    Poisson,
    /// Poisson scorelines nudged by the Elo difference.
    #[default]
    Hybrid,
}

impl FromStr for ModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elo" => Ok(Self::Elo),
            "poisson" => Ok(Self::Poisson),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(ConfigError::UnsupportedModel(s.to_string())),
        }
    }
}

impl TryFrom<String> for ModelKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelKind> for String {
    fn from(kind: ModelKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Elo => "elo",
            Self::Poisson => "poisson",
            Self::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_simulations: u64,
    pub model: ModelKind,
    /// Fixed seed for reproducible runs. Drawn from entropy when absent.
    pub random_seed: Option<u64>,
    /// Worker threads. Defaults to rayon's choice (one per core).
    pub threads: Option<usize>,
    /// Keep every trial's final positions, not only the tallies.
    pub keep_trials: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            model: ModelKind::default(),
            random_seed: None,
            threads: None,
            keep_trials: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EloConfig {
    pub k_factor: f64,
    /// Fixed draw rate. Estimated from the table's draw column when absent.
    pub draw_probability: Option<f64>,
    pub seeding: EloSeedingConfig,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: 20.0,
            draw_probability: None,
            seeding: EloSeedingConfig::default(),
        }
    }
}

/// Weights for deriving a starting Elo from the table when a team has none.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EloSeedingConfig {
    /// Points per game.
    pub alpha: f64,
    /// Goal difference per game.
    pub beta: f64,
    /// Goals for per game.
    pub gamma: f64,
    /// Rating spread per standard deviation of the composite score.
    pub sigma: f64,
}

impl Default for EloSeedingConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.8,
            gamma: 0.2,
            sigma: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PoissonConfig {
    /// League mean goals per team per match. Derived from the table when absent.
    pub base_goal_rate: Option<f64>,
    /// Exponent weight on the Elo correction in hybrid mode.
    pub elo_influence_weight: f64,
}

impl Default for PoissonConfig {
    fn default() -> Self {
        Self {
            base_goal_rate: None,
            elo_influence_weight: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    /// Places at the bottom that go down.
    pub relegation_places: usize,
    /// Places at the top counted as promotion/qualification.
    pub promotion_places: usize,
    /// Positions whose final points are summarised (1-based).
    pub reference_positions: Vec<usize>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            relegation_places: 3,
            promotion_places: 4,
            reference_positions: vec![1],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not depend on the league size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.num_simulations == 0 {
            return Err(ConfigError::NonPositiveSimulations);
        }
        if self.simulation.threads == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "threads",
                value: 0.0,
            });
        }
        if let Some(p) = self.elo.draw_probability {
            if !(0.0..1.0).contains(&p) {
                return Err(ConfigError::InvalidProbability {
                    name: "draw_probability",
                    value: p,
                });
            }
        }
        finite_non_negative("k_factor", self.elo.k_factor)?;
        finite_non_negative("elo_influence_weight", self.poisson.elo_influence_weight)?;
        if let Some(rate) = self.poisson.base_goal_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name: "base_goal_rate",
                    value: rate,
                });
            }
        }
        let seeding = &self.elo.seeding;
        for (name, value) in [
            ("seeding.alpha", seeding.alpha),
            ("seeding.beta", seeding.beta),
            ("seeding.gamma", seeding.gamma),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        finite_non_negative("seeding.sigma", seeding.sigma)?;
        Ok(())
    }

    /// Checks against the number of teams in the snapshot.
    pub fn validate_for_league(&self, teams: usize) -> Result<(), ConfigError> {
        self.validate()?;
        let report = &self.report;
        if report.relegation_places >= teams {
            return Err(ConfigError::PositionOutOfRange {
                name: "relegation_places",
                value: report.relegation_places,
                teams,
            });
        }
        if report.promotion_places > teams {
            return Err(ConfigError::PositionOutOfRange {
                name: "promotion_places",
                value: report.promotion_places,
                teams,
            });
        }
        if self.simulation.keep_trials && teams > u16::MAX as usize {
            return Err(ConfigError::PositionOutOfRange {
                name: "keep_trials",
                value: teams,
                teams,
            });
        }
        if let Some(&bad) = report
            .reference_positions
            .iter()
            .find(|&&p| p == 0 || p > teams)
        {
            return Err(ConfigError::PositionOutOfRange {
                name: "reference_positions",
                value: bad,
                teams,
            });
        }
        Ok(())
    }
}

fn finite_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidParameter { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses() {
        let config = Config::load(Path::new("config.toml")).unwrap();
        assert_eq!(config.simulation.num_simulations, 10_000);
        assert_eq!(config.simulation.model, ModelKind::Hybrid);
        assert_eq!(config.elo.k_factor, 20.0);
        assert_eq!(config.report.relegation_places, 3);
        assert!(!config.simulation.keep_trials);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.num_simulations, 10_000);
        assert_eq!(config.elo.seeding.sigma, 100.0);
        assert_eq!(config.poisson.elo_influence_weight, 1.0);
        assert!(config.simulation.random_seed.is_none());
    }

    #[test]
    fn test_unknown_model_fails_to_parse() {
        let err = toml::from_str::<Config>("[simulation]\nmodel = \"glicko\"\n").unwrap_err();
        assert!(err.to_string().contains("glicko"), "got {err}");
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!("ELO".parse::<ModelKind>().unwrap(), ModelKind::Elo);
        assert_eq!(" poisson ".parse::<ModelKind>().unwrap(), ModelKind::Poisson);
        assert_eq!(
            "dixon-coles".parse::<ModelKind>().unwrap_err(),
            ConfigError::UnsupportedModel("dixon-coles".to_string())
        );
    }

    #[test]
    fn test_zero_simulations_rejected() {
        let mut config = Config::default();
        config.simulation.num_simulations = 0;
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveSimulations));
    }

    #[test]
    fn test_draw_probability_bounds() {
        let mut config = Config::default();
        config.elo.draw_probability = Some(1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability { name: "draw_probability", .. })
        ));
        config.elo.draw_probability = Some(-0.1);
        assert!(config.validate().is_err());
        config.elo.draw_probability = Some(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_goal_rate_must_be_positive() {
        let mut config = Config::default();
        config.poisson.base_goal_rate = Some(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "base_goal_rate", .. })
        ));
    }

    #[test]
    fn test_positions_checked_against_league_size() {
        let mut config = Config::default();
        config.report.relegation_places = 2;
        config.report.promotion_places = 1;
        config.report.reference_positions = vec![1, 4];
        assert!(config.validate_for_league(4).is_ok());
        assert!(matches!(
            config.validate_for_league(3),
            Err(ConfigError::PositionOutOfRange { name: "reference_positions", value: 4, .. })
        ));
        config.report.relegation_places = 4;
        assert!(matches!(
            config.validate_for_league(4),
            Err(ConfigError::PositionOutOfRange { name: "relegation_places", .. })
        ));
    }
}
