//! TOML run configuration.
//!
//! One file describes a whole comparison run:
//!
//! ```toml
//! [run]
//! initial_equity = 100.0
//! gap_policy = "strict"
//!
//! [data]
//! source = "csv"
//! dir = "data"
//!
//! [defaults]
//! transaction_cost_bps = 5.0
//!
//! [[strategy]]
//! name = "sma_5_20"
//! type = "crossover"
//! instrument = "SPY"
//! fast_window = 5
//! slow_window = 20
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use stratlab_core::data::GapPolicy;
use stratlab_core::engine::{EngineConfig, SimulationConfig};
use stratlab_core::error::BacktestError;
use stratlab_core::fingerprint::ConfigHash;
use stratlab_core::signals::{SignalGenerator, Strategy};

/// Errors from loading or validating a run file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("strategy '{name}': {source}")]
    Strategy {
        name: String,
        #[source]
        source: BacktestError,
    },
}

fn default_initial_equity() -> f64 {
    100.0
}

fn default_periods_per_year() -> f64 {
    252.0
}

/// Settings shared by every strategy in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(default = "default_initial_equity")]
    pub initial_equity: f64,
    /// Bars per year, for annualizing metrics.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    /// Annual risk-free rate used by Sharpe and Sortino.
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub gap_policy: GapPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            initial_equity: default_initial_equity(),
            periods_per_year: default_periods_per_year(),
            risk_free_rate: 0.0,
            gap_policy: GapPolicy::Strict,
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_bars() -> usize {
    504
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default()
}

fn default_volatility() -> f64 {
    0.01
}

/// Parameters of the seeded synthetic random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_bars")]
    pub bars: usize,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    /// Mean daily return.
    #[serde(default)]
    pub drift: f64,
    /// Standard deviation of daily returns.
    #[serde(default = "default_volatility")]
    pub volatility: f64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            bars: default_bars(),
            start_date: default_start_date(),
            drift: 0.0,
            volatility: default_volatility(),
        }
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataSpec {
    /// `<dir>/<INSTRUMENT>.csv`; a relative `dir` resolves against the config file.
    Csv {
        #[serde(default = "default_data_dir")]
        dir: PathBuf,
    },
    Synthetic(SyntheticSpec),
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for DataSpec {
    fn default() -> Self {
        DataSpec::Csv {
            dir: default_data_dir(),
        }
    }
}

/// Per-strategy overrides of the `[defaults]` simulation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOverride {
    pub execution_lag: Option<usize>,
    pub transaction_cost_bps: Option<f64>,
    pub max_leverage: Option<f64>,
    pub position_size: Option<f64>,
    pub no_short_selling: Option<bool>,
}

impl SimulationOverride {
    pub fn apply(&self, base: &SimulationConfig) -> SimulationConfig {
        SimulationConfig {
            execution_lag: self.execution_lag.unwrap_or(base.execution_lag),
            transaction_cost_bps: self
                .transaction_cost_bps
                .unwrap_or(base.transaction_cost_bps),
            max_leverage: self.max_leverage.unwrap_or(base.max_leverage),
            position_size: self.position_size.unwrap_or(base.position_size),
            no_short_selling: self.no_short_selling.unwrap_or(base.no_short_selling),
        }
    }
}

/// One `[[strategy]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    /// Unique label; also used for artifact file names.
    pub name: String,
    #[serde(flatten)]
    pub strategy: Strategy,
    #[serde(default)]
    pub simulation: SimulationOverride,
    /// Buy & Hold instrument; defaults to the strategy's first instrument.
    #[serde(default)]
    pub benchmark: Option<String>,
}

/// A complete run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub data: DataSpec,
    #[serde(default)]
    pub defaults: SimulationConfig,
    #[serde(rename = "strategy", default)]
    pub strategies: Vec<StrategySpec>,
}

impl RunFile {
    /// Parse and validate a run file.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: RunFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Check everything that can be checked without data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let run = &self.run;
        if !(run.initial_equity.is_finite() && run.initial_equity > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "run.initial_equity must be positive, got {}",
                run.initial_equity
            )));
        }
        if !(run.periods_per_year.is_finite() && run.periods_per_year > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "run.periods_per_year must be positive, got {}",
                run.periods_per_year
            )));
        }
        if !run.risk_free_rate.is_finite() {
            return Err(ConfigError::Invalid("run.risk_free_rate must be finite".into()));
        }
        if let DataSpec::Synthetic(s) = &self.data {
            if s.bars == 0 {
                return Err(ConfigError::Invalid("data.bars must be >= 1".into()));
            }
            if !(s.volatility.is_finite() && s.volatility >= 0.0 && s.drift.is_finite()) {
                return Err(ConfigError::Invalid(
                    "data.drift and data.volatility must be finite, volatility >= 0".into(),
                ));
            }
        }
        if self.strategies.is_empty() {
            return Err(ConfigError::Invalid("no [[strategy]] entries".into()));
        }

        let mut seen = BTreeSet::new();
        for spec in &self.strategies {
            if spec.name.is_empty()
                || !spec
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(ConfigError::Invalid(format!(
                    "strategy name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate strategy name '{}'",
                    spec.name
                )));
            }
            let wrap = |source| ConfigError::Strategy {
                name: spec.name.clone(),
                source,
            };
            spec.strategy.validate().map_err(wrap)?;
            let sim = self.simulation_for(spec);
            sim.validate(spec.strategy.requested_leverage(sim.position_size))
                .map_err(wrap)?;
        }
        Ok(())
    }

    /// Effective simulation settings for one strategy.
    pub fn simulation_for(&self, spec: &StrategySpec) -> SimulationConfig {
        spec.simulation.apply(&self.defaults)
    }

    /// Engine configuration for one strategy.
    pub fn engine_config(&self, spec: &StrategySpec) -> EngineConfig {
        EngineConfig {
            initial_equity: self.run.initial_equity,
            gap_policy: self.run.gap_policy,
            simulation: self.simulation_for(spec),
            benchmark: spec.benchmark.clone(),
        }
    }

    /// Every instrument any strategy trades or benchmarks against, sorted.
    pub fn instruments(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for spec in &self.strategies {
            set.extend(spec.strategy.instruments());
            if let Some(b) = &spec.benchmark {
                set.insert(b.clone());
            }
        }
        set.into_iter().collect()
    }

    /// BLAKE3 hash of the canonical JSON form of this file.
    pub fn config_hash(&self) -> Result<ConfigHash, serde_json::Error> {
        ConfigHash::of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratlab_core::signals::RebalanceFrequency;

    const SAMPLE: &str = r#"
[run]
initial_equity = 1000.0
gap_policy = "forward_fill"

[data]
source = "synthetic"
seed = 7
bars = 300

[defaults]
transaction_cost_bps = 2.0

[[strategy]]
name = "sma_5_20"
type = "crossover"
instrument = "SPY"
fast_window = 5
slow_window = 20
[strategy.simulation]
no_short_selling = false

[[strategy]]
name = "bollinger"
type = "mean_reversion"
instrument = "SPY"
window = 20

[[strategy]]
name = "sixty_forty"
type = "rebalance"
frequency = "quarterly"
benchmark = "SPY"
[[strategy.allocations]]
instrument = "SPY"
weight = 0.6
[[strategy.allocations]]
instrument = "AGG"
weight = 0.4
"#;

    #[test]
    fn parses_full_sample() {
        let file = RunFile::from_toml(SAMPLE).unwrap();
        assert_eq!(file.run.initial_equity, 1000.0);
        assert_eq!(file.run.gap_policy, GapPolicy::ForwardFill);
        assert_eq!(file.run.periods_per_year, 252.0);
        assert!(matches!(file.data, DataSpec::Synthetic(SyntheticSpec { seed: 7, bars: 300, .. })));
        assert_eq!(file.strategies.len(), 3);

        let cross = &file.strategies[0];
        assert_eq!(cross.strategy.name(), "crossover");
        let sim = file.simulation_for(cross);
        assert!(!sim.no_short_selling);
        assert_eq!(sim.transaction_cost_bps, 2.0);
        assert_eq!(sim.execution_lag, 1);

        match &file.strategies[1].strategy {
            Strategy::MeanReversion(m) => assert_eq!(m.k, 2.0),
            other => panic!("expected mean reversion, got {other:?}"),
        }
        match &file.strategies[2].strategy {
            Strategy::Rebalance(r) => {
                assert_eq!(r.frequency, RebalanceFrequency::Quarterly);
                assert_eq!(r.allocations.len(), 2);
            }
            other => panic!("expected rebalance, got {other:?}"),
        }
        assert_eq!(file.instruments(), vec!["AGG".to_string(), "SPY".to_string()]);
    }

    #[test]
    fn engine_config_carries_run_settings() {
        let file = RunFile::from_toml(SAMPLE).unwrap();
        let engine = file.engine_config(&file.strategies[2]);
        assert_eq!(engine.initial_equity, 1000.0);
        assert_eq!(engine.benchmark.as_deref(), Some("SPY"));
        assert_eq!(engine.gap_policy, GapPolicy::ForwardFill);
    }

    #[test]
    fn csv_is_the_default_source() {
        let toml_str = r#"
[[strategy]]
name = "x"
type = "crossover"
instrument = "SPY"
fast_window = 2
slow_window = 4
"#;
        let file = RunFile::from_toml(toml_str).unwrap();
        assert_eq!(
            file.data,
            DataSpec::Csv {
                dir: PathBuf::from("data")
            }
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let toml_str = r#"
[[strategy]]
name = "a"
type = "crossover"
instrument = "SPY"
fast_window = 2
slow_window = 4

[[strategy]]
name = "a"
type = "crossover"
instrument = "QQQ"
fast_window = 2
slow_window = 4
"#;
        let err = RunFile::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("duplicate strategy name"));
    }

    #[test]
    fn rejects_leverage_above_limit() {
        let toml_str = r#"
[[strategy]]
name = "levered"
type = "crossover"
instrument = "SPY"
fast_window = 2
slow_window = 4
[strategy.simulation]
position_size = 2.0
"#;
        let err = RunFile::from_toml(toml_str).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Strategy {
                source: BacktestError::ConstraintViolation(_),
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_lag_and_empty_file() {
        let toml_str = r#"
[defaults]
execution_lag = 0

[[strategy]]
name = "x"
type = "crossover"
instrument = "SPY"
fast_window = 2
slow_window = 4
"#;
        assert!(RunFile::from_toml(toml_str).is_err());
        assert!(matches!(
            RunFile::from_toml(""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_strategy_type_is_a_parse_error() {
        let toml_str = r#"
[[strategy]]
name = "x"
type = "momentum"
instrument = "SPY"
"#;
        assert!(matches!(RunFile::from_toml(toml_str), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn config_hash_is_stable() {
        let a = RunFile::from_toml(SAMPLE).unwrap();
        let b = RunFile::from_toml(SAMPLE).unwrap();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }
}
