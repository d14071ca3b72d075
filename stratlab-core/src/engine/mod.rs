//! Backtesting engine: one strategy from raw bars to an equity curve.
//!
//! `run_strategy` chains the pipeline stages:
//!
//! 1. Validate strategy parameters and the simulation constraints
//! 2. Align the strategy's instruments (plus its benchmark) onto one axis
//! 3. Generate signals
//! 4. Simulate positions and trades
//! 5. Account returns, equity, drawdown and the Buy & Hold benchmark

pub mod accounting;
pub mod simulator;

pub use accounting::account;
pub use simulator::{simulate, Simulation, SimulationConfig, MAX_LEVERAGE_CEILING};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::data::{align_instruments, GapPolicy};
use crate::domain::{Bar, PerformanceRecord, PositionSnapshot, SignalSeries, Trade};
use crate::error::BacktestError;
use crate::signals::{SignalGenerator, Strategy};

/// Configuration for a single strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_equity: f64,
    pub gap_policy: GapPolicy,
    pub simulation: SimulationConfig,
    /// Buy & Hold instrument; defaults to the strategy's first instrument.
    pub benchmark: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_equity: 100.0,
            gap_policy: GapPolicy::Strict,
            simulation: SimulationConfig::default(),
            benchmark: None,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            initial_equity,
            ..Self::default()
        }
    }

    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }
}

/// Everything a strategy run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRun {
    pub strategy: String,
    pub instruments: Vec<String>,
    pub benchmark: String,
    pub signals: SignalSeries,
    pub positions: Vec<PositionSnapshot>,
    pub trades: Vec<Trade>,
    pub records: Vec<PerformanceRecord>,
    pub warmup_bars: usize,
    pub filled_bars: usize,
    pub ruined_at: Option<usize>,
}

impl StrategyRun {
    pub fn final_equity(&self) -> Option<f64> {
        self.records.last().map(|r| r.equity)
    }

    pub fn total_turnover(&self) -> f64 {
        self.positions.iter().map(|p| p.turnover).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.positions.iter().map(|p| p.transaction_cost).sum()
    }
}

/// Run one strategy end to end.
///
/// `universe` maps instrument names to their raw (unvalidated) bars; only the
/// strategy's instruments and its benchmark are read from it.
pub fn run_strategy(
    strategy: &Strategy,
    universe: &HashMap<String, Vec<Bar>>,
    config: &EngineConfig,
) -> Result<StrategyRun, BacktestError> {
    if !(config.initial_equity.is_finite() && config.initial_equity > 0.0) {
        return Err(BacktestError::ConstraintViolation(format!(
            "initial_equity must be positive, got {}",
            config.initial_equity
        )));
    }
    strategy.validate()?;
    config
        .simulation
        .validate(strategy.requested_leverage(config.simulation.position_size))?;

    let traded = strategy.instruments();
    let benchmark = match &config.benchmark {
        Some(b) => b.clone(),
        None => traded.first().cloned().ok_or_else(|| {
            BacktestError::ConstraintViolation("strategy trades no instruments".into())
        })?,
    };
    let mut needed = traded.clone();
    if !needed.contains(&benchmark) {
        needed.push(benchmark.clone());
    }

    let data = align_instruments(universe, &needed, config.gap_policy)?;
    let signals = strategy.generate(&data)?;
    let sim = simulate(&signals, &data, &config.simulation)?;
    let records = account(&sim, &data, config.initial_equity, &benchmark)?;

    debug!(
        strategy = strategy.name(),
        bars = data.len(),
        trades = sim.trades.len(),
        filled = data.filled_bars,
        "strategy run complete"
    );

    Ok(StrategyRun {
        strategy: strategy.name().to_string(),
        instruments: traded,
        benchmark,
        signals,
        positions: sim.positions,
        trades: sim.trades,
        records,
        warmup_bars: strategy.warmup_bars(),
        filled_bars: data.filled_bars,
        ruined_at: sim.ruined_at,
    })
}
