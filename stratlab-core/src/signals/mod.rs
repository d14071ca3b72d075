//! Signal generation: turns bar history into directional intent.
//!
//! Signals are portfolio-agnostic: they see aligned bars, never positions or
//! equity. The three strategy families form a closed set (`Strategy`) that the
//! harness dispatches by `match`; each family implements `SignalGenerator`.

pub mod crossover;
pub mod mean_reversion;
pub mod rebalance;

pub use crossover::CrossoverStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use rebalance::{Allocation, RebalanceFrequency, RebalanceStrategy};

use serde::{Deserialize, Serialize};

use crate::data::AlignedBars;
use crate::domain::{Bar, SignalSeries};
use crate::error::BacktestError;

/// Contract shared by every strategy family.
///
/// # Architecture invariant
/// `generate` must only use `bars[0..=t]` to produce the signal for bar `t`.
/// The position simulator adds the execution lag on top of that.
pub trait SignalGenerator: Send + Sync {
    /// Family name (e.g., "crossover").
    fn name(&self) -> &str;

    /// Instruments this strategy trades, in column order.
    fn instruments(&self) -> Vec<String>;

    /// Minimum number of bars required before the strategy can run.
    fn warmup_bars(&self) -> usize;

    /// Check parameters without looking at data.
    fn validate(&self) -> Result<(), BacktestError>;

    /// Produce one signal row per bar of `data`.
    fn generate(&self, data: &AlignedBars) -> Result<SignalSeries, BacktestError>;
}

/// The closed set of strategy families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    Crossover(CrossoverStrategy),
    MeanReversion(MeanReversionStrategy),
    Rebalance(RebalanceStrategy),
}

impl Strategy {
    fn inner(&self) -> &dyn SignalGenerator {
        match self {
            Strategy::Crossover(s) => s,
            Strategy::MeanReversion(s) => s,
            Strategy::Rebalance(s) => s,
        }
    }

    /// Gross exposure this strategy asks for, given the configured position size.
    pub fn requested_leverage(&self, position_size: f64) -> f64 {
        match self {
            Strategy::Crossover(_) | Strategy::MeanReversion(_) => position_size.abs(),
            Strategy::Rebalance(s) => s.gross_weight(),
        }
    }
}

impl SignalGenerator for Strategy {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn instruments(&self) -> Vec<String> {
        self.inner().instruments()
    }

    fn warmup_bars(&self) -> usize {
        self.inner().warmup_bars()
    }

    fn validate(&self) -> Result<(), BacktestError> {
        self.inner().validate()
    }

    fn generate(&self, data: &AlignedBars) -> Result<SignalSeries, BacktestError> {
        self.inner().generate(data)
    }
}

/// Fail with `InsufficientHistory` when fewer than `required` bars are available.
pub(crate) fn ensure_history(
    strategy: &str,
    required: usize,
    available: usize,
) -> Result<(), BacktestError> {
    if available < required {
        return Err(BacktestError::InsufficientHistory {
            strategy: strategy.to_string(),
            required,
            available,
        });
    }
    Ok(())
}

/// Look up one instrument's bars in the aligned data.
pub(crate) fn instrument_bars<'a>(
    data: &'a AlignedBars,
    instrument: &str,
) -> Result<&'a [Bar], BacktestError> {
    data.series(instrument).ok_or_else(|| {
        BacktestError::AlignmentError(format!("instrument '{instrument}' not in aligned data"))
    })
}
