//! Moving average crossover: golden cross and death cross detection.
//!
//! Goes Long when the fast SMA crosses above the slow SMA and Short when it
//! crosses below. The direction holds between crossings. Whether Short means
//! an actual short or flat is decided by the simulator's short-selling flag.

use serde::{Deserialize, Serialize};

use super::{ensure_history, instrument_bars, SignalGenerator};
use crate::data::AlignedBars;
use crate::domain::{Direction, Signal, SignalSeries};
use crate::error::BacktestError;
use crate::indicators::{Indicator, Sma};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverStrategy {
    pub instrument: String,
    pub fast_window: usize,
    pub slow_window: usize,
}

impl CrossoverStrategy {
    pub fn new(instrument: impl Into<String>, fast_window: usize, slow_window: usize) -> Self {
        Self {
            instrument: instrument.into(),
            fast_window,
            slow_window,
        }
    }
}

impl SignalGenerator for CrossoverStrategy {
    fn name(&self) -> &str {
        "crossover"
    }

    fn instruments(&self) -> Vec<String> {
        vec![self.instrument.clone()]
    }

    fn warmup_bars(&self) -> usize {
        self.slow_window
    }

    fn validate(&self) -> Result<(), BacktestError> {
        if self.fast_window == 0 {
            return Err(BacktestError::ConstraintViolation(
                "crossover fast_window must be >= 1".into(),
            ));
        }
        if self.slow_window <= self.fast_window {
            return Err(BacktestError::ConstraintViolation(format!(
                "crossover slow_window ({}) must be greater than fast_window ({})",
                self.slow_window, self.fast_window
            )));
        }
        Ok(())
    }

    fn generate(&self, data: &AlignedBars) -> Result<SignalSeries, BacktestError> {
        self.validate()?;
        let bars = instrument_bars(data, &self.instrument)?;
        ensure_history(self.name(), self.warmup_bars(), bars.len())?;

        let fast = Sma::new(self.fast_window).compute(bars);
        let slow = Sma::new(self.slow_window).compute(bars);

        let mut series = SignalSeries::new(self.instruments());
        let mut state = Direction::Flat;
        for (i, bar) in bars.iter().enumerate() {
            if i > 0 {
                let (f, s, fp, sp) = (fast[i], slow[i], fast[i - 1], slow[i - 1]);
                if !(f.is_nan() || s.is_nan() || fp.is_nan() || sp.is_nan()) {
                    if f > s && fp <= sp {
                        state = Direction::Long;
                    } else if f < s && fp >= sp {
                        state = Direction::Short;
                    }
                }
            }
            series
                .rows
                .push(vec![Signal::new(bar.date, &self.instrument, state)]);
        }
        Ok(series)
    }
}
