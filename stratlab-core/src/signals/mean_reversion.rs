//! Bollinger mean reversion.
//!
//! Flat → Long when the close falls below the lower band; Long → Flat once the
//! close reverts to the rolling mean. Symmetrically, Flat → Short above the
//! upper band and Short → Flat at or below the mean.

use serde::{Deserialize, Serialize};

use super::{ensure_history, instrument_bars, SignalGenerator};
use crate::data::AlignedBars;
use crate::domain::{Direction, Signal, SignalSeries};
use crate::error::BacktestError;
use crate::indicators::bollinger::rolling_mean_std;

fn default_k() -> f64 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionStrategy {
    pub instrument: String,
    pub window: usize,
    #[serde(default = "default_k")]
    pub k: f64,
}

impl MeanReversionStrategy {
    pub fn new(instrument: impl Into<String>, window: usize, k: f64) -> Self {
        Self {
            instrument: instrument.into(),
            window,
            k,
        }
    }
}

impl SignalGenerator for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn instruments(&self) -> Vec<String> {
        vec![self.instrument.clone()]
    }

    fn warmup_bars(&self) -> usize {
        self.window
    }

    fn validate(&self) -> Result<(), BacktestError> {
        if self.window < 2 {
            return Err(BacktestError::ConstraintViolation(
                "mean reversion window must be >= 2".into(),
            ));
        }
        if !(self.k.is_finite() && self.k > 0.0) {
            return Err(BacktestError::ConstraintViolation(format!(
                "mean reversion k must be positive and finite, got {}",
                self.k
            )));
        }
        Ok(())
    }

    fn generate(&self, data: &AlignedBars) -> Result<SignalSeries, BacktestError> {
        self.validate()?;
        let bars = instrument_bars(data, &self.instrument)?;
        ensure_history(self.name(), self.warmup_bars(), bars.len())?;

        let bands = rolling_mean_std(bars, self.window);

        let mut series = SignalSeries::new(self.instruments());
        let mut state = Direction::Flat;
        for (bar, &(mean, std)) in bars.iter().zip(&bands) {
            if !(mean.is_nan() || std.is_nan()) {
                let upper = mean + self.k * std;
                let lower = mean - self.k * std;
                state = match state {
                    Direction::Flat if bar.close < lower => Direction::Long,
                    Direction::Flat if bar.close > upper => Direction::Short,
                    Direction::Long if bar.close >= mean => Direction::Flat,
                    Direction::Short if bar.close <= mean => Direction::Flat,
                    held => held,
                };
            }
            series
                .rows
                .push(vec![Signal::new(bar.date, &self.instrument, state)]);
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{align_instruments, test_bars, GapPolicy};
    use std::collections::HashMap;

    fn aligned(closes: &[f64]) -> AlignedBars {
        let mut u = HashMap::new();
        u.insert("SPY".to_string(), test_bars("SPY", closes));
        align_instruments(&u, &["SPY".into()], GapPolicy::Strict).unwrap()
    }

    #[test]
    fn enters_below_lower_band_and_exits_at_mean() {
        let mut closes = vec![100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 100.0];
        closes.push(90.0); // far below the lower band
        closes.push(95.0); // still below the mean
        closes.push(101.0); // back above the mean
        let strat = MeanReversionStrategy::new("SPY", 5, 1.5);
        let dirs = strat
            .generate(&aligned(&closes))
            .unwrap()
            .directions("SPY")
            .unwrap();
        assert!(dirs[..7].iter().all(|d| *d == Direction::Flat));
        assert_eq!(dirs[7], Direction::Long);
        assert_eq!(dirs[8], Direction::Long);
        assert_eq!(dirs[9], Direction::Flat);
    }

    #[test]
    fn goes_short_above_upper_band() {
        let closes = vec![100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 112.0, 104.0, 98.0];
        let strat = MeanReversionStrategy::new("SPY", 5, 1.5);
        let dirs = strat
            .generate(&aligned(&closes))
            .unwrap()
            .directions("SPY")
            .unwrap();
        assert_eq!(dirs[6], Direction::Short);
        assert_eq!(dirs[8], Direction::Flat);
    }

    #[test]
    fn insufficient_history() {
        let strat = MeanReversionStrategy::new("SPY", 20, 2.0);
        let err = strat.generate(&aligned(&[100.0; 10])).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientHistory { required: 20, available: 10, .. }
        ));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(MeanReversionStrategy::new("SPY", 1, 2.0).validate().is_err());
        assert!(MeanReversionStrategy::new("SPY", 20, 0.0).validate().is_err());
        assert!(MeanReversionStrategy::new("SPY", 20, f64::NAN).validate().is_err());
    }
}
