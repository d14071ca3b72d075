//! Bollinger Bands: rolling mean +/- k standard deviations.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + k * stddev(close, period)
//! - Lower: middle - k * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

impl BollingerBand {
    fn label(&self) -> &'static str {
        match self {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    k: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(band: BollingerBand, period: usize, k: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self {
            period,
            k,
            band,
            name: format!("bollinger_{}_{period}_{k}", band.label()),
        }
    }

    pub fn upper(period: usize, k: f64) -> Self {
        Self::new(BollingerBand::Upper, period, k)
    }

    pub fn middle(period: usize, k: f64) -> Self {
        Self::new(BollingerBand::Middle, period, k)
    }

    pub fn lower(period: usize, k: f64) -> Self {
        Self::new(BollingerBand::Lower, period, k)
    }
}

/// Rolling (mean, population stddev) of closes; NaN during warmup or when the
/// window contains a NaN close.
pub fn rolling_mean_std(bars: &[Bar], period: usize) -> Vec<(f64, f64)> {
    let n = bars.len();
    let mut result = vec![(f64::NAN, f64::NAN); n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &bars[i + 1 - period..=i];
        if window.iter().any(|b| b.close.is_nan()) {
            continue;
        }
        let mean = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|b| {
                let diff = b.close - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        result[i] = (mean, variance.sqrt());
    }
    result
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean_std(bars, self.period)
            .into_iter()
            .map(|(mean, std)| match self.band {
                BollingerBand::Middle => mean,
                BollingerBand::Upper => mean + self.k * std,
                BollingerBand::Lower => mean - self.k * std,
            })
            .collect()
    }
}
