//! Fixed-weight calendar rebalancing (e.g., 60/40 equity/bond).
//!
//! On the first bar of every new calendar period the strategy emits explicit
//! target weights. On every other bar it repeats the held direction, so the
//! simulator lets weights drift with prices. No price-derived logic.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{ensure_history, instrument_bars, SignalGenerator};
use crate::data::AlignedBars;
use crate::domain::{Signal, SignalSeries};
use crate::error::BacktestError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceFrequency {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl RebalanceFrequency {
    /// Calendar bucket a date falls in; a rebalance fires when it changes.
    pub fn period_key(&self, date: NaiveDate) -> (i32, u32) {
        match self {
            RebalanceFrequency::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            RebalanceFrequency::Monthly => (date.year(), date.month()),
            RebalanceFrequency::Quarterly => (date.year(), (date.month() - 1) / 3),
            RebalanceFrequency::Annually => (date.year(), 0),
        }
    }

    /// Whether bar `i` of `dates` opens a new period.
    pub fn is_rebalance_bar(&self, dates: &[NaiveDate], i: usize) -> bool {
        i == 0 || self.period_key(dates[i]) != self.period_key(dates[i - 1])
    }
}

/// Target weight for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub instrument: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceStrategy {
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub frequency: RebalanceFrequency,
}

impl RebalanceStrategy {
    pub fn new(allocations: Vec<Allocation>, frequency: RebalanceFrequency) -> Self {
        Self {
            allocations,
            frequency,
        }
    }

    /// The classic 60% equity / 40% bond split.
    pub fn sixty_forty(equity: &str, bond: &str, frequency: RebalanceFrequency) -> Self {
        Self::new(
            vec![
                Allocation {
                    instrument: equity.to_string(),
                    weight: 0.6,
                },
                Allocation {
                    instrument: bond.to_string(),
                    weight: 0.4,
                },
            ],
            frequency,
        )
    }

    /// Sum of absolute target weights.
    pub fn gross_weight(&self) -> f64 {
        self.allocations.iter().map(|a| a.weight.abs()).sum()
    }
}

impl SignalGenerator for RebalanceStrategy {
    fn name(&self) -> &str {
        "rebalance"
    }

    fn instruments(&self) -> Vec<String> {
        self.allocations
            .iter()
            .map(|a| a.instrument.clone())
            .collect()
    }

    fn warmup_bars(&self) -> usize {
        1
    }

    fn validate(&self) -> Result<(), BacktestError> {
        if self.allocations.is_empty() {
            return Err(BacktestError::ConstraintViolation(
                "rebalance strategy needs at least one allocation".into(),
            ));
        }
        for (i, a) in self.allocations.iter().enumerate() {
            if !a.weight.is_finite() {
                return Err(BacktestError::ConstraintViolation(format!(
                    "allocation weight for '{}' is not finite",
                    a.instrument
                )));
            }
            if self.allocations[..i]
                .iter()
                .any(|b| b.instrument == a.instrument)
            {
                return Err(BacktestError::ConstraintViolation(format!(
                    "instrument '{}' allocated twice",
                    a.instrument
                )));
            }
        }
        Ok(())
    }

    fn generate(&self, data: &AlignedBars) -> Result<SignalSeries, BacktestError> {
        self.validate()?;
        for a in &self.allocations {
            instrument_bars(data, &a.instrument)?;
        }
        ensure_history(self.name(), self.warmup_bars(), data.len())?;

        let mut series = SignalSeries::new(self.instruments());
        for (i, &date) in data.dates.iter().enumerate() {
            let rebalance = self.frequency.is_rebalance_bar(&data.dates, i);
            let row = self
                .allocations
                .iter()
                .map(|a| {
                    if rebalance {
                        Signal::rebalance(date, &a.instrument, a.weight)
                    } else {
                        let held = Signal::rebalance(date, &a.instrument, a.weight).direction;
                        Signal::new(date, &a.instrument, held)
                    }
                })
                .collect();
            series.rows.push(row);
        }
        Ok(series)
    }
}

/// Number of rebalance bars on an axis, for diagnostics.
pub fn count_rebalances(frequency: RebalanceFrequency, dates: &[NaiveDate]) -> usize {
    (0..dates.len())
        .filter(|&i| frequency.is_rebalance_bar(dates, i))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{align_instruments, bars_from_closes, GapPolicy};
    use crate::domain::Direction;
    use std::collections::HashMap;

    fn two_asset(n: usize) -> AlignedBars {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut u = HashMap::new();
        u.insert("SPY".to_string(), bars_from_closes("SPY", start, &vec![100.0; n]));
        u.insert("AGG".to_string(), bars_from_closes("AGG", start, &vec![50.0; n]));
        align_instruments(&u, &["SPY".into(), "AGG".into()], GapPolicy::Strict).unwrap()
    }

    #[test]
    fn targets_emitted_only_on_period_starts() {
        let data = two_asset(70); // ~ Jan 2 .. early April 2024
        let strat = RebalanceStrategy::sixty_forty("SPY", "AGG", RebalanceFrequency::Monthly);
        let series = strat.generate(&data).unwrap();

        let rebalance_rows: Vec<usize> = series
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row[0].target_weight.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(rebalance_rows[0], 0);
        assert_eq!(
            rebalance_rows.len(),
            count_rebalances(RebalanceFrequency::Monthly, &data.dates)
        );
        for &i in &rebalance_rows[1..] {
            assert_ne!(data.dates[i].month(), data.dates[i - 1].month());
        }
        assert_eq!(series.rows[0][0].target_weight, Some(0.6));
        assert_eq!(series.rows[0][1].target_weight, Some(0.4));
        assert!(series.rows[1].iter().all(|s| s.direction == Direction::Long));
    }

    #[test]
    fn quarterly_fires_less_often_than_monthly() {
        let data = two_asset(260);
        let monthly = count_rebalances(RebalanceFrequency::Monthly, &data.dates);
        let quarterly = count_rebalances(RebalanceFrequency::Quarterly, &data.dates);
        let annual = count_rebalances(RebalanceFrequency::Annually, &data.dates);
        assert_eq!(monthly, 12);
        assert_eq!(quarterly, 4);
        assert_eq!(annual, 1);
    }

    #[test]
    fn period_keys() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(RebalanceFrequency::Quarterly.period_key(d), (2024, 1));
        assert_eq!(RebalanceFrequency::Monthly.period_key(d), (2024, 5));
    }

    #[test]
    fn rejects_duplicate_instrument() {
        let strat = RebalanceStrategy::new(
            vec![
                Allocation {
                    instrument: "SPY".into(),
                    weight: 0.5,
                },
                Allocation {
                    instrument: "SPY".into(),
                    weight: 0.5,
                },
            ],
            RebalanceFrequency::Monthly,
        );
        assert!(matches!(
            strat.validate(),
            Err(BacktestError::ConstraintViolation(_))
        ));
    }
}
