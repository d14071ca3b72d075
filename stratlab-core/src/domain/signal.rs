//! Signals: directional intent derived from bar history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Desired exposure direction for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Flat,
    Short,
}

impl Direction {
    /// Sign applied to the configured position size.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Flat => 0.0,
            Direction::Short => -1.0,
        }
    }
}

/// One signal for one instrument on one bar.
///
/// `target_weight` is set only by calendar rebalancing: it forces the
/// simulator to restore that weight even when the direction is unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub date: NaiveDate,
    pub instrument: String,
    pub direction: Direction,
    pub target_weight: Option<f64>,
}

impl Signal {
    pub fn new(date: NaiveDate, instrument: impl Into<String>, direction: Direction) -> Self {
        Self {
            date,
            instrument: instrument.into(),
            direction,
            target_weight: None,
        }
    }

    pub fn flat(date: NaiveDate, instrument: impl Into<String>) -> Self {
        Self::new(date, instrument, Direction::Flat)
    }

    pub fn rebalance(date: NaiveDate, instrument: impl Into<String>, weight: f64) -> Self {
        let direction = if weight > 0.0 {
            Direction::Long
        } else if weight < 0.0 {
            Direction::Short
        } else {
            Direction::Flat
        };
        Self {
            date,
            instrument: instrument.into(),
            direction,
            target_weight: Some(weight),
        }
    }
}

/// Signals for a whole run: one row per bar, one signal per instrument.
///
/// Every row holds signals in the same order as `instruments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub instruments: Vec<String>,
    pub rows: Vec<Vec<Signal>>,
}

impl SignalSeries {
    pub fn new(instruments: Vec<String>) -> Self {
        Self {
            instruments,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Direction series for one instrument, or `None` if it is not traded.
    pub fn directions(&self, instrument: &str) -> Option<Vec<Direction>> {
        let col = self.instruments.iter().position(|i| i == instrument)?;
        Some(self.rows.iter().map(|row| row[col].direction).collect())
    }
}
