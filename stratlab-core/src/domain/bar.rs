//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single instrument on a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub instrument: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if the close cannot be used for returns (NaN, infinite or
    /// non-positive).
    pub fn is_void(&self) -> bool {
        !self.close.is_finite() || self.close <= 0.0
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        let finite = self.open.is_finite() && self.high.is_finite() && self.low.is_finite();
        if self.is_void() || !finite {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
    }

    /// A flat bar that repeats `previous.close` on `date` with zero volume.
    ///
    /// Used when the gap policy allows forward-filling a missing or void bar.
    pub fn carried_forward(previous: &Bar, date: NaiveDate) -> Bar {
        Bar {
            instrument: previous.instrument.clone(),
            date,
            open: previous.close,
            high: previous.close,
            low: previous.close,
            close: previous.close,
            volume: 0,
        }
    }
}
