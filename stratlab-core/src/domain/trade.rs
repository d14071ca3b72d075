//! Trade: a round trip from a position opening to its closing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A completed (or end-of-data marked) round-trip trade.
///
/// `size` is the signed weight at entry: positive for long, negative for short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub instrument: String,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    pub size: f64,

    /// True when the position was still open on the final bar and the exit is
    /// a mark-to-market valuation rather than a transition.
    pub mark_to_market: bool,
}

impl Trade {
    pub fn is_long(&self) -> bool {
        self.size > 0.0
    }

    /// Price return of the trade in the direction held.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        let raw = self.exit_price / self.entry_price - 1.0;
        if self.size < 0.0 {
            -raw
        } else {
            raw
        }
    }

    pub fn is_winner(&self) -> bool {
        self.return_pct() > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade(size: f64) -> Trade {
        Trade {
            instrument: "SPY".into(),
            entry_bar: 4,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            entry_price: 100.0,
            exit_bar: 8,
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            exit_price: 110.0,
            size,
            mark_to_market: false,
        }
    }

    #[test]
    fn long_return() {
        let trade = sample_trade(1.0);
        assert!((trade.return_pct() - 0.10).abs() < 1e-12);
        assert!(trade.is_winner());
        assert_eq!(trade.bars_held(), 4);
    }

    #[test]
    fn short_return_is_inverted() {
        let trade = sample_trade(-0.5);
        assert!((trade.return_pct() + 0.10).abs() < 1e-12);
        assert!(!trade.is_winner());
        assert!(!trade.is_long());
    }
}
