use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// End-of-bar holding of one instrument, as a fraction of equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub date: NaiveDate,
    pub instrument: String,
    pub weight: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.weight > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.weight < 0.0
    }
}

/// All positions held at the close of one bar, plus what it cost to get there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub date: NaiveDate,
    /// One weight per instrument, in the run's instrument order.
    pub weights: Vec<f64>,
    /// Sum of absolute weight changes executed on this bar.
    pub turnover: f64,
    /// Turnover cost as a fraction of equity.
    pub transaction_cost: f64,
}

impl PositionSnapshot {
    /// Sum of absolute weights.
    pub fn gross_exposure(&self) -> f64 {
        self.weights.iter().map(|w| w.abs()).sum()
    }

    pub fn positions(&self, instruments: &[String]) -> Vec<Position> {
        instruments
            .iter()
            .zip(&self.weights)
            .map(|(instrument, &weight)| Position {
                date: self.date,
                instrument: instrument.clone(),
                weight,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gross_exposure_sums_absolute_weights() {
        let snap = PositionSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            weights: vec![0.8, -0.3],
            turnover: 0.0,
            transaction_cost: 0.0,
        };
        assert!((snap.gross_exposure() - 1.1).abs() < 1e-12);

        let positions = snap.positions(&["SPY".into(), "TLT".into()]);
        assert!(positions[0].is_long());
        assert!(positions[1].is_short());
        assert_eq!(positions[1].instrument, "TLT");
    }
}
