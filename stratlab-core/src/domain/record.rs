use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of a strategy's equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub date: NaiveDate,
    pub equity: f64,
    /// `equity / running_peak - 1`; always <= 0.
    pub drawdown: f64,
    pub benchmark_equity: f64,

    // ── Audit ──
    pub period_return: f64,
    pub turnover: f64,
    pub transaction_cost: f64,
    pub gross_exposure: f64,
}
