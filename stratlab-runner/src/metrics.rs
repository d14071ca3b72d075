//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Annualization uses `periods_per_year` bars per year (252 for daily data).

use serde::{Deserialize, Serialize};
use stratlab_core::domain::Trade;

/// Aggregate performance metrics for one equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub final_equity: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub max_consecutive_losses: usize,
    /// Sum of per-bar turnover, in multiples of equity.
    pub total_turnover: f64,
    /// Sum of per-bar costs, as fractions of equity.
    pub total_cost: f64,
}

/// Annualization and risk-free settings shared by every metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    pub fn compute(
        equity_curve: &[f64],
        trades: &[Trade],
        total_turnover: f64,
        total_cost: f64,
        cfg: &MetricsConfig,
    ) -> Self {
        let ppy = cfg.periods_per_year;
        Self {
            total_return: total_return(equity_curve),
            cagr: cagr(equity_curve, ppy),
            annualized_volatility: annualized_volatility(equity_curve, ppy),
            sharpe: sharpe_ratio(equity_curve, cfg.risk_free_rate, ppy),
            sortino: sortino_ratio(equity_curve, cfg.risk_free_rate, ppy),
            calmar: calmar_ratio(equity_curve, ppy),
            max_drawdown: max_drawdown(equity_curve),
            final_equity: equity_curve.last().copied().unwrap_or(0.0),
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            total_turnover,
            total_cost,
        }
    }

    /// Metrics for a Buy & Hold curve: no trades, no costs.
    pub fn benchmark(equity_curve: &[f64], cfg: &MetricsConfig) -> Self {
        Self::compute(equity_curve, &[], 0.0, 0.0, cfg)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&final_eq)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (final_eq - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound Annual Growth Rate over the elapsed bars.
///
/// Returns 0.0 for single-bar curves. A wiped-out curve returns -1.0.
pub fn cagr(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let (Some(&initial), Some(&final_eq)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || initial <= 0.0 || periods_per_year <= 0.0 {
        return 0.0;
    }
    if final_eq <= 0.0 {
        return -1.0;
    }
    let years = (equity_curve.len() - 1) as f64 / periods_per_year;
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Annualized standard deviation of per-bar returns.
pub fn annualized_volatility(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    std_dev(&period_returns(equity_curve)) * periods_per_year.sqrt()
}

/// Annualized Sharpe ratio from per-bar returns.
///
/// Sharpe = mean(returns - rf) / std(returns) * sqrt(periods_per_year).
/// Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let rf = risk_free_rate / periods_per_year;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&excess) / std * periods_per_year.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there is no downside or fewer than 2 returns.
pub fn sortino_ratio(equity_curve: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let rf = risk_free_rate / periods_per_year;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();

    let downside: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&excess) / downside_std * periods_per_year.sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|.
///
/// Returns 0.0 if there was no drawdown.
pub fn calmar_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 {
        return 0.0;
    }
    cagr(equity_curve, periods_per_year) / dd.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min(eq / peak - 1.0);
        }
    }
    max_dd
}

/// Fraction of trades with a positive return.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross gains / gross losses, each trade weighted by its size.
///
/// Capped at 100.0 when there are no losses.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let pnl = |t: &Trade| t.return_pct() * t.size.abs();
    let gains: f64 = trades.iter().map(pnl).filter(|p| *p > 0.0).sum();
    let losses: f64 = trades.iter().map(pnl).filter(|p| *p < 0.0).map(f64::abs).sum();
    if losses < 1e-12 {
        return if gains > 0.0 { 100.0 } else { 0.0 };
    }
    (gains / losses).min(100.0)
}

/// Longest run of consecutive losing trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() {
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Per-bar simple returns of an equity curve.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
