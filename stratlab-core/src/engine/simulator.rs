//! Position simulator: signals in, weights and trades out.
//!
//! # Timing
//! Weights are end-of-bar fractions of equity. A signal computed on the close
//! of bar `t` is executed on the close of bar `t + execution_lag`, and the
//! resulting weight earns the return of the following bar. With
//! `execution_lag >= 1` a signal can never influence a weight dated at or
//! before the bar it was computed on.
//!
//! # Per-bar sequence
//! 1. Drift: weights held from the previous bar move with prices,
//!    `w_i' = w_i (1 + r_i) / (1 + sum_j w_j r_j)`.
//! 2. Execute: the lagged signal row sets new targets (direction transitions
//!    or explicit rebalance weights). Unchanged directions keep drifted weights.
//! 3. Constrain: clamp each weight to its bounds, then scale the book down if
//!    gross exposure exceeds `max_leverage`.
//! 4. Charge: turnover `sum_i |target_i - drifted_i|` times the cost rate.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::AlignedBars;
use crate::domain::{Direction, PositionSnapshot, SignalSeries, Trade};
use crate::error::BacktestError;

/// Hard ceiling on `max_leverage`, whatever the configuration says.
pub const MAX_LEVERAGE_CEILING: f64 = 10.0;

/// Tolerance for floating-point comparisons of weights.
const WEIGHT_EPSILON: f64 = 1e-12;

/// Cost and constraint settings for one strategy's simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Bars between a signal and its execution. Must be >= 1.
    pub execution_lag: usize,
    /// Cost per unit of turnover, in basis points of equity.
    pub transaction_cost_bps: f64,
    /// Maximum gross exposure (sum of absolute weights).
    pub max_leverage: f64,
    /// Weight taken on a Long (or, negated, Short) direction signal.
    pub position_size: f64,
    /// When true, weights are clamped to `[0, max_leverage]`.
    pub no_short_selling: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            execution_lag: 1,
            transaction_cost_bps: 5.0,
            max_leverage: 1.0,
            position_size: 1.0,
            no_short_selling: true,
        }
    }
}

impl SimulationConfig {
    /// Check the configuration, and that `requested_leverage` fits under it.
    pub fn validate(&self, requested_leverage: f64) -> Result<(), BacktestError> {
        let violation = |msg: String| Err(BacktestError::ConstraintViolation(msg));

        if !(self.max_leverage.is_finite() && self.max_leverage > 0.0) {
            return violation(format!(
                "max_leverage must be positive, got {}",
                self.max_leverage
            ));
        }
        if self.max_leverage > MAX_LEVERAGE_CEILING {
            return violation(format!(
                "max_leverage {} exceeds ceiling {MAX_LEVERAGE_CEILING}",
                self.max_leverage
            ));
        }
        if !requested_leverage.is_finite() || requested_leverage > self.max_leverage + WEIGHT_EPSILON
        {
            return violation(format!(
                "requested leverage {requested_leverage} exceeds max_leverage {}",
                self.max_leverage
            ));
        }
        if !(self.position_size.is_finite() && self.position_size >= 0.0) {
            return violation(format!(
                "position_size must be non-negative, got {}",
                self.position_size
            ));
        }
        if !(self.transaction_cost_bps.is_finite() && self.transaction_cost_bps >= 0.0) {
            return violation(format!(
                "transaction_cost_bps must be non-negative, got {}",
                self.transaction_cost_bps
            ));
        }
        if self.execution_lag == 0 {
            return violation(
                "execution_lag must be >= 1; same-bar execution would use the signal bar's close"
                    .into(),
            );
        }
        Ok(())
    }

    fn cost_rate(&self) -> f64 {
        self.transaction_cost_bps / 10_000.0
    }

    fn bounds(&self) -> (f64, f64) {
        let lo = if self.no_short_selling {
            0.0
        } else {
            -self.max_leverage
        };
        (lo, self.max_leverage)
    }
}

/// Output of the position simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    /// Instruments in weight-column order.
    pub instruments: Vec<String>,
    /// One snapshot per bar.
    pub positions: Vec<PositionSnapshot>,
    /// Closed trades, plus open ones marked to market on the last bar.
    pub trades: Vec<Trade>,
    /// Bar at which equity was wiped out, if it was.
    pub ruined_at: Option<usize>,
}

impl Simulation {
    pub fn total_turnover(&self) -> f64 {
        self.positions.iter().map(|p| p.turnover).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.positions.iter().map(|p| p.transaction_cost).sum()
    }
}

#[derive(Debug, Clone)]
struct OpenTrade {
    entry_bar: usize,
    entry_price: f64,
    size: f64,
}

/// Turn a signal series into positions and trades.
pub fn simulate(
    signals: &SignalSeries,
    data: &AlignedBars,
    config: &SimulationConfig,
) -> Result<Simulation, BacktestError> {
    config.validate(0.0)?;
    if signals.len() != data.len() {
        return Err(BacktestError::AlignmentError(format!(
            "{} signal rows for {} bars",
            signals.len(),
            data.len()
        )));
    }

    // Data column of each signal instrument.
    let columns: Vec<usize> = signals
        .instruments
        .iter()
        .map(|inst| {
            data.index_of(inst).ok_or_else(|| {
                BacktestError::AlignmentError(format!("no bars for signal instrument '{inst}'"))
            })
        })
        .collect::<Result<_, _>>()?;

    let k = columns.len();
    let n = data.len();
    let (lo, hi) = config.bounds();
    let lag = config.execution_lag;

    let mut weights = vec![0.0; k];
    let mut last_direction: Vec<Option<Direction>> = vec![None; k];
    let mut open: Vec<Option<OpenTrade>> = vec![None; k];
    let mut positions = Vec::with_capacity(n);
    let mut trades = Vec::new();
    let mut ruined_at = None;

    for t in 0..n {
        // 1. Drift.
        let mut drifted = weights.clone();
        if t > 0 && ruined_at.is_none() {
            let rets: Vec<f64> = columns.iter().map(|&c| data.close_return(c, t)).collect();
            let growth = 1.0 + weights.iter().zip(&rets).map(|(w, r)| w * r).sum::<f64>();
            if growth <= 0.0 {
                warn!(bar = t, date = %data.dates[t], "equity wiped out; strategy stays flat");
                ruined_at = Some(t);
                drifted = vec![0.0; k];
            } else {
                for (w, r) in drifted.iter_mut().zip(&rets) {
                    *w = *w * (1.0 + r) / growth;
                }
            }
        }

        // 2. Execute lagged signals.
        let mut target = drifted.clone();
        if ruined_at.is_none() && t >= lag {
            for (j, signal) in signals.rows[t - lag].iter().enumerate().take(k) {
                if let Some(w) = signal.target_weight {
                    target[j] = w;
                } else if last_direction[j] != Some(signal.direction) {
                    target[j] = signal.direction.sign() * config.position_size;
                }
                last_direction[j] = Some(signal.direction);
            }
        }

        // 3. Constrain.
        for w in target.iter_mut() {
            *w = w.clamp(lo, hi);
        }
        let gross: f64 = target.iter().map(|w| w.abs()).sum();
        if gross > config.max_leverage + WEIGHT_EPSILON {
            let scale = config.max_leverage / gross;
            debug!(bar = t, gross, scale, "gross exposure above max_leverage; scaling down");
            for w in target.iter_mut() {
                *w *= scale;
            }
        }

        // 4. Charge turnover.
        let turnover: f64 = target
            .iter()
            .zip(&drifted)
            .map(|(a, b)| (a - b).abs())
            .sum();
        let turnover = if turnover < WEIGHT_EPSILON { 0.0 } else { turnover };

        // Trade log: a trade opens or closes whenever the sign of a weight
        // changes. Drift never flips a sign, so the pre-drift weight is used
        // and a ruin closes whatever was open.
        for j in 0..k {
            let (before, after) = (sign(weights[j]), sign(target[j]));
            if before == after {
                continue;
            }
            let price = data.close(columns[j], t);
            if let Some(o) = open[j].take() {
                trades.push(close_trade(&signals.instruments[j], o, t, price, data, false));
            }
            if after != 0 {
                open[j] = Some(OpenTrade {
                    entry_bar: t,
                    entry_price: price,
                    size: target[j],
                });
            }
        }

        positions.push(PositionSnapshot {
            date: data.dates[t],
            weights: target.clone(),
            turnover,
            transaction_cost: turnover * config.cost_rate(),
        });
        weights = target;
    }

    if n > 0 {
        for (j, slot) in open.iter_mut().enumerate() {
            if let Some(o) = slot.take() {
                let price = data.close(columns[j], n - 1);
                trades.push(close_trade(&signals.instruments[j], o, n - 1, price, data, true));
            }
        }
    }

    debug!(
        bars = n,
        trades = trades.len(),
        turnover = positions.iter().map(|p| p.turnover).sum::<f64>(),
        "simulation complete"
    );

    Ok(Simulation {
        instruments: signals.instruments.clone(),
        positions,
        trades,
        ruined_at,
    })
}

fn sign(w: f64) -> i8 {
    if w > WEIGHT_EPSILON {
        1
    } else if w < -WEIGHT_EPSILON {
        -1
    } else {
        0
    }
}

fn close_trade(
    instrument: &str,
    open: OpenTrade,
    exit_bar: usize,
    exit_price: f64,
    data: &AlignedBars,
    mark_to_market: bool,
) -> Trade {
    Trade {
        instrument: instrument.to_string(),
        entry_bar: open.entry_bar,
        entry_date: data.dates[open.entry_bar],
        entry_price: open.entry_price,
        exit_bar,
        exit_date: data.dates[exit_bar],
        exit_price,
        size: open.size,
        mark_to_market,
    }
}
