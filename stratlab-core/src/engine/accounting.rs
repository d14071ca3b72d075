//! Performance accountant: positions and prices in, equity curve out.
//!
//! Period return over bar `t` is the previous bar's weights times each
//! instrument's close-to-close return, minus the turnover cost charged on `t`.
//! Equity compounds from `initial_equity`, which bar 0 reports exactly, and
//! is floored at zero.

use tracing::debug;

use super::simulator::Simulation;
use crate::data::AlignedBars;
use crate::domain::PerformanceRecord;
use crate::error::BacktestError;

/// Build the equity curve and Buy & Hold benchmark for a simulation.
///
/// `benchmark` names the instrument held fully invested, without costs, for
/// the comparison curve.
pub fn account(
    sim: &Simulation,
    data: &AlignedBars,
    initial_equity: f64,
    benchmark: &str,
) -> Result<Vec<PerformanceRecord>, BacktestError> {
    if !(initial_equity.is_finite() && initial_equity > 0.0) {
        return Err(BacktestError::ConstraintViolation(format!(
            "initial_equity must be positive, got {initial_equity}"
        )));
    }
    if sim.positions.len() != data.len() {
        return Err(BacktestError::AlignmentError(format!(
            "{} position rows for {} bars",
            sim.positions.len(),
            data.len()
        )));
    }
    let bench_col = data.index_of(benchmark).ok_or_else(|| {
        BacktestError::AlignmentError(format!("benchmark '{benchmark}' not in aligned data"))
    })?;
    let columns: Vec<usize> = sim
        .instruments
        .iter()
        .map(|inst| {
            data.index_of(inst).ok_or_else(|| {
                BacktestError::AlignmentError(format!("no bars for position instrument '{inst}'"))
            })
        })
        .collect::<Result<_, _>>()?;

    let mut records = Vec::with_capacity(data.len());
    let mut equity = initial_equity;
    let mut peak = initial_equity;
    let bench_base = data.close(bench_col, 0);

    for (t, snapshot) in sim.positions.iter().enumerate() {
        let period_return = if t == 0 {
            0.0
        } else {
            let held = &sim.positions[t - 1].weights;
            let gross: f64 = held
                .iter()
                .zip(&columns)
                .map(|(w, &c)| w * data.close_return(c, t))
                .sum();
            gross - snapshot.transaction_cost
        };

        if t > 0 {
            equity = (equity * (1.0 + period_return)).max(0.0);
        }
        if equity > peak {
            peak = equity;
        }
        let drawdown = if peak > 0.0 { equity / peak - 1.0 } else { 0.0 };

        records.push(PerformanceRecord {
            date: data.dates[t],
            equity,
            drawdown,
            benchmark_equity: initial_equity * data.close(bench_col, t) / bench_base,
            period_return,
            turnover: snapshot.turnover,
            transaction_cost: snapshot.transaction_cost,
            gross_exposure: snapshot.gross_exposure(),
        });
    }

    if let Some(last) = records.last() {
        debug!(
            bars = records.len(),
            final_equity = last.equity,
            benchmark_equity = last.benchmark_equity,
            "accounting complete"
        );
    }
    Ok(records)
}
