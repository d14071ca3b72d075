//! Equity curve export (CSV).

use anyhow::{Context, Result};
use std::path::Path;
use stratlab_core::domain::PerformanceRecord;

pub fn write_equity_csv(path: &Path, records: &[PerformanceRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    wtr.write_record([
        "date",
        "equity",
        "drawdown",
        "benchmark_equity",
        "period_return",
        "turnover",
        "transaction_cost",
        "gross_exposure",
    ])?;
    for rec in records {
        wtr.write_record([
            rec.date.to_string(),
            format!("{:.6}", rec.equity),
            format!("{:.6}", rec.drawdown),
            format!("{:.6}", rec.benchmark_equity),
            format!("{:.8}", rec.period_return),
            format!("{:.6}", rec.turnover),
            format!("{:.8}", rec.transaction_cost),
            format!("{:.6}", rec.gross_exposure),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to write equity CSV {}", path.display()))?;
    Ok(())
}
