//! Trade log export (CSV).

use anyhow::{Context, Result};
use std::path::Path;
use stratlab_core::domain::Trade;

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;
    wtr.write_record([
        "instrument",
        "direction",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "size",
        "bars_held",
        "return_pct",
        "mark_to_market",
    ])?;

    for trade in trades {
        let direction = if trade.is_long() { "long" } else { "short" };
        wtr.write_record([
            trade.instrument.clone(),
            direction.to_string(),
            trade.entry_date.to_string(),
            format!("{:.4}", trade.entry_price),
            trade.exit_date.to_string(),
            format!("{:.4}", trade.exit_price),
            format!("{:.4}", trade.size),
            trade.bars_held().to_string(),
            format!("{:.6}", trade.return_pct()),
            trade.mark_to_market.to_string(),
        ])?;
    }

    wtr.flush()
        .with_context(|| format!("Failed to write trades CSV {}", path.display()))?;
    Ok(())
}
