//! Comparison summary export (JSON).

use anyhow::{Context, Result};
use std::path::Path;

use crate::harness::ComparisonSummary;

pub fn write_summary_json(path: &Path, summary: &ComparisonSummary) -> Result<()> {
    let json =
        serde_json::to_string_pretty(summary).context("Failed to serialize comparison summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
