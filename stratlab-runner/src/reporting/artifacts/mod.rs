//! Artifact manager for persisting harness outputs.

mod equity;
mod summary;
mod trades;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::harness::HarnessReport;

pub use equity::write_equity_csv;
pub use summary::write_summary_json;
pub use trades::write_trades_csv;

/// Artifact paths returned after export.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPaths {
    pub report_json: PathBuf,
    /// One file per successful strategy, in harness order.
    pub equity_csv: Vec<PathBuf>,
    pub trades_csv: Vec<PathBuf>,
    pub report_markdown: Option<PathBuf>,
}

/// Manages writing all artifacts for a run.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `report.json` plus `<strategy>_equity.csv` and
    /// `<strategy>_trades.csv` for every successful strategy.
    pub fn save_report(&self, report: &HarnessReport) -> Result<ArtifactPaths> {
        let report_json = self.output_dir.join("report.json");
        write_summary_json(&report_json, &report.summary)?;

        let mut paths = ArtifactPaths {
            report_json,
            ..ArtifactPaths::default()
        };
        for named in &report.runs {
            let equity = self.output_dir.join(format!("{}_equity.csv", named.name));
            write_equity_csv(&equity, &named.run.records)?;
            paths.equity_csv.push(equity);

            let trades = self.output_dir.join(format!("{}_trades.csv", named.name));
            write_trades_csv(&trades, &named.run.trades)?;
            paths.trades_csv.push(trades);
        }

        Ok(paths)
    }
}
