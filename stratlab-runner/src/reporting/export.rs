//! Export orchestrator for artifacts and reports.

use anyhow::{Context, Result};
use std::path::Path;

use crate::harness::HarnessReport;
use crate::reporting::artifacts::{ArtifactManager, ArtifactPaths};
use crate::reporting::reports::MarkdownReportGenerator;

pub fn export_report(
    output_dir: impl AsRef<Path>,
    report: &HarnessReport,
    include_markdown: bool,
) -> Result<ArtifactPaths> {
    let manager = ArtifactManager::new(output_dir)?;
    let mut paths = manager.save_report(report)?;

    if include_markdown {
        let report_path = manager.output_dir().join("report.md");
        let markdown = MarkdownReportGenerator.generate(&report.summary);
        std::fs::write(&report_path, markdown)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
        paths.report_markdown = Some(report_path);
    }

    Ok(paths)
}
