//! Markdown comparison report.

use crate::harness::{ComparisonSummary, RowKind};

pub struct MarkdownReportGenerator;

impl MarkdownReportGenerator {
    pub fn generate(&self, summary: &ComparisonSummary) -> String {
        let mut report = String::from("# StratLab Comparison Report\n\n");

        if let Some(fp) = &summary.fingerprint {
            report.push_str(&format!("Run ID: `{}`\n\n", fp.short_id()));
        }
        report.push_str(&format!(
            "Window: {} to {} ({} bars)\n",
            summary.start, summary.end, summary.bars
        ));
        if summary.synthetic_data {
            report.push_str("\n> **Synthetic data.** Prices are a seeded random walk.\n");
        }

        report.push_str("\n## Summary\n\n");
        report.push_str(
            "| Strategy | Return | CAGR | Vol | Sharpe | Sortino | Calmar | Max DD | Trades | Win Rate | Turnover | Costs |\n",
        );
        report.push_str(
            "|----------|--------|------|-----|--------|---------|--------|--------|--------|----------|----------|-------|\n",
        );
        for row in &summary.rows {
            let m = &row.metrics;
            let name = match row.kind {
                RowKind::Strategy => cell(&row.name),
                RowKind::Benchmark => format!("*{}*", cell(&row.name)),
            };
            report.push_str(&format!(
                "| {} | {:+.2}% | {:+.2}% | {:.2}% | {:.2} | {:.2} | {:.2} | {:.2}% | {} | {:.1}% | {:.2} | {:.3}% |\n",
                name,
                m.total_return * 100.0,
                m.cagr * 100.0,
                m.annualized_volatility * 100.0,
                m.sharpe,
                m.sortino,
                m.calmar,
                m.max_drawdown * 100.0,
                m.trade_count,
                m.win_rate * 100.0,
                m.total_turnover,
                m.total_cost * 100.0,
            ));
        }

        if !summary.failures.is_empty() {
            report.push_str("\n## Failed Strategies\n\n");
            report.push_str("| Strategy | Error | Detail |\n");
            report.push_str("|----------|-------|--------|\n");
            for failure in &summary.failures {
                report.push_str(&format!(
                    "| {} | {} | {} |\n",
                    cell(&failure.name),
                    cell(&failure.kind),
                    cell(&failure.message)
                ));
            }
        }

        report.push_str(
            "\n## Notes\n\
- Metrics cover the window shared by every successful strategy.\n\
- Benchmark rows are Buy & Hold of the named instrument, without costs.\n",
        );

        report
    }
}

/// Table cell text: pipes escaped, line breaks flattened.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
