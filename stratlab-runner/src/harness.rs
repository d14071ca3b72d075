//! Strategy harness: runs every configured strategy, isolates failures and
//! compares the survivors on a common date axis.
//!
//! Each strategy pipeline is independent, so jobs fan out over rayon and
//! results come back in job order regardless of scheduling.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use stratlab_core::data::common_dates;
use stratlab_core::domain::{Bar, Trade};
use stratlab_core::engine::{run_strategy, EngineConfig, StrategyRun};
use stratlab_core::error::BacktestError;
use stratlab_core::fingerprint::RunFingerprint;
use stratlab_core::signals::Strategy;

use crate::config::{ConfigError, RunFile};
use crate::data_loader::{load_data, LoadError};
use crate::metrics::{MetricsConfig, PerformanceMetrics};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error("failed to fingerprint configuration: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// One strategy to evaluate.
#[derive(Debug, Clone)]
pub struct StrategyJob {
    pub name: String,
    pub strategy: Strategy,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct HarnessOptions {
    pub parallel: bool,
    pub metrics: MetricsConfig,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Strategy,
    Benchmark,
}

/// One line of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub name: String,
    pub kind: RowKind,
    pub metrics: PerformanceMetrics,
}

/// A strategy that did not produce results, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub name: String,
    /// Stable error category, e.g. `insufficient_history`.
    pub kind: String,
    pub message: String,
}

/// The serializable comparison report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub fingerprint: Option<RunFingerprint>,
    pub synthetic_data: bool,
    /// First and last date of the common axis.
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars: usize,
    pub rows: Vec<SummaryRow>,
    pub failures: Vec<StrategyFailure>,
}

impl ComparisonSummary {
    pub fn row(&self, name: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

/// A successful strategy run under its configured name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRun {
    pub name: String,
    pub run: StrategyRun,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessReport {
    pub summary: ComparisonSummary,
    /// Full per-strategy output, in job order. Records cover each strategy's
    /// own aligned range, not just the common axis.
    pub runs: Vec<NamedRun>,
}

/// Name of the Buy & Hold row for a benchmark instrument.
pub fn benchmark_row_name(instrument: &str) -> String {
    format!("buy_hold_{instrument}")
}

/// Run every job and compare the ones that succeed.
///
/// Fails with `AlignmentError` if no job succeeded or the successful runs
/// share no date.
pub fn run_harness(
    jobs: &[StrategyJob],
    universe: &HashMap<String, Vec<Bar>>,
    opts: &HarnessOptions,
) -> Result<HarnessReport, BacktestError> {
    info!(strategies = jobs.len(), parallel = opts.parallel, "running strategies");

    let run_one = |job: &StrategyJob| run_strategy(&job.strategy, universe, &job.engine);
    let outcomes: Vec<Result<StrategyRun, BacktestError>> = if opts.parallel {
        jobs.par_iter().map(run_one).collect()
    } else {
        jobs.iter().map(run_one).collect()
    };

    let mut runs = Vec::new();
    let mut failures = Vec::new();
    for (job, outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            Ok(run) => runs.push(NamedRun {
                name: job.name.clone(),
                run,
            }),
            Err(e) => {
                warn!(strategy = %job.name, kind = e.kind(), error = %e, "strategy failed");
                failures.push(StrategyFailure {
                    name: job.name.clone(),
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    if runs.is_empty() {
        return Err(BacktestError::AlignmentError(format!(
            "no strategy succeeded ({} failed)",
            failures.len()
        )));
    }

    let axes: Vec<Vec<NaiveDate>> = runs
        .iter()
        .map(|r| r.run.records.iter().map(|rec| rec.date).collect())
        .collect();
    let axis_refs: Vec<&[NaiveDate]> = axes.iter().map(Vec::as_slice).collect();
    let dates = common_dates(&axis_refs);
    let (Some(&start), Some(&end)) = (dates.first(), dates.last()) else {
        return Err(BacktestError::AlignmentError(
            "successful strategies share no common date".into(),
        ));
    };
    let common: BTreeSet<NaiveDate> = dates.iter().copied().collect();

    let mut rows = Vec::with_capacity(runs.len() * 2);
    let mut benchmarks: Vec<&str> = Vec::new();
    for named in &runs {
        let on_axis = named.run.records.iter().filter(|r| common.contains(&r.date));
        let equity: Vec<f64> = on_axis.clone().map(|r| r.equity).collect();
        // Trades are credited to the window they close in.
        let trades: Vec<Trade> = named
            .run
            .trades
            .iter()
            .filter(|t| (start..=end).contains(&t.exit_date))
            .cloned()
            .collect();
        let metrics = PerformanceMetrics::compute(
            &equity,
            &trades,
            on_axis.clone().map(|r| r.turnover).sum(),
            on_axis.clone().map(|r| r.transaction_cost).sum(),
            &opts.metrics,
        );
        rows.push(SummaryRow {
            name: named.name.clone(),
            kind: RowKind::Strategy,
            metrics,
        });

        if !benchmarks.contains(&named.run.benchmark.as_str()) {
            benchmarks.push(&named.run.benchmark);
            let curve: Vec<f64> = on_axis.map(|r| r.benchmark_equity).collect();
            rows.push(SummaryRow {
                name: benchmark_row_name(&named.run.benchmark),
                kind: RowKind::Benchmark,
                metrics: PerformanceMetrics::benchmark(&curve, &opts.metrics),
            });
        }
    }

    info!(
        succeeded = runs.len(),
        failed = failures.len(),
        bars = dates.len(),
        start = %start,
        end = %end,
        "comparison complete"
    );

    Ok(HarnessReport {
        summary: ComparisonSummary {
            fingerprint: None,
            synthetic_data: false,
            start,
            end,
            bars: dates.len(),
            rows,
            failures,
        },
        runs,
    })
}

/// Build the jobs a run file describes, in file order.
pub fn jobs_from_config(file: &RunFile) -> Vec<StrategyJob> {
    file.strategies
        .iter()
        .map(|spec| StrategyJob {
            name: spec.name.clone(),
            strategy: spec.strategy.clone(),
            engine: file.engine_config(spec),
        })
        .collect()
}

/// Validate a run file, load its data and run the harness.
///
/// `base_dir` anchors relative data paths, normally the config file's directory.
pub fn run_config(
    file: &RunFile,
    base_dir: &Path,
    parallel: bool,
) -> Result<HarnessReport, HarnessError> {
    file.validate()?;
    let loaded = load_data(&file.data, &file.instruments(), base_dir)?;
    let opts = HarnessOptions {
        parallel,
        metrics: MetricsConfig {
            periods_per_year: file.run.periods_per_year,
            risk_free_rate: file.run.risk_free_rate,
        },
    };

    let mut report = run_harness(&jobs_from_config(file), &loaded.bars, &opts)?;
    let fingerprint = RunFingerprint::new(file.config_hash()?, loaded.dataset_hash);
    info!(run_id = fingerprint.short_id(), "run fingerprinted");
    report.summary.fingerprint = Some(fingerprint);
    report.summary.synthetic_data = loaded.synthetic;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratlab_core::data::bars_from_closes;
    use stratlab_core::signals::{
        CrossoverStrategy, MeanReversionStrategy, RebalanceFrequency, RebalanceStrategy,
    };

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn universe() -> HashMap<String, Vec<Bar>> {
        let spy: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.2).sin() * 8.0).collect();
        let agg: Vec<f64> = (0..120).map(|i| 50.0 + i as f64 * 0.02).collect();
        let mut u = HashMap::new();
        u.insert("SPY".to_string(), bars_from_closes("SPY", start(), &spy));
        u.insert("AGG".to_string(), bars_from_closes("AGG", start(), &agg));
        u
    }

    fn job(name: &str, strategy: Strategy) -> StrategyJob {
        StrategyJob {
            name: name.into(),
            strategy,
            engine: EngineConfig::default(),
        }
    }

    fn jobs() -> Vec<StrategyJob> {
        vec![
            job(
                "sma",
                Strategy::Crossover(CrossoverStrategy::new("SPY", 5, 20)),
            ),
            job(
                "bollinger",
                Strategy::MeanReversion(MeanReversionStrategy::new("SPY", 20, 2.0)),
            ),
            job(
                "sixty_forty",
                Strategy::Rebalance(RebalanceStrategy::sixty_forty(
                    "SPY",
                    "AGG",
                    RebalanceFrequency::Monthly,
                )),
            ),
        ]
    }

    #[test]
    fn rows_follow_job_order_with_one_benchmark_per_instrument() {
        let report = run_harness(&jobs(), &universe(), &HarnessOptions::default()).unwrap();
        let names: Vec<&str> = report.summary.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["sma", "buy_hold_SPY", "bollinger", "sixty_forty"]);
        assert_eq!(report.summary.bars, 120);
        assert!(report.summary.failures.is_empty());
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let par = run_harness(&jobs(), &universe(), &HarnessOptions::default()).unwrap();
        let seq = run_harness(
            &jobs(),
            &universe(),
            &HarnessOptions {
                parallel: false,
                ..HarnessOptions::default()
            },
        )
        .unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn failing_strategy_is_isolated() {
        let mut all = jobs();
        all.insert(
            1,
            job(
                "too_slow",
                Strategy::Crossover(CrossoverStrategy::new("SPY", 50, 500)),
            ),
        );
        let report = run_harness(&all, &universe(), &HarnessOptions::default()).unwrap();
        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.summary.failures.len(), 1);
        assert_eq!(report.summary.failures[0].name, "too_slow");
        assert_eq!(report.summary.failures[0].kind, "insufficient_history");
    }

    #[test]
    fn all_failing_is_alignment_error() {
        let bad = vec![job(
            "missing",
            Strategy::Crossover(CrossoverStrategy::new("QQQ", 5, 20)),
        )];
        let err = run_harness(&bad, &universe(), &HarnessOptions::default()).unwrap_err();
        assert!(matches!(err, BacktestError::AlignmentError(_)));
    }

    #[test]
    fn disjoint_ranges_are_alignment_error() {
        let mut u = universe();
        let later = start() + chrono::Duration::days(400);
        u.insert(
            "QQQ".to_string(),
            bars_from_closes("QQQ", later, &vec![100.0; 60]),
        );
        let two = vec![
            job("spy", Strategy::Crossover(CrossoverStrategy::new("SPY", 5, 20))),
            job("qqq", Strategy::Crossover(CrossoverStrategy::new("QQQ", 5, 20))),
        ];
        let err = run_harness(&two, &u, &HarnessOptions::default()).unwrap_err();
        assert!(matches!(err, BacktestError::AlignmentError(_)));
    }

    #[test]
    fn overlapping_ranges_use_common_window() {
        let mut u = universe();
        let spy = u["SPY"].clone();
        let qqq: Vec<Bar> = spy[40..]
            .iter()
            .map(|b| Bar {
                instrument: "QQQ".into(),
                ..b.clone()
            })
            .collect();
        u.insert("QQQ".to_string(), qqq);
        let two = vec![
            job("spy", Strategy::Crossover(CrossoverStrategy::new("SPY", 5, 20))),
            job("qqq", Strategy::Crossover(CrossoverStrategy::new("QQQ", 5, 20))),
        ];
        let report = run_harness(&two, &u, &HarnessOptions::default()).unwrap();
        assert_eq!(report.summary.bars, 80);
        assert_eq!(report.summary.start, spy[40].date);
        // Full records are kept per strategy.
        assert_eq!(report.runs[0].run.records.len(), 120);

        // Trade and cost stats only count the common window.
        let run = &report.runs[0].run;
        let row = report.summary.row("spy").unwrap();
        let in_window = run
            .trades
            .iter()
            .filter(|t| t.exit_date >= spy[40].date)
            .count();
        assert_eq!(row.metrics.trade_count, in_window);
        let window_cost: f64 = run.records[40..].iter().map(|r| r.transaction_cost).sum();
        let window_turnover: f64 = run.records[40..].iter().map(|r| r.turnover).sum();
        assert!((row.metrics.total_cost - window_cost).abs() < 1e-15);
        assert!((row.metrics.total_turnover - window_turnover).abs() < 1e-12);
        assert!(row.metrics.total_turnover <= run.total_turnover());
    }
}
