//! StratLab Runner: configuration, data loading, metrics, the strategy
//! harness and reporting.
//!
//! This crate builds on `stratlab-core` to provide:
//! - TOML run files validated into core strategy and simulation types
//! - CSV and seeded synthetic bar loading with dataset fingerprints
//! - Performance metrics over equity curves and trade logs
//! - Parallel strategy evaluation with failure isolation and date alignment
//! - Markdown, JSON and CSV artifacts

pub mod config;
pub mod data_loader;
pub mod harness;
pub mod metrics;
pub mod reporting;

pub use config::{ConfigError, DataSpec, RunFile, RunSettings, StrategySpec, SyntheticSpec};
pub use data_loader::{load_data, LoadError, LoadedData};
pub use harness::{
    run_config, run_harness, ComparisonSummary, HarnessError, HarnessOptions, HarnessReport,
    NamedRun, RowKind, StrategyFailure, StrategyJob, SummaryRow,
};
pub use metrics::{MetricsConfig, PerformanceMetrics};
pub use reporting::{export_report, ArtifactPaths, MarkdownReportGenerator};
