//! StratLab CLI: run, synth and validate commands.
//!
//! Commands:
//! - `run` executes every strategy in a TOML run file and exports the comparison
//! - `synth` writes seeded synthetic bars as CSV files
//! - `validate` parses and checks a run file without loading data

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use stratlab_core::signals::SignalGenerator;
use stratlab_runner::data_loader::{synthetic_bars, write_bars_csv};
use stratlab_runner::{
    export_report, run_config, MarkdownReportGenerator, RunFile, SyntheticSpec,
};

#[derive(Parser)]
#[command(
    name = "stratlab",
    about = "StratLab CLI: daily-bar strategy backtesting and comparison"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, debug, stratlab_core=trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every strategy in a TOML run file and compare them.
    Run {
        /// Path to the run file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for report.json and per-strategy CSVs.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Evaluate strategies one at a time instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Write synthetic bars as `<out>/<INSTRUMENT>.csv`.
    Synth {
        /// Instruments to generate, comma separated.
        #[arg(long, value_delimiter = ',', default_value = "SPY,AGG")]
        instruments: Vec<String>,

        #[arg(long, default_value_t = 504)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date (YYYY-MM-DD); weekends are skipped.
        #[arg(long, default_value = "2020-01-02")]
        start: String,

        /// Per-bar log drift.
        #[arg(long, default_value_t = 0.0)]
        drift: f64,

        /// Per-bar volatility.
        #[arg(long, default_value_t = 0.01)]
        volatility: f64,

        #[arg(long, default_value = "data")]
        out: PathBuf,
    },
    /// Parse and validate a run file.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            sequential,
        } => run_cmd(&config, &output_dir, !sequential),
        Commands::Synth {
            instruments,
            bars,
            seed,
            start,
            drift,
            volatility,
            out,
        } => {
            let start_date = NaiveDate::parse_from_str(&start, "%Y-%m-%d")
                .with_context(|| format!("invalid --start '{start}', expected YYYY-MM-DD"))?;
            let spec = SyntheticSpec {
                seed,
                bars,
                start_date,
                drift,
                volatility,
            };
            synth_cmd(&instruments, &spec, &out)
        }
        Commands::Validate { config } => validate_cmd(&config),
    }
}

fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .with_context(|| format!("invalid log filter '{filter}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_run_file(path: &Path) -> Result<(RunFile, PathBuf)> {
    let file = RunFile::from_file(path)
        .with_context(|| format!("failed to load run file {}", path.display()))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((file, base_dir))
}

fn run_cmd(config: &Path, output_dir: &Path, parallel: bool) -> Result<()> {
    let (file, base_dir) = load_run_file(config)?;
    let report = run_config(&file, &base_dir, parallel)
        .with_context(|| format!("run of {} failed", config.display()))?;

    println!("{}", MarkdownReportGenerator.generate(&report.summary));

    let paths = export_report(output_dir, &report, true)?;
    info!(
        output = %output_dir.display(),
        strategies = paths.equity_csv.len(),
        "artifacts written"
    );
    println!("Artifacts saved to: {}", output_dir.display());

    if !report.summary.failures.is_empty() {
        eprintln!(
            "WARNING: {} strategy run(s) failed; see the report",
            report.summary.failures.len()
        );
    }
    Ok(())
}

fn synth_cmd(instruments: &[String], spec: &SyntheticSpec, out: &Path) -> Result<()> {
    if instruments.is_empty() {
        anyhow::bail!("--instruments must name at least one instrument");
    }
    for instrument in instruments {
        let bars = synthetic_bars(instrument, spec);
        let path = out.join(format!("{instrument}.csv"));
        write_bars_csv(&path, &bars)
            .with_context(|| format!("failed to write synthetic bars for {instrument}"))?;
        info!(instrument = %instrument, bars = bars.len(), path = %path.display(), "wrote synthetic bars");
    }
    println!(
        "Wrote {} instrument(s) x {} bars to {}",
        instruments.len(),
        spec.bars,
        out.display()
    );
    Ok(())
}

fn validate_cmd(config: &Path) -> Result<()> {
    let (file, _) = load_run_file(config)?;
    file.validate()
        .with_context(|| format!("{} is invalid", config.display()))?;
    let hash = file.config_hash().context("failed to hash run file")?;

    println!("{} is valid", config.display());
    println!("Config hash: {}", &hash.0[..12]);
    println!("Instruments: {}", file.instruments().join(", "));
    for spec in &file.strategies {
        let sim = file.simulation_for(spec);
        println!(
            "  {:<20} {:<15} warmup {:>4} bars, lag {}, cost {} bps, max leverage {}",
            spec.name,
            spec.strategy.name(),
            spec.strategy.warmup_bars(),
            sim.execution_lag,
            sim.transaction_cost_bps,
            sim.max_leverage,
        );
    }
    Ok(())
}
