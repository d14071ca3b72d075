//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV files, one per instrument: `<dir>/<INSTRUMENT>.csv` with header
//!    `date,open,high,low,close,volume`. Empty price fields load as NaN so the
//!    core's gap policy decides what happens to them.
//! 2. A seeded synthetic random walk, for demos and tests. Synthetic data is
//!    tagged so reports can say so.
//!
//! Loading never validates ordering or gaps; that is the core's job.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use stratlab_core::domain::Bar;
use stratlab_core::fingerprint::DatasetHash;

use crate::config::{DataSpec, SyntheticSpec};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data file for '{instrument}' at {}", path.display())]
    MissingFile { instrument: String, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: row {row}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bars for every requested instrument, plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: HashMap<String, Vec<Bar>>,
    /// BLAKE3 over all bar data, for run fingerprints.
    pub dataset_hash: DatasetHash,
    pub synthetic: bool,
}

/// Load `instruments` from the configured source.
///
/// A relative CSV directory resolves against `base_dir` (the config file's
/// directory).
pub fn load_data(
    spec: &DataSpec,
    instruments: &[String],
    base_dir: &Path,
) -> Result<LoadedData, LoadError> {
    let (bars, synthetic) = match spec {
        DataSpec::Csv { dir } => {
            let dir = if dir.is_absolute() {
                dir.clone()
            } else {
                base_dir.join(dir)
            };
            (load_csv_dir(&dir, instruments)?, false)
        }
        DataSpec::Synthetic(opts) => {
            warn!(
                seed = opts.seed,
                "generating synthetic data; results are not from market prices"
            );
            (generate_synthetic(instruments, opts), true)
        }
    };
    let dataset_hash = DatasetHash::of_universe(&bars);
    info!(
        instruments = bars.len(),
        synthetic,
        dataset = %dataset_hash,
        "data loaded"
    );
    Ok(LoadedData {
        bars,
        dataset_hash,
        synthetic,
    })
}

/// Load `<dir>/<INSTRUMENT>.csv` for each instrument.
pub fn load_csv_dir(
    dir: &Path,
    instruments: &[String],
) -> Result<HashMap<String, Vec<Bar>>, LoadError> {
    let mut out = HashMap::with_capacity(instruments.len());
    for instrument in instruments {
        let path = dir.join(format!("{instrument}.csv"));
        if !path.is_file() {
            return Err(LoadError::MissingFile {
                instrument: instrument.clone(),
                path,
            });
        }
        let bars = read_bars_csv(&path, instrument)?;
        debug!(instrument = %instrument, bars = bars.len(), path = %path.display(), "read csv");
        out.insert(instrument.clone(), bars);
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

/// Read one instrument's bars from a CSV file, in file order.
pub fn read_bars_csv(path: &Path, instrument: &str) -> Result<Vec<Bar>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(csv_err)?;
        // Header is line 1.
        let line = i + 2;
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
            LoadError::Malformed {
                path: path.to_path_buf(),
                row: line,
                reason: format!("bad date '{}': {e}", row.date),
            }
        })?;
        let volume = row.volume.unwrap_or(0.0);
        if !(volume.is_finite() && volume >= 0.0) {
            return Err(LoadError::Malformed {
                path: path.to_path_buf(),
                row: line,
                reason: format!("bad volume {volume}"),
            });
        }
        let close = row.close.unwrap_or(f64::NAN);
        bars.push(Bar {
            instrument: instrument.to_string(),
            date,
            open: row.open.unwrap_or(close),
            high: row.high.unwrap_or(close),
            low: row.low.unwrap_or(close),
            close,
            volume: volume.round() as u64,
        });
    }
    Ok(bars)
}

/// Write bars as CSV in the format `read_bars_csv` reads.
pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LoadError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(["date", "open", "high", "low", "close", "volume"])
        .map_err(csv_err)?;
    for bar in bars {
        wtr.write_record([
            bar.date.to_string(),
            format!("{:.6}", bar.open),
            format!("{:.6}", bar.high),
            format!("{:.6}", bar.low),
            format!("{:.6}", bar.close),
            bar.volume.to_string(),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Synthetic bars for every instrument, each from its own seeded stream.
pub fn generate_synthetic(instruments: &[String], opts: &SyntheticSpec) -> HashMap<String, Vec<Bar>> {
    instruments
        .iter()
        .map(|inst| (inst.clone(), synthetic_bars(inst, opts)))
        .collect()
}

/// Geometric random walk from 100.0 on weekdays starting at `opts.start_date`.
///
/// The stream is seeded from BLAKE3(seed, instrument), so instruments differ
/// from each other but are reproducible for a given seed.
pub fn synthetic_bars(instrument: &str, opts: &SyntheticSpec) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut hasher = blake3::Hasher::new();
    hasher.update(&opts.seed.to_le_bytes());
    hasher.update(instrument.as_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let mut bars = Vec::with_capacity(opts.bars);
    let mut price = 100.0_f64;
    let mut date = opts.start_date;

    while bars.len() < opts.bars {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date = date.succ_opt().unwrap_or(date);
            continue;
        }

        // Box-Muller: one standard normal draw per bar.
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        let log_return = opts.drift - 0.5 * opts.volatility.powi(2) + opts.volatility * z;

        let open = price;
        let close = price * log_return.exp();
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            instrument: instrument.to_string(),
            date,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn spec(bars: usize) -> SyntheticSpec {
        SyntheticSpec {
            bars,
            ..SyntheticSpec::default()
        }
    }

    #[test]
    fn synthetic_is_reproducible_and_per_instrument() {
        let a = synthetic_bars("SPY", &spec(100));
        let b = synthetic_bars("SPY", &spec(100));
        let c = synthetic_bars("AGG", &spec(100));
        assert_eq!(a, b);
        assert_ne!(a[50].close, c[50].close);
        assert_eq!(a.len(), 100);
        assert!(a.iter().all(|bar| bar.is_sane()));
        assert!(a
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn different_seed_different_walk() {
        let a = synthetic_bars("SPY", &spec(50));
        let b = synthetic_bars(
            "SPY",
            &SyntheticSpec {
                seed: 1,
                ..spec(50)
            },
        );
        assert_ne!(a, b);
    }

    #[test]
    fn csv_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let bars = synthetic_bars("SPY", &spec(20));
        write_bars_csv(&dir.path().join("SPY.csv"), &bars).unwrap();

        let loaded = load_csv_dir(dir.path(), &["SPY".to_string()]).unwrap();
        let spy = &loaded["SPY"];
        assert_eq!(spy.len(), 20);
        assert_eq!(spy[0].date, bars[0].date);
        assert!((spy[19].close - bars[19].close).abs() < 1e-6);
    }

    #[test]
    fn empty_close_loads_as_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SPY.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "date,open,high,low,close,volume").unwrap();
        writeln!(f, "2024-01-02,100,101,99,100.5,1000").unwrap();
        writeln!(f, "2024-01-03,,,,,").unwrap();
        drop(f);

        let bars = read_bars_csv(&path, "SPY").unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[1].is_void());
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn bad_date_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SPY.csv");
        std::fs::write(&path, "date,open,high,low,close,volume\n01/02/2024,1,1,1,1,1\n").unwrap();
        let err = read_bars_csv(&path, "SPY").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { row: 2, .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_csv_dir(dir.path(), &["QQQ".to_string()]).unwrap_err();
        assert!(err.to_string().contains("QQQ"));
    }

    #[test]
    fn load_data_tags_synthetic() {
        let loaded = load_data(
            &DataSpec::Synthetic(spec(30)),
            &["SPY".to_string(), "AGG".to_string()],
            Path::new("."),
        )
        .unwrap();
        assert!(loaded.synthetic);
        assert_eq!(loaded.bars.len(), 2);
        assert_eq!(loaded.dataset_hash.0.len(), 64);
    }
}
