//! Multi-instrument time alignment.
//!
//! Given validated bars for several instruments, build a common date axis over
//! the range every instrument covers. Dates outside that range are trimmed.
//! Inside it, an instrument without a bar on an axis date is a gap: fatal under
//! `GapPolicy::Strict`, filled with the previous close under `ForwardFill`.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::series::{validate_series, GapPolicy};
use crate::domain::Bar;
use crate::error::{BacktestError, GapKind};

/// Bars for several instruments on one shared, ascending date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBars {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// Instruments, in the order requested.
    pub instruments: Vec<String>,
    /// One bar vector per instrument, each the same length as `dates`.
    pub bars: Vec<Vec<Bar>>,
    /// Number of bars synthesized by forward-filling.
    pub filled_bars: usize,
}

impl AlignedBars {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Column index of an instrument.
    pub fn index_of(&self, instrument: &str) -> Option<usize> {
        self.instruments.iter().position(|i| i == instrument)
    }

    /// Bar series for one instrument.
    pub fn series(&self, instrument: &str) -> Option<&[Bar]> {
        self.index_of(instrument).map(|i| self.bars[i].as_slice())
    }

    /// Close of instrument column `col` at bar `t`.
    pub fn close(&self, col: usize, t: usize) -> f64 {
        self.bars[col][t].close
    }

    /// Close-to-close return of column `col` over bar `t`; zero at `t == 0`.
    pub fn close_return(&self, col: usize, t: usize) -> f64 {
        if t == 0 {
            return 0.0;
        }
        self.close(col, t) / self.close(col, t - 1) - 1.0
    }

    /// Restrict to a sub-range of the axis (`start..end`).
    pub fn slice(&self, start: usize, end: usize) -> AlignedBars {
        AlignedBars {
            dates: self.dates[start..end].to_vec(),
            instruments: self.instruments.clone(),
            bars: self.bars.iter().map(|b| b[start..end].to_vec()).collect(),
            filled_bars: self.filled_bars,
        }
    }
}

/// Align the named instruments from `universe` onto one date axis.
pub fn align_instruments(
    universe: &HashMap<String, Vec<Bar>>,
    instruments: &[String],
    policy: GapPolicy,
) -> Result<AlignedBars, BacktestError> {
    if instruments.is_empty() {
        return Err(BacktestError::AlignmentError(
            "no instruments requested".into(),
        ));
    }

    let mut validated = Vec::with_capacity(instruments.len());
    let mut filled_bars = 0;
    for instrument in instruments {
        let raw = universe.get(instrument).ok_or_else(|| {
            BacktestError::AlignmentError(format!("no bars loaded for '{instrument}'"))
        })?;
        let (bars, filled) = validate_series(instrument, raw, policy)?;
        if bars.is_empty() {
            return Err(BacktestError::AlignmentError(format!(
                "'{instrument}' has no bars"
            )));
        }
        filled_bars += filled;
        validated.push(bars);
    }

    // Overlapping coverage: latest first date .. earliest last date.
    let start = validated.iter().map(|b| b[0].date).max();
    let end = validated.iter().filter_map(|b| b.last()).map(|b| b.date).min();
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s <= e => (s, e),
        _ => {
            return Err(BacktestError::AlignmentError(format!(
                "instruments {instruments:?} have no overlapping date range"
            )))
        }
    };

    let dates: Vec<NaiveDate> = validated
        .iter()
        .flat_map(|bars| bars.iter().map(|b| b.date))
        .filter(|d| *d >= start && *d <= end)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut aligned = Vec::with_capacity(validated.len());
    for (instrument, bars) in instruments.iter().zip(&validated) {
        let mut column: Vec<Bar> = Vec::with_capacity(dates.len());
        let mut cursor = 0;
        let mut last: Option<&Bar> = None;
        for date in &dates {
            while cursor < bars.len() && bars[cursor].date < *date {
                last = Some(&bars[cursor]);
                cursor += 1;
            }
            if cursor < bars.len() && bars[cursor].date == *date {
                column.push(bars[cursor].clone());
                last = Some(&bars[cursor]);
                cursor += 1;
                continue;
            }
            match last {
                Some(prev) if policy.fills(GapKind::MissingBar) => {
                    column.push(Bar::carried_forward(prev, *date));
                    filled_bars += 1;
                }
                _ => {
                    return Err(BacktestError::DataGapError {
                        instrument: instrument.clone(),
                        date: date.to_string(),
                        kind: GapKind::MissingBar,
                    })
                }
            }
        }
        aligned.push(column);
    }

    debug!(
        instruments = ?instruments,
        bars = dates.len(),
        filled_bars,
        "aligned instruments"
    );

    Ok(AlignedBars {
        dates,
        instruments: instruments.to_vec(),
        bars: aligned,
        filled_bars,
    })
}

/// Inner join of several date axes: dates present in every one, ascending.
pub fn common_dates(axes: &[&[NaiveDate]]) -> Vec<NaiveDate> {
    let Some((first, rest)) = axes.split_first() else {
        return Vec::new();
    };
    let others: Vec<BTreeSet<NaiveDate>> =
        rest.iter().map(|a| a.iter().copied().collect()).collect();
    let mut out: Vec<NaiveDate> = first
        .iter()
        .copied()
        .filter(|d| others.iter().all(|s| s.contains(d)))
        .collect();
    out.sort();
    out.dedup();
    out
}
