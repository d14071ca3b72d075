//! Market data validation and alignment.
//!
//! The core never performs I/O: bars arrive from the runner's loaders and are
//! checked here before any strategy sees them.

pub mod align;
pub mod series;

pub use align::{align_instruments, common_dates, AlignedBars};
pub use series::{check_ordering, validate_series, GapPolicy};

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::Bar;

/// Build daily bars from a close series, one per weekday starting at `start`.
///
/// Open is the previous close (or the close itself on the first bar); high
/// and low bracket open/close by 0.5%.
pub fn bars_from_closes(instrument: &str, start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    let mut date = start;
    let mut out = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date = date.succ_opt().unwrap_or(date);
        }
        let open = if i == 0 { close } else { closes[i - 1] };
        out.push(Bar {
            instrument: instrument.to_string(),
            date,
            open,
            high: open.max(close) * 1.005,
            low: open.min(close) * 0.995,
            close,
            volume: 1_000,
        });
        date = date.succ_opt().unwrap_or(date);
    }
    out
}

/// Bars on consecutive weekdays from 2024-01-02, for unit tests.
#[cfg(test)]
pub(crate) fn test_bars(instrument: &str, closes: &[f64]) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    bars_from_closes(instrument, start, closes)
}
