//! Per-instrument bar validation.
//!
//! Input bars must be strictly time-ascending with no duplicate dates. Ordering
//! defects are always fatal; void prices may be forward-filled when the gap
//! policy allows it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Bar;
use crate::error::{BacktestError, GapKind};

/// How recoverable data gaps (missing bars, void prices) are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Any gap fails the run.
    #[default]
    Strict,
    /// Carry the previous close forward over missing or void bars.
    ForwardFill,
}

impl GapPolicy {
    /// Whether this policy repairs a gap of `kind` instead of failing.
    pub fn fills(self, kind: GapKind) -> bool {
        self == GapPolicy::ForwardFill && kind.is_fillable()
    }
}

/// Check ordering and void prices for one instrument's bars.
///
/// Returns the (possibly repaired) bars and how many were forward-filled.
pub fn validate_series(
    instrument: &str,
    bars: &[Bar],
    policy: GapPolicy,
) -> Result<(Vec<Bar>, usize), BacktestError> {
    check_ordering(instrument, bars)?;

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    let mut filled = 0;
    let mut malformed = 0;
    for bar in bars {
        if !bar.is_void() {
            if !bar.is_sane() {
                malformed += 1;
            }
            out.push(bar.clone());
            continue;
        }
        match out.last() {
            Some(prev) if policy.fills(GapKind::VoidPrice) => {
                out.push(Bar::carried_forward(prev, bar.date));
                filled += 1;
            }
            // A void first bar has nothing to carry forward.
            _ => return Err(gap(instrument, bar, GapKind::VoidPrice)),
        }
    }

    if filled > 0 {
        debug!(instrument, filled, "forward-filled void bars");
    }
    // Only the close drives returns, so inconsistent OHLC is reported, not fatal.
    if malformed > 0 {
        warn!(instrument, malformed, "bars with inconsistent OHLC ranges");
    }
    Ok((out, filled))
}

/// Fail on the first non-ascending or repeated date.
pub fn check_ordering(instrument: &str, bars: &[Bar]) -> Result<(), BacktestError> {
    for pair in bars.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.date == prev.date {
            return Err(gap(instrument, cur, GapKind::Duplicate));
        }
        if cur.date < prev.date {
            return Err(gap(instrument, cur, GapKind::NonMonotonic));
        }
    }
    Ok(())
}

fn gap(instrument: &str, bar: &Bar, kind: GapKind) -> BacktestError {
    BacktestError::DataGapError {
        instrument: instrument.to_string(),
        date: bar.date.to_string(),
        kind,
    }
}
