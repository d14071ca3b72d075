//! Error taxonomy shared by every stage of the pipeline.
//!
//! All variants are terminal for the strategy run that produced them. The
//! harness reports them per strategy and keeps evaluating siblings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What is wrong with an instrument's bar sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapKind {
    /// A bar's date is earlier than its predecessor's.
    NonMonotonic,
    /// Two bars share the same date.
    Duplicate,
    /// The instrument has no bar on a date its siblings trade.
    MissingBar,
    /// The close is NaN, infinite or non-positive.
    VoidPrice,
}

impl fmt::Display for GapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GapKind::NonMonotonic => "non-monotonic timestamps",
            GapKind::Duplicate => "duplicate timestamp",
            GapKind::MissingBar => "missing bar",
            GapKind::VoidPrice => "void price",
        };
        f.write_str(s)
    }
}

impl GapKind {
    /// Whether forward-filling can repair this gap.
    pub fn is_fillable(&self) -> bool {
        matches!(self, GapKind::MissingBar | GapKind::VoidPrice)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BacktestError {
    #[error("insufficient history for '{strategy}': need {required} bars, have {available}")]
    InsufficientHistory {
        strategy: String,
        required: usize,
        available: usize,
    },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("alignment error: {0}")]
    AlignmentError(String),

    #[error("data gap in '{instrument}' at {date}: {kind}")]
    DataGapError {
        instrument: String,
        date: String,
        kind: GapKind,
    },
}

impl BacktestError {
    /// Short machine-readable tag, used in reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BacktestError::InsufficientHistory { .. } => "insufficient_history",
            BacktestError::ConstraintViolation(_) => "constraint_violation",
            BacktestError::AlignmentError(_) => "alignment_error",
            BacktestError::DataGapError { .. } => "data_gap",
        }
    }
}
