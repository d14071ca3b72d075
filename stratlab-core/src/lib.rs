//! StratLab Core: signals, position simulation and performance accounting.
//!
//! This crate is pure computation, no I/O:
//! - Domain types (bars, signals, positions, trades, performance records)
//! - Bar validation and multi-instrument alignment with gap policies
//! - Indicators (SMA, Bollinger bands)
//! - Strategy families behind one `SignalGenerator` contract
//! - Position simulator with execution lag, leverage limits and turnover costs
//! - Performance accountant with drawdown and Buy & Hold benchmark
//! - BLAKE3 run fingerprints

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod signals;

pub use engine::{run_strategy, EngineConfig, SimulationConfig, StrategyRun};
pub use error::{BacktestError, GapKind};
pub use signals::{SignalGenerator, Strategy};
