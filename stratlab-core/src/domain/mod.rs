//! Domain types for StratLab

pub mod bar;
pub mod position;
pub mod record;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use position::{Position, PositionSnapshot};
pub use record::PerformanceRecord;
pub use signal::{Direction, Signal, SignalSeries};
pub use trade::Trade;
