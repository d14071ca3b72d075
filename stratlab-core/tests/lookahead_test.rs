//! Look-ahead contamination tests.
//!
//! Invariant: nothing dated at bar t may depend on price data from bar t+1 or
//! later, and a signal from bar t may not touch any weight dated <= t.
//!
//! Method: run on a truncated series (bars 0..100) and the full series
//! (bars 0..200) and assert the shared prefix is identical. A second check
//! flips a single signal and verifies earlier weights do not move.

use chrono::NaiveDate;
use std::collections::HashMap;
use stratlab_core::data::{align_instruments, bars_from_closes, AlignedBars, GapPolicy};
use stratlab_core::domain::{Bar, Direction, Signal};
use stratlab_core::engine::{simulate, SimulationConfig};
use stratlab_core::indicators::{Bollinger, Indicator, Sma};
use stratlab_core::signals::{
    CrossoverStrategy, MeanReversionStrategy, RebalanceFrequency, RebalanceStrategy,
    SignalGenerator, Strategy,
};

/// Deterministic pseudo-random close series using a simple LCG.
fn make_closes(n: usize, salt: u64) -> Vec<f64> {
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64 ^ salt)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0; // -1% .. +1%
            price *= 1.0 + change * 0.02;
            price
        })
        .collect()
}

fn make_test_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    bars_from_closes("SPY", start, &make_closes(n, 7))
}

fn make_aligned(n: usize) -> AlignedBars {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut u = HashMap::new();
    u.insert("SPY".to_string(), bars_from_closes("SPY", start, &make_closes(n, 7)));
    u.insert("AGG".to_string(), bars_from_closes("AGG", start, &make_closes(n, 99)));
    align_instruments(&u, &["SPY".into(), "AGG".into()], GapPolicy::Strict).unwrap()
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated = &full_bars[..truncated_len];
    let full_result = indicator.compute(full_bars);
    let truncated_result = indicator.compute(truncated);

    assert_eq!(truncated_result.len(), truncated_len);
    assert_eq!(full_result.len(), full_bars.len());

    for i in 0..truncated_len {
        let t = truncated_result[i];
        let f = full_result[i];
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            (t - f).abs() < 1e-10,
            "{}: look-ahead contamination at bar {i}: truncated={t}, full={f}",
            indicator.name()
        );
    }
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Sma::new(5), &bars, 100);
    assert_no_lookahead(&Sma::new(20), &bars, 100);
}

#[test]
fn lookahead_bollinger() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Bollinger::upper(20, 2.0), &bars, 100);
    assert_no_lookahead(&Bollinger::middle(20, 2.0), &bars, 100);
    assert_no_lookahead(&Bollinger::lower(20, 2.0), &bars, 100);
}

fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::Crossover(CrossoverStrategy::new("SPY", 5, 20)),
        Strategy::MeanReversion(MeanReversionStrategy::new("SPY", 20, 1.5)),
        Strategy::Rebalance(RebalanceStrategy::sixty_forty(
            "SPY",
            "AGG",
            RebalanceFrequency::Monthly,
        )),
    ]
}

#[test]
fn signals_prefix_is_stable() {
    let full = make_aligned(200);
    let truncated = full.slice(0, 100);
    for strat in strategies() {
        let a = strat.generate(&truncated).unwrap();
        let b = strat.generate(&full).unwrap();
        assert_eq!(a.rows[..], b.rows[..100], "{} leaks future bars", strat.name());
    }
}

#[test]
fn positions_prefix_is_stable() {
    let full = make_aligned(200);
    let truncated = full.slice(0, 100);
    let config = SimulationConfig {
        no_short_selling: false,
        ..SimulationConfig::default()
    };
    for strat in strategies() {
        let a = simulate(&strat.generate(&truncated).unwrap(), &truncated, &config).unwrap();
        let b = simulate(&strat.generate(&full).unwrap(), &full, &config).unwrap();
        assert_eq!(a.positions[..], b.positions[..100], "{}", strat.name());
    }
}

#[test]
fn flipped_signal_never_moves_earlier_weights() {
    let data = make_aligned(120);
    let strat = Strategy::Crossover(CrossoverStrategy::new("SPY", 5, 20));
    let signals = strat.generate(&data).unwrap();
    let config = SimulationConfig {
        no_short_selling: false,
        execution_lag: 2,
        ..SimulationConfig::default()
    };
    let base = simulate(&signals, &data, &config).unwrap();

    for t in [30usize, 60, 90] {
        let mut perturbed = signals.clone();
        let current = perturbed.rows[t][0].direction;
        let flipped = if current == Direction::Long {
            Direction::Short
        } else {
            Direction::Long
        };
        perturbed.rows[t][0] = Signal::new(data.dates[t], "SPY", flipped);
        let sim = simulate(&perturbed, &data, &config).unwrap();

        // With lag 2 the earliest bar the flip can reach is t + 2.
        assert_eq!(sim.positions[..t + 2], base.positions[..t + 2]);
    }
}
