//! Property tests for the metric functions.

use proptest::prelude::*;
use stratlab_runner::metrics::{cagr, max_drawdown, period_returns, total_return};

fn curve_from(returns: &[f64]) -> Vec<f64> {
    let mut eq = vec![100.0];
    for r in returns {
        let last = eq[eq.len() - 1];
        eq.push(last * (1.0 + r));
    }
    eq
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn drawdown_is_bounded(returns in prop::collection::vec(-0.1f64..0.1, 1..300)) {
        let dd = max_drawdown(&curve_from(&returns));
        prop_assert!(dd <= 0.0);
        prop_assert!(dd > -1.0);
    }

    #[test]
    fn total_return_matches_compounded_returns(returns in prop::collection::vec(-0.05f64..0.05, 1..200)) {
        let eq = curve_from(&returns);
        let compounded = period_returns(&eq).iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
        prop_assert!((total_return(&eq) - compounded).abs() < 1e-9);
    }

    #[test]
    fn cagr_sign_follows_total_return(returns in prop::collection::vec(-0.05f64..0.05, 2..300)) {
        let eq = curve_from(&returns);
        let tr = total_return(&eq);
        let c = cagr(&eq, 252.0);
        if tr > 1e-12 {
            prop_assert!(c > 0.0);
        } else if tr < -1e-12 {
            prop_assert!(c < 0.0);
        }
    }
}
