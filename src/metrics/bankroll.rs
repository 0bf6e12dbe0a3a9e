//! Bankroll management metrics
//!
//! Bankroll growth, units, Kelly sizing and expected value per bet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::settled_chronological;
use crate::core::kelly::{expected_value, KellyCalculator};
use crate::core::stats::mean;
use crate::models::Bet;

/// Bankroll after a settlement; the seed point has no date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: Option<DateTime<Utc>>,
    pub bankroll: f64,
}

/// Bankroll metrics (growth, Kelly, break-even and flat ROI as 0-1 ratios)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankrollMetrics {
    pub current_bankroll: f64,
    pub bankroll_growth: f64,
    pub units_won: f64,
    /// Mean clamped Kelly fraction
    pub kelly_average: f64,
    pub break_even_winrate: f64,
    pub ev_per_bet: f64,
    pub roi_if_flat: f64,
    pub equity_curve: Vec<EquityPoint>,
}

impl BankrollMetrics {
    /// Zero record with a single seed point at the initial bankroll
    pub fn empty(initial_bankroll: f64) -> Self {
        Self {
            current_bankroll: initial_bankroll,
            bankroll_growth: 0.0,
            units_won: 0.0,
            kelly_average: 0.0,
            break_even_winrate: 0.0,
            ev_per_bet: 0.0,
            roi_if_flat: 0.0,
            equity_curve: vec![EquityPoint {
                date: None,
                bankroll: initial_bankroll,
            }],
        }
    }
}

/// Calculate bankroll metrics
///
/// # Arguments
/// * `bets` - Bet snapshot
/// * `initial_bankroll` - Starting bankroll in currency units
/// * `kelly` - Kelly sizing (cap and fractional multiplier)
pub fn calculate(bets: &[Bet], initial_bankroll: f64, kelly: &KellyCalculator) -> BankrollMetrics {
    let ordered = settled_chronological(bets);
    if ordered.is_empty() {
        return BankrollMetrics::empty(initial_bankroll);
    }

    let total_profit: f64 = ordered.iter().map(|b| b.profit_or_zero()).sum();
    let total_stake: f64 = ordered.iter().map(|b| b.stake).sum();
    let current_bankroll = initial_bankroll + total_profit;

    let bankroll_growth = if initial_bankroll > 0.0 {
        (current_bankroll - initial_bankroll) / initial_bankroll
    } else {
        0.0
    };

    let stakes: Vec<f64> = ordered.iter().map(|b| b.stake).collect();
    let avg_stake = mean(&stakes);
    let units_won = if avg_stake > 0.0 {
        total_profit / avg_stake
    } else {
        0.0
    };

    let sizing: Vec<(f64, f64)> = ordered
        .iter()
        .map(|b| (b.model_probability, b.odds))
        .collect();
    let kelly_average = kelly.average_fraction(&sizing);
    let skipped = sizing.iter().filter(|(_, odds)| *odds <= 1.0).count();
    if skipped > 0 {
        debug!(skipped, "bets with odds <= 1 excluded from Kelly average");
    }

    let odds: Vec<f64> = ordered.iter().map(|b| b.odds).collect();
    let avg_odds = mean(&odds);
    let break_even_winrate = if avg_odds > 0.0 { 1.0 / avg_odds } else { 0.0 };

    let evs: Vec<f64> = ordered
        .iter()
        .map(|b| expected_value(b.model_probability, b.odds, b.stake))
        .collect();

    let roi_if_flat = if total_stake > 0.0 {
        total_profit / total_stake
    } else {
        0.0
    };

    let mut equity_curve = Vec::with_capacity(ordered.len() + 1);
    let mut running = initial_bankroll;
    equity_curve.push(EquityPoint {
        date: None,
        bankroll: running,
    });
    for bet in &ordered {
        running += bet.profit_or_zero();
        equity_curve.push(EquityPoint {
            date: bet.settled_at,
            bankroll: running,
        });
    }

    debug!(settled = ordered.len(), current_bankroll, "bankroll metrics");

    BankrollMetrics {
        current_bankroll,
        bankroll_growth,
        units_won,
        kelly_average,
        break_even_winrate,
        ev_per_bet: mean(&evs),
        roi_if_flat,
        equity_curve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kelly::KELLY_CAP;
    use crate::metrics::fixtures::{day, evens};

    #[test]
    fn test_bankroll_empty() {
        let metrics = calculate(&[], 1000.0, &KellyCalculator::default());
        assert_eq!(metrics, BankrollMetrics::empty(1000.0));
        assert_eq!(metrics.equity_curve.len(), 1);
        assert!(metrics.equity_curve[0].date.is_none());
    }

    #[test]
    fn test_bankroll_growth_and_units() {
        let bets = evens(&[true, false, true]);
        let metrics = calculate(&bets, 1000.0, &KellyCalculator::default());
        assert!((metrics.current_bankroll - 1010.0).abs() < 1e-9);
        assert!((metrics.bankroll_growth - 0.01).abs() < 1e-9);
        assert!((metrics.units_won - 1.0).abs() < 1e-9);
        assert!((metrics.break_even_winrate - 0.5).abs() < 1e-9);
        assert!((metrics.roi_if_flat - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_equity_curve_follows_settlements() {
        let bets = evens(&[true, false, true]);
        let metrics = calculate(&bets, 1000.0, &KellyCalculator::default());
        assert_eq!(metrics.equity_curve.len(), bets.len() + 1);
        let values: Vec<f64> = metrics.equity_curve.iter().map(|p| p.bankroll).collect();
        assert_eq!(values, vec![1000.0, 1010.0, 1000.0, 1010.0]);
        assert_eq!(metrics.equity_curve[1].date, Some(day(0)));
    }

    #[test]
    fn test_kelly_average_clamped() {
        // p = 0.6 at evens -> raw 0.2, clamped 0.10
        let bets = vec![Bet::new(1, 2.0, 10.0, 0.6).settle(true, day(0))];
        let metrics = calculate(&bets, 1000.0, &KellyCalculator::default());
        assert!((metrics.kelly_average - KELLY_CAP).abs() < 1e-12);
        assert!(metrics.kelly_average >= 0.0 && metrics.kelly_average <= KELLY_CAP);

        let quarter = calculate(&bets, 1000.0, &KellyCalculator::new(0.25, KELLY_CAP));
        assert!((quarter.kelly_average - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_ev_per_bet() {
        // 0.55 * 10 - 0.45 * 10 = 1.0 per bet at evens
        let metrics = calculate(&evens(&[true, false]), 1000.0, &KellyCalculator::default());
        assert!((metrics.ev_per_bet - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_roi_if_flat_order_invariant() {
        let bets = evens(&[true, false, false, true, true]);
        let mut reversed = bets.clone();
        reversed.reverse();
        let a = calculate(&bets, 1000.0, &KellyCalculator::default());
        let b = calculate(&reversed, 1000.0, &KellyCalculator::default());
        assert_eq!(a.roi_if_flat, b.roi_if_flat);
    }
}
