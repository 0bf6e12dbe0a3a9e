//! Risk metrics
//!
//! Sharpe/Sortino, drawdown, Calmar, volatility and tail risk computed over
//! settled bets in settlement order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{settled_chronological, TRADING_DAYS};
use crate::core::stats::{mean, percentile, std_dev};
use crate::models::Bet;

/// Risk-adjusted performance
///
/// `max_drawdown`, `volatility`, `var_95` and `cvar_95` are 0-1 ratios.
/// `recovery_factor` and `calmar_ratio` divide by the drawdown in
/// percentage points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Whole days of the longest drawdown episode
    pub max_drawdown_duration: i64,
    pub recovery_factor: f64,
    pub calmar_ratio: f64,
    pub volatility: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    /// Cumulative profit, leading 0 then one point per settled bet
    pub equity_curve: Vec<f64>,
}

impl Default for RiskMetrics {
    fn default() -> Self {
        Self {
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            max_drawdown: 0.0,
            max_drawdown_duration: 0,
            recovery_factor: 0.0,
            calmar_ratio: 0.0,
            volatility: 0.0,
            var_95: 0.0,
            cvar_95: 0.0,
            equity_curve: vec![0.0],
        }
    }
}

/// Calculate risk metrics
///
/// # Arguments
/// * `bets` - Bet snapshot (any order; only settled bets with a timestamp are used)
/// * `risk_free_rate` - Annual risk-free rate, de-annualized over 252 trading days
pub fn calculate(bets: &[Bet], risk_free_rate: f64) -> RiskMetrics {
    let ordered = settled_chronological(bets);
    if ordered.is_empty() {
        return RiskMetrics::default();
    }

    let returns: Vec<f64> = ordered.iter().map(|b| b.unit_return()).collect();

    let mut equity_curve = Vec::with_capacity(ordered.len() + 1);
    let mut cumulative = 0.0;
    equity_curve.push(cumulative);
    for bet in &ordered {
        cumulative += bet.profit_or_zero();
        equity_curve.push(cumulative);
    }

    // Sharpe / Sortino
    let daily_rf = risk_free_rate / TRADING_DAYS;
    let mean_excess = mean(&returns) - daily_rf;
    let std_return = std_dev(&returns);
    let annualizer = TRADING_DAYS.sqrt();

    let sharpe_ratio = if std_return > 0.0 {
        mean_excess / std_return * annualizer
    } else {
        0.0
    };

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_std = std_dev(&downside);
    let sortino_ratio = if downside_std > 0.0 {
        mean_excess / downside_std * annualizer
    } else {
        0.0
    };

    // Drawdown
    let timestamps: Vec<DateTime<Utc>> = ordered.iter().filter_map(|b| b.settled_at).collect();
    let (max_drawdown, max_drawdown_duration) = calculate_max_drawdown(&equity_curve, &timestamps);
    let drawdown_points = max_drawdown.abs() * 100.0;

    let total_profit = cumulative;
    let recovery_factor = if max_drawdown < 0.0 {
        total_profit / drawdown_points
    } else {
        0.0
    };

    // Calmar
    let total_stake: f64 = ordered.iter().map(|b| b.stake).sum();
    let roi = if total_stake > 0.0 {
        total_profit / total_stake
    } else {
        0.0
    };
    let days = match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) => (*last - *first).num_days(),
        _ => 0,
    };
    let annualized_roi = if days > 0 {
        roi * 365.0 / days as f64
    } else {
        roi
    };
    let calmar_ratio = if max_drawdown < 0.0 {
        annualized_roi / drawdown_points
    } else {
        0.0
    };

    // Tail risk
    let var_95 = percentile(&returns, 5.0);
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var_95).collect();
    let cvar_95 = if tail.is_empty() { var_95 } else { mean(&tail) };

    debug!(settled = ordered.len(), max_drawdown, days, "risk metrics");

    RiskMetrics {
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        max_drawdown_duration,
        recovery_factor,
        calmar_ratio,
        volatility: std_return * annualizer,
        var_95,
        cvar_95,
        equity_curve,
    }
}

/// Maximum drawdown ratio and longest drawdown episode in days
///
/// `equity[i]` for `i >= 1` was reached at `timestamps[i - 1]`. An episode
/// runs while equity sits strictly below a positive running peak and ends
/// once equity gets back to the peak.
fn calculate_max_drawdown(equity: &[f64], timestamps: &[DateTime<Utc>]) -> (f64, i64) {
    if equity.len() < 2 {
        return (0.0, 0);
    }

    let mut peak = equity[0];
    let mut max_drawdown = 0.0_f64;
    let mut max_duration = 0_i64;
    let mut episode_start: Option<DateTime<Utc>> = None;

    for (i, &value) in equity.iter().enumerate().skip(1) {
        let at = timestamps.get(i - 1).copied();

        if value >= peak {
            peak = value;
            episode_start = None;
            continue;
        }

        if peak > 0.0 {
            let drawdown = (value - peak) / peak.abs();
            max_drawdown = max_drawdown.min(drawdown);

            if let Some(at) = at {
                let start = *episode_start.get_or_insert(at);
                max_duration = max_duration.max((at - start).num_days());
            }
        }
    }

    (max_drawdown, max_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::{day, evens};

    #[test]
    fn test_risk_empty() {
        let metrics = calculate(&[], 0.0);
        assert_eq!(metrics, RiskMetrics::default());
        assert_eq!(metrics.equity_curve, vec![0.0]);
    }

    #[test]
    fn test_equity_curve_length() {
        let bets = evens(&[true, false, true, true]);
        let metrics = calculate(&bets, 0.0);
        assert_eq!(metrics.equity_curve.len(), bets.len() + 1);
        assert_eq!(metrics.equity_curve, vec![0.0, 10.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_sharpe_and_volatility() {
        // returns [1, -1, 1]: mean 1/3, population std sqrt(8/9)
        let metrics = calculate(&evens(&[true, false, true]), 0.0);
        let std = (8.0_f64 / 9.0).sqrt();
        let expected_sharpe = (1.0 / 3.0) / std * 252.0_f64.sqrt();
        assert!((metrics.sharpe_ratio - expected_sharpe).abs() < 1e-9);
        assert!((metrics.volatility - std * 252.0_f64.sqrt()).abs() < 1e-9);
        // single downside value has zero spread
        assert_eq!(metrics.sortino_ratio, 0.0);
    }

    #[test]
    fn test_sortino_uses_downside_spread() {
        // returns [1, 1, -1, -0.5]: mean 0.125, downside std 0.25
        let mut bets = evens(&[true, true, false, false]);
        bets[3].profit = Some(-5.0);
        let metrics = calculate(&bets, 0.0);
        let expected = 0.125 / 0.25 * 252.0_f64.sqrt();
        assert!((metrics.sortino_ratio - expected).abs() < 1e-9);

        let with_rf = calculate(&bets, 0.0252);
        let expected_rf = (0.125 - 0.0001) / 0.25 * 252.0_f64.sqrt();
        assert!((with_rf.sortino_ratio - expected_rf).abs() < 1e-9);
    }

    #[test]
    fn test_risk_free_rate_lowers_sharpe() {
        let bets = evens(&[true, false, true]);
        let base = calculate(&bets, 0.0).sharpe_ratio;
        let with_rf = calculate(&bets, 0.05).sharpe_ratio;
        assert!(with_rf < base);
    }

    #[test]
    fn test_max_drawdown_and_duration() {
        // equity 0, 10, 0, -10, 0, 10 on days 0..4
        let metrics = calculate(&evens(&[true, false, false, true, true]), 0.0);
        assert!((metrics.max_drawdown - (-2.0)).abs() < 1e-9);
        // below peak on days 1..=3, back at the peak on day 4
        assert_eq!(metrics.max_drawdown_duration, 2);
        assert!(metrics.max_drawdown <= 0.0);
    }

    #[test]
    fn test_recovery_and_calmar_use_percentage_points() {
        // equity 0, 10, 0, 10: drawdown -100%, profit 10, roi 10/30, 2 days
        let metrics = calculate(&evens(&[true, false, true]), 0.0);
        assert!((metrics.max_drawdown - (-1.0)).abs() < 1e-9);
        assert!((metrics.recovery_factor - 0.1).abs() < 1e-9);
        let annualized = (10.0 / 30.0) * 365.0 / 2.0;
        assert!((metrics.calmar_ratio - annualized / 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_drawdown_from_zero_peak() {
        // losing from the start never sets a positive peak
        let metrics = calculate(&evens(&[false, false]), 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.max_drawdown_duration, 0);
        assert_eq!(metrics.recovery_factor, 0.0);
        assert_eq!(metrics.calmar_ratio, 0.0);
    }

    #[test]
    fn test_var_and_cvar() {
        // returns [1, -1, 1]: 5th percentile -0.8, tail {-1}
        let metrics = calculate(&evens(&[true, false, true]), 0.0);
        assert!((metrics.var_95 - (-0.8)).abs() < 1e-9);
        assert!((metrics.cvar_95 - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_longest_of_several_episodes() {
        let mut bets = evens(&[true, false, true, true, false, false, false, true, true]);
        // stretch the second episode across a week
        for (i, bet) in bets.iter_mut().enumerate() {
            bet.settled_at = Some(day(i as i64 * 2));
        }
        let metrics = calculate(&bets, 0.0);
        // first episode lasts one point; the second is below peak at bets 4..=8 (days 8..16)
        assert_eq!(metrics.max_drawdown_duration, 8);
        assert!((metrics.max_drawdown - (-1.5)).abs() < 1e-9);
    }
}
