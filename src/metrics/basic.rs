//! Basic performance metrics
//!
//! Win rate, ROI, profit and averages over settled bets.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::settled;
use crate::core::stats::mean;
use crate::models::Bet;

/// Headline performance numbers (ratios on the 0-1 scale)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub win_rate: f64,
    pub roi: f64,
    pub profit: f64,
    pub yield_per_bet: f64,
    pub total_wagered: f64,
    pub total_bets: usize,
    pub average_odds: f64,
    pub average_stake: f64,
}

/// Calculate basic metrics
///
/// With no settled bets, `total_bets` and the averages fall back to the
/// whole input so pending-only snapshots still report their exposure.
pub fn calculate(bets: &[Bet]) -> BasicMetrics {
    let settled = settled(bets);

    if settled.is_empty() {
        let odds: Vec<f64> = bets.iter().map(|b| b.odds).collect();
        let stakes: Vec<f64> = bets.iter().map(|b| b.stake).collect();
        return BasicMetrics {
            total_bets: bets.len(),
            average_odds: mean(&odds),
            average_stake: mean(&stakes),
            ..Default::default()
        };
    }

    let count = settled.len();
    let wins = settled.iter().filter(|b| b.won()).count();
    let total_profit: f64 = settled.iter().map(|b| b.profit_or_zero()).sum();
    let total_stake: f64 = settled.iter().map(|b| b.stake).sum();

    let roi = if total_stake > 0.0 {
        total_profit / total_stake
    } else {
        0.0
    };

    debug!(settled = count, wins, "basic metrics");

    BasicMetrics {
        win_rate: wins as f64 / count as f64,
        roi,
        profit: total_profit,
        yield_per_bet: total_profit / count as f64,
        total_wagered: total_stake,
        total_bets: count,
        average_odds: settled.iter().map(|b| b.odds).sum::<f64>() / count as f64,
        average_stake: total_stake / count as f64,
    }
}
