//! Closing Line Value (CLV) metrics
//!
//! Whether bets were taken at better prices than the market closed at,
//! and whether that price advantage turned into results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::stats::{mean, pearson};
use crate::models::Bet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClvMetrics {
    pub clv_average: f64,
    /// Share of bets with positive CLV (0-1)
    pub clv_positive_rate: f64,
    pub clv_by_sport: BTreeMap<String, f64>,
    pub clv_by_market: BTreeMap<String, f64>,
    /// Pearson correlation between CLV and the win indicator
    pub clv_correlation: f64,
    /// Realized ROI as a multiple of the mean theoretical edge
    pub edge_realized: f64,
}

/// Calculate CLV metrics over bets that have a closing price
pub fn calculate(bets: &[Bet]) -> ClvMetrics {
    let with_clv: Vec<(&Bet, f64)> = bets
        .iter()
        .filter(|b| b.closing_odds.is_some())
        .filter_map(|b| b.clv.map(|clv| (b, clv)))
        .collect();

    if with_clv.is_empty() {
        return ClvMetrics::default();
    }

    let clv_values: Vec<f64> = with_clv.iter().map(|(_, clv)| *clv).collect();
    let positive = clv_values.iter().filter(|clv| **clv > 0.0).count();

    let clv_by_sport = mean_by_key(&with_clv, |b| b.sport_or_unknown().to_string());
    let clv_by_market = mean_by_key(&with_clv, |b| b.market_type.clone());

    debug!(with_clv = with_clv.len(), "clv metrics");

    ClvMetrics {
        clv_average: mean(&clv_values),
        clv_positive_rate: positive as f64 / clv_values.len() as f64,
        clv_by_sport,
        clv_by_market,
        clv_correlation: calculate_clv_correlation(&with_clv),
        edge_realized: calculate_edge_realized(&with_clv),
    }
}

fn mean_by_key<F>(bets: &[(&Bet, f64)], key_fn: F) -> BTreeMap<String, f64>
where
    F: Fn(&Bet) -> String,
{
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (bet, clv) in bets {
        grouped.entry(key_fn(bet)).or_default().push(*clv);
    }

    grouped
        .into_iter()
        .map(|(key, values)| (key, mean(&values)))
        .collect()
}

/// Correlation of CLV with outcome over settled bets (needs two or more)
fn calculate_clv_correlation(bets: &[(&Bet, f64)]) -> f64 {
    let (clv, outcomes): (Vec<f64>, Vec<f64>) = bets
        .iter()
        .filter(|(b, _)| b.is_settled())
        .map(|(b, clv)| (*clv, if b.won() { 1.0 } else { 0.0 }))
        .unzip();

    pearson(&clv, &outcomes)
}

fn calculate_edge_realized(bets: &[(&Bet, f64)]) -> f64 {
    let settled: Vec<&Bet> = bets
        .iter()
        .map(|(b, _)| *b)
        .filter(|b| b.is_settled() && b.profit.is_some())
        .collect();

    if settled.is_empty() {
        return 0.0;
    }

    let edges: Vec<f64> = settled.iter().map(|b| b.edge).collect();
    let theoretical_edge = mean(&edges);
    if theoretical_edge <= 0.0 {
        return 0.0;
    }

    let total_stake: f64 = settled.iter().map(|b| b.stake).sum();
    let total_profit: f64 = settled.iter().map(|b| b.profit_or_zero()).sum();
    let realized = if total_stake > 0.0 {
        total_profit / total_stake
    } else {
        0.0
    };

    realized / theoretical_edge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::day;

    fn clv_bet(id: i64, closing: f64, sport: Option<&str>, market: &str) -> Bet {
        let mut bet = Bet::new(id, 2.0, 10.0, 0.6)
            .with_market(market)
            .with_closing_odds(closing);
        bet.sport = sport.map(str::to_string);
        bet
    }

    #[test]
    fn test_clv_empty_without_closing_odds() {
        let bets = vec![Bet::new(1, 2.0, 10.0, 0.6).settle(true, day(0))];
        let metrics = calculate(&bets);
        assert_eq!(metrics, ClvMetrics::default());
        assert!(metrics.clv_by_sport.is_empty());
    }

    #[test]
    fn test_clv_average_and_rate() {
        // closing 1.8 -> clv 0.5 - 0.5556 < 0; closing 2.5 -> 0.5 - 0.4 = 0.1
        let bets = vec![
            clv_bet(1, 1.8, Some("cs2"), "match_winner"),
            clv_bet(2, 2.5, Some("cs2"), "match_winner"),
            clv_bet(3, 2.5, None, "map_winner"),
        ];
        let metrics = calculate(&bets);
        let expected_avg = ((0.5 - 1.0 / 1.8) + 0.1 + 0.1) / 3.0;
        assert!((metrics.clv_average - expected_avg).abs() < 1e-9);
        assert!((metrics.clv_positive_rate - 2.0 / 3.0).abs() < 1e-9);

        assert_eq!(metrics.clv_by_sport.len(), 2);
        assert!((metrics.clv_by_sport["Unknown"] - 0.1).abs() < 1e-9);
        assert!((metrics.clv_by_market["map_winner"] - 0.1).abs() < 1e-9);
        // pending bets contribute no correlation points
        assert_eq!(metrics.clv_correlation, 0.0);
        assert_eq!(metrics.edge_realized, 0.0);
    }

    #[test]
    fn test_clv_correlation_positive() {
        let bets = vec![
            clv_bet(1, 2.5, Some("cs2"), "m").settle(true, day(0)),
            clv_bet(2, 1.8, Some("cs2"), "m").settle(false, day(1)),
        ];
        let metrics = calculate(&bets);
        assert!((metrics.clv_correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clv_correlation_zero_variance() {
        let bets = vec![
            clv_bet(1, 2.5, Some("cs2"), "m").settle(true, day(0)),
            clv_bet(2, 2.5, Some("cs2"), "m").settle(true, day(1)),
        ];
        assert_eq!(calculate(&bets).clv_correlation, 0.0);
    }

    #[test]
    fn test_edge_realized() {
        // edge 0.1 each; profit 10 - 10 + 10 on 30 staked -> realized 1/3
        let bets = vec![
            clv_bet(1, 2.5, None, "m").settle(true, day(0)),
            clv_bet(2, 2.5, None, "m").settle(false, day(1)),
            clv_bet(3, 2.5, None, "m").settle(true, day(2)),
        ];
        let metrics = calculate(&bets);
        assert!((metrics.edge_realized - (1.0 / 3.0) / 0.1).abs() < 1e-9);
    }
}
