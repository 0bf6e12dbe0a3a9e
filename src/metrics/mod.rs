//! Metric calculators
//!
//! Six stateless calculators over a bet snapshot, plus the aggregator that
//! composes them and partitions bets into segments.

pub mod aggregator;
pub mod bankroll;
pub mod basic;
pub mod calibration;
pub mod clv;
pub mod risk;
pub mod streaks;

use crate::models::Bet;

pub use aggregator::{
    BetFilter, Dimension, Metadata, MetricsAggregator, MetricsResult, SegmentedMetrics,
};
pub use bankroll::{BankrollMetrics, EquityPoint};
pub use basic::BasicMetrics;
pub use calibration::{CalibrationBin, CalibrationMetrics};
pub use clv::ClvMetrics;
pub use risk::RiskMetrics;
pub use streaks::{CurrentStreak, StreakKind, StreakMetrics};

/// Annualization factor (trading days per year)
pub const TRADING_DAYS: f64 = 252.0;

/// Bets with a graded outcome (won or lost), in input order
pub(crate) fn settled(bets: &[Bet]) -> Vec<&Bet> {
    bets.iter().filter(|b| b.is_settled()).collect()
}

/// Settled bets carrying a settlement timestamp, ascending by `settled_at`
///
/// Ties break on bet id, then input position, so the order is total and
/// independent of how the snapshot was supplied.
pub(crate) fn settled_chronological(bets: &[Bet]) -> Vec<&Bet> {
    let mut ordered: Vec<&Bet> = bets
        .iter()
        .filter(|b| b.is_settled() && b.settled_at.is_some())
        .collect();
    ordered.sort_by_key(|b| (b.settled_at, b.id));
    ordered
}
