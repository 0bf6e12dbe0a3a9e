//! Metrics aggregation and segmentation
//!
//! Runs the six calculators over one bet snapshot and partitions bets by a
//! dimension (sport, market, bookmaker, confidence, odds, edge). Segments
//! share nothing and are computed in parallel with rayon.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use super::{bankroll, basic, calibration, clv, risk, streaks};
use super::{
    BankrollMetrics, BasicMetrics, CalibrationMetrics, ClvMetrics, RiskMetrics, StreakMetrics,
};
use crate::config::{AnalyticsConfig, RangeBucket, SegmentationConfig};
use crate::core::kelly::{KellyCalculator, KELLY_CAP};
use crate::models::{Bet, BetStatus};

/// Snapshot counts attached to every result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_bets: usize,
    pub settled_bets: usize,
    pub pending_bets: usize,
    pub initial_bankroll: f64,
}

/// Composite output of all six calculators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub basic: BasicMetrics,
    pub risk: RiskMetrics,
    pub calibration: CalibrationMetrics,
    pub clv: ClvMetrics,
    pub streaks: StreakMetrics,
    pub bankroll: BankrollMetrics,
    pub metadata: Metadata,
}

/// Segment label -> metrics for that segment
pub type SegmentedMetrics = BTreeMap<String, MetricsResult>;

/// Partition dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Sport,
    Market,
    Bookmaker,
    Confidence,
    Odds,
    Edge,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dimension::Sport => "sport",
            Dimension::Market => "market",
            Dimension::Bookmaker => "bookmaker",
            Dimension::Confidence => "confidence",
            Dimension::Odds => "odds",
            Dimension::Edge => "edge",
        };
        write!(f, "{}", name)
    }
}

/// Pre-aggregation bet filter; unset fields match everything
///
/// Ranges are half-open `[min, max)`; the `created_at` window is inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetFilter {
    pub sport: Option<String>,
    pub market: Option<String>,
    pub bookmaker: Option<String>,
    pub confidence: Option<(f64, f64)>,
    pub odds: Option<(f64, f64)>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BetFilter {
    pub fn matches(&self, bet: &Bet) -> bool {
        let in_range = |range: Option<(f64, f64)>, value: f64| {
            range.map_or(true, |(min, max)| value >= min && value < max)
        };

        self.sport
            .as_ref()
            .map_or(true, |s| bet.sport.as_ref() == Some(s))
            && self.market.as_ref().map_or(true, |m| &bet.market_type == m)
            && self.bookmaker.as_ref().map_or(true, |b| &bet.bookmaker == b)
            && in_range(self.confidence, bet.confidence)
            && in_range(self.odds, bet.odds)
            && self.start.map_or(true, |start| bet.created_at >= start)
            && self.end.map_or(true, |end| bet.created_at <= end)
    }
}

/// Composite metrics for one snapshot
pub fn compute_all(
    bets: &[Bet],
    initial_bankroll: f64,
    risk_free_rate: f64,
    kelly: &KellyCalculator,
) -> MetricsResult {
    let metadata = Metadata {
        total_bets: bets.len(),
        settled_bets: bets.iter().filter(|b| b.is_settled()).count(),
        pending_bets: bets
            .iter()
            .filter(|b| b.status == BetStatus::Pending)
            .count(),
        initial_bankroll,
    };

    debug!(
        total = metadata.total_bets,
        settled = metadata.settled_bets,
        pending = metadata.pending_bets,
        "computing all metrics"
    );

    MetricsResult {
        basic: basic::calculate(bets),
        risk: risk::calculate(bets, risk_free_rate),
        calibration: calibration::calculate(bets),
        clv: clv::calculate(bets),
        streaks: streaks::calculate(bets),
        bankroll: bankroll::calculate(bets, initial_bankroll, kelly),
        metadata,
    }
}

/// Owns a bet snapshot and produces composite and segmented metrics
///
/// # Examples
/// ```
/// use betlens::metrics::MetricsAggregator;
/// use betlens::models::Bet;
///
/// let bets = vec![Bet::new(1, 2.0, 10.0, 0.6)];
/// let result = MetricsAggregator::new(bets, 1000.0, 0.0).calculate_all();
/// assert_eq!(result.metadata.pending_bets, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    bets: Vec<Bet>,
    initial_bankroll: f64,
    risk_free_rate: f64,
    kelly: KellyCalculator,
}

impl MetricsAggregator {
    pub fn new(bets: Vec<Bet>, initial_bankroll: f64, risk_free_rate: f64) -> Self {
        Self {
            bets,
            initial_bankroll,
            risk_free_rate,
            kelly: KellyCalculator::default(),
        }
    }

    /// Build from configuration (bankroll, risk-free rate, Kelly multiplier)
    pub fn from_config(bets: Vec<Bet>, config: &AnalyticsConfig) -> Self {
        Self::new(bets, config.initial_bankroll, config.risk_free_rate)
            .with_kelly_multiplier(config.kelly_multiplier)
    }

    /// Report fractional Kelly (e.g. 0.25 for quarter Kelly)
    pub fn with_kelly_multiplier(mut self, multiplier: f64) -> Self {
        self.kelly = KellyCalculator::new(multiplier, KELLY_CAP);
        self
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn initial_bankroll(&self) -> f64 {
        self.initial_bankroll
    }

    /// Run all calculators over the held snapshot
    pub fn calculate_all(&self) -> MetricsResult {
        compute_all(
            &self.bets,
            self.initial_bankroll,
            self.risk_free_rate,
            &self.kelly,
        )
    }

    /// New aggregator over the bets matching `filter`, same settings
    pub fn filter(&self, filter: &BetFilter) -> Self {
        let bets: Vec<Bet> = self
            .bets
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        debug!(kept = bets.len(), of = self.bets.len(), "filtered bets");

        Self {
            bets,
            initial_bankroll: self.initial_bankroll,
            risk_free_rate: self.risk_free_rate,
            kelly: self.kelly,
        }
    }

    pub fn calculate_by_sport(&self, sports: &[&str]) -> SegmentedMetrics {
        self.segment_by(
            Dimension::Sport,
            sports,
            |s| s.to_string(),
            |s, bet| bet.sport.as_deref() == Some(*s),
        )
    }

    pub fn calculate_by_market(&self, markets: &[&str]) -> SegmentedMetrics {
        self.segment_by(
            Dimension::Market,
            markets,
            |m| m.to_string(),
            |m, bet| bet.market_type == *m,
        )
    }

    pub fn calculate_by_bookmaker(&self, bookmakers: &[&str]) -> SegmentedMetrics {
        self.segment_by(
            Dimension::Bookmaker,
            bookmakers,
            |b| b.to_string(),
            |b, bet| bet.bookmaker == *b,
        )
    }

    pub fn calculate_by_confidence_range(&self, ranges: &[RangeBucket]) -> SegmentedMetrics {
        self.segment_by(
            Dimension::Confidence,
            ranges,
            |r| r.label.clone(),
            |r, bet| r.contains(bet.confidence),
        )
    }

    pub fn calculate_by_odds_range(&self, ranges: &[RangeBucket]) -> SegmentedMetrics {
        self.segment_by(
            Dimension::Odds,
            ranges,
            |r| r.label.clone(),
            |r, bet| r.contains(bet.odds),
        )
    }

    pub fn calculate_by_edge_range(&self, ranges: &[RangeBucket]) -> SegmentedMetrics {
        self.segment_by(
            Dimension::Edge,
            ranges,
            |r| r.label.clone(),
            |r, bet| r.contains(bet.edge),
        )
    }

    /// Segment along `dimension`: observed keys for categorical dimensions,
    /// the configured range table for numeric ones
    pub fn calculate_by_dimension(
        &self,
        dimension: Dimension,
        segmentation: &SegmentationConfig,
    ) -> SegmentedMetrics {
        match dimension {
            Dimension::Sport => {
                let sports = self.observed_sports();
                self.calculate_by_sport(&as_strs(&sports))
            }
            Dimension::Market => {
                let markets = self.observed_markets();
                self.calculate_by_market(&as_strs(&markets))
            }
            Dimension::Bookmaker => {
                let bookmakers = self.observed_bookmakers();
                self.calculate_by_bookmaker(&as_strs(&bookmakers))
            }
            Dimension::Confidence => {
                self.calculate_by_confidence_range(&segmentation.confidence_ranges)
            }
            Dimension::Odds => self.calculate_by_odds_range(&segmentation.odds_ranges),
            Dimension::Edge => self.calculate_by_edge_range(&segmentation.edge_ranges),
        }
    }

    /// Distinct sport tags in the snapshot (untagged bets excluded)
    pub fn observed_sports(&self) -> Vec<String> {
        distinct(self.bets.iter().filter_map(|b| b.sport.clone()))
    }

    pub fn observed_markets(&self) -> Vec<String> {
        distinct(self.bets.iter().map(|b| b.market_type.clone()))
    }

    pub fn observed_bookmakers(&self) -> Vec<String> {
        distinct(self.bets.iter().map(|b| b.bookmaker.clone()))
    }

    /// Filter per key and compute every non-empty segment in parallel
    fn segment_by<K, L, P>(
        &self,
        dimension: Dimension,
        keys: &[K],
        label: L,
        predicate: P,
    ) -> SegmentedMetrics
    where
        K: Sync,
        L: Fn(&K) -> String + Sync,
        P: Fn(&K, &Bet) -> bool + Sync,
    {
        let segments: SegmentedMetrics = keys
            .par_iter()
            .filter_map(|key| {
                let subset: Vec<Bet> = self
                    .bets
                    .iter()
                    .filter(|bet| predicate(key, bet))
                    .cloned()
                    .collect();

                if subset.is_empty() {
                    return None;
                }

                let result = compute_all(
                    &subset,
                    self.initial_bankroll,
                    self.risk_free_rate,
                    &self.kelly,
                );
                Some((label(key), result))
            })
            .collect();

        info!(
            %dimension,
            keys = keys.len(),
            segments = segments.len(),
            "segmented metrics"
        );

        segments
    }
}

fn distinct<I: Iterator<Item = String>>(values: I) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::day;

    fn sample_bets() -> Vec<Bet> {
        vec![
            Bet::new(1, 2.0, 10.0, 0.62)
                .with_sport("valorant")
                .with_market("match_winner")
                .with_bookmaker("pinnacle")
                .settle(true, day(0)),
            Bet::new(2, 1.6, 10.0, 0.70)
                .with_sport("valorant")
                .with_market("map_winner")
                .with_bookmaker("bet365")
                .settle(false, day(1)),
            Bet::new(3, 2.5, 10.0, 0.57)
                .with_sport("cs2")
                .with_market("match_winner")
                .with_bookmaker("pinnacle")
                .settle(true, day(2)),
            Bet::new(4, 4.0, 10.0, 0.40)
                .with_sport("cs2")
                .with_market("match_winner")
                .with_bookmaker("pinnacle"),
            Bet::new(5, 1.1, 10.0, 0.95).with_market("handicap"),
        ]
    }

    #[test]
    fn test_calculate_all_metadata() {
        let result = MetricsAggregator::new(sample_bets(), 1000.0, 0.0).calculate_all();
        assert_eq!(result.metadata.total_bets, 5);
        assert_eq!(result.metadata.settled_bets, 3);
        assert_eq!(result.metadata.pending_bets, 2);
        assert_eq!(result.metadata.initial_bankroll, 1000.0);
        assert_eq!(result.risk.equity_curve.len(), 4);
        assert_eq!(result.bankroll.equity_curve.len(), 4);
    }

    #[test]
    fn test_calculate_all_idempotent() {
        let aggregator = MetricsAggregator::new(sample_bets(), 1000.0, 0.01);
        assert_eq!(aggregator.calculate_all(), aggregator.calculate_all());
    }

    #[test]
    fn test_calculate_by_sport_skips_empty_segments() {
        let aggregator = MetricsAggregator::new(sample_bets(), 1000.0, 0.0);
        let segments = aggregator.calculate_by_sport(&["valorant", "cs2", "dota2"]);
        assert_eq!(segments.len(), 2);
        assert!(!segments.contains_key("dota2"));
        assert_eq!(segments["valorant"].metadata.total_bets, 2);
        assert_eq!(segments["cs2"].metadata.settled_bets, 1);
    }

    #[test]
    fn test_segment_matches_standalone_aggregator() {
        let bets = sample_bets();
        let aggregator = MetricsAggregator::new(bets.clone(), 500.0, 0.0);
        let segments = aggregator.calculate_by_market(&["match_winner"]);

        let subset: Vec<Bet> = bets
            .into_iter()
            .filter(|b| b.market_type == "match_winner")
            .collect();
        let standalone = MetricsAggregator::new(subset, 500.0, 0.0).calculate_all();
        assert_eq!(segments["match_winner"], standalone);
    }

    #[test]
    fn test_confidence_ranges_half_open() {
        let aggregator = MetricsAggregator::new(sample_bets(), 1000.0, 0.0);
        let ranges = SegmentationConfig::default().confidence_ranges;
        let segments = aggregator.calculate_by_confidence_range(&ranges);
        // 0.62 -> 60-65%, 0.70 -> 70-75%, 0.57 -> 55-60%, 0.95 -> 75%+, 0.40 -> none
        let total: usize = segments.values().map(|r| r.metadata.total_bets).sum();
        assert_eq!(total, 4);
        assert_eq!(segments["70-75%"].metadata.total_bets, 1);
        assert!(!segments.contains_key("65-70%"));
    }

    #[test]
    fn test_odds_ranges_exclude_unmatched() {
        let aggregator = MetricsAggregator::new(sample_bets(), 1000.0, 0.0);
        let ranges = SegmentationConfig::default().odds_ranges;
        let segments = aggregator.calculate_by_odds_range(&ranges);
        // 1.1 falls below every bucket
        let total: usize = segments.values().map(|r| r.metadata.total_bets).sum();
        assert_eq!(total, 4);
        assert_eq!(segments["3.00+"].metadata.total_bets, 1);
    }

    #[test]
    fn test_calculate_by_dimension_uses_observed_keys() {
        let aggregator = MetricsAggregator::new(sample_bets(), 1000.0, 0.0);
        let config = SegmentationConfig::default();

        let sports = aggregator.calculate_by_dimension(Dimension::Sport, &config);
        assert_eq!(sports.keys().collect::<Vec<_>>(), vec!["cs2", "valorant"]);

        let bookmakers = aggregator.calculate_by_dimension(Dimension::Bookmaker, &config);
        assert_eq!(bookmakers["pinnacle"].metadata.total_bets, 3);

        let markets = aggregator.calculate_by_dimension(Dimension::Market, &config);
        assert_eq!(markets.len(), 3);
    }

    #[test]
    fn test_filter() {
        let aggregator = MetricsAggregator::new(sample_bets(), 1000.0, 0.0);
        let filter = BetFilter {
            sport: Some("cs2".to_string()),
            ..Default::default()
        };
        assert_eq!(aggregator.filter(&filter).bets().len(), 2);

        let filter = BetFilter {
            odds: Some((1.5, 2.6)),
            bookmaker: Some("pinnacle".to_string()),
            ..Default::default()
        };
        let ids: Vec<i64> = aggregator.filter(&filter).bets().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_filter_by_created_window() {
        let bets: Vec<Bet> = (0..5)
            .map(|i| Bet::new(i, 2.0, 10.0, 0.6).created(day(i)))
            .collect();
        let aggregator = MetricsAggregator::new(bets, 1000.0, 0.0);
        let filter = BetFilter {
            start: Some(day(1)),
            end: Some(day(3)),
            ..Default::default()
        };
        assert_eq!(aggregator.filter(&filter).bets().len(), 3);
    }

    #[test]
    fn test_kelly_multiplier_from_config() {
        let config = AnalyticsConfig {
            kelly_multiplier: 0.5,
            ..Default::default()
        };
        let bets = vec![Bet::new(1, 2.0, 10.0, 0.6).settle(true, day(0))];
        let result = MetricsAggregator::from_config(bets, &config).calculate_all();
        assert!((result.bankroll.kelly_average - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_result_serializes() {
        let result = MetricsAggregator::new(sample_bets(), 1000.0, 0.0).calculate_all();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["metadata"]["settled_bets"], 3);
        assert_eq!(json["streaks"]["current_streak"]["type"], "win");
        assert!(json["bankroll"]["equity_curve"][0]["date"].is_null());
    }
}
