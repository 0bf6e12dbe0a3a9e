//! Betlens - Betting performance analytics
//!
//! This library provides:
//! - Return, risk and drawdown metrics over a bet history
//! - Probability calibration (Brier, log loss, reliability bins)
//! - Closing line value and streak analysis
//! - Kelly criterion sizing and bankroll tracking
//! - Segmentation by sport, market, bookmaker and numeric ranges
//! - Rule-based insights and a go/no-go validation report
//!
//! # Example
//!
//! ```no_run
//! use betlens::data::{load_bets, LoadOptions};
//! use betlens::insights::InsightGenerator;
//! use betlens::metrics::MetricsAggregator;
//!
//! let bets = load_bets("bets.json", &LoadOptions::default()).unwrap();
//! let result = MetricsAggregator::new(bets, 1000.0, 0.0).calculate_all();
//!
//! for insight in InsightGenerator::with_defaults(&result).get_top_insights(5) {
//!     println!("{}: {}", insight.title, insight.description);
//! }
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod insights;
pub mod metrics;
pub mod models;
pub mod report;

// Re-export commonly used types
pub use config::{AnalyticsConfig, RangeBucket, SegmentationConfig, Thresholds};
pub use data::{load_bets, LoadOptions};
pub use error::AnalyticsError;
pub use insights::{Insight, InsightGenerator, InsightKind, Priority};
pub use metrics::{BetFilter, Dimension, MetricsAggregator, MetricsResult, SegmentedMetrics};
pub use models::{Bet, BetStatus};
pub use report::{ValidationReport, Verdict};
