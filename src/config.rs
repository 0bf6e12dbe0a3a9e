//! Analytics configuration
//!
//! Bankroll/risk scalars, insight thresholds and segmentation range tables.
//! Values come from defaults, an optional TOML file, then `BETLENS_*`
//! environment variables (nested keys use `__`, e.g.
//! `BETLENS_THRESHOLDS__EXCELLENT_ROI=12`).

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AnalyticsError;

/// Half-open interval `[min, max)` with a display label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket {
    pub min: f64,
    pub max: f64,
    pub label: String,
}

impl RangeBucket {
    pub fn new(min: f64, max: f64, label: &str) -> Self {
        Self {
            min,
            max,
            label: label.to_string(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }
}

/// Range tables used to partition bets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub confidence_ranges: Vec<RangeBucket>,
    pub odds_ranges: Vec<RangeBucket>,
    pub edge_ranges: Vec<RangeBucket>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            confidence_ranges: vec![
                RangeBucket::new(0.55, 0.60, "55-60%"),
                RangeBucket::new(0.60, 0.65, "60-65%"),
                RangeBucket::new(0.65, 0.70, "65-70%"),
                RangeBucket::new(0.70, 0.75, "70-75%"),
                RangeBucket::new(0.75, 1.00, "75%+"),
            ],
            odds_ranges: vec![
                RangeBucket::new(1.20, 1.50, "1.20-1.50"),
                RangeBucket::new(1.50, 1.80, "1.50-1.80"),
                RangeBucket::new(1.80, 2.20, "1.80-2.20"),
                RangeBucket::new(2.20, 3.00, "2.20-3.00"),
                RangeBucket::new(3.00, 10.00, "3.00+"),
            ],
            edge_ranges: vec![
                RangeBucket::new(0.03, 0.05, "3-5%"),
                RangeBucket::new(0.05, 0.08, "5-8%"),
                RangeBucket::new(0.08, 0.12, "8-12%"),
                RangeBucket::new(0.12, 1.00, "12%+"),
            ],
        }
    }
}

impl SegmentationConfig {
    /// Fine-grained confidence buckets: nine 5% steps from 0.55 to 1.00
    pub fn confidence_steps() -> Vec<RangeBucket> {
        (0..9)
            .map(|i| {
                let lo = 55 + i * 5;
                let hi = lo + 5;
                RangeBucket::new(lo as f64 / 100.0, hi as f64 / 100.0, &format!("{}-{}%", lo, hi))
            })
            .collect()
    }
}

/// Insight cutoffs
///
/// Percent-scale fields compare against metrics expressed in percent
/// (e.g. `excellent_roi = 15.0` means 15% ROI). Sharpe, Brier, log loss,
/// CLV and correlation are in their natural units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub excellent_roi: f64,
    pub good_roi: f64,
    pub poor_roi: f64,

    pub excellent_winrate: f64,
    pub good_winrate: f64,
    pub poor_winrate: f64,

    pub excellent_sharpe: f64,
    pub good_sharpe: f64,
    pub poor_sharpe: f64,

    pub warning_drawdown: f64,
    pub danger_drawdown: f64,
    pub high_volatility: f64,

    pub excellent_brier: f64,
    pub good_brier: f64,
    pub poor_brier: f64,

    pub excellent_log_loss: f64,
    pub good_log_loss: f64,
    pub poor_log_loss: f64,

    pub excellent_clv: f64,
    pub good_clv: f64,
    pub poor_clv: f64,

    pub excellent_clv_rate: f64,
    pub good_clv_rate: f64,
    pub poor_clv_rate: f64,

    pub min_sample_size: usize,
    pub good_overround_beat: f64,
    pub poor_overround_beat: f64,
    pub strong_clv_correlation: f64,
    pub losing_streak_alert: u32,
    pub long_losing_streak: u32,
    pub recovery_win_rate: f64,
    pub good_bankroll_growth: f64,
    pub bad_bankroll_growth: f64,
    pub high_kelly: f64,
    pub strong_ev: f64,

    pub small_sample: usize,
    pub adequate_sample: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            excellent_roi: 15.0,
            good_roi: 8.0,
            poor_roi: -5.0,

            excellent_winrate: 60.0,
            good_winrate: 55.0,
            poor_winrate: 45.0,

            excellent_sharpe: 2.0,
            good_sharpe: 1.0,
            poor_sharpe: 0.0,

            warning_drawdown: 20.0,
            danger_drawdown: 30.0,
            high_volatility: 30.0,

            excellent_brier: 0.15,
            good_brier: 0.20,
            poor_brier: 0.25,

            excellent_log_loss: 0.40,
            good_log_loss: 0.50,
            poor_log_loss: 0.60,

            excellent_clv: 0.05,
            good_clv: 0.02,
            poor_clv: -0.02,

            excellent_clv_rate: 60.0,
            good_clv_rate: 55.0,
            poor_clv_rate: 45.0,

            min_sample_size: 30,
            good_overround_beat: 60.0,
            poor_overround_beat: 40.0,
            strong_clv_correlation: 0.3,
            losing_streak_alert: 5,
            long_losing_streak: 10,
            recovery_win_rate: 60.0,
            good_bankroll_growth: 20.0,
            bad_bankroll_growth: -15.0,
            high_kelly: 5.0,
            strong_ev: 0.5,

            small_sample: 50,
            adequate_sample: 100,
        }
    }
}

/// Top-level analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub initial_bankroll: f64,
    /// Annual risk-free rate (0.02 = 2%)
    pub risk_free_rate: f64,
    /// Fraction of the clamped Kelly stake to report (1.0 = full Kelly)
    pub kelly_multiplier: f64,
    pub thresholds: Thresholds,
    pub segmentation: SegmentationConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: 1000.0,
            risk_free_rate: 0.0,
            kelly_multiplier: 1.0,
            thresholds: Thresholds::default(),
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Load from environment only
    pub fn load() -> Result<Self, AnalyticsError> {
        Self::load_from(None)
    }

    /// Load from an optional TOML file, then apply `BETLENS_*` overrides
    pub fn load_from(path: Option<&Path>) -> Result<Self, AnalyticsError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let builder = builder.add_source(
            Environment::with_prefix("BETLENS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AnalyticsConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.initial_bankroll <= 0.0 {
            errors.push("initial_bankroll must be positive".to_string());
        }

        if self.kelly_multiplier <= 0.0 || self.kelly_multiplier > 1.0 {
            errors.push("kelly_multiplier must be in (0, 1]".to_string());
        }

        let t = &self.thresholds;
        if !(t.excellent_roi >= t.good_roi && t.good_roi > t.poor_roi) {
            errors.push("ROI thresholds must satisfy excellent >= good > poor".to_string());
        }
        if !(t.excellent_sharpe >= t.good_sharpe && t.good_sharpe > t.poor_sharpe) {
            errors.push("Sharpe thresholds must satisfy excellent >= good > poor".to_string());
        }
        if t.warning_drawdown > t.danger_drawdown {
            errors.push("warning_drawdown should not exceed danger_drawdown".to_string());
        }
        if t.excellent_brier > t.poor_brier {
            errors.push("excellent_brier should not exceed poor_brier".to_string());
        }
        if t.excellent_clv <= t.poor_clv {
            errors.push("excellent_clv must be greater than poor_clv".to_string());
        }

        let tables = [
            ("confidence_ranges", &self.segmentation.confidence_ranges),
            ("odds_ranges", &self.segmentation.odds_ranges),
            ("edge_ranges", &self.segmentation.edge_ranges),
        ];
        for (name, ranges) in tables {
            for bucket in ranges.iter().filter(|b| b.min >= b.max) {
                errors.push(format!(
                    "{}: range '{}' has min {} >= max {}",
                    name, bucket.label, bucket.min, bucket.max
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
