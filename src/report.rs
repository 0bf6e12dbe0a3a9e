//! Validation report
//!
//! Turns a metrics result into a go/no-go verdict for moving from paper
//! trading to real money, plus general recommendations and segment rankings.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::config::Thresholds;
use crate::insights::{Insight, InsightGenerator, InsightKind, MetricsView};
use crate::metrics::{MetricsResult, SegmentedMetrics};

/// Minimum bets for a segment to be ranked
pub const DEFAULT_MIN_SEGMENT_BETS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    ApproveWithCaution,
    Reject,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::Approve => "APPROVE for real-money operation",
            Verdict::ApproveWithCaution => "APPROVE with caution",
            Verdict::Reject => "DO NOT APPROVE",
        };
        write!(f, "{}", text)
    }
}

impl Verdict {
    /// Follow-up steps shown with the verdict
    pub fn guidance(&self) -> &'static [&'static str] {
        match self {
            Verdict::Approve => &[
                "ROI above the excellence threshold",
                "Sharpe ratio indicates good risk-adjusted return",
                "Consistent metrics point to a real edge",
            ],
            Verdict::ApproveWithCaution => &[
                "Start with reduced stakes",
                "Monitor metrics closely",
                "Review underperforming markets",
            ],
            Verdict::Reject => &[
                "Review the predictive models",
                "Adjust the selection criteria",
                "Keep paper trading",
            ],
        }
    }
}

/// Approve when ROI and Sharpe both reach the excellent tier, approve with
/// caution when both reach the good tier, reject otherwise
pub fn verdict(metrics: &MetricsResult, thresholds: &Thresholds) -> Verdict {
    let view = MetricsView::from(metrics);

    if view.roi >= thresholds.excellent_roi && view.sharpe_ratio >= thresholds.excellent_sharpe {
        Verdict::Approve
    } else if view.roi >= thresholds.good_roi && view.sharpe_ratio >= thresholds.good_sharpe {
        Verdict::ApproveWithCaution
    } else {
        Verdict::Reject
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: InsightKind,
    pub message: String,
}

impl Recommendation {
    fn new(kind: InsightKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

pub fn general_recommendations(
    metrics: &MetricsResult,
    thresholds: &Thresholds,
) -> Vec<Recommendation> {
    let view = MetricsView::from(metrics);
    let settled = metrics.metadata.settled_bets;
    let mut recommendations = Vec::new();

    if settled < thresholds.small_sample {
        recommendations.push(Recommendation::new(
            InsightKind::Info,
            "Small sample: keep collecting data before final decisions",
        ));
    }
    if settled >= thresholds.adequate_sample {
        recommendations.push(Recommendation::new(
            InsightKind::Success,
            "Adequate sample: metrics carry enough statistical weight",
        ));
    }
    if view.roi > thresholds.excellent_roi {
        recommendations.push(Recommendation::new(
            InsightKind::Success,
            "Excellent performance: ready for real-money operation",
        ));
    }
    if view.max_drawdown.abs() > thresholds.warning_drawdown {
        recommendations.push(Recommendation::new(
            InsightKind::Warning,
            "Review risk management: drawdown is elevated",
        ));
    }
    if view.clv_positive_rate > thresholds.good_clv_rate {
        recommendations.push(Recommendation::new(
            InsightKind::Success,
            "Consistently positive CLV: evidence of a real market edge",
        ));
    }

    recommendations
}

/// Segment label with its ROI (0-1) and settled bet count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSegment {
    pub label: String,
    pub roi: f64,
    pub bets: usize,
}

/// Rank segments by ROI, keeping those with at least `min_bets` settled bets
///
/// Equal ROIs keep label order.
pub fn rank_segments(
    segments: &SegmentedMetrics,
    min_bets: usize,
    best_first: bool,
) -> Vec<RankedSegment> {
    let mut ranked: Vec<RankedSegment> = segments
        .iter()
        .filter(|(_, m)| m.metadata.settled_bets >= min_bets)
        .map(|(label, m)| RankedSegment {
            label: label.clone(),
            roi: m.basic.roi,
            bets: m.metadata.settled_bets,
        })
        .collect();

    ranked.sort_by(|a, b| {
        let order = a.roi.partial_cmp(&b.roi).unwrap_or(Ordering::Equal);
        if best_first {
            order.reverse()
        } else {
            order
        }
    });
    ranked
}

/// Highest-ROI segment with enough bets (e.g. the optimal confidence range)
pub fn best_segment(segments: &SegmentedMetrics, min_bets: usize) -> Option<RankedSegment> {
    rank_segments(segments, min_bets, true).into_iter().next()
}

/// Everything needed to decide on a strategy, in one serializable record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub verdict: Verdict,
    pub metrics: MetricsResult,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

impl ValidationReport {
    pub fn build(metrics: MetricsResult, thresholds: &Thresholds) -> Self {
        let insights = InsightGenerator::new(&metrics, thresholds.clone()).generate_all_insights();
        Self {
            verdict: verdict(&metrics, thresholds),
            recommendations: general_recommendations(&metrics, thresholds),
            insights,
            metrics,
        }
    }
}
