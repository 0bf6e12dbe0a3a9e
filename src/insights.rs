//! Insight generation
//!
//! Evaluates a fixed rule table against one `MetricsResult` and a set of
//! thresholds, producing human-readable findings ordered by priority.
//!
//! Rules are grouped into families (ROI, Sharpe, drawdown, ...). Families are
//! independent; inside a family the first matching rule wins, which makes
//! tiered rules ("excellent / good / poor") mutually exclusive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::Thresholds;
use crate::core::stats::{pct, round_to};
use crate::error::AnalyticsError;
use crate::metrics::{MetricsResult, StreakKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Success,
    Info,
    Warning,
    Danger,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InsightKind::Success => "success",
            InsightKind::Info => "info",
            InsightKind::Warning => "warning",
            InsightKind::Danger => "danger",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for InsightKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(InsightKind::Success),
            "info" => Ok(InsightKind::Info),
            "warning" => Ok(InsightKind::Warning),
            "danger" => Ok(InsightKind::Danger),
            other => Err(AnalyticsError::Validation(format!(
                "Unknown insight type: {}",
                other
            ))),
        }
    }
}

/// 1 = high, 2 = medium, 3 = low; serialized as the number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(format!("priority must be 1, 2 or 3, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub action: String,
    pub priority: Priority,
}

/// Metric values as they are reported, which is what thresholds refer to
///
/// Ratios are converted to percent and rounded to 2 decimals; Sharpe and
/// correlation to 3 decimals; Brier and CLV average to 4.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsView {
    pub roi: f64,
    pub win_rate: f64,
    pub total_bets: usize,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub brier_score: f64,
    pub overround_beat_rate: f64,
    pub clv_average: f64,
    pub clv_positive_rate: f64,
    pub clv_correlation: f64,
    pub current_streak_kind: StreakKind,
    pub current_streak_count: u32,
    pub longest_lose_streak: u32,
    pub win_after_loss: f64,
    pub bankroll_growth: f64,
    pub kelly_average: f64,
    pub ev_per_bet: f64,
}

impl From<&MetricsResult> for MetricsView {
    fn from(m: &MetricsResult) -> Self {
        Self {
            roi: pct(m.basic.roi),
            win_rate: pct(m.basic.win_rate),
            total_bets: m.basic.total_bets,
            sharpe_ratio: round_to(m.risk.sharpe_ratio, 3),
            max_drawdown: pct(m.risk.max_drawdown),
            volatility: pct(m.risk.volatility),
            brier_score: round_to(m.calibration.brier_score, 4),
            overround_beat_rate: pct(m.calibration.overround_beat_rate),
            clv_average: round_to(m.clv.clv_average, 4),
            clv_positive_rate: pct(m.clv.clv_positive_rate),
            clv_correlation: round_to(m.clv.clv_correlation, 3),
            current_streak_kind: m.streaks.current_streak.kind,
            current_streak_count: m.streaks.current_streak.count,
            longest_lose_streak: m.streaks.longest_lose_streak,
            win_after_loss: pct(m.streaks.win_after_loss),
            bankroll_growth: pct(m.bankroll.bankroll_growth),
            kelly_average: pct(m.bankroll.kelly_average),
            ev_per_bet: round_to(m.bankroll.ev_per_bet, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Roi,
    WinRate,
    SampleSize,
    Sharpe,
    Drawdown,
    Volatility,
    Brier,
    OverroundBeat,
    ClvAverage,
    ClvRate,
    ClvCorrelation,
    LosingStreak,
    LongestLosingStreak,
    Recovery,
    BankrollGrowth,
    Kelly,
    ExpectedValue,
}

type Condition = fn(&MetricsView, &Thresholds) -> bool;
type Describe = fn(&MetricsView, &Thresholds) -> String;

/// One `condition -> insight` entry of the rule table
pub struct Rule {
    pub family: Family,
    pub kind: InsightKind,
    pub priority: Priority,
    pub title: &'static str,
    pub condition: Condition,
    pub describe: Describe,
    pub action: &'static str,
}

impl Rule {
    /// Insight for this rule if its condition holds
    pub fn evaluate(&self, view: &MetricsView, thresholds: &Thresholds) -> Option<Insight> {
        if !(self.condition)(view, thresholds) {
            return None;
        }
        Some(Insight {
            kind: self.kind,
            title: self.title.to_string(),
            description: (self.describe)(view, thresholds),
            action: self.action.to_string(),
            priority: self.priority,
        })
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("family", &self.family)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("title", &self.title)
            .finish()
    }
}

static RULES: &[Rule] = &[
    // Performance
    Rule {
        family: Family::Roi,
        kind: InsightKind::Success,
        priority: Priority::High,
        title: "Excellent ROI",
        condition: |v, t| v.roi >= t.excellent_roi,
        describe: |v, t| {
            format!(
                "ROI of {:.1}% is above the excellence threshold ({:.1}%)",
                v.roi, t.excellent_roi
            )
        },
        action: "Keep the current strategy; the model is performing very well",
    },
    Rule {
        family: Family::Roi,
        kind: InsightKind::Info,
        priority: Priority::Medium,
        title: "Positive ROI",
        condition: |v, t| v.roi >= t.good_roi,
        describe: |v, _| format!("ROI of {:.1}% is in the good range", v.roi),
        action: "Satisfactory performance; monitor consistency",
    },
    Rule {
        family: Family::Roi,
        kind: InsightKind::Danger,
        priority: Priority::High,
        title: "Negative ROI",
        condition: |v, t| v.roi <= t.poor_roi,
        describe: |v, _| format!("ROI of {:.1}% is below an acceptable level", v.roi),
        action: "URGENT: review strategy, models and bet selection",
    },
    Rule {
        family: Family::WinRate,
        kind: InsightKind::Success,
        priority: Priority::Medium,
        title: "High win rate",
        condition: |v, t| v.win_rate >= t.excellent_winrate,
        describe: |v, _| format!("Win rate of {:.1}% is excellent", v.win_rate),
        action: "Model looks well calibrated; keep the selection criteria",
    },
    Rule {
        family: Family::WinRate,
        kind: InsightKind::Warning,
        priority: Priority::High,
        title: "Low win rate",
        condition: |v, t| v.win_rate <= t.poor_winrate,
        describe: |v, _| format!("Win rate of {:.1}% is below expectations", v.win_rate),
        action: "Review model calibration and confidence criteria",
    },
    Rule {
        family: Family::SampleSize,
        kind: InsightKind::Info,
        priority: Priority::Low,
        title: "Small sample",
        condition: |v, t| v.total_bets < t.min_sample_size,
        describe: |v, _| {
            format!(
                "Only {} bets; results may carry high variance",
                v.total_bets
            )
        },
        action: "Keep collecting data before drawing firm conclusions",
    },
    // Risk
    Rule {
        family: Family::Sharpe,
        kind: InsightKind::Success,
        priority: Priority::Medium,
        title: "Excellent Sharpe ratio",
        condition: |v, t| v.sharpe_ratio >= t.excellent_sharpe,
        describe: |v, _| {
            format!(
                "Sharpe of {:.2} indicates very good risk-adjusted returns",
                v.sharpe_ratio
            )
        },
        action: "Risk is well managed; continue the approach",
    },
    Rule {
        family: Family::Sharpe,
        kind: InsightKind::Warning,
        priority: Priority::High,
        title: "Low Sharpe ratio",
        condition: |v, t| v.sharpe_ratio <= t.poor_sharpe,
        describe: |v, _| {
            format!(
                "Sharpe of {:.2} means returns do not justify the risk",
                v.sharpe_ratio
            )
        },
        action: "Consider smaller stakes or stricter filters",
    },
    Rule {
        family: Family::Drawdown,
        kind: InsightKind::Danger,
        priority: Priority::High,
        title: "Dangerous drawdown",
        condition: |v, t| v.max_drawdown.abs() >= t.danger_drawdown,
        describe: |v, _| format!("Max drawdown of {:.1}% is very high", v.max_drawdown.abs()),
        action: "CRITICAL: cut exposure immediately or pause betting",
    },
    Rule {
        family: Family::Drawdown,
        kind: InsightKind::Warning,
        priority: Priority::Medium,
        title: "Elevated drawdown",
        condition: |v, t| v.max_drawdown.abs() >= t.warning_drawdown,
        describe: |v, _| {
            format!(
                "Max drawdown of {:.1}% deserves attention",
                v.max_drawdown.abs()
            )
        },
        action: "Review bankroll management and consider reducing stakes",
    },
    Rule {
        family: Family::Volatility,
        kind: InsightKind::Info,
        priority: Priority::Medium,
        title: "High volatility",
        condition: |v, t| v.volatility >= t.high_volatility,
        describe: |v, _| {
            format!(
                "Volatility of {:.1}% points to inconsistent results",
                v.volatility
            )
        },
        action: "Consider spreading across more markets or reducing stakes",
    },
    // Calibration
    Rule {
        family: Family::Brier,
        kind: InsightKind::Success,
        priority: Priority::Medium,
        title: "Excellent calibration",
        condition: |v, t| v.brier_score <= t.excellent_brier,
        describe: |v, _| {
            format!(
                "Brier score of {:.3} indicates a very well calibrated model",
                v.brier_score
            )
        },
        action: "Probabilities are accurate; trust the estimates",
    },
    Rule {
        family: Family::Brier,
        kind: InsightKind::Warning,
        priority: Priority::High,
        title: "Poorly calibrated model",
        condition: |v, t| v.brier_score >= t.poor_brier,
        describe: |v, _| {
            format!(
                "Brier score of {:.3} indicates calibration problems",
                v.brier_score
            )
        },
        action: "Review the predictive models and recalibrate probabilities",
    },
    Rule {
        family: Family::OverroundBeat,
        kind: InsightKind::Success,
        priority: Priority::Medium,
        title: "Beating the bookmaker margin",
        condition: |v, t| v.overround_beat_rate >= t.good_overround_beat,
        describe: |v, _| {
            format!(
                "{:.0}% of bets placed with positive edge",
                v.overround_beat_rate
            )
        },
        action: "Value identification is working well",
    },
    Rule {
        family: Family::OverroundBeat,
        kind: InsightKind::Warning,
        priority: Priority::Medium,
        title: "Struggling to beat the margin",
        condition: |v, t| v.overround_beat_rate <= t.poor_overround_beat,
        describe: |v, _| {
            format!(
                "Only {:.0}% of bets placed with positive edge",
                v.overround_beat_rate
            )
        },
        action: "Review the minimum edge criteria or the chosen markets",
    },
    // CLV
    Rule {
        family: Family::ClvAverage,
        kind: InsightKind::Success,
        priority: Priority::High,
        title: "Consistently positive CLV",
        condition: |v, t| v.clv_average >= t.excellent_clv,
        describe: |v, _| format!("Average CLV of {:.3} is excellent", v.clv_average),
        action: "Real edge demonstrated; continue the strategy",
    },
    Rule {
        family: Family::ClvAverage,
        kind: InsightKind::Danger,
        priority: Priority::High,
        title: "Negative CLV",
        condition: |v, t| v.clv_average <= t.poor_clv,
        describe: |v, _| {
            format!(
                "Average CLV of {:.3} indicates bad prices",
                v.clv_average
            )
        },
        action: "CRITICAL: poor timing or inaccurate models; review",
    },
    Rule {
        family: Family::ClvRate,
        kind: InsightKind::Success,
        priority: Priority::Medium,
        title: "High positive CLV rate",
        condition: |v, t| v.clv_positive_rate >= t.excellent_clv_rate,
        describe: |v, _| format!("{:.0}% of bets beat the closing line", v.clv_positive_rate),
        action: "Entry timing is very good; keep it",
    },
    Rule {
        family: Family::ClvRate,
        kind: InsightKind::Warning,
        priority: Priority::Medium,
        title: "Low positive CLV rate",
        condition: |v, t| v.clv_positive_rate <= t.poor_clv_rate,
        describe: |v, _| {
            format!(
                "Only {:.0}% of bets beat the closing line",
                v.clv_positive_rate
            )
        },
        action: "Improve timing or review market selection",
    },
    Rule {
        family: Family::ClvCorrelation,
        kind: InsightKind::Success,
        priority: Priority::Low,
        title: "CLV correlates with wins",
        condition: |v, t| v.clv_correlation > t.strong_clv_correlation,
        describe: |v, _| {
            format!(
                "Correlation of {:.2} between CLV and outcome",
                v.clv_correlation
            )
        },
        action: "CLV is a good predictor; keep focusing on it",
    },
    // Streaks
    Rule {
        family: Family::LosingStreak,
        kind: InsightKind::Warning,
        priority: Priority::High,
        title: "Losing streak",
        condition: |v, t| {
            v.current_streak_kind == StreakKind::Loss
                && v.current_streak_count >= t.losing_streak_alert
        },
        describe: |v, _| format!("{} consecutive losses", v.current_streak_count),
        action: "Avoid emotional decisions; stay disciplined",
    },
    Rule {
        family: Family::LongestLosingStreak,
        kind: InsightKind::Info,
        priority: Priority::Low,
        title: "Long losing streak on record",
        condition: |v, t| v.longest_lose_streak >= t.long_losing_streak,
        describe: |v, _| {
            format!(
                "Longest streak was {} losses",
                v.longest_lose_streak
            )
        },
        action: "Normal in betting; make sure the bankroll can absorb it",
    },
    Rule {
        family: Family::Recovery,
        kind: InsightKind::Success,
        priority: Priority::Low,
        title: "Good recovery",
        condition: |v, t| v.win_after_loss >= t.recovery_win_rate,
        describe: |v, _| format!("{:.0}% wins right after a loss", v.win_after_loss),
        action: "No apparent tilt; discipline holds",
    },
    // Bankroll
    Rule {
        family: Family::BankrollGrowth,
        kind: InsightKind::Success,
        priority: Priority::High,
        title: "Excellent growth",
        condition: |v, t| v.bankroll_growth >= t.good_bankroll_growth,
        describe: |v, _| format!("Bankroll grew {:.1}%", v.bankroll_growth),
        action: "Exceptional performance; document the strategy",
    },
    Rule {
        family: Family::BankrollGrowth,
        kind: InsightKind::Danger,
        priority: Priority::High,
        title: "Significant loss",
        condition: |v, t| v.bankroll_growth <= t.bad_bankroll_growth,
        describe: |v, _| format!("Bankroll fell {:.1}%", v.bankroll_growth.abs()),
        action: "URGENT: pause and reassess completely",
    },
    Rule {
        family: Family::Kelly,
        kind: InsightKind::Info,
        priority: Priority::Low,
        title: "Kelly suggests larger stakes",
        condition: |v, t| v.kelly_average >= t.high_kelly,
        describe: |v, _| format!("Average Kelly of {:.1}% of bankroll", v.kelly_average),
        action: "Consider larger stakes if comfortable with the risk",
    },
    Rule {
        family: Family::ExpectedValue,
        kind: InsightKind::Success,
        priority: Priority::Medium,
        title: "Strong positive EV",
        condition: |v, t| v.ev_per_bet > t.strong_ev,
        describe: |v, _| format!("Average EV of {:.2} per bet", v.ev_per_bet),
        action: "Mathematical edge demonstrated; continue",
    },
];

/// Rule-based insight generator over one metrics result
pub struct InsightGenerator {
    view: MetricsView,
    thresholds: Thresholds,
}

impl InsightGenerator {
    pub fn new(metrics: &MetricsResult, thresholds: Thresholds) -> Self {
        Self {
            view: MetricsView::from(metrics),
            thresholds,
        }
    }

    pub fn with_defaults(metrics: &MetricsResult) -> Self {
        Self::new(metrics, Thresholds::default())
    }

    /// The full rule table in evaluation order
    pub fn rules() -> &'static [Rule] {
        RULES
    }

    pub fn view(&self) -> &MetricsView {
        &self.view
    }

    /// Every triggered insight, ascending priority (evaluation order within a priority)
    pub fn generate_all_insights(&self) -> Vec<Insight> {
        let mut matched: Vec<Family> = Vec::new();
        let mut insights = Vec::new();

        for rule in RULES {
            if matched.contains(&rule.family) {
                continue;
            }
            if let Some(insight) = rule.evaluate(&self.view, &self.thresholds) {
                matched.push(rule.family);
                insights.push(insight);
            }
        }

        insights.sort_by_key(|i| i.priority);
        insights
    }

    pub fn get_top_insights(&self, n: usize) -> Vec<Insight> {
        let mut insights = self.generate_all_insights();
        insights.truncate(n);
        insights
    }

    pub fn get_insights_by_type(&self, kind: InsightKind) -> Vec<Insight> {
        self.generate_all_insights()
            .into_iter()
            .filter(|i| i.kind == kind)
            .collect()
    }
}
