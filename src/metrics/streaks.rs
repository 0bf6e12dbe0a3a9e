//! Streak and consistency metrics

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::settled_chronological;
use crate::models::{Bet, BetStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakKind {
    Win,
    Loss,
    #[default]
    None,
}

/// Run of identical outcomes at the end of the settled history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentStreak {
    #[serde(rename = "type")]
    pub kind: StreakKind,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakMetrics {
    pub current_streak: CurrentStreak,
    pub longest_win_streak: u32,
    pub longest_lose_streak: u32,
    pub average_win_streak: f64,
    pub average_lose_streak: f64,
    /// Win rate on the bet following a loss (0-1)
    pub win_after_loss: f64,
    /// Win rate on the bet following a win (0-1)
    pub win_after_win: f64,
    /// Longest run of profitable days among days that had settlements
    pub consecutive_profitable_days: u32,
}

/// Calculate streak metrics over settled bets in settlement order
pub fn calculate(bets: &[Bet]) -> StreakMetrics {
    let ordered = settled_chronological(bets);
    if ordered.is_empty() {
        return StreakMetrics::default();
    }

    let outcomes: Vec<bool> = ordered.iter().map(|b| b.won()).collect();
    let runs = run_lengths(&outcomes);

    let current_streak = runs
        .last()
        .map(|&(won, count)| CurrentStreak {
            kind: if won { StreakKind::Win } else { StreakKind::Loss },
            count,
        })
        .unwrap_or_default();

    let (longest_win_streak, longest_lose_streak) = longest_streaks(&outcomes);

    let win_runs: Vec<u32> = runs.iter().filter(|r| r.0).map(|r| r.1).collect();
    let lose_runs: Vec<u32> = runs.iter().filter(|r| !r.0).map(|r| r.1).collect();

    debug!(settled = ordered.len(), runs = runs.len(), "streak metrics");

    StreakMetrics {
        current_streak,
        longest_win_streak,
        longest_lose_streak,
        average_win_streak: average_run(&win_runs),
        average_lose_streak: average_run(&lose_runs),
        win_after_loss: win_rate_after(&ordered, BetStatus::Lost),
        win_after_win: win_rate_after(&ordered, BetStatus::Won),
        consecutive_profitable_days: consecutive_profitable_days(&ordered),
    }
}

/// Run-length encode outcomes into `(won, length)` pairs
fn run_lengths(outcomes: &[bool]) -> Vec<(bool, u32)> {
    let mut runs: Vec<(bool, u32)> = Vec::new();
    for &won in outcomes {
        match runs.last_mut() {
            Some((kind, count)) if *kind == won => *count += 1,
            _ => runs.push((won, 1)),
        }
    }
    runs
}

fn longest_streaks(outcomes: &[bool]) -> (u32, u32) {
    let mut longest_win = 0;
    let mut longest_lose = 0;
    let mut current_win = 0;
    let mut current_lose = 0;

    for &won in outcomes {
        if won {
            current_win += 1;
            current_lose = 0;
            longest_win = longest_win.max(current_win);
        } else {
            current_lose += 1;
            current_win = 0;
            longest_lose = longest_lose.max(current_lose);
        }
    }

    (longest_win, longest_lose)
}

fn average_run(runs: &[u32]) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    runs.iter().sum::<u32>() as f64 / runs.len() as f64
}

/// Share of bets won immediately after a bet with status `previous`
fn win_rate_after(ordered: &[&Bet], previous: BetStatus) -> f64 {
    let mut total_after = 0;
    let mut wins_after = 0;

    for pair in ordered.windows(2) {
        if pair[0].status == previous {
            total_after += 1;
            if pair[1].won() {
                wins_after += 1;
            }
        }
    }

    if total_after == 0 {
        return 0.0;
    }
    wins_after as f64 / total_after as f64
}

/// Longest run of positive-profit days over the sorted active days
///
/// Days without any settlement are skipped, not treated as breaks.
fn consecutive_profitable_days(ordered: &[&Bet]) -> u32 {
    let mut daily_profits: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for bet in ordered {
        if let Some(settled_at) = bet.settled_at {
            *daily_profits.entry(settled_at.date_naive()).or_insert(0.0) += bet.profit_or_zero();
        }
    }

    let mut max_consecutive = 0;
    let mut current = 0;
    for profit in daily_profits.values() {
        if *profit > 0.0 {
            current += 1;
            max_consecutive = max_consecutive.max(current);
        } else {
            current = 0;
        }
    }

    max_consecutive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::{day, evens};

    #[test]
    fn test_streak_example() {
        let metrics = calculate(&evens(&[true, true, false, true]));
        assert_eq!(metrics.longest_win_streak, 2);
        assert_eq!(metrics.longest_lose_streak, 1);
        assert_eq!(
            metrics.current_streak,
            CurrentStreak {
                kind: StreakKind::Win,
                count: 1
            }
        );
        assert!((metrics.average_win_streak - 1.5).abs() < 1e-9);
        assert!((metrics.average_lose_streak - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_streak_empty() {
        let metrics = calculate(&[Bet::new(1, 2.0, 10.0, 0.6)]);
        assert_eq!(metrics.current_streak.kind, StreakKind::None);
        assert_eq!(metrics.current_streak.count, 0);
        assert_eq!(metrics, StreakMetrics::default());
    }

    #[test]
    fn test_current_losing_streak() {
        let metrics = calculate(&evens(&[true, false, false, false]));
        assert_eq!(metrics.current_streak.kind, StreakKind::Loss);
        assert_eq!(metrics.current_streak.count, 3);
        assert!(metrics.longest_lose_streak >= metrics.current_streak.count);
    }

    #[test]
    fn test_current_streak_uses_settlement_order() {
        let mut bets = evens(&[true, true, false]);
        // the loss settled first
        bets[2].settled_at = Some(day(-1));
        let metrics = calculate(&bets);
        assert_eq!(metrics.current_streak.kind, StreakKind::Win);
        assert_eq!(metrics.current_streak.count, 2);
    }

    #[test]
    fn test_win_after_outcome() {
        // pairs: (W,W) (W,L) (L,W) (W,L) (L,L)
        let metrics = calculate(&evens(&[true, true, false, true, false, false]));
        assert!((metrics.win_after_win - 1.0 / 3.0).abs() < 1e-9);
        assert!((metrics.win_after_loss - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_consecutive_profitable_days_skips_idle_days() {
        let mut bets = evens(&[true, true, false, true]);
        // days 0, 5, 6, 20: the gaps do not break the run
        bets[1].settled_at = Some(day(5));
        bets[2].settled_at = Some(day(6));
        bets[3].settled_at = Some(day(20));
        let metrics = calculate(&bets);
        assert_eq!(metrics.consecutive_profitable_days, 2);

        let all_winning = calculate(&evens(&[true, true, true]));
        assert_eq!(all_winning.consecutive_profitable_days, 3);
    }

    #[test]
    fn test_streak_serializes_type_field() {
        let streak = CurrentStreak {
            kind: StreakKind::Loss,
            count: 4,
        };
        let json = serde_json::to_value(streak).unwrap();
        assert_eq!(json["type"], "loss");
        assert_eq!(json["count"], 4);
    }
}
