//! Calibration metrics
//!
//! How well model probabilities match realized outcomes: Brier score,
//! log loss and binned expected calibration error (ECE).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::settled;
use crate::models::Bet;

/// Clamp for probabilities entering the log loss
const LOG_LOSS_EPSILON: f64 = 1e-15;

/// Number of equal-width calibration bins over [0, 1]
pub const CALIBRATION_BINS: usize = 10;

/// One non-empty calibration bin `[bin_start, bin_end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub bin_start: f64,
    pub bin_end: f64,
    /// Mean predicted probability
    pub predicted: f64,
    /// Observed win frequency
    pub actual: f64,
    pub count: usize,
    pub error: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetrics {
    pub brier_score: f64,
    pub log_loss: f64,
    /// Expected calibration error
    pub calibration_error: f64,
    /// Share of settled bets placed with positive edge (0-1)
    pub overround_beat_rate: f64,
    pub calibration_bins: Vec<CalibrationBin>,
}

/// Calculate calibration metrics over settled bets
pub fn calculate(bets: &[Bet]) -> CalibrationMetrics {
    let settled = settled(bets);
    if settled.is_empty() {
        return CalibrationMetrics::default();
    }

    let predicted: Vec<f64> = settled.iter().map(|b| b.model_probability).collect();
    let actual: Vec<f64> = settled
        .iter()
        .map(|b| if b.won() { 1.0 } else { 0.0 })
        .collect();
    let n = predicted.len() as f64;

    let brier_score = predicted
        .iter()
        .zip(&actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum::<f64>()
        / n;

    let log_loss = -predicted
        .iter()
        .zip(&actual)
        .map(|(p, a)| {
            let p = p.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
            a * p.ln() + (1.0 - a) * (1.0 - p).ln()
        })
        .sum::<f64>()
        / n;

    let (calibration_error, calibration_bins) = calculate_calibration_error(&predicted, &actual);

    let positive_edge = settled.iter().filter(|b| b.edge > 0.0).count();
    let overround_beat_rate = positive_edge as f64 / settled.len() as f64;

    debug!(
        settled = settled.len(),
        bins = calibration_bins.len(),
        "calibration metrics"
    );

    CalibrationMetrics {
        brier_score,
        log_loss,
        calibration_error,
        overround_beat_rate,
        calibration_bins,
    }
}

/// Population-weighted mean gap between predicted and observed frequency
///
/// Bin `k` covers `[k/10, (k+1)/10)`; empty bins are omitted.
fn calculate_calibration_error(predicted: &[f64], actual: &[f64]) -> (f64, Vec<CalibrationBin>) {
    let mut sums = [(0.0_f64, 0.0_f64, 0_usize); CALIBRATION_BINS];

    for (&p, &a) in predicted.iter().zip(actual) {
        let Some(k) = (0..CALIBRATION_BINS).find(|&k| {
            let start = k as f64 / CALIBRATION_BINS as f64;
            let end = (k + 1) as f64 / CALIBRATION_BINS as f64;
            p >= start && p < end
        }) else {
            continue;
        };
        sums[k].0 += p;
        sums[k].1 += a;
        sums[k].2 += 1;
    }

    let mut bins = Vec::new();
    let mut total_error = 0.0;
    let mut total_count = 0;

    for (k, &(p_sum, a_sum, count)) in sums.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let predicted = p_sum / count as f64;
        let actual = a_sum / count as f64;
        let error = (predicted - actual).abs();

        total_error += error * count as f64;
        total_count += count;

        bins.push(CalibrationBin {
            bin_start: k as f64 / CALIBRATION_BINS as f64,
            bin_end: (k + 1) as f64 / CALIBRATION_BINS as f64,
            predicted,
            actual,
            count,
            error,
        });
    }

    let ece = if total_count > 0 {
        total_error / total_count as f64
    } else {
        0.0
    };

    (ece, bins)
}
