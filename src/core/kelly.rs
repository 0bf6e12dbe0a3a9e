//! Kelly Criterion Bet Sizing
//!
//! Suggested bankroll fraction and expected value for settled bets.
//!
//! The Kelly criterion formula:
//!     f* = (b*p - q) / b
//!
//! Where:
//!     f* = fraction of bankroll to bet
//!     b = odds - 1 (net odds)
//!     p = model probability of winning
//!     q = 1 - p (probability of losing)
//!     odds = decimal odds (e.g., 2.0 means 2x return)

use serde::{Deserialize, Serialize};

/// Upper bound applied to every per-bet Kelly fraction (10% of bankroll)
pub const KELLY_CAP: f64 = 0.10;

/// Calculate the raw Kelly fraction for a single bet
///
/// # Arguments
/// * `probability` - Model probability of winning (0-1)
/// * `odds` - Decimal odds
///
/// # Returns
/// Kelly fraction (negative when the bet has no edge, 0 when odds <= 1)
///
/// # Examples
/// ```
/// use betlens::core::kelly::calculate_kelly_fraction;
/// let kelly = calculate_kelly_fraction(0.6, 2.0); // (1 * 0.6 - 0.4) / 1
/// assert!((kelly - 0.2).abs() < 1e-12);
/// ```
pub fn calculate_kelly_fraction(probability: f64, odds: f64) -> f64 {
    if odds <= 1.0 {
        return 0.0;
    }

    let b = odds - 1.0;
    let q = 1.0 - probability;
    (b * probability - q) / b
}

/// Expected profit of a bet in currency units
///
/// EV = p * stake * (odds - 1) - (1 - p) * stake
pub fn expected_value(probability: f64, odds: f64, stake: f64) -> f64 {
    probability * stake * (odds - 1.0) - (1.0 - probability) * stake
}

/// Kelly calculator producing clamped, optionally fractional, stake suggestions
///
/// Supports:
/// - Full Kelly clamped to `cap` (default 10%)
/// - Fractional Kelly via `multiplier` applied after clamping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellyCalculator {
    pub multiplier: f64,
    pub cap: f64,
}

impl KellyCalculator {
    /// Create a new Kelly calculator
    ///
    /// # Arguments
    /// * `multiplier` - Fraction of Kelly to use (1.0 = full, 0.25 = quarter Kelly)
    /// * `cap` - Maximum fraction per bet before the multiplier is applied
    pub fn new(multiplier: f64, cap: f64) -> Self {
        Self { multiplier, cap }
    }

    /// Full Kelly clamped to [`KELLY_CAP`]
    pub fn with_defaults() -> Self {
        Self::new(1.0, KELLY_CAP)
    }

    /// Clamped Kelly fraction for one bet
    ///
    /// Returns `None` for malformed prices (`odds <= 1`), which callers skip.
    pub fn clamped_fraction(&self, probability: f64, odds: f64) -> Option<f64> {
        if odds <= 1.0 {
            return None;
        }

        let kelly = calculate_kelly_fraction(probability, odds);
        Some(kelly.clamp(0.0, self.cap) * self.multiplier)
    }

    /// Average clamped fraction over `(probability, odds)` pairs
    ///
    /// Pairs with `odds <= 1` are excluded; 0.0 if none qualify.
    pub fn average_fraction(&self, bets: &[(f64, f64)]) -> f64 {
        let fractions: Vec<f64> = bets
            .iter()
            .filter_map(|(p, o)| self.clamped_fraction(*p, *o))
            .collect();

        if fractions.is_empty() {
            return 0.0;
        }
        fractions.iter().sum::<f64>() / fractions.len() as f64
    }
}

impl Default for KellyCalculator {
    fn default() -> Self {
        Self::with_defaults()
    }
}
