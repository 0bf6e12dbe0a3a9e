//! Core numeric building blocks

pub mod kelly;
pub mod stats;

// Re-export commonly used types
pub use kelly::{calculate_kelly_fraction, expected_value, KellyCalculator, KELLY_CAP};
pub use stats::{mean, pct, pearson, percentile, round_to, std_dev};
