use thiserror::Error;

/// Errors raised at the edges of the analytics engine (loading, config, validation)
///
/// The metric calculators themselves never fail; they return zero-valued records.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] polars::error::PolarsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid bet {id}: {reason}")]
    InvalidBet { id: i64, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}

impl AnalyticsError {
    /// Attach a bet id to a field-level validation failure
    pub fn for_bet(self, id: i64) -> Self {
        match self {
            AnalyticsError::Validation(reason) => AnalyticsError::InvalidBet { id, reason },
            other => other,
        }
    }
}

/// Validation functions
pub fn validate_odds(odds: f64) -> Result<(), AnalyticsError> {
    if !odds.is_finite() || odds <= 1.0 {
        return Err(AnalyticsError::Validation(format!(
            "Odds must be greater than 1, got {}",
            odds
        )));
    }
    Ok(())
}

pub fn validate_stake(stake: f64) -> Result<(), AnalyticsError> {
    if !stake.is_finite() || stake <= 0.0 {
        return Err(AnalyticsError::Validation(format!(
            "Stake must be positive, got {}",
            stake
        )));
    }
    Ok(())
}

/// Model probability must lie strictly inside (0, 1)
pub fn validate_probability(prob: f64) -> Result<(), AnalyticsError> {
    if !(prob > 0.0 && prob < 1.0) {
        return Err(AnalyticsError::Validation(format!(
            "Probability must be between 0 and 1 (exclusive), got {}",
            prob
        )));
    }
    Ok(())
}

pub fn validate_confidence(confidence: f64) -> Result<(), AnalyticsError> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AnalyticsError::Validation(format!(
            "Confidence must be between 0 and 1, got {}",
            confidence
        )));
    }
    Ok(())
}

/// Profit is present iff the bet is won/lost and has a settlement timestamp
pub fn validate_settlement(
    settled: bool,
    has_profit: bool,
    has_settled_at: bool,
) -> Result<(), AnalyticsError> {
    if has_profit && !(settled && has_settled_at) {
        return Err(AnalyticsError::Validation(
            "Profit recorded on a bet that is not settled".to_string(),
        ));
    }
    if settled && !has_settled_at {
        return Err(AnalyticsError::Validation(
            "Settled bet is missing settled_at".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_odds() {
        assert!(validate_odds(1.01).is_ok());
        assert!(validate_odds(5.5).is_ok());
        assert!(validate_odds(1.0).is_err());
        assert!(validate_odds(0.5).is_err());
        assert!(validate_odds(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_stake() {
        assert!(validate_stake(10.0).is_ok());
        assert!(validate_stake(0.0).is_err());
        assert!(validate_stake(-5.0).is_err());
    }

    #[test]
    fn test_validate_probability() {
        assert!(validate_probability(0.5).is_ok());
        assert!(validate_probability(0.0).is_err());
        assert!(validate_probability(1.0).is_err());
        assert!(validate_probability(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_confidence() {
        assert!(validate_confidence(0.0).is_ok());
        assert!(validate_confidence(1.0).is_ok());
        assert!(validate_confidence(1.1).is_err());
    }

    #[test]
    fn test_validate_settlement() {
        assert!(validate_settlement(true, true, true).is_ok());
        assert!(validate_settlement(false, false, false).is_ok());
        // settled but profit not yet booked is tolerated
        assert!(validate_settlement(true, false, true).is_ok());
        assert!(validate_settlement(false, true, true).is_err());
        assert!(validate_settlement(true, true, false).is_err());
    }

    #[test]
    fn test_for_bet_attaches_id() {
        let err = validate_odds(1.0).unwrap_err().for_bet(42);
        assert!(err.to_string().starts_with("Invalid bet 42"));
    }
}
