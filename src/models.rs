use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{
    validate_confidence, validate_odds, validate_probability, validate_settlement, validate_stake,
    AnalyticsError,
};

/// Lifecycle state of a bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Void,
    Cashout,
}

impl BetStatus {
    /// Won or lost (void and cashout are not graded outcomes)
    pub fn is_settled(self) -> bool {
        matches!(self, BetStatus::Won | BetStatus::Lost)
    }
}

impl std::str::FromStr for BetStatus {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BetStatus::Pending),
            "won" | "win" => Ok(BetStatus::Won),
            "lost" | "loss" => Ok(BetStatus::Lost),
            "void" => Ok(BetStatus::Void),
            "cashout" => Ok(BetStatus::Cashout),
            other => Err(AnalyticsError::Validation(format!(
                "Unknown bet status: {}",
                other
            ))),
        }
    }
}

/// One paper-traded bet as supplied by the bet repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: i64,
    pub bookmaker: String,
    pub market_type: String,
    pub selection: String,
    #[serde(default)]
    pub sport: Option<String>,
    pub odds: f64,
    pub stake: f64,
    pub model_probability: f64,
    pub implied_probability: f64,
    pub edge: f64,
    pub confidence: f64,
    pub status: BetStatus,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub closing_odds: Option<f64>,
    #[serde(default)]
    pub clv: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub settled_at: Option<DateTime<Utc>>,
}

/// Closing line value in probability space: positive means the price taken beat the close
pub fn clv_from_odds(odds: f64, closing_odds: f64) -> f64 {
    1.0 / odds - 1.0 / closing_odds
}

impl Bet {
    /// New pending bet with implied probability and edge derived from the price
    pub fn new(id: i64, odds: f64, stake: f64, model_probability: f64) -> Self {
        let implied_probability = if odds > 0.0 { 1.0 / odds } else { 0.0 };
        Self {
            id,
            bookmaker: String::new(),
            market_type: String::new(),
            selection: String::new(),
            sport: None,
            odds,
            stake,
            model_probability,
            implied_probability,
            edge: model_probability - implied_probability,
            confidence: model_probability,
            status: BetStatus::Pending,
            confirmed: true,
            profit: None,
            closing_odds: None,
            clv: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            settled_at: None,
        }
    }

    pub fn with_sport(mut self, sport: &str) -> Self {
        self.sport = Some(sport.to_string());
        self
    }

    pub fn with_market(mut self, market_type: &str) -> Self {
        self.market_type = market_type.to_string();
        self
    }

    pub fn with_bookmaker(mut self, bookmaker: &str) -> Self {
        self.bookmaker = bookmaker.to_string();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn created(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Record the closing price and the CLV it implies
    pub fn with_closing_odds(mut self, closing_odds: f64) -> Self {
        self.closing_odds = Some(closing_odds);
        self.clv = Some(clv_from_odds(self.odds, closing_odds));
        self
    }

    /// Grade the bet; profit is `stake * (odds - 1)` on a win and `-stake` on a loss
    pub fn settle(mut self, won: bool, settled_at: DateTime<Utc>) -> Self {
        if won {
            self.status = BetStatus::Won;
            self.profit = Some(self.stake * (self.odds - 1.0));
        } else {
            self.status = BetStatus::Lost;
            self.profit = Some(-self.stake);
        }
        self.settled_at = Some(settled_at);
        self
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }

    pub fn won(&self) -> bool {
        self.status == BetStatus::Won
    }

    pub fn is_pending(&self) -> bool {
        self.status == BetStatus::Pending
    }

    /// Booked profit, 0.0 when a settled bet has none recorded
    pub fn profit_or_zero(&self) -> f64 {
        self.profit.unwrap_or(0.0)
    }

    /// Per-unit return `profit / stake`
    pub fn unit_return(&self) -> f64 {
        if self.stake == 0.0 {
            return 0.0;
        }
        self.profit_or_zero() / self.stake
    }

    /// Sport tag for grouping, `"Unknown"` when untagged
    pub fn sport_or_unknown(&self) -> &str {
        self.sport.as_deref().unwrap_or("Unknown")
    }

    /// Check the repository invariants
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        validate_odds(self.odds)
            .and_then(|_| validate_stake(self.stake))
            .and_then(|_| validate_probability(self.model_probability))
            .and_then(|_| validate_confidence(self.confidence))
            .and_then(|_| {
                validate_settlement(
                    self.is_settled(),
                    self.profit.is_some(),
                    self.settled_at.is_some(),
                )
            })
            .map_err(|e| e.for_bet(self.id))
    }
}
