//! Bet history loading

pub mod bet_loader;

// Re-export commonly used types
pub use bet_loader::{load_bets, parse_timestamp, BetRecord, LoadOptions};
