//! Bet history loading from JSON or CSV snapshots

use chrono::{DateTime, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::error::AnalyticsError;
use crate::models::{clv_from_odds, Bet, BetStatus};

/// How a snapshot is turned into bets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Keep only bets whose intent was confirmed
    pub confirmed_only: bool,
    /// Fail on the first invalid row instead of skipping it
    pub strict: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            confirmed_only: true,
            strict: false,
        }
    }
}

/// One row of a snapshot before validation
///
/// Derived fields (implied probability, edge, CLV, confidence) are filled in
/// from odds and probability when the source omits them.
#[derive(Debug, Clone, Deserialize)]
pub struct BetRecord {
    pub id: i64,
    #[serde(default)]
    pub bookmaker: String,
    #[serde(default)]
    pub market_type: String,
    #[serde(default)]
    pub selection: String,
    #[serde(default)]
    pub sport: Option<String>,
    pub odds: f64,
    pub stake: f64,
    pub model_probability: f64,
    #[serde(default)]
    pub implied_probability: Option<f64>,
    #[serde(default)]
    pub edge: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub status: BetStatus,
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub closing_odds: Option<f64>,
    #[serde(default)]
    pub clv: Option<f64>,
    pub created_at: String,
    #[serde(default)]
    pub settled_at: Option<String>,
}

fn default_confirmed() -> bool {
    true
}

impl BetRecord {
    /// Build a validated bet
    pub fn into_bet(self) -> Result<Bet, AnalyticsError> {
        let id = self.id;
        let created_at = parse_timestamp(&self.created_at).map_err(|e| e.for_bet(id))?;
        let settled_at = match self.settled_at.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(parse_timestamp(s).map_err(|e| e.for_bet(id))?),
            _ => None,
        };

        let implied_probability = self
            .implied_probability
            .unwrap_or(if self.odds > 0.0 { 1.0 / self.odds } else { 0.0 });
        let edge = self
            .edge
            .unwrap_or(self.model_probability - implied_probability);
        let clv = self
            .clv
            .or_else(|| self.closing_odds.map(|closing| clv_from_odds(self.odds, closing)));

        let bet = Bet {
            id,
            bookmaker: self.bookmaker,
            market_type: self.market_type,
            selection: self.selection,
            sport: self.sport.filter(|s| !s.is_empty()),
            odds: self.odds,
            stake: self.stake,
            model_probability: self.model_probability,
            implied_probability,
            edge,
            confidence: self.confidence.unwrap_or(self.model_probability),
            status: self.status,
            confirmed: self.confirmed,
            profit: self.profit,
            closing_odds: self.closing_odds,
            clv,
            created_at,
            settled_at,
        };

        bet.validate()?;
        Ok(bet)
    }
}

/// Parse RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as UTC)
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AnalyticsError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AnalyticsError::Validation(format!("Invalid timestamp: '{}'", value)))
}

/// Load bets from a `.json` array or a `.csv` file
///
/// # Arguments
/// * `path` - Snapshot file
/// * `options` - Confirmed-only filtering and strictness
pub fn load_bets<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Vec<Bet>, AnalyticsError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let records = match extension.as_str() {
        "json" => {
            let content = std::fs::read_to_string(path)?;
            parse_json_records(&content)?
        }
        "csv" => read_csv_records(path)?,
        other => {
            return Err(AnalyticsError::UnsupportedFormat(format!(
                "'{}' (expected .json or .csv)",
                other
            )))
        }
    };

    let total = records.len();
    let mut bets = Vec::with_capacity(total);
    let mut skipped = 0;

    for record in records {
        match record.and_then(BetRecord::into_bet) {
            Ok(bet) => bets.push(bet),
            Err(e) if options.strict => return Err(e),
            Err(e) => {
                warn!(error = %e, "skipping invalid bet");
                skipped += 1;
            }
        }
    }

    if options.confirmed_only {
        bets.retain(|b| b.confirmed);
    }

    info!(
        path = %path.display(),
        rows = total,
        loaded = bets.len(),
        skipped,
        "loaded bet history"
    );

    Ok(bets)
}

/// Rows parsed one at a time so a malformed row fails alone
type RowResults = Vec<Result<BetRecord, AnalyticsError>>;

fn parse_json_records(content: &str) -> Result<RowResults, AnalyticsError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(content)?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let id = row
                .get("id")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(i as i64);
            serde_json::from_value::<BetRecord>(row).map_err(|e| AnalyticsError::InvalidBet {
                id,
                reason: e.to_string(),
            })
        })
        .collect())
}

fn read_csv_records(path: &Path) -> Result<RowResults, AnalyticsError> {
    let df = LazyCsvReader::new(path).finish()?.collect()?;

    dataframe_to_records(&df)
}

fn f64_column(df: &DataFrame, name: &str) -> PolarsResult<Float64Chunked> {
    Ok(df.column(name)?.cast(&DataType::Float64)?.f64()?.clone())
}

fn optional_f64_column(df: &DataFrame, name: &str) -> PolarsResult<Option<Float64Chunked>> {
    match df.column(name) {
        Ok(series) => Ok(Some(series.cast(&DataType::Float64)?.f64()?.clone())),
        Err(_) => Ok(None),
    }
}

fn optional_str_column(df: &DataFrame, name: &str) -> PolarsResult<Option<StringChunked>> {
    match df.column(name) {
        Ok(series) => Ok(Some(series.cast(&DataType::String)?.str()?.clone())),
        Err(_) => Ok(None),
    }
}

fn str_column(df: &DataFrame, name: &str) -> PolarsResult<StringChunked> {
    Ok(df.column(name)?.cast(&DataType::String)?.str()?.clone())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "t"
    )
}

/// Convert a DataFrame to bet records
///
/// Required columns: id, odds, stake, model_probability, status, created_at.
/// A missing column fails the whole frame; a bad value fails only its row.
fn dataframe_to_records(df: &DataFrame) -> Result<RowResults, AnalyticsError> {
    let id_col = df.column("id")?.cast(&DataType::Int64)?;
    let id_col = id_col.i64()?;
    let odds_col = f64_column(df, "odds")?;
    let stake_col = f64_column(df, "stake")?;
    let prob_col = f64_column(df, "model_probability")?;
    let status_col = str_column(df, "status")?;
    let created_col = str_column(df, "created_at")?;

    let bookmaker_col = optional_str_column(df, "bookmaker")?;
    let market_col = optional_str_column(df, "market_type")?;
    let selection_col = optional_str_column(df, "selection")?;
    let sport_col = optional_str_column(df, "sport")?;
    let confirmed_col = optional_str_column(df, "confirmed")?;
    let settled_col = optional_str_column(df, "settled_at")?;
    let implied_col = optional_f64_column(df, "implied_probability")?;
    let edge_col = optional_f64_column(df, "edge")?;
    let confidence_col = optional_f64_column(df, "confidence")?;
    let profit_col = optional_f64_column(df, "profit")?;
    let closing_col = optional_f64_column(df, "closing_odds")?;
    let clv_col = optional_f64_column(df, "clv")?;

    let text = |col: &Option<StringChunked>, i: usize| -> Option<String> {
        col.as_ref()
            .and_then(|c| c.get(i))
            .map(|s| s.to_string())
    };
    let number = |col: &Option<Float64Chunked>, i: usize| col.as_ref().and_then(|c| c.get(i));

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let id = id_col.get(i).unwrap_or(i as i64);
        let status = match status_col.get(i).map(str::parse::<BetStatus>) {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                records.push(Err(e.for_bet(id)));
                continue;
            }
            None => {
                records.push(Err(AnalyticsError::InvalidBet {
                    id,
                    reason: "missing status".to_string(),
                }));
                continue;
            }
        };

        records.push(Ok(BetRecord {
            id,
            bookmaker: text(&bookmaker_col, i).unwrap_or_default(),
            market_type: text(&market_col, i).unwrap_or_default(),
            selection: text(&selection_col, i).unwrap_or_default(),
            sport: text(&sport_col, i),
            odds: odds_col.get(i).unwrap_or(0.0),
            stake: stake_col.get(i).unwrap_or(0.0),
            model_probability: prob_col.get(i).unwrap_or(0.0),
            implied_probability: number(&implied_col, i),
            edge: number(&edge_col, i),
            confidence: number(&confidence_col, i),
            status,
            confirmed: text(&confirmed_col, i).map_or(true, |v| parse_bool(&v)),
            profit: number(&profit_col, i),
            closing_odds: number(&closing_col, i),
            clv: number(&clv_col, i),
            created_at: created_col.get(i).unwrap_or("").to_string(),
            settled_at: text(&settled_col, i),
        }));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const JSON_SNAPSHOT: &str = r#"[
        {"id": 1, "bookmaker": "pinnacle", "market_type": "match_winner", "selection": "Team A",
         "sport": "valorant", "odds": 2.0, "stake": 10.0, "model_probability": 0.6,
         "status": "won", "profit": 10.0, "closing_odds": 1.8,
         "created_at": "2024-01-01T10:00:00Z", "settled_at": "2024-01-01T18:00:00Z"},
        {"id": 2, "odds": 2.5, "stake": 10.0, "model_probability": 0.45,
         "status": "pending", "confirmed": false, "created_at": "2024-01-02 09:30:00"},
        {"id": 3, "odds": 1.0, "stake": 10.0, "model_probability": 0.5,
         "status": "pending", "created_at": "2024-01-02 09:30:00"}
    ]"#;

    #[test]
    fn test_load_json_fills_derived_fields() {
        let file = write_temp(".json", JSON_SNAPSHOT);
        let options = LoadOptions {
            confirmed_only: false,
            strict: false,
        };
        let bets = load_bets(file.path(), &options).unwrap();
        // odds 1.0 is skipped
        assert_eq!(bets.len(), 2);

        let first = &bets[0];
        assert!((first.implied_probability - 0.5).abs() < 1e-12);
        assert!((first.edge - 0.1).abs() < 1e-12);
        assert!((first.confidence - 0.6).abs() < 1e-12);
        assert!((first.clv.unwrap() - (0.5 - 1.0 / 1.8)).abs() < 1e-12);
        assert_eq!(first.sport.as_deref(), Some("valorant"));
        assert!(first.settled_at.is_some());
    }

    #[test]
    fn test_confirmed_only_default() {
        let file = write_temp(".json", JSON_SNAPSHOT);
        let bets = load_bets(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].id, 1);
    }

    #[test]
    fn test_strict_rejects_invalid_rows() {
        let file = write_temp(".json", JSON_SNAPSHOT);
        let options = LoadOptions {
            confirmed_only: false,
            strict: true,
        };
        let err = load_bets(file.path(), &options).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidBet { id: 3, .. }));
    }

    #[test]
    fn test_load_csv() {
        let csv = "\
id,bookmaker,market_type,sport,odds,stake,model_probability,status,confirmed,profit,closing_odds,created_at,settled_at
1,pinnacle,match_winner,cs2,2.0,10,0.6,won,true,10.0,2.2,2024-01-01 10:00:00,2024-01-01 20:00:00
2,bet365,map_winner,,1.8,20,0.58,lost,true,-20.0,,2024-01-02 10:00:00,2024-01-02 20:00:00
3,bet365,map_winner,cs2,3.0,5,0.4,pending,false,,,2024-01-03 10:00:00,
";
        let file = write_temp(".csv", csv);
        let options = LoadOptions {
            confirmed_only: false,
            strict: true,
        };
        let bets = load_bets(file.path(), &options).unwrap();
        assert_eq!(bets.len(), 3);

        assert_eq!(bets[0].status, BetStatus::Won);
        assert!((bets[0].clv.unwrap() - (0.5 - 1.0 / 2.2)).abs() < 1e-12);
        assert!((bets[1].stake - 20.0).abs() < 1e-12);
        assert!(bets[1].sport.is_none());
        assert!(bets[1].closing_odds.is_none());
        assert!(bets[2].settled_at.is_none());
        assert!(!bets[2].confirmed);

        let confirmed = load_bets(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(confirmed.len(), 2);
    }

    const LENIENT: LoadOptions = LoadOptions {
        confirmed_only: false,
        strict: false,
    };
    const STRICT: LoadOptions = LoadOptions {
        confirmed_only: false,
        strict: true,
    };

    #[test]
    fn test_json_unknown_status_skips_only_that_row() {
        let json = r#"[
            {"id": 1, "odds": 2.0, "stake": 10.0, "model_probability": 0.6,
             "status": "pending", "created_at": "2024-01-01 10:00:00"},
            {"id": 2, "odds": 2.0, "stake": 10.0, "model_probability": 0.6,
             "status": "refunded", "created_at": "2024-01-01 11:00:00"}
        ]"#;
        let file = write_temp(".json", json);

        let bets = load_bets(file.path(), &LENIENT).unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].id, 1);

        let err = load_bets(file.path(), &STRICT).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidBet { id: 2, .. }));
    }

    #[test]
    fn test_csv_unknown_status_skips_only_that_row() {
        let csv = "\
id,odds,stake,model_probability,status,created_at
1,2.0,10,0.6,pending,2024-01-01 10:00:00
2,2.0,10,0.6,refunded,2024-01-01 11:00:00
";
        let file = write_temp(".csv", csv);

        let bets = load_bets(file.path(), &LENIENT).unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].id, 1);

        let err = load_bets(file.path(), &STRICT).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidBet { id: 2, .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".xlsx", "");
        let err = load_bets(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T12:00:00+02:00").is_ok());
        assert!(parse_timestamp("2024-03-01 12:00:00").is_ok());
        assert!(parse_timestamp("2024-03-01T12:00:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());

        let a = parse_timestamp("2024-03-01T12:00:00+02:00").unwrap();
        let b = parse_timestamp("2024-03-01 10:00:00").unwrap();
        assert_eq!(a, b);
    }
}
