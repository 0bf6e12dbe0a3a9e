//! Betlens CLI - Command-line interface for betting performance analysis

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::{ColoredString, Colorize};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use betlens::config::{AnalyticsConfig, SegmentationConfig};
use betlens::data::{load_bets, LoadOptions};
use betlens::insights::{Insight, InsightGenerator, InsightKind, Priority};
use betlens::metrics::{BetFilter, Dimension, MetricsAggregator, MetricsResult};
use betlens::report::{best_segment, rank_segments, ValidationReport, Verdict, DEFAULT_MIN_SEGMENT_BETS};

/// Default bet history snapshot (relative to working directory)
const DEFAULT_INPUT: &str = "data/bets.json";

#[derive(Parser)]
#[command(name = "betlens")]
#[command(author, version, about = "Betting performance analytics CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Bet history snapshot (.json or .csv)
    #[arg(long, default_value = DEFAULT_INPUT, global = true)]
    input: PathBuf,

    /// TOML configuration file (BETLENS_* environment variables also apply)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only bets created in the last N days
    #[arg(long, global = true)]
    since_days: Option<i64>,

    /// Include bets whose intent was never confirmed
    #[arg(long, global = true)]
    include_unconfirmed: bool,

    /// Fail on the first invalid row instead of skipping it
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full validation report with verdict
    Report {
        /// Initial bankroll (overrides configuration)
        #[arg(long)]
        bankroll: Option<f64>,

        /// Annual risk-free rate as a fraction (overrides configuration)
        #[arg(long)]
        risk_free_rate: Option<f64>,

        /// Kelly multiplier (0.25 = quarter Kelly)
        #[arg(long)]
        kelly: Option<f64>,
    },

    /// Metrics per segment, ranked by ROI
    Segments {
        /// Segmentation dimension
        #[arg(long, value_enum, default_value = "sport")]
        by: DimensionArg,

        /// Minimum settled bets for a segment to be ranked
        #[arg(long, default_value_t = DEFAULT_MIN_SEGMENT_BETS)]
        min_bets: usize,

        /// Use 5% confidence steps (confidence dimension only)
        #[arg(long)]
        fine: bool,
    },

    /// Rule-based insights, highest priority first
    Insights {
        /// Number of insights to show
        #[arg(long, default_value = "5")]
        top: usize,

        /// Only insights of this type
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DimensionArg {
    Sport,
    Market,
    Bookmaker,
    Confidence,
    Odds,
    Edge,
}

impl From<DimensionArg> for Dimension {
    fn from(arg: DimensionArg) -> Self {
        match arg {
            DimensionArg::Sport => Dimension::Sport,
            DimensionArg::Market => Dimension::Market,
            DimensionArg::Bookmaker => Dimension::Bookmaker,
            DimensionArg::Confidence => Dimension::Confidence,
            DimensionArg::Odds => Dimension::Odds,
            DimensionArg::Edge => Dimension::Edge,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Success,
    Info,
    Warning,
    Danger,
}

impl From<KindArg> for InsightKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Success => InsightKind::Success,
            KindArg::Info => InsightKind::Info,
            KindArg::Warning => InsightKind::Warning,
            KindArg::Danger => InsightKind::Danger,
        }
    }
}

/// Loaded snapshot plus effective configuration
struct Session {
    aggregator: MetricsAggregator,
    config: AnalyticsConfig,
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    if !cli.json {
        println!("{}", "Betlens CLI v0.1.0".cyan().bold());
        println!();
    }

    let config = AnalyticsConfig::load_from(cli.config.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    let options = LoadOptions {
        confirmed_only: !cli.include_unconfirmed,
        strict: cli.strict,
    };

    if cli.interactive {
        return run_interactive(&cli.input, config, &options, cli.since_days);
    }

    let Some(command) = cli.command else {
        println!("No command given. Use --help or --interactive.");
        return Ok(());
    };

    match command {
        Commands::Report {
            bankroll,
            risk_free_rate,
            kelly,
        } => {
            let mut config = config;
            if let Some(b) = bankroll {
                config.initial_bankroll = b;
            }
            if let Some(r) = risk_free_rate {
                config.risk_free_rate = r;
            }
            if let Some(k) = kelly {
                config.kelly_multiplier = k;
            }
            let session = open_session(&cli.input, config, &options, cli.since_days, cli.json)?;
            run_report(&session)?;
        }
        Commands::Segments { by, min_bets, fine } => {
            let session = open_session(&cli.input, config, &options, cli.since_days, cli.json)?;
            run_segments(&session, by.into(), min_bets, fine)?;
        }
        Commands::Insights { top, kind } => {
            let session = open_session(&cli.input, config, &options, cli.since_days, cli.json)?;
            run_insights(&session, top, kind.map(InsightKind::from))?;
        }
    }

    Ok(())
}

fn open_session(
    input: &Path,
    config: AnalyticsConfig,
    options: &LoadOptions,
    since_days: Option<i64>,
    json: bool,
) -> Result<Session> {
    if let Err(problems) = config.validate() {
        anyhow::bail!("Invalid configuration:\n  {}", problems.join("\n  "));
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Loading bet history...");

    let bets = load_bets(input, options)
        .with_context(|| format!("Failed to load bets from {:?}", input))?;

    pb.finish_and_clear();

    let mut aggregator = MetricsAggregator::from_config(bets, &config);
    if let Some(days) = since_days {
        if days <= 0 {
            anyhow::bail!("--since-days must be positive, got {}", days);
        }
        let filter = BetFilter {
            start: Some(Utc::now() - Duration::days(days)),
            ..BetFilter::default()
        };
        aggregator = aggregator.filter(&filter);
    }

    if !json {
        println!(
            "{}: {:?} ({} bets)",
            "Loaded".green(),
            input,
            aggregator.bets().len()
        );
        println!();
    }

    Ok(Session {
        aggregator,
        config,
        json,
    })
}

fn run_report(session: &Session) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Computing metrics...");

    let metrics = session.aggregator.calculate_all();
    let report = ValidationReport::build(metrics, &session.config.thresholds);

    let by_confidence = session
        .aggregator
        .calculate_by_confidence_range(&SegmentationConfig::confidence_steps());
    let optimal = best_segment(&by_confidence, DEFAULT_MIN_SEGMENT_BETS);

    pb.finish_and_clear();

    if session.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_metrics(&report.metrics);

    if let Some(segment) = optimal {
        println!(
            "{} {} (ROI {:.2}%, {} bets)",
            "Optimal confidence range:".yellow().bold(),
            segment.label,
            segment.roi * 100.0,
            segment.bets
        );
        println!();
    }

    print_insights(&report.insights);

    println!("{}", "Recommendations:".yellow().bold());
    println!("{}", "-".repeat(60));
    for rec in &report.recommendations {
        println!("  {} {}", kind_marker(rec.kind), rec.message);
    }
    println!();

    println!("{}", "=".repeat(60));
    let verdict = match report.verdict {
        Verdict::Approve => report.verdict.to_string().green().bold(),
        Verdict::ApproveWithCaution => report.verdict.to_string().yellow().bold(),
        Verdict::Reject => report.verdict.to_string().red().bold(),
    };
    println!("{} {}", "Verdict:".bold(), verdict);
    for step in report.verdict.guidance() {
        println!("  - {}", step);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

fn print_metrics(m: &MetricsResult) {
    println!("{}", "=".repeat(60));
    println!("{}", "PERFORMANCE SUMMARY".bold());
    println!("{}", "=".repeat(60));
    println!(
        "Bets: {} total, {} settled, {} pending",
        m.metadata.total_bets, m.metadata.settled_bets, m.metadata.pending_bets
    );
    println!();

    println!("{}", "Returns:".yellow().bold());
    println!("  Win rate:        {:>10.2}%", m.basic.win_rate * 100.0);
    println!("  ROI:             {:>10.2}%", m.basic.roi * 100.0);
    println!("  Profit:          {:>10.2}", m.basic.profit);
    println!("  Total wagered:   {:>10.2}", m.basic.total_wagered);
    println!("  Average odds:    {:>10.2}", m.basic.average_odds);
    println!();

    println!("{}", "Risk:".yellow().bold());
    println!("  Sharpe:          {:>10.3}", m.risk.sharpe_ratio);
    println!("  Sortino:         {:>10.3}", m.risk.sortino_ratio);
    println!("  Max drawdown:    {:>10.2}%", m.risk.max_drawdown * 100.0);
    println!("  DD duration:     {:>10} days", m.risk.max_drawdown_duration);
    println!("  Volatility:      {:>10.2}%", m.risk.volatility * 100.0);
    println!("  VaR 95%:         {:>10.2}%", m.risk.var_95 * 100.0);
    println!("  CVaR 95%:        {:>10.2}%", m.risk.cvar_95 * 100.0);
    println!();

    println!("{}", "Calibration:".yellow().bold());
    println!("  Brier score:     {:>10.4}", m.calibration.brier_score);
    println!("  Log loss:        {:>10.4}", m.calibration.log_loss);
    println!("  ECE:             {:>10.4}", m.calibration.calibration_error);
    println!(
        "  Overround beat:  {:>10.2}%",
        m.calibration.overround_beat_rate * 100.0
    );
    if !m.calibration.calibration_bins.is_empty() {
        println!(
            "  {:>12} {:>10} {:>10} {:>8}",
            "Bin", "Predicted", "Actual", "Bets"
        );
        for bin in &m.calibration.calibration_bins {
            println!(
                "  {:>5.1}-{:<6.1} {:>9.1}% {:>9.1}% {:>8}",
                bin.bin_start,
                bin.bin_end,
                bin.predicted * 100.0,
                bin.actual * 100.0,
                bin.count
            );
        }
    }
    println!();

    println!("{}", "Closing line value:".yellow().bold());
    println!("  Average CLV:     {:>10.4}", m.clv.clv_average);
    println!(
        "  Positive rate:   {:>10.2}%",
        m.clv.clv_positive_rate * 100.0
    );
    println!("  CLV/profit corr: {:>10.3}", m.clv.clv_correlation);
    println!();

    println!("{}", "Streaks:".yellow().bold());
    println!(
        "  Current:         {:>10}",
        format!("{:?} x{}", m.streaks.current_streak.kind, m.streaks.current_streak.count)
    );
    println!("  Longest win:     {:>10}", m.streaks.longest_win_streak);
    println!("  Longest loss:    {:>10}", m.streaks.longest_lose_streak);
    println!(
        "  Win after loss:  {:>10.2}%",
        m.streaks.win_after_loss * 100.0
    );
    println!();

    println!("{}", "Bankroll:".yellow().bold());
    println!("  Initial:         {:>10.2}", m.metadata.initial_bankroll);
    println!("  Current:         {:>10.2}", m.bankroll.current_bankroll);
    let growth = format!("{:>9.2}%", m.bankroll.bankroll_growth * 100.0);
    let growth = if m.bankroll.bankroll_growth >= 0.0 {
        growth.green()
    } else {
        growth.red()
    };
    println!("  Growth:          {}", growth);
    println!("  Units won:       {:>10.2}", m.bankroll.units_won);
    println!(
        "  Kelly average:   {:>10.2}%",
        m.bankroll.kelly_average * 100.0
    );
    println!("  EV per bet:      {:>10.2}", m.bankroll.ev_per_bet);
    println!();
}

fn run_segments(session: &Session, dimension: Dimension, min_bets: usize, fine: bool) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Segmenting by {}...", dimension));

    let segments = if fine && dimension == Dimension::Confidence {
        session
            .aggregator
            .calculate_by_confidence_range(&SegmentationConfig::confidence_steps())
    } else {
        session
            .aggregator
            .calculate_by_dimension(dimension, &session.config.segmentation)
    };

    pb.finish_and_clear();

    if session.json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    if segments.is_empty() {
        println!("{}", "No segments with bets for this dimension.".yellow());
        return Ok(());
    }

    println!("{} {}", "Analysis by".yellow().bold(), dimension.to_string().yellow().bold());
    println!(
        "{:<16} {:>6} {:>9} {:>9} {:>10} {:>9} {:>8}",
        "Segment", "Bets", "Win %", "ROI", "Profit", "Sharpe", "Brier"
    );
    println!("{}", "-".repeat(75));

    for ranked in rank_segments(&segments, 0, true) {
        let Some(m) = segments.get(&ranked.label) else {
            continue;
        };
        let roi = format!("{:>8.2}%", m.basic.roi * 100.0);
        let roi = if m.basic.roi >= 0.0 { roi.green() } else { roi.red() };
        let row = format!(
            "{:<16} {:>6} {:>8.1}% {} {:>10.2} {:>9.3} {:>8.4}",
            truncate_label(&ranked.label, 16),
            m.basic.total_bets,
            m.basic.win_rate * 100.0,
            roi,
            m.basic.profit,
            m.risk.sharpe_ratio,
            m.calibration.brier_score
        );
        if m.basic.total_bets < min_bets {
            println!("{}", row.dimmed());
        } else {
            println!("{}", row);
        }
    }
    println!();

    let eligible = rank_segments(&segments, min_bets, true);
    if let (Some(best), Some(worst)) = (eligible.first(), eligible.last()) {
        println!(
            "Best:  {} ({:.2}% ROI over {} bets)",
            best.label.green(),
            best.roi * 100.0,
            best.bets
        );
        println!(
            "Worst: {} ({:.2}% ROI over {} bets)",
            worst.label.red(),
            worst.roi * 100.0,
            worst.bets
        );
    } else {
        println!(
            "{}",
            format!("No segment has at least {} settled bets.", min_bets).dimmed()
        );
    }

    Ok(())
}

fn run_insights(session: &Session, top: usize, kind: Option<InsightKind>) -> Result<()> {
    let metrics = session.aggregator.calculate_all();
    let generator = InsightGenerator::new(&metrics, session.config.thresholds.clone());

    let insights = match kind {
        Some(kind) => generator
            .get_insights_by_type(kind)
            .into_iter()
            .take(top)
            .collect(),
        None => generator.get_top_insights(top),
    };

    if session.json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }

    print_insights(&insights);
    Ok(())
}

fn print_insights(insights: &[Insight]) {
    println!("{}", "Insights:".yellow().bold());
    println!("{}", "-".repeat(60));

    if insights.is_empty() {
        println!("{}", "  No insights for this snapshot.".dimmed());
    }

    for insight in insights {
        let priority = match insight.priority {
            Priority::High => "HIGH".red(),
            Priority::Medium => "MED".yellow(),
            Priority::Low => "LOW".normal(),
        };
        println!(
            "  {} [{}] {}",
            kind_marker(insight.kind),
            priority,
            insight.title.bold()
        );
        println!("      {}", insight.description);
        println!("      {} {}", "->".dimmed(), insight.action);
    }
    println!();
}

fn kind_marker(kind: InsightKind) -> ColoredString {
    match kind {
        InsightKind::Success => "[+]".green(),
        InsightKind::Info => "[i]".cyan(),
        InsightKind::Warning => "[!]".yellow(),
        InsightKind::Danger => "[x]".red().bold(),
    }
}

fn run_interactive(
    input: &Path,
    config: AnalyticsConfig,
    options: &LoadOptions,
    since_days: Option<i64>,
) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();
    let session = open_session(input, config, options, since_days, false)?;

    loop {
        let choices = vec!["Validation report", "Segment analysis", "Insights", "Quit"];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&choices)
            .default(0)
            .interact()?;

        match selection {
            0 => {
                println!();
                run_report(&session)?;
                println!();
            }
            1 => {
                let dimensions = [
                    DimensionArg::Sport,
                    DimensionArg::Market,
                    DimensionArg::Bookmaker,
                    DimensionArg::Confidence,
                    DimensionArg::Odds,
                    DimensionArg::Edge,
                ];
                let names: Vec<String> = dimensions
                    .iter()
                    .map(|d| Dimension::from(*d).to_string())
                    .collect();

                let picked = Select::with_theme(&theme)
                    .with_prompt("Segment by")
                    .items(&names)
                    .default(0)
                    .interact()?;

                let min_bets: usize = Input::with_theme(&theme)
                    .with_prompt("Minimum bets per segment")
                    .default(DEFAULT_MIN_SEGMENT_BETS)
                    .interact_text()?;

                println!();
                run_segments(&session, dimensions[picked].into(), min_bets, false)?;
                println!();
            }
            2 => {
                let top: usize = Input::with_theme(&theme)
                    .with_prompt("How many insights?")
                    .default(5)
                    .interact_text()?;

                println!();
                run_insights(&session, top, None)?;
            }
            3 => {
                println!("Goodbye!");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Truncate label to fit display width
fn truncate_label(label: &str, max_len: usize) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() <= max_len {
        label.to_string()
    } else {
        chars[..max_len - 1].iter().collect::<String>() + "…"
    }
}
