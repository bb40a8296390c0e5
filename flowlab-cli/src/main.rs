//! FlowLab CLI: ingest daily flow exports and query the ledger.
//!
//! Commands:
//! - `ingest` - parse new exports, merge into the ledger, rewrite artifacts
//! - `status` - ledger size, date span, and the best-covered entities
//! - `rank` - top net buyers or sellers over a date range
//! - `screen` - entities under recent selling pressure

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use flowlab_core::screen::{rank, screen, RankMode, ScreenCriteria};
use flowlab_core::summary::{coverage, ledger_status};
use flowlab_runner::{
    load_enriched_ledger, load_ledger, run_pipeline, FileStatus, NameMap, PipelineConfig, RunReport,
};

#[derive(Parser)]
#[command(
    name = "flowlab",
    about = "FlowLab CLI - daily trading-flow ledger with moving averages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse new exports and refresh the ledger artifacts.
    Ingest {
        /// Path to a TOML config file. Defaults are used without one.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding the raw exports (overrides the config).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory for the ledger and derived files (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Report ledger size, date span and coverage.
    Status {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of entities to list, busiest first.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Rank entities by net flow over a date range.
    Rank {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Start date (YYYY-MM-DD). Defaults to the first ledger date.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to the last ledger date.
        #[arg(long)]
        end: Option<String>,

        /// `buy` for net buyers, `sell` for net sellers.
        #[arg(long, default_value = "buy")]
        mode: String,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Screen for low buy/sell ratio and non-positive moving averages.
    Screen {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of most recent trading days to look at.
        #[arg(long, default_value_t = 20)]
        days: usize,

        /// Keep entities whose buy/sell ratio is at most this value.
        #[arg(long, default_value_t = 0.9, conflicts_with = "no_ratio")]
        max_ratio: f64,

        /// Disable the ratio condition.
        #[arg(long, default_value_t = false)]
        no_ratio: bool,

        /// Require MA{W} <= 0 for each given window.
        #[arg(long = "ma", num_args = 1.., default_values_t = [5usize])]
        ma: Vec<usize>,

        /// Disable the moving-average conditions.
        #[arg(long, default_value_t = false, conflicts_with = "ma")]
        no_ma: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            config,
            data_dir,
            output_dir,
        } => run_ingest(config, data_dir, output_dir),
        Commands::Status { config, top } => run_status(config, top),
        Commands::Rank {
            config,
            start,
            end,
            mode,
            limit,
        } => run_rank(config, start, end, &mode, limit),
        Commands::Screen {
            config,
            days,
            max_ratio,
            no_ratio,
            ma,
            no_ma,
        } => {
            let criteria = ScreenCriteria {
                lookback_days: days,
                max_ratio: (!no_ratio).then_some(max_ratio),
                nonpositive_windows: if no_ma { Vec::new() } else { ma },
            };
            run_screen(config, &criteria)
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            Ok(PipelineConfig::from_file(&path)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn name_map(config: &PipelineConfig) -> NameMap {
    config
        .name_map
        .as_deref()
        .map(NameMap::load_or_identity)
        .unwrap_or_default()
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    Ok(raw
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?)
}

fn run_ingest(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let report = run_pipeline(&config)?;
    print_run_summary(&report);
    Ok(())
}

fn print_run_summary(report: &RunReport) {
    println!("=== Ingest Summary ===");
    for file in &report.files {
        match &file.status {
            FileStatus::Parsed { trade_date, rows } => {
                println!("  ok    {:<24} {trade_date}  {rows} rows", file.file)
            }
            FileStatus::Skipped(reason) => println!("  skip  {:<24} {reason}", file.file),
        }
    }
    println!(
        "Files:           {} parsed, {} skipped",
        report.parsed_count(),
        report.skipped_count()
    );

    if !report.wrote_artifacts() {
        println!("No new valid data; ledger unchanged.");
    } else {
        println!("Rows merged:     {}", report.merged_rows);
        println!("Rows replaced:   {}", report.replaced_rows);
        println!("New dates:       {}", report.new_dates.len());
    }
    println!("Total rows:      {}", report.total_rows);
    println!("Distinct dates:  {}", report.total_dates);
    println!("Entities:        {}", report.total_entities);

    if let Some(paths) = &report.artifacts {
        println!("Ledger:          {}", paths.ledger_csv.display());
        println!("Summary:         {}", paths.summary_csv.display());
        println!("Entity list:     {}", paths.entities_txt.display());
        println!("Manifest:        {}", paths.manifest_json.display());
        if let Some(parquet) = &paths.ledger_parquet {
            println!("Parquet:         {}", parquet.display());
        }
    }
}

fn run_status(config_path: Option<PathBuf>, top: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let Some(ledger) = load_ledger(&config)? else {
        println!("No ledger at {}", config.ledger_path().display());
        return Ok(());
    };
    let names = name_map(&config);

    let status = ledger_status(ledger.records());
    println!("Ledger:    {}", config.ledger_path().display());
    println!("Rows:      {}", status.rows);
    println!("Entities:  {}", status.entities);
    println!("Dates:     {}", status.dates);
    if let (Some(first), Some(last)) = (status.first_date, status.last_date) {
        println!("Range:     {first} .. {last}");
    }

    if top > 0 && !ledger.is_empty() {
        println!();
        println!("{:<32} {:>6}  {:<10}  {:<10}", "Entity", "Rows", "First", "Last");
        for row in coverage(ledger.records()).into_iter().take(top) {
            println!(
                "{:<32} {:>6}  {:<10}  {:<10}",
                names.display(&row.entity_id),
                row.count,
                row.first_date,
                row.last_date
            );
        }
    }
    Ok(())
}

fn run_rank(
    config_path: Option<PathBuf>,
    start: Option<String>,
    end: Option<String>,
    mode: &str,
    limit: usize,
) -> Result<()> {
    let mode = match mode {
        "buy" => RankMode::NetBuy,
        "sell" => RankMode::NetSell,
        _ => bail!("unknown mode '{mode}'. Valid: buy, sell"),
    };
    let config = load_config(config_path)?;
    let Some(ledger) = load_enriched_ledger(&config)? else {
        println!("No ledger at {}", config.ledger_path().display());
        return Ok(());
    };
    let dates = ledger.dates();
    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        println!("Ledger is empty.");
        return Ok(());
    };
    let start = parse_date(start.as_deref())?.unwrap_or(first);
    let end = parse_date(end.as_deref())?.unwrap_or(last);
    if start > end {
        bail!("start {start} is after end {end}");
    }

    let names = name_map(&config);
    let entries = rank(&ledger, start, end, mode, limit);
    let label = match mode {
        RankMode::NetBuy => "net buy",
        RankMode::NetSell => "net sell",
    };
    println!("Top {} by {label}, {start} .. {end}", entries.len());
    println!("{:>4}  {:<32} {:>16} {:>16} {:>16}", "#", "Entity", "Buy", "Sell", label);
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>4}  {:<32} {:>16.1} {:>16.1} {:>16.1}",
            i + 1,
            names.display(&entry.totals.entity_id),
            entry.totals.buy,
            entry.totals.sell,
            entry.score
        );
    }
    Ok(())
}

fn run_screen(config_path: Option<PathBuf>, criteria: &ScreenCriteria) -> Result<()> {
    let config = load_config(config_path)?;
    let Some(ledger) = load_enriched_ledger(&config)? else {
        println!("No ledger at {}", config.ledger_path().display());
        return Ok(());
    };
    let Some(result) = screen(&ledger, criteria)? else {
        println!("Ledger is empty.");
        return Ok(());
    };

    let names = name_map(&config);
    println!(
        "Screen over {} trading days, {} .. {}: {} matches",
        result.trading_days,
        result.first_day,
        result.last_day,
        result.hits.len()
    );
    for hit in &result.hits {
        let averages: Vec<String> = hit
            .averages
            .iter()
            .map(|(w, v)| match v {
                Some(v) => format!("MA{w}={v:.1}"),
                None => format!("MA{w}=-"),
            })
            .collect();
        println!(
            "  {:<32} buy={:.1} sell={:.1} ratio={:.3} {}",
            names.display(&hit.entity_id),
            hit.buy_sum,
            hit.sell_sum,
            hit.ratio,
            averages.join(" ")
        );
    }
    Ok(())
}
