use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use tradepulse_core::domain::Period;
use tradepulse_pipeline::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Parser)]
#[command(name = "tradepulse", version, about = "Foreign-trade statistics sync and reporting")]
pub struct Cli {
    /// DuckDB database file.
    #[arg(long, global = true, env = "TRADEPULSE_DB_PATH", default_value = "tradepulse.duckdb")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one period from the remote source and upsert it.
    Sync(SyncArgs),
    /// Print an analytics report as JSON.
    Report {
        #[command(subcommand)]
        report: ReportCommand,
    },
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Target period as YYYYMM; defaults to the previous calendar month.
    #[arg(long, value_parser = parse_period)]
    pub period: Option<Period>,

    /// Records per upsert transaction.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Reference code CSV scoping which HS codes are ingested.
    #[arg(long, default_value = "reference_codes.csv")]
    pub reference: PathBuf,

    /// Dry run against a stub source instead of the remote endpoint.
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Product diversification (1 - HHI) for one period.
    Diversity {
        #[arg(long, value_parser = parse_period)]
        period: Period,
    },
    /// Top-destination concentration for one period.
    Concentration {
        #[arg(long, value_parser = parse_period)]
        period: Period,
    },
    /// Monthly dispersion within a year.
    Seasonality {
        #[arg(long)]
        year: i32,
    },
    /// Compound annual growth over a year range.
    Trend {
        #[arg(long)]
        start_year: i32,
        #[arg(long)]
        end_year: i32,
    },
    /// One-call yearly dashboard rollup.
    Dashboard {
        #[arg(long)]
        year: i32,
    },
}

fn parse_period(value: &str) -> Result<Period, String> {
    Period::parse_yyyymm(value).map_err(|e| e.to_string())
}
