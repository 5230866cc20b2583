use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file (tick_ingestor.toml). Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the configured ticker symbol (e.g. "AMD")
    #[arg(long)]
    pub symbol: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Intraday trade/quote bars for one trading day, one window per interval
    Bars {
        /// Trading day in YYYY-MM-DD format (e.g. "2025-02-03")
        #[arg(long)]
        day: NaiveDate,
    },

    /// Trades joined to their lookback price, one session window per day
    Momentum {
        /// First day in YYYY-MM-DD format
        #[arg(long)]
        from: NaiveDate,

        /// Last day (inclusive) in YYYY-MM-DD format
        #[arg(long)]
        to: NaiveDate,
    },
}
