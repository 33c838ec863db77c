use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Command-line configuration of the `athlete-stats` binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "athlete-stats")]
#[command(about = "Descriptive statistics, sampling demos and regression over an athlete table")]
#[command(version)]
pub struct Config {
    /// Operation to run, e.g. `histogram` or `linearRegression`.
    pub operation: String,

    /// Operation parameters as `key=value` pairs, e.g. `column=Age bins=20`.
    pub params: Vec<String>,

    /// Dataset file (.csv, .json, .parquet).
    #[arg(long, env = "ATHLETE_STATS_DATA", default_value = "athlete_events.csv")]
    pub data: PathBuf,

    /// Indent the JSON output.
    #[arg(long)]
    pub pretty: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}
