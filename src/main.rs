use std::process::ExitCode;

use anyhow::{Context, Result};
use athlete_stats::config::Config;
use athlete_stats::query::QueryEngine;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let config = Config::parse();

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    let mut engine = QueryEngine::new(&config.data);
    let response = engine
        .respond(&config.operation, config.params.as_slice())
        .with_context(|| format!("Failed to run '{}' on {}", config.operation, config.data.display()))?;

    let rendered = if config.pretty {
        serde_json::to_string_pretty(&response.body)?
    } else {
        serde_json::to_string(&response.body)?
    };
    println!("{rendered}");

    Ok(if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
