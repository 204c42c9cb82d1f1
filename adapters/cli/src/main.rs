#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Rampart match headlessly and reports the result.

mod runner;
mod scenario;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use crate::scenario::Scenario;

/// Command-line arguments for the Rampart headless runner.
#[derive(Debug, Parser)]
#[command(
    name = "rampart",
    about = "Runs a tower defense match without a renderer."
)]
struct CliArgs {
    /// Scenario file to play; the bundled skirmish is used when omitted.
    #[arg(long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Simulated milliseconds per tick.
    #[arg(long, value_name = "N", default_value_t = 50)]
    dt_ms: u64,

    /// Upper bound on simulated ticks before giving up.
    #[arg(long, value_name = "N", default_value_t = 20_000)]
    max_ticks: u64,

    /// Prints the match report as JSON.
    #[arg(long)]
    json: bool,

    /// Raises the default log level to debug.
    #[arg(long)]
    verbose: bool,
}

/// Entry point for the Rampart command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    ensure!(args.dt_ms > 0, "--dt-ms must be at least 1");

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin()?,
    };
    info!(
        "playing {} wave group(s) with {} opening tower(s)",
        scenario.waves.groups().len(),
        scenario.towers.len()
    );

    let report = runner::run(
        &scenario,
        Duration::from_millis(args.dt_ms),
        args.max_ticks,
    );

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("failed to encode match report")?;
        println!("{json}");
    } else {
        println!("{report}");
    }

    Ok(())
}
