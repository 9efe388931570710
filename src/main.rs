/*
SPDX-FileCopyrightText: Copyright 2026 Dosewatch Authors
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};

use dosewatch::config::ReminderConfig;
use dosewatch::controller::ReminderController;
use dosewatch::device::sim::{CountdownButton, LogOutputs, SimClock};
use dosewatch::link::{LogOnlyLink, ResilientChannel};
use dosewatch::schedule::DoseSchedule;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Dosewatch medication-reminder controller – host simulation harness.
///
/// The controller core is hardware-agnostic; this binary wires it to a
/// simulated clock, logging indicators, a scripted confirmation button
/// and a log-only status link.  Hardware targets implement the same
/// `device` and `link` traits instead.
///
/// Example:
///   dosewatch -c reminder.yaml --day 12 --start 08:29:50 --pace 10
#[derive(Debug, Parser)]
#[command(
    name = "dosewatch",
    about = "Dosewatch medication-reminder controller – Rust implementation",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML reminder configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Day of month the simulated clock starts on (1-31).
    #[arg(long = "day", default_value_t = 12)]
    day: u8,

    /// Time of day the simulated clock starts at, as HH:MM:SS.
    #[arg(long = "start", default_value = "08:29:50")]
    start: String,

    /// Simulation pace in virtual seconds per real second (0 = unpaced).
    #[arg(long = "pace", default_value_t = 1.0)]
    pace: f64,

    /// Negative button samples before the simulated confirmation press.
    #[arg(long = "confirm-after", default_value_t = 5)]
    confirm_after: u32,
}

/// Parse `HH:MM:SS` into its validated components.
fn parse_start(start: &str) -> anyhow::Result<(u8, u8, u8)> {
    let parts: Vec<&str> = start.split(':').collect();
    if parts.len() != 3 {
        bail!("expected HH:MM:SS, got '{start}'");
    }
    let hour: u8 = parts[0].parse().context("invalid hour")?;
    let minute: u8 = parts[1].parse().context("invalid minute")?;
    let second: u8 = parts[2].parse().context("invalid second")?;
    if hour > 23 || minute > 59 || second > 59 {
        bail!("time of day out of range: '{start}'");
    }
    Ok((hour, minute, second))
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Dosewatch starting up...");

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    let cli = Cli::parse();

    info!(
        config        = ?cli.config,
        day           = cli.day,
        start         = %cli.start,
        pace          = cli.pace,
        confirm_after = cli.confirm_after,
        "Configuration"
    );

    let (hour, minute, second) = match parse_start(&cli.start) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Invalid --start value: {:#}", e);
            process::exit(1);
        }
    };
    if cli.day == 0 || cli.day > 31 {
        error!("Invalid --day value: {} (expected 1-31)", cli.day);
        process::exit(1);
    }

    // ── Load reminder configuration ───────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => match ReminderConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load reminder configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using the built-in schedule");
            ReminderConfig::default_config()
        }
    };

    for dose in &config.schedule {
        info!("  dose scheduled at {dose}");
    }

    // ── Wire the simulation harness ───────────────────────────────────────────
    let clock = SimClock::new(cli.day, hour, minute, second).with_pace(cli.pace);
    let schedule = DoseSchedule::new(config.schedule.clone());

    let mut channel = ResilientChannel::new(LogOnlyLink);
    if let Err(e) = channel.connect() {
        error!("Failed to bring up the status link: {e}");
        process::exit(1);
    }

    let mut controller = ReminderController::new(
        clock,
        LogOutputs::default(),
        CountdownButton::new(cli.confirm_after),
        channel,
        schedule,
        config.topics,
        config.timing,
    );

    controller.run();
}
