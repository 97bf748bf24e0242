//! rf - race-free concurrency scenarios
//!
//! CLI entry point for running the scenarios and printing their reports.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use tracing::{debug, error, info};

use racefree::cli::{Cli, Command, OutputFormat};
use racefree::config::Config;
use racefree::heartbeat::HeartbeatConfig;
use racefree::scenarios::{self, LocalFiles, WatchdogOptions};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // Reports go to stdout, so logs stay on stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install subscriber: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Registry { key, value, readers } => cmd_registry(key, &value, readers).await,
        Command::Watchdog {
            keep_alive,
            duration_secs,
            interval_ms,
            threshold_ms,
        } => {
            let heartbeat = HeartbeatConfig {
                interval_ms: interval_ms.unwrap_or(config.heartbeat.interval_ms),
                threshold_ms: threshold_ms.unwrap_or(config.heartbeat.threshold_ms),
            };
            cmd_watchdog(&heartbeat, keep_alive, duration_secs).await
        }
        Command::FanIn { output_dir, format } => {
            let mut fan_in = config.fan_in.clone();
            if let Some(dir) = output_dir {
                fan_in.output_dir = dir;
            }
            cmd_fan_in(&fan_in, &format).await
        }
        Command::LoopCapture { tasks } => cmd_loop_capture(tasks.unwrap_or(config.loop_capture.tasks)).await,
        Command::Rendezvous { payload } => cmd_rendezvous(&payload).await,
        Command::All => {
            cmd_registry(1, "A", 2).await?;
            cmd_loop_capture(config.loop_capture.tasks).await?;
            cmd_rendezvous("ping").await?;
            cmd_fan_in(&config.fan_in, &OutputFormat::Text).await
        }
    }
}

async fn cmd_registry(key: u64, value: &str, readers: usize) -> Result<()> {
    let report = scenarios::registry::run(key, value, readers).await?;

    let racing = report.racing_read.as_deref().unwrap_or("<absent>");
    println!("{} registry: key {} = {:?}", "✓".green(), report.key, report.value);
    println!("  racing read: {}", racing.dimmed());
    for (i, read) in report.reads.iter().enumerate() {
        println!("  reader {}: {}", i, read.as_deref().unwrap_or("<absent>"));
    }

    if !report.is_consistent() {
        bail!("Registry reads were inconsistent: {:?}", report);
    }
    Ok(())
}

async fn cmd_watchdog(heartbeat: &HeartbeatConfig, keep_alive: bool, duration_secs: Option<u64>) -> Result<()> {
    let duration = duration_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| heartbeat.detection_bound() + heartbeat.interval());
    println!(
        "{} watchdog: interval {:?}, threshold {:?}, keep-alive {}, watching for {:?}",
        "→".cyan(),
        heartbeat.interval(),
        heartbeat.threshold(),
        keep_alive,
        duration
    );

    let options = WatchdogOptions { keep_alive, duration };
    let report = scenarios::watchdog::run(heartbeat, &options, || {
        error!("Watched task stopped sending keep-alives, exiting");
        println!("{} watchdog: no keep-alive within threshold, terminating", "✗".red());
        std::process::exit(1);
    })
    .await?;

    println!(
        "{} watchdog: task stayed alive ({:?})",
        "✓".green(),
        report.final_state
    );
    Ok(())
}

async fn cmd_fan_in(fan_in: &scenarios::FanInConfig, format: &OutputFormat) -> Result<()> {
    let files = Arc::new(LocalFiles::new(&fan_in.output_dir));
    let report = scenarios::fan_in::run(files, &fan_in.files, fan_in.payload.as_bytes()).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} fan-in: {} outcome(s) drained from {}",
                "✓".green(),
                report.drained,
                fan_in.output_dir.display()
            );
            for received in &report.outcomes {
                let mark = if received.outcome.is_ok() { "✓".green() } else { "✗".red() };
                println!("  {} {}: {}", mark, received.file.cyan(), received.outcome);
            }
        }
    }

    if !report.is_balanced() {
        bail!(
            "Fan-in lost outcomes: submitted {}, drained {}",
            report.submitted,
            report.drained
        );
    }
    Ok(())
}

async fn cmd_loop_capture(tasks: usize) -> Result<()> {
    let report = scenarios::loop_capture::run(tasks).await?;

    println!(
        "{} loop-capture: {} task(s) reported {:?}",
        "✓".green(),
        report.tasks,
        report.reported
    );

    if !report.is_complete() {
        bail!("Tasks did not each report their own index: {:?}", report.reported);
    }
    Ok(())
}

async fn cmd_rendezvous(payload: &str) -> Result<()> {
    let report = scenarios::rendezvous::run(payload).await?;

    println!(
        "{} rendezvous: sent {:?}, received {:?}",
        "✓".green(),
        report.sent,
        report.received
    );

    if !report.closed_cleanly {
        bail!("Rendezvous close reported unmatched sends");
    }
    println!("  closed after receive");
    Ok(())
}
