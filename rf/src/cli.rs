//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// racefree - race-free concurrency scenarios
#[derive(Parser)]
#[command(
    name = "rf",
    about = "Run race-free concurrency scenarios",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Scenario to run
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a key once while readers race it through the guarded registry
    Registry {
        /// Key to write
        #[arg(short, long, default_value = "1")]
        key: u64,

        /// Value to write
        #[arg(long, default_value = "A")]
        value: String,

        /// Readers started after the write
        #[arg(short, long, default_value = "2")]
        readers: usize,
    },

    /// Watch a task with the heartbeat checker
    Watchdog {
        /// Keep the watched task alive every half interval
        #[arg(short, long)]
        keep_alive: bool,

        /// Observation window in seconds (default: threshold plus two intervals)
        #[arg(short, long)]
        duration_secs: Option<u64>,

        /// Override the check interval, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Override the staleness threshold, in milliseconds
        #[arg(long)]
        threshold_ms: Option<u64>,
    },

    /// Write files from concurrent producers and drain their outcomes
    FanIn {
        /// Directory to write into
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Spawn tasks that each report the index handed to them
    LoopCapture {
        /// Number of tasks
        #[arg(short, long)]
        tasks: Option<usize>,
    },

    /// Hand a payload over and close after the matching receive
    Rendezvous {
        /// Payload to send
        #[arg(short, long, default_value = "ping")]
        payload: String,
    },

    /// Run every scenario except the watchdog
    All,
}

/// Output format for scenario reports
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["rf"]).is_err());
    }

    #[test]
    fn test_cli_parse_registry_defaults() {
        let cli = Cli::parse_from(["rf", "registry"]);
        if let Command::Registry { key, value, readers } = cli.command {
            assert_eq!(key, 1);
            assert_eq!(value, "A");
            assert_eq!(readers, 2);
        } else {
            panic!("Expected Registry command");
        }
    }

    #[test]
    fn test_cli_parse_watchdog() {
        let cli = Cli::parse_from([
            "rf",
            "watchdog",
            "--keep-alive",
            "--duration-secs",
            "5",
            "--threshold-ms",
            "300",
        ]);
        if let Command::Watchdog {
            keep_alive,
            duration_secs,
            interval_ms,
            threshold_ms,
        } = cli.command
        {
            assert!(keep_alive);
            assert_eq!(duration_secs, Some(5));
            assert_eq!(interval_ms, None);
            assert_eq!(threshold_ms, Some(300));
        } else {
            panic!("Expected Watchdog command");
        }
    }

    #[test]
    fn test_cli_parse_fan_in_json() {
        let cli = Cli::parse_from(["rf", "fan-in", "--output-dir", "/tmp/out", "--format", "json"]);
        if let Command::FanIn { output_dir, format } = cli.command {
            assert_eq!(output_dir, Some(PathBuf::from("/tmp/out")));
            assert_eq!(format, OutputFormat::Json);
        } else {
            panic!("Expected FanIn command");
        }
    }

    #[test]
    fn test_cli_parse_global_options() {
        let cli = Cli::parse_from(["rf", "loop-capture", "--tasks", "9", "-l", "debug", "-c", "rf.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("rf.yml")));
        assert!(matches!(cli.command, Command::LoopCapture { tasks: Some(9) }));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
    }
}
