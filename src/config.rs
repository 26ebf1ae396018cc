//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use chrono::TimeDelta;
use clap::Parser;

/// CLI argument parsing structure
#[derive(Debug, Clone, Parser)]
#[command(name = "wake-timer")]
#[command(about = "A persistent countdown timer daemon with wake-driven scheduling")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding the persisted timer state
    #[arg(short, long, default_value = "wake-timer-state")]
    pub state_dir: PathBuf,

    /// Display tick interval while in foreground mode, in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub foreground_interval_ms: u64,

    /// Display tick interval while in background mode, in milliseconds
    #[arg(long, default_value = "5000", value_parser = clap::value_parser!(u64).range(1..))]
    pub background_interval_ms: u64,

    /// How long an expired timer's alarm keeps ringing, in seconds
    #[arg(long, default_value = "60")]
    pub ring_seconds: u32,

    /// Default number of entries returned by the popular list
    #[arg(long, default_value = "8")]
    pub popular_limit: usize,

    /// Replace a corrupt persisted state with an empty one instead of failing
    #[arg(long)]
    pub reset_corrupt_state: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn foreground_interval(&self) -> Duration {
        Duration::from_millis(self.foreground_interval_ms)
    }

    pub fn background_interval_ms(&self) -> i64 {
        i64::try_from(self.background_interval_ms).unwrap_or(i64::MAX)
    }

    pub fn ring_duration(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.ring_seconds))
    }
}
