//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls record and error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "probe", version, about = "Analog load-cell probe driver")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/probe.toml")]
    pub config: PathBuf,

    /// Print records and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pre-fill, tare, then home against a recorded ADC trace
    Replay {
        /// Sample trace CSV (strict header: raw,busy_ticks)
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Also stream a log record for every sample while homing
        #[arg(long, action = ArgAction::SetTrue)]
        log: bool,
    },
    /// Stream log records for a recorded ADC trace
    Stream {
        /// Sample trace CSV (strict header: raw,busy_ticks)
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Stop after this many ticks; 0 streams until the trace ends or Ctrl-C
        #[arg(long, value_name = "TICKS", default_value_t = 0)]
        duration_ticks: u32,
    },
    /// Exercise configure, pre-fill, tare and report against a synthetic feed
    SelfCheck,
}
