#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Host-side driver for the analog probe: replays recorded ADC traces
//! against the driver on simulated hardware.

mod cli;
mod error_fmt;
mod logging;
mod records;
mod run;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use serde_json::json;

use crate::cli::{Cli, Commands, JSON_MODE, json_mode};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json_mode() {
                eprintln!("{}", error_fmt::format_error_json(&e));
            } else {
                eprintln!("{}", error_fmt::humanize(&e));
            }
            tracing::error!(error = %e, "run failed");
            let code = error_fmt::exit_code_for_error(&e);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn load_config(path: &std::path::Path) -> eyre::Result<probe_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = probe_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn run_cli(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, &cli.log_level, Some(&cfg.logging))?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Replay { trace, log } => {
            let rows = probe_config::load_trace_csv(&trace)?;
            let summary = run::run_replay(&cfg, &rows, log, cli.json)?;
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "summary": "replay",
                        "trigger_clock": summary.trigger_clock,
                        "samples": summary.samples,
                        "reason": summary.reason,
                    })
                );
            } else {
                println!(
                    "triggered at clock {} after {} samples (reason {})",
                    summary.trigger_clock, summary.samples, summary.reason
                );
            }
        }
        Commands::Stream {
            trace,
            duration_ticks,
        } => {
            let rows = probe_config::load_trace_csv(&trace)?;
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "could not install Ctrl-C handler");
            }
            let summary = run::run_stream(&cfg, &rows, duration_ticks, cli.json, &shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "summary": "stream",
                        "records": summary.records,
                        "samples": summary.samples,
                        "interrupted": summary.interrupted,
                    })
                );
            } else {
                println!(
                    "streamed {} log records over {} samples{}",
                    summary.records,
                    summary.samples,
                    if summary.interrupted {
                        " (interrupted)"
                    } else {
                        ""
                    }
                );
            }
        }
        Commands::SelfCheck => {
            run::run_self_check(&cfg, cli.json)?;
            if cli.json {
                println!("{}", json!({ "summary": "self-check", "ok": true }));
            } else {
                println!("self-check passed");
            }
        }
    }
    Ok(())
}
