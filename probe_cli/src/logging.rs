//! Tracing subscriber setup: console layer plus an optional JSON file layer.

use probe_config::Logging;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::cli::FILE_GUARD;

/// Install the global subscriber. `RUST_LOG` wins over the config level,
/// which wins over the CLI level.
pub fn init_tracing(json: bool, cli_level: &str, cfg: Option<&Logging>) -> eyre::Result<()> {
    let level = cfg
        .and_then(|l| l.level.as_deref())
        .unwrap_or(cli_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| eyre::eyre!("invalid log level {level:?}: {e}"))?;

    // Records own stdout; diagnostics go to stderr.
    let console_json = json.then(|| {
        fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let console_pretty = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file_layer = match cfg.and_then(|l| l.file.as_deref()) {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {path:?} has no file name"))?;
            let rotation = match cfg
                .and_then(|l| l.rotation.as_deref())
                .map(str::to_ascii_lowercase)
                .as_deref()
            {
                None | Some("never") => tracing_appender::rolling::Rotation::NEVER,
                Some("daily") => tracing_appender::rolling::Rotation::DAILY,
                Some("hourly") => tracing_appender::rolling::Rotation::HOURLY,
                Some(other) => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
            };
            let appender = tracing_appender::rolling::RollingFileAppender::new(rotation, dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // Keep the worker alive for the process lifetime.
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_pretty)
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}
