//! Tracing setup.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{
    Layer, fmt::MakeWriter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

/// Environment variable that overrides the verbosity-derived filter.
pub(crate) const LOG_ENV: &str = "TICKBAR_LOG";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Maps `-q` / `-v` flags to a default filter directive.
pub(crate) const fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free
/// for NDJSON output. With `log_file`, every line is also appended to that
/// file without ANSI colors.
pub(crate) fn init_tracing(
    default_level: &str,
    format: LogFormat,
    log_file: Option<&Path>,
) -> Result<()> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .with_context(|| format!("invalid log filter: {filter}"))?;

    let file_layer = log_file
        .map(open_log_file)
        .transpose()?
        .map(|file| fmt_layer(format, Mutex::new(file), false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(format, std::io::stderr, true))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")
}

/// Opens `path` for appending, creating it and its parent directories.
pub(crate) fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

fn fmt_layer<S, W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}
