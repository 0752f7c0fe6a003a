//! Run command implementation.
//!
//! Reads NDJSON ticks from a file or stdin, aggregates them into one-minute
//! windows and delivers each summary to the configured sinks.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tickbar_lib::prelude::*;
use tickbar_lib::RequiredFields;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

/// Options for [`run`].
pub(crate) struct RunOptions {
    pub(crate) symbols: Vec<String>,
    pub(crate) input: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) stdout: bool,
    pub(crate) late_policy: LatePolicy,
    pub(crate) concurrent_sinks: bool,
    pub(crate) require_fields: Vec<String>,
}

impl RunOptions {
    fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            required_fields: RequiredFields::new(self.require_fields.iter().cloned()),
            late_policy: self.late_policy,
            dispatch_mode: if self.concurrent_sinks {
                DispatchMode::Concurrent
            } else {
                DispatchMode::Sequential
            },
            ..IngestConfig::default()
        }
        .with_symbols(self.symbols.iter().cloned())
    }
}

/// Aggregate ticks until the input ends or the process is interrupted.
pub(crate) async fn run(options: RunOptions) -> Result<()> {
    let config = options.ingest_config();

    let mut dispatcher = config
        .dispatcher()
        .with_sink(JsonlSink::new(&options.output_dir));
    if options.stdout {
        dispatcher.push(Box::new(WriterSink::stdout()));
    }
    dispatcher
        .check_ready()
        .await
        .context("Failed to initialize sinks")?;

    let cancel = CancellationToken::new();
    let signals = ShutdownSignals::install().context("Failed to install signal handlers")?;
    tokio::spawn(signals.cancel_on_signal(cancel.clone()));

    let stats = if options.input == "-" {
        let reader = std::io::BufReader::new(std::io::stdin());
        let source = ChannelSource::spawn_reader("stdin", reader, STDIN_BUFFER)
            .context("Failed to start stdin reader")?;
        IngestionLoop::new(source, dispatcher, config, cancel)
            .run()
            .await
    } else {
        let file = tokio::fs::File::open(&options.input)
            .await
            .with_context(|| format!("Failed to open input: {}", options.input))?;
        let source = LineSource::new(options.input.as_str(), BufReader::new(file));
        IngestionLoop::new(source, dispatcher, config, cancel)
            .run()
            .await
    };

    tracing::info!(
        received = stats.received,
        parse_failures = stats.parse_failures,
        late_rejected = stats.late_rejected,
        summaries = stats.dispatched,
        sink_failures = stats.sink_failures,
        "run finished"
    );
    Ok(())
}

/// Lines buffered between the stdin reader thread and the loop.
const STDIN_BUFFER: usize = 1024;

/// SIGINT (ctrl-c) and, on unix, SIGTERM listeners.
///
/// Handlers are registered by [`ShutdownSignals::install`], so a signal
/// arriving before the listener task is first polled still triggers a drain.
#[derive(Debug)]
pub(crate) struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Registers the signal handlers. Must be called inside the runtime.
    pub(crate) fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Waits for the first shutdown signal and returns its name.
    pub(crate) async fn recv(self) -> std::io::Result<&'static str> {
        #[cfg(unix)]
        {
            let Self {
                mut interrupt,
                mut terminate,
            } = self;
            tokio::select! {
                _ = interrupt.recv() => Ok("SIGINT"),
                _ = terminate.recv() => Ok("SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
        }
    }

    async fn cancel_on_signal(self, cancel: CancellationToken) {
        match self.recv().await {
            Ok(signal) => {
                tracing::info!(signal, "shutdown signal received, draining open windows");
                cancel.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "unable to listen for shutdown signals"),
        }
    }
}
