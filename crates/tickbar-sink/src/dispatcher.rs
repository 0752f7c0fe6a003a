//! Fan-out of window summaries to independent sinks.

use futures::future::join_all;
use std::fmt;
use tickbar_aggregate::OhlcvSummary;
use tickbar_types::{SinkError, StartupError};

use crate::Sink;

/// How the dispatcher drives its sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchMode {
    /// One sink after another, in configured order.
    #[default]
    Sequential,
    /// All sinks at once; dispatch returns when every sink has finished.
    Concurrent,
}

/// A failed delivery to one sink.
#[derive(Debug)]
pub struct SinkFailure {
    /// Name of the sink.
    pub sink: String,
    /// What went wrong.
    pub error: SinkError,
}

/// Outcome of dispatching one summary.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Sinks that accepted the summary, in completion order.
    pub delivered: Vec<String>,
    /// Sinks that failed.
    pub failed: Vec<SinkFailure>,
}

impl DispatchReport {
    /// Returns true if every sink accepted the summary.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, summary: &OhlcvSummary, sink: &str, result: Result<(), SinkError>) {
        match result {
            Ok(()) => {
                tracing::debug!(
                    symbol = %summary.symbol,
                    minute_start = %summary.minute_start,
                    sink,
                    "summary delivered"
                );
                self.delivered.push(sink.to_string());
            }
            Err(error) => {
                tracing::error!(
                    symbol = %summary.symbol,
                    minute_start = %summary.minute_start,
                    sink,
                    stage = "dispatch",
                    error = %error,
                    "sink delivery failed"
                );
                self.failed.push(SinkFailure {
                    sink: sink.to_string(),
                    error,
                });
            }
        }
    }
}

/// Delivers each summary to every configured sink exactly once.
///
/// A failing sink is logged and reported but never stops the remaining sinks,
/// and [`SinkDispatcher::dispatch`] itself cannot fail.
pub struct SinkDispatcher {
    sinks: Vec<Box<dyn Sink>>,
    mode: DispatchMode,
}

impl SinkDispatcher {
    /// Creates a dispatcher with no sinks.
    #[must_use]
    pub fn new(mode: DispatchMode) -> Self {
        Self {
            sinks: Vec::new(),
            mode,
        }
    }

    /// Adds a sink, builder style.
    #[must_use]
    pub fn with_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Adds a boxed sink.
    pub fn push(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// Returns the dispatch mode.
    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Names of the configured sinks, in order.
    pub fn sink_names(&self) -> impl Iterator<Item = &str> {
        self.sinks.iter().map(|sink| sink.name())
    }

    /// Number of configured sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if no sinks are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Probes every sink once.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Sink`] for the first sink that is not ready.
    pub async fn check_ready(&self) -> Result<(), StartupError> {
        for sink in &self.sinks {
            sink.ready().await.map_err(|source| StartupError::Sink {
                sink: sink.name().to_string(),
                source,
            })?;
            tracing::info!(sink = sink.name(), "sink ready");
        }
        Ok(())
    }

    /// Delivers a summary to every sink.
    pub async fn dispatch(&self, summary: &OhlcvSummary) -> DispatchReport {
        let mut report = DispatchReport::default();

        match self.mode {
            DispatchMode::Sequential => {
                for sink in &self.sinks {
                    let result = sink.deliver(summary).await;
                    report.record(summary, sink.name(), result);
                }
            }
            DispatchMode::Concurrent => {
                let results = join_all(
                    self.sinks
                        .iter()
                        .map(|sink| async move { (sink.name(), sink.deliver(summary).await) }),
                )
                .await;
                for (name, result) in results {
                    report.record(summary, name, result);
                }
            }
        }

        report
    }
}

impl fmt::Debug for SinkDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkDispatcher")
            .field("sinks", &self.sink_names().collect::<Vec<_>>())
            .field("mode", &self.mode)
            .finish()
    }
}
