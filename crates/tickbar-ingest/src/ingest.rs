//! The ingestion loop.

use std::collections::HashSet;
use std::time::Duration;
use tickbar_aggregate::{ApplyOutcome, LatePolicy, Window, WindowAggregator};
use tickbar_sink::{DispatchMode, SinkDispatcher};
use tokio_util::sync::CancellationToken;

use crate::{RawMessage, Received, RequiredFields, TickParser, TickSource};

/// Runtime options for an [`IngestionLoop`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Symbols to aggregate. Empty accepts every symbol.
    pub symbols: HashSet<String>,
    /// Fields a message must carry.
    pub required_fields: RequiredFields,
    /// Handling of ticks older than the open window.
    pub late_policy: LatePolicy,
    /// How sealed summaries are fanned out to sinks.
    pub dispatch_mode: DispatchMode,
    /// Maximum wait per receive before re-checking for cancellation.
    pub recv_timeout: Duration,
    /// Delay before reconnecting after a transport error.
    pub reconnect_delay: Duration,
    /// Tick slots reserved for each new window.
    pub window_capacity: usize,
}

impl IngestConfig {
    /// Default receive timeout (1 second).
    pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

    /// Default reconnect delay (5 seconds).
    pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

    /// Restricts aggregation to `symbols`.
    #[must_use]
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Creates an empty dispatcher using the configured dispatch mode.
    #[must_use]
    pub fn dispatcher(&self) -> SinkDispatcher {
        SinkDispatcher::new(self.dispatch_mode)
    }

    /// Returns true if ticks for `symbol` should be aggregated.
    #[must_use]
    pub fn accepts(&self, symbol: &str) -> bool {
        self.symbols.is_empty() || self.symbols.contains(symbol)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            symbols: HashSet::new(),
            required_fields: RequiredFields::default(),
            late_policy: LatePolicy::default(),
            dispatch_mode: DispatchMode::default(),
            recv_timeout: Self::DEFAULT_RECV_TIMEOUT,
            reconnect_delay: Self::DEFAULT_RECONNECT_DELAY,
            window_capacity: WindowAggregator::DEFAULT_CAPACITY_HINT,
        }
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Raw messages received.
    pub received: u64,
    /// Messages dropped by the parser.
    pub parse_failures: u64,
    /// Valid ticks for symbols outside the subscription.
    pub unsubscribed: u64,
    /// Ticks applied to a window.
    pub accepted: u64,
    /// Ticks dropped because their minute was already sealed.
    pub late_rejected: u64,
    /// Windows sealed by rollover.
    pub rolled: u64,
    /// Windows sealed by the final drain.
    pub drained: u64,
    /// Summaries handed to the dispatcher.
    pub dispatched: u64,
    /// Failed sink deliveries, counted per sink.
    pub sink_failures: u64,
    /// Transport errors followed by a reconnect attempt.
    pub transport_errors: u64,
}

/// Drives a [`TickSource`] through parsing, windowing and dispatch until the
/// source is exhausted or the token is cancelled, then drains every open
/// window.
#[derive(Debug)]
pub struct IngestionLoop<S> {
    source: S,
    parser: TickParser,
    aggregator: WindowAggregator,
    dispatcher: SinkDispatcher,
    config: IngestConfig,
    cancel: CancellationToken,
    stats: IngestStats,
}

impl<S: TickSource> IngestionLoop<S> {
    /// Creates a loop. Call [`SinkDispatcher::check_ready`] first; sinks are
    /// not probed here.
    #[must_use]
    pub fn new(
        source: S,
        dispatcher: SinkDispatcher,
        config: IngestConfig,
        cancel: CancellationToken,
    ) -> Self {
        let aggregator = WindowAggregator::new()
            .with_late_policy(config.late_policy)
            .with_capacity_hint(config.window_capacity);
        Self {
            source,
            parser: TickParser::new(config.required_fields.clone()),
            aggregator,
            dispatcher,
            config,
            cancel,
            stats: IngestStats::default(),
        }
    }

    /// Runs to completion and returns the collected counters.
    ///
    /// Per-message, per-window and per-sink failures are logged and counted;
    /// they never stop the loop.
    pub async fn run(mut self) -> IngestStats {
        tracing::info!(
            symbols = ?self.config.symbols,
            sinks = ?self.dispatcher.sink_names().collect::<Vec<_>>(),
            late_policy = %self.config.late_policy,
            "ingestion started"
        );

        loop {
            let received = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                received = self.source.recv(self.config.recv_timeout) => received,
            };

            match received {
                Ok(Received::Message(message)) => self.handle_message(message).await,
                Ok(Received::Idle) => {}
                Ok(Received::Exhausted) => {
                    tracing::info!("source exhausted");
                    break;
                }
                Err(e) => {
                    self.stats.transport_errors += 1;
                    tracing::error!(
                        stage = "transport",
                        error = %e,
                        retry_in_ms = self.config.reconnect_delay.as_millis() as u64,
                        "subscription lost"
                    );
                    if !backoff(&self.cancel, self.config.reconnect_delay).await {
                        tracing::info!("shutdown requested during reconnect backoff");
                        break;
                    }
                    match self.source.reconnect().await {
                        Ok(()) => tracing::info!("subscription re-established"),
                        Err(e) => {
                            tracing::warn!(stage = "transport", error = %e, "reconnect failed");
                        }
                    }
                }
            }
        }

        self.drain().await;
        tracing::info!(stats = ?self.stats, "ingestion stopped");
        self.stats
    }

    async fn handle_message(&mut self, message: RawMessage) {
        self.stats.received += 1;

        let tick = match self.parser.parse(&message.payload) {
            Ok(tick) => tick,
            Err(e) => {
                self.stats.parse_failures += 1;
                tracing::warn!(
                    channel = %message.channel,
                    stage = "parse",
                    error = %e,
                    "dropping invalid message"
                );
                return;
            }
        };

        if !self.config.accepts(tick.symbol()) {
            self.stats.unsubscribed += 1;
            tracing::trace!(symbol = tick.symbol(), "ignoring unsubscribed symbol");
            return;
        }

        match self.aggregator.apply(tick) {
            ApplyOutcome::Opened | ApplyOutcome::Appended => self.stats.accepted += 1,
            ApplyOutcome::Rolled { sealed } => {
                self.stats.accepted += 1;
                self.stats.rolled += 1;
                self.seal(sealed).await;
            }
            ApplyOutcome::RejectedLate { tick, window_start } => {
                self.stats.late_rejected += 1;
                tracing::warn!(
                    symbol = tick.symbol(),
                    tick_time = %tick.timestamp(),
                    window_start = %window_start,
                    stage = "aggregate",
                    "dropping tick for a sealed minute"
                );
            }
        }
    }

    async fn drain(&mut self) {
        let windows = self.aggregator.drain();
        tracing::info!(windows = windows.len(), "draining open windows");
        for window in windows {
            self.stats.drained += 1;
            self.seal(window).await;
        }
    }

    async fn seal(&mut self, window: Window) {
        let summary = match window.summarize() {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(stage = "summarize", error = %e, "skipping window");
                return;
            }
        };

        tracing::info!(
            symbol = %summary.symbol,
            minute_start = %summary.minute_start,
            open = summary.open,
            high = summary.high,
            low = summary.low,
            close = summary.close,
            volume = summary.volume,
            ticks = summary.tick_count,
            "minute complete"
        );

        let report = self.dispatcher.dispatch(&summary).await;
        self.stats.dispatched += 1;
        self.stats.sink_failures += report.failed.len() as u64;
    }
}

/// Sleeps for `delay`. Returns false if cancelled first.
async fn backoff(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
