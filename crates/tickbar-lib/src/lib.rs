//! Streaming one-minute OHLCV aggregation for tick feeds.
//!
//! This is a facade crate that re-exports functionality from the tickbar
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use tickbar_lib::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = SinkDispatcher::new(DispatchMode::Sequential)
//!         .with_sink(JsonlSink::new("./out"))
//!         .with_sink(WriterSink::stdout());
//!     dispatcher.check_ready().await?;
//!
//!     let stdin = std::io::BufReader::new(std::io::stdin());
//!     let source = ChannelSource::spawn_reader("stdin", stdin, 1024)?;
//!     let stats = IngestionLoop::new(source, dispatcher, IngestConfig::default(), CancellationToken::new())
//!         .run()
//!         .await;
//!     println!("sealed {} windows", stats.rolled + stats.drained);
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use tickbar_types::*;

// Re-export windowing
pub use tickbar_aggregate::{
    ApplyOutcome, LatePolicy, LatePolicyParseError, OhlcvSummary, Window, WindowAggregator,
    summarize,
};

// Re-export sinks
#[cfg(feature = "sink")]
pub use tickbar_sink::{
    CacheClient, CacheSink, DispatchMode, DispatchReport, DocumentSink, DocumentStore, IndexSpec,
    JsonlSink, MemoryCache, MemoryDocumentStore, Sink, SinkDispatcher, SinkFailure, SortOrder,
    SummaryDocument, SummaryPayload, WriterSink, record,
};

// Re-export ingestion
#[cfg(feature = "ingest")]
pub use tickbar_ingest::{
    CORE_FIELDS, ChannelItem, ChannelSource, DEFAULT_INSTRUMENTS, EPOCH_SECONDS_RANGE,
    IngestConfig, IngestStats, IngestionLoop, LineSource, RawMessage, Received, RequiredFields,
    SyntheticFeed, SyntheticTick, TickParser, TickSource, parse_timestamp,
};

/// Prelude module for convenient imports.
///
/// ```
/// use tickbar_lib::prelude::*;
/// ```
pub mod prelude {
    pub use tickbar_types::{ParseError, SinkError, StartupError, Tick, TradeId, TransportError};

    pub use tickbar_aggregate::{LatePolicy, OhlcvSummary, WindowAggregator};

    #[cfg(feature = "sink")]
    pub use tickbar_sink::{
        CacheSink, DispatchMode, DocumentSink, JsonlSink, Sink, SinkDispatcher, WriterSink,
    };

    #[cfg(feature = "ingest")]
    pub use tickbar_ingest::{
        ChannelSource, IngestConfig, IngestStats, IngestionLoop, LineSource, SyntheticFeed,
        TickParser, TickSource,
    };
}
