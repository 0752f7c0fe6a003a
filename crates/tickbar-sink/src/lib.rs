//! Summary sinks and fan-out dispatch for tickbar.
//!
//! This crate delivers sealed-window summaries downstream:
//!
//! - [`Sink`] - A single independent destination
//! - [`SinkDispatcher`] - Fans a summary out to every sink with isolated failures
//! - [`JsonlSink`] - Append-only per-symbol NDJSON files
//! - [`WriterSink`] - NDJSON lines on any async writer (stdout by default)
//! - [`DocumentSink`] - Durable records through a [`DocumentStore`]
//! - [`CacheSink`] - Expiring cache entry plus publish through a [`CacheClient`]

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod dispatcher;
mod document;
mod jsonl;
pub mod record;
mod sink;
mod writer;

pub use cache::{CacheClient, CacheSink, MemoryCache};
pub use dispatcher::{DispatchMode, DispatchReport, SinkDispatcher, SinkFailure};
pub use document::{DocumentSink, DocumentStore, IndexSpec, MemoryDocumentStore, SortOrder};
pub use jsonl::JsonlSink;
pub use record::{SummaryDocument, SummaryPayload};
pub use sink::Sink;
pub use writer::WriterSink;
