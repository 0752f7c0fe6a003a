//! Tick ingestion for tickbar.
//!
//! This crate turns a raw message stream into dispatched summaries:
//!
//! - [`TickParser`] - Validates JSON messages into [`tickbar_types::Tick`]s
//! - [`TickSource`] - Transport abstraction with [`ChannelSource`] and [`LineSource`]
//! - [`IngestionLoop`] - Receive, window, dispatch; reconnect and drain on shutdown
//! - [`SyntheticFeed`] - Random-walk tick generator

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod ingest;
mod parse;
mod source;
mod synthetic;

pub use ingest::{IngestConfig, IngestStats, IngestionLoop};
pub use parse::{CORE_FIELDS, EPOCH_SECONDS_RANGE, RequiredFields, TickParser, parse_timestamp};
pub use source::{ChannelItem, ChannelSource, LineSource, RawMessage, Received, TickSource};
pub use synthetic::{DEFAULT_INSTRUMENTS, SyntheticFeed, SyntheticTick};
