//! Core types for the tickbar minute-bar aggregator.
//!
//! This crate provides the fundamental data structures used throughout tickbar:
//!
//! - [`Tick`] - A single validated trade with symbol, price, volume and timestamp
//! - [`TradeId`] - Opaque trade identifier carried by a tick
//! - [`truncate_to_minute`] - Minute bucketing used for window boundaries
//! - [`ParseError`], [`TransportError`], [`SinkError`], [`StartupError`],
//!   [`EmptyWindowError`] - The failure taxonomy of the pipeline

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod minute;
mod tick;

pub use error::{EmptyWindowError, ParseError, SinkError, StartupError, TransportError};
pub use minute::{minute_key, truncate_to_minute};
pub use tick::{Tick, TradeId};
