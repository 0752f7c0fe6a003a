//! Minute windowing and OHLCV summaries for tickbar.
//!
//! This crate provides the windowing state machine:
//!
//! - [`WindowAggregator`] - Per-symbol open windows with rollover and drain
//! - [`Window`] - Ticks collected for one symbol within one minute
//! - [`LatePolicy`] - Handling of ticks older than the open window
//! - [`OhlcvSummary`] / [`summarize`] - Summary of a sealed window

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod ohlcv;
mod window;

pub use aggregator::{ApplyOutcome, LatePolicy, LatePolicyParseError, WindowAggregator};
pub use ohlcv::{OhlcvSummary, summarize};
pub use window::Window;
