//! Wire records written by the sinks.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tickbar_aggregate::OhlcvSummary;
use tickbar_types::minute_key;

/// Formats a minute boundary as ISO-8601 (`2024-01-01T09:30:00Z`).
#[must_use]
pub fn iso_minute(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Cache key for a summary: `<symbol>:<YYYYMMDD_HHMM>`.
#[must_use]
pub fn cache_key(symbol: &str, minute_start: DateTime<Utc>) -> String {
    format!("{symbol}:{}", minute_key(minute_start))
}

/// Publish channel for a symbol's summaries: `<symbol>:aggregated`.
#[must_use]
pub fn aggregated_channel(symbol: &str) -> String {
    format!("{symbol}:aggregated")
}

/// Summary payload shared by the cache, publish, and log sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    /// Instrument symbol.
    pub symbol: String,
    /// ISO-8601 start of the minute.
    pub timestamp: String,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Total volume.
    pub volume: f64,
    /// Number of ticks.
    pub tick_count: u64,
}

impl From<&OhlcvSummary> for SummaryPayload {
    fn from(summary: &OhlcvSummary) -> Self {
        Self {
            symbol: summary.symbol.clone(),
            timestamp: iso_minute(summary.minute_start),
            open: summary.open,
            high: summary.high,
            low: summary.low,
            close: summary.close,
            volume: summary.volume,
            tick_count: summary.tick_count,
        }
    }
}

/// Durable record for the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    /// Instrument symbol.
    pub symbol: String,
    /// Start of the minute, as a native timestamp.
    pub minute_start: DateTime<Utc>,
    /// ISO-8601 start of the minute.
    pub timestamp: String,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Total volume.
    pub volume: f64,
    /// Number of ticks.
    pub tick_count: u64,
    /// ISO-8601 write time.
    pub created_at: String,
}

impl SummaryDocument {
    /// Builds the document for a summary written at `created_at`.
    #[must_use]
    pub fn new(summary: &OhlcvSummary, created_at: DateTime<Utc>) -> Self {
        Self {
            symbol: summary.symbol.clone(),
            minute_start: summary.minute_start,
            timestamp: iso_minute(summary.minute_start),
            open: summary.open,
            high: summary.high,
            low: summary.low,
            close: summary.close,
            volume: summary.volume,
            tick_count: summary.tick_count,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
