//! OHLCV summary of a sealed window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tickbar_types::{EmptyWindowError, Tick};

/// OHLCV summary for one symbol and one minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvSummary {
    /// Instrument symbol.
    pub symbol: String,
    /// Window open time (start of the minute).
    pub minute_start: DateTime<Utc>,
    /// Price of the earliest tick.
    pub open: f64,
    /// Highest price in the window.
    pub high: f64,
    /// Lowest price in the window.
    pub low: f64,
    /// Price of the latest tick.
    pub close: f64,
    /// Sum of tick volumes.
    pub volume: f64,
    /// Number of ticks in the window.
    pub tick_count: u64,
}

impl OhlcvSummary {
    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if the window closed above its open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if the window closed below its open.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns the typical price ((high + low + close) / 3).
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Summarizes the ticks of one window.
///
/// Ticks are stably sorted by timestamp first, so ticks sharing a timestamp
/// keep their arrival order when picking `open` and `close`.
///
/// # Errors
///
/// Returns [`EmptyWindowError`] if `members` is empty.
pub fn summarize(
    symbol: &str,
    minute_start: DateTime<Utc>,
    members: &[Tick],
) -> Result<OhlcvSummary, EmptyWindowError> {
    let mut ordered: Vec<&Tick> = members.iter().collect();
    ordered.sort_by_key(|tick| tick.timestamp());

    let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
        return Err(EmptyWindowError {
            symbol: symbol.to_string(),
            minute_start,
        });
    };

    let mut high = f64::MIN;
    let mut low = f64::MAX;
    let mut volume = 0.0;
    for tick in &ordered {
        high = high.max(tick.price());
        low = low.min(tick.price());
        volume += tick.volume();
    }

    Ok(OhlcvSummary {
        symbol: symbol.to_string(),
        minute_start,
        open: first.price(),
        high,
        low,
        close: last.price(),
        volume,
        tick_count: ordered.len() as u64,
    })
}
