//! A single symbol's one-minute window.

use chrono::{DateTime, Utc};
use tickbar_types::{EmptyWindowError, Tick};

use crate::{OhlcvSummary, summarize};

/// Ticks collected for one symbol within one minute.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    symbol: String,
    minute_start: DateTime<Utc>,
    members: Vec<Tick>,
}

impl Window {
    /// Opens a window from its first tick.
    #[must_use]
    pub fn open(tick: Tick, capacity_hint: usize) -> Self {
        let mut members = Vec::with_capacity(capacity_hint.max(1));
        let symbol = tick.symbol().to_string();
        let minute_start = tick.minute_start();
        members.push(tick);
        Self {
            symbol,
            minute_start,
            members,
        }
    }

    /// Symbol this window belongs to.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Start of the window's minute.
    #[must_use]
    pub const fn minute_start(&self) -> DateTime<Utc> {
        self.minute_start
    }

    /// Ticks in arrival order.
    #[must_use]
    pub fn members(&self) -> &[Tick] {
        &self.members
    }

    /// Number of ticks in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the window holds no ticks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn push(&mut self, tick: Tick) {
        self.members.push(tick);
    }

    /// Consumes the sealed window and computes its summary.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyWindowError`] if the window holds no ticks.
    pub fn summarize(self) -> Result<OhlcvSummary, EmptyWindowError> {
        summarize(&self.symbol, self.minute_start, &self.members)
    }
}
