//! Streaming per-symbol minute windowing.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tickbar_types::Tick;

use crate::Window;

/// What to do with a tick whose minute is older than the open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LatePolicy {
    /// Drop the tick and leave the open window untouched.
    #[default]
    Reject,
    /// Append the tick to the open (newer) window regardless of its minute.
    AppendToCurrent,
}

impl LatePolicy {
    /// Returns the policy as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::AppendToCurrent => "append",
        }
    }
}

impl std::fmt::Display for LatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown late-tick policy names.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown late policy: {0} (expected 'reject' or 'append')")]
pub struct LatePolicyParseError(String);

impl FromStr for LatePolicy {
    type Err = LatePolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "append" | "append-to-current" => Ok(Self::AppendToCurrent),
            _ => Err(LatePolicyParseError(s.to_string())),
        }
    }
}

/// Result of applying one tick to the aggregator.
#[derive(Debug)]
#[must_use]
pub enum ApplyOutcome {
    /// First tick for the symbol opened a window.
    Opened,
    /// Tick joined the open window.
    Appended,
    /// Tick belongs to a later minute: the previous window was sealed and a
    /// new one opened with this tick.
    Rolled {
        /// The window that was sealed.
        sealed: Window,
    },
    /// Tick belongs to a minute before the open window and was dropped.
    RejectedLate {
        /// The dropped tick.
        tick: Tick,
        /// Start of the window that stayed open.
        window_start: DateTime<Utc>,
    },
}

impl ApplyOutcome {
    /// Returns the sealed window, if this tick caused a rollover.
    pub fn into_sealed(self) -> Option<Window> {
        match self {
            Self::Rolled { sealed } => Some(sealed),
            _ => None,
        }
    }
}

/// Per-symbol minute window state machine.
///
/// Holds at most one open window per symbol. A tick from a later minute seals
/// the open window and starts a new one; [`WindowAggregator::drain`] seals
/// everything that is still open.
#[derive(Debug)]
pub struct WindowAggregator {
    windows: HashMap<String, Window>,
    late_policy: LatePolicy,
    capacity_hint: usize,
}

impl WindowAggregator {
    /// Default number of tick slots reserved for a new window.
    pub const DEFAULT_CAPACITY_HINT: usize = 64;

    /// Creates an aggregator that rejects late ticks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
            late_policy: LatePolicy::Reject,
            capacity_hint: Self::DEFAULT_CAPACITY_HINT,
        }
    }

    /// Sets the late-tick policy.
    #[must_use]
    pub const fn with_late_policy(mut self, late_policy: LatePolicy) -> Self {
        self.late_policy = late_policy;
        self
    }

    /// Sets how many tick slots a new window reserves up front.
    #[must_use]
    pub const fn with_capacity_hint(mut self, capacity_hint: usize) -> Self {
        self.capacity_hint = capacity_hint;
        self
    }

    /// Returns the late-tick policy.
    #[must_use]
    pub const fn late_policy(&self) -> LatePolicy {
        self.late_policy
    }

    /// Applies a tick, possibly sealing the symbol's open window.
    pub fn apply(&mut self, tick: Tick) -> ApplyOutcome {
        let tick_minute = tick.minute_start();

        let Some(current) = self.windows.get_mut(tick.symbol()) else {
            let symbol = tick.symbol().to_string();
            tracing::trace!(%symbol, minute_start = %tick_minute, "window opened");
            self.windows
                .insert(symbol, Window::open(tick, self.capacity_hint));
            return ApplyOutcome::Opened;
        };

        match current.minute_start().cmp(&tick_minute) {
            Ordering::Equal => {
                current.push(tick);
                ApplyOutcome::Appended
            }
            Ordering::Less => {
                let fresh = Window::open(tick, self.capacity_hint);
                let sealed = std::mem::replace(current, fresh);
                tracing::debug!(
                    symbol = sealed.symbol(),
                    minute_start = %sealed.minute_start(),
                    ticks = sealed.len(),
                    next_minute = %tick_minute,
                    "window sealed on rollover"
                );
                ApplyOutcome::Rolled { sealed }
            }
            Ordering::Greater => match self.late_policy {
                LatePolicy::Reject => ApplyOutcome::RejectedLate {
                    window_start: current.minute_start(),
                    tick,
                },
                LatePolicy::AppendToCurrent => {
                    current.push(tick);
                    ApplyOutcome::Appended
                }
            },
        }
    }

    /// Seals every open window and clears the state.
    ///
    /// Windows are returned ordered by symbol.
    pub fn drain(&mut self) -> Vec<Window> {
        let mut sealed: Vec<Window> = self.windows.drain().map(|(_, window)| window).collect();
        sealed.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        sealed
    }

    /// Returns the open window for a symbol.
    #[must_use]
    pub fn window(&self, symbol: &str) -> Option<&Window> {
        self.windows.get(symbol)
    }

    /// Number of symbols with an open window.
    #[must_use]
    pub fn open_windows(&self) -> usize {
        self.windows.len()
    }

    /// Returns true if no window is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Default for WindowAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeDelta, TimeZone};

    fn make_tick(symbol: &str, hour: u32, minute: u32, second: u32, millis: u32, price: f64) -> Tick {
        let timestamp = Utc
            .with_ymd_and_hms(2024, 1, 1, hour, minute, second)
            .unwrap()
            + TimeDelta::milliseconds(i64::from(millis));
        Tick::new(symbol, price, 1.0, timestamp).unwrap()
    }

    #[test]
    fn test_first_tick_opens_window() {
        let mut agg = WindowAggregator::new();
        assert!(agg.is_empty());

        let outcome = agg.apply(make_tick("XYZ", 9, 30, 5, 0, 10.0));

        assert!(matches!(outcome, ApplyOutcome::Opened));
        assert_eq!(agg.open_windows(), 1);
        let window = agg.window("XYZ").unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(
            window.minute_start(),
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_same_minute_appends() {
        let mut agg = WindowAggregator::new();
        let _ = agg.apply(make_tick("XYZ", 9, 30, 0, 0, 10.0));

        for (second, price) in [(10, 10.5), (20, 9.8), (59, 10.2)] {
            let outcome = agg.apply(make_tick("XYZ", 9, 30, second, 999, price));
            assert!(matches!(outcome, ApplyOutcome::Appended));
        }

        assert_eq!(agg.window("XYZ").unwrap().len(), 4);
    }

    #[test]
    fn test_rollover_seals_previous_minute() {
        let mut agg = WindowAggregator::new();
        let _ = agg.apply(make_tick("XYZ", 9, 30, 59, 0, 10.0));

        let sealed = agg
            .apply(make_tick("XYZ", 9, 31, 1, 0, 11.0))
            .into_sealed()
            .unwrap();

        assert_eq!(sealed.len(), 1);
        assert_eq!(
            sealed.minute_start(),
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap()
        );
        let summary = sealed.summarize().unwrap();
        assert_relative_eq!(summary.close, 10.0);

        let open = agg.window("XYZ").unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(
            open.minute_start(),
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 31, 0).unwrap()
        );
    }

    #[test]
    fn test_rollover_across_gap() {
        let mut agg = WindowAggregator::new();
        let _ = agg.apply(make_tick("XYZ", 9, 30, 0, 0, 10.0));

        let sealed = agg.apply(make_tick("XYZ", 11, 5, 0, 0, 12.0)).into_sealed();

        assert!(sealed.is_some());
        assert_eq!(
            agg.window("XYZ").unwrap().minute_start(),
            Utc.with_ymd_and_hms(2024, 1, 1, 11, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_n_minutes_seal_n_minus_one_then_drain_one() {
        let mut agg = WindowAggregator::new();
        let mut seals = 0;

        for minute in 0..5 {
            if agg
                .apply(make_tick("XYZ", 9, 30 + minute, 15, 0, 10.0))
                .into_sealed()
                .is_some()
            {
                seals += 1;
            }
        }

        assert_eq!(seals, 4);
        assert_eq!(agg.drain().len(), 1);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_symbols_are_independent() {
        let mut agg = WindowAggregator::new();
        let _ = agg.apply(make_tick("AAA", 9, 30, 0, 0, 1.0));
        let _ = agg.apply(make_tick("BBB", 9, 31, 0, 0, 2.0));

        // BBB being in 09:31 does not seal AAA's 09:30 window.
        let outcome = agg.apply(make_tick("AAA", 9, 30, 30, 0, 1.5));
        assert!(matches!(outcome, ApplyOutcome::Appended));
        assert_eq!(agg.open_windows(), 2);
    }

    #[test]
    fn test_late_tick_rejected_by_default() {
        let mut agg = WindowAggregator::new();
        let _ = agg.apply(make_tick("XYZ", 9, 30, 0, 0, 10.0));
        let _ = agg.apply(make_tick("XYZ", 9, 31, 0, 0, 11.0));

        let outcome = agg.apply(make_tick("XYZ", 9, 30, 45, 0, 99.0));

        let ApplyOutcome::RejectedLate { tick, window_start } = outcome else {
            panic!("expected late rejection, got {outcome:?}");
        };
        assert_relative_eq!(tick.price(), 99.0);
        assert_eq!(
            window_start,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 31, 0).unwrap()
        );

        let open = agg.window("XYZ").unwrap();
        assert_eq!(open.len(), 1);
        assert_relative_eq!(open.clone().summarize().unwrap().high, 11.0);
    }

    #[test]
    fn test_late_tick_appended_when_configured() {
        let mut agg = WindowAggregator::new().with_late_policy(LatePolicy::AppendToCurrent);
        let _ = agg.apply(make_tick("XYZ", 9, 30, 0, 0, 10.0));
        let _ = agg.apply(make_tick("XYZ", 9, 31, 0, 0, 11.0));

        let outcome = agg.apply(make_tick("XYZ", 9, 30, 45, 0, 99.0));

        assert!(matches!(outcome, ApplyOutcome::Appended));
        let summary = agg.drain().remove(0).summarize().unwrap();
        assert_eq!(
            summary.minute_start,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 31, 0).unwrap()
        );
        assert_eq!(summary.tick_count, 2);
        // The late tick sorts first by timestamp and becomes the open.
        assert_relative_eq!(summary.open, 99.0);
    }

    #[test]
    fn test_drain_orders_by_symbol_and_clears() {
        let mut agg = WindowAggregator::new();
        let _ = agg.apply(make_tick("BBB", 9, 30, 0, 0, 2.0));
        let _ = agg.apply(make_tick("AAA", 9, 30, 0, 0, 1.0));

        let drained = agg.drain();

        let symbols: Vec<_> = drained.iter().map(Window::symbol).collect();
        assert_eq!(symbols, vec!["AAA", "BBB"]);
        assert!(agg.is_empty());
        assert!(agg.drain().is_empty());
    }

    #[test]
    fn test_late_policy_parse() {
        assert_eq!("reject".parse::<LatePolicy>().unwrap(), LatePolicy::Reject);
        assert_eq!(
            "APPEND".parse::<LatePolicy>().unwrap(),
            LatePolicy::AppendToCurrent
        );
        assert!("ignore".parse::<LatePolicy>().is_err());
        assert_eq!(LatePolicy::default().to_string(), "reject");
    }
}
