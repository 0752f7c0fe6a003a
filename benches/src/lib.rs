//! Benchmark fixtures for tickbar.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tickbar_lib::Tick;

/// Shape of a generated tick workload.
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    /// Number of distinct symbols.
    pub symbols: usize,
    /// Ticks per symbol per minute.
    pub ticks_per_minute: usize,
    /// Number of consecutive minutes.
    pub minutes: usize,
}

impl Workload {
    /// Total number of ticks produced.
    pub const fn total_ticks(&self) -> usize {
        self.symbols * self.ticks_per_minute * self.minutes
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0)
            .single()
            .unwrap_or_default()
    }

    fn symbol(index: usize) -> String {
        format!("SYM{index:03}")
    }

    /// Ticks in arrival order: symbols interleaved, timestamps non-decreasing.
    pub fn ticks(&self) -> Vec<Tick> {
        let spacing_ms = 60_000 / self.ticks_per_minute.max(1) as i64;
        let mut ticks = Vec::with_capacity(self.total_ticks());
        for minute in 0..self.minutes {
            for slot in 0..self.ticks_per_minute {
                let timestamp = Self::start()
                    + TimeDelta::minutes(minute as i64)
                    + TimeDelta::milliseconds(slot as i64 * spacing_ms);
                for symbol in 0..self.symbols {
                    let price = 100.0 + ((minute * 7 + slot * 3 + symbol) % 50) as f64 * 0.01;
                    if let Ok(tick) = Tick::new(Self::symbol(symbol), price, 1.0, timestamp) {
                        ticks.push(tick);
                    }
                }
            }
        }
        ticks
    }

    /// The same ticks rendered as NDJSON payloads.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.ticks()
            .iter()
            .map(|tick| {
                format!(
                    r#"{{"symbol":"{}","price":{},"volume":{},"timestamp":"{}"}}"#,
                    tick.symbol(),
                    tick.price(),
                    tick.volume(),
                    tick.timestamp().to_rfc3339()
                )
                .into_bytes()
            })
            .collect()
    }
}
