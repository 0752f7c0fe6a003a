//! Random-walk tick generator for demos and load tests.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Symbols and starting prices used by [`SyntheticFeed::multi_symbol`].
pub const DEFAULT_INSTRUMENTS: [(&str, f64); 4] = [
    ("BTCUSDT", 45_000.0),
    ("ETHUSDT", 2_800.0),
    ("ADAUSDT", 0.45),
    ("DOTUSDT", 6.50),
];

/// One generated tick, serialized as a message the parser accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticTick {
    /// Instrument symbol.
    pub symbol: String,
    /// Trade price.
    pub price: f64,
    /// Traded volume.
    pub volume: f64,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
    /// Random six-digit trade id.
    pub trade_id: u32,
}

#[derive(Debug, Clone)]
struct Instrument {
    symbol: String,
    price: f64,
}

/// Generates ticks whose prices follow a gaussian random walk and whose
/// volumes are log-normal.
///
/// Timestamps advance from a start instant by a jittered step, so output is
/// deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    rng: StdRng,
    instruments: Vec<Instrument>,
    volatility: f64,
    clock: DateTime<Utc>,
    step: TimeDelta,
}

impl SyntheticFeed {
    /// Default relative price move per tick (0.1%).
    pub const DEFAULT_VOLATILITY: f64 = 0.001;

    /// Smallest price the walk may reach.
    pub const MIN_PRICE: f64 = 0.0001;

    /// Creates a feed with no instruments.
    #[must_use]
    pub fn new(seed: u64, start: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            instruments: Vec::new(),
            volatility: Self::DEFAULT_VOLATILITY,
            clock: start,
            step: TimeDelta::milliseconds(100),
        }
    }

    /// Creates a feed over [`DEFAULT_INSTRUMENTS`].
    #[must_use]
    pub fn multi_symbol(seed: u64, start: DateTime<Utc>) -> Self {
        DEFAULT_INSTRUMENTS
            .iter()
            .fold(Self::new(seed, start), |feed, (symbol, price)| {
                feed.with_instrument(*symbol, *price)
            })
    }

    /// Adds an instrument starting at `base_price`.
    #[must_use]
    pub fn with_instrument(mut self, symbol: impl Into<String>, base_price: f64) -> Self {
        self.instruments.push(Instrument {
            symbol: symbol.into(),
            price: base_price.max(Self::MIN_PRICE),
        });
        self
    }

    /// Sets the relative standard deviation of each price move.
    #[must_use]
    pub const fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// Sets the mean spacing between consecutive ticks.
    #[must_use]
    pub const fn with_step(mut self, step: TimeDelta) -> Self {
        self.step = step;
        self
    }

    /// Generates the next tick stamped at `timestamp`, without touching the
    /// internal clock. Returns `None` if no instrument is configured.
    pub fn next_at(&mut self, timestamp: DateTime<Utc>) -> Option<SyntheticTick> {
        if self.instruments.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.instruments.len());
        let shock = standard_normal(&mut self.rng) * self.volatility;
        let volume = (standard_normal(&mut self.rng).exp() * 10.0 * 10_000.0).round() / 10_000.0;
        let trade_id = self.rng.gen_range(100_000..=999_999);

        let instrument = &mut self.instruments[index];
        instrument.price = round_price(instrument.price * (1.0 + shock)).max(Self::MIN_PRICE);

        Some(SyntheticTick {
            symbol: instrument.symbol.clone(),
            price: instrument.price,
            volume,
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            trade_id,
        })
    }

    fn advance_clock(&mut self) -> DateTime<Utc> {
        let step_ms = self.step.num_milliseconds().max(1);
        let jitter = self.rng.gen_range(step_ms / 2..=step_ms + step_ms / 2);
        self.clock += TimeDelta::milliseconds(jitter);
        self.clock
    }
}

impl Iterator for SyntheticFeed {
    type Item = SyntheticTick;

    fn next(&mut self) -> Option<Self::Item> {
        let timestamp = self.advance_clock();
        self.next_at(timestamp)
    }
}

/// Box-Muller sample from N(0, 1).
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Rounds to four decimals, enough for sub-dollar instruments.
fn round_price(price: f64) -> f64 {
    (price * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TickParser;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_seeded_feed_is_deterministic() {
        let a: Vec<_> = SyntheticFeed::multi_symbol(7, start()).take(50).collect();
        let b: Vec<_> = SyntheticFeed::multi_symbol(7, start()).take(50).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_ticks_parse() {
        let parser = TickParser::default();
        let feed = SyntheticFeed::new(1, start()).with_instrument("XYZ", 10.0);

        let mut last = start();
        for tick in feed.take(200) {
            assert!((100_000..=999_999).contains(&tick.trade_id));
            let json = serde_json::to_vec(&tick).unwrap();
            let parsed = parser.parse(&json).unwrap();
            assert_eq!(parsed.symbol(), "XYZ");
            assert!(parsed.price() > 0.0);
            assert!(parsed.timestamp() > last);
            last = parsed.timestamp();
        }
    }

    #[test]
    fn test_multi_symbol_covers_instruments() {
        let symbols: std::collections::HashSet<_> = SyntheticFeed::multi_symbol(3, start())
            .take(400)
            .map(|tick| tick.symbol)
            .collect();
        assert_eq!(symbols.len(), DEFAULT_INSTRUMENTS.len());
    }

    #[test]
    fn test_empty_feed_yields_nothing() {
        assert!(SyntheticFeed::new(0, start()).next().is_none());
    }
}
