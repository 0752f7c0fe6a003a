//! Tick data representation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::{ParseError, truncate_to_minute};

/// Opaque trade identifier.
///
/// Numeric identifiers are kept in their decimal text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TradeId(String);

impl TradeId {
    /// Creates a trade identifier from its text form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for TradeId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A single trade for one symbol.
///
/// Ticks can only be built through [`Tick::new`], which enforces a non-empty
/// symbol, a finite positive price and a finite non-negative volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    symbol: String,
    price: f64,
    volume: f64,
    timestamp: DateTime<Utc>,
    trade_id: Option<TradeId>,
}

impl Tick {
    /// Creates a new tick, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidField`] if the symbol is empty, the price
    /// is not strictly positive, or the volume is negative.
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ParseError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(ParseError::InvalidField {
                field: "symbol",
                reason: "must not be empty".to_string(),
            });
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(ParseError::InvalidField {
                field: "price",
                reason: format!("must be a positive number, got {price}"),
            });
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(ParseError::InvalidField {
                field: "volume",
                reason: format!("must be a non-negative number, got {volume}"),
            });
        }

        Ok(Self {
            symbol,
            price,
            volume,
            timestamp,
            trade_id: None,
        })
    }

    /// Attaches a trade identifier.
    #[must_use]
    pub fn with_trade_id(mut self, trade_id: TradeId) -> Self {
        self.trade_id = Some(trade_id);
        self
    }

    /// Instrument symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Trade price.
    #[must_use]
    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Traded volume.
    #[must_use]
    pub const fn volume(&self) -> f64 {
        self.volume
    }

    /// Trade time (UTC).
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Trade identifier, if the feed supplied one.
    #[must_use]
    pub const fn trade_id(&self) -> Option<&TradeId> {
        self.trade_id.as_ref()
    }

    /// Start of the minute this tick falls into.
    #[must_use]
    pub fn minute_start(&self) -> DateTime<Utc> {
        truncate_to_minute(self.timestamp)
    }

    /// Returns the notional value (price * volume).
    #[must_use]
    pub fn notional(&self) -> f64 {
        self.price * self.volume
    }
}
