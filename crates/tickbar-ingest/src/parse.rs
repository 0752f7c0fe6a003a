//! Raw message to [`Tick`] parsing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use tickbar_types::{ParseError, Tick, TradeId};

/// Fields every tick message must carry.
pub const CORE_FIELDS: [&str; 4] = ["symbol", "price", "volume", "timestamp"];

/// Naive timestamp layouts accepted in addition to RFC 3339.
///
/// Strings without an offset are read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Set of fields that must be present (and non-null) in a tick message.
///
/// Always contains [`CORE_FIELDS`]; deployments can require more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredFields(Vec<String>);

impl RequiredFields {
    /// Core fields plus `extra`.
    #[must_use]
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extra
            .into_iter()
            .fold(Self::default(), |fields, field| fields.with_field(field))
    }

    /// Adds a required field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.0.contains(&field) {
            self.0.push(field);
        }
        self
    }

    /// Iterates over the required field names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for RequiredFields {
    fn default() -> Self {
        Self(CORE_FIELDS.iter().map(|f| (*f).to_string()).collect())
    }
}

/// Validates and normalizes raw JSON messages into ticks.
#[derive(Debug, Clone, Default)]
pub struct TickParser {
    required: RequiredFields,
}

impl TickParser {
    /// Creates a parser enforcing `required`.
    #[must_use]
    pub const fn new(required: RequiredFields) -> Self {
        Self { required }
    }

    /// Returns the required field set.
    #[must_use]
    pub const fn required_fields(&self) -> &RequiredFields {
        &self.required
    }

    /// Parses one raw message.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the payload is not a JSON object, lacks a
    /// required field, carries an unreadable timestamp, or violates the tick
    /// invariants.
    pub fn parse(&self, raw: &[u8]) -> Result<Tick, ParseError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(ParseError::NotAnObject);
        };
        self.parse_object(&object)
    }

    /// Parses an already-decoded JSON object.
    ///
    /// # Errors
    ///
    /// Same as [`TickParser::parse`].
    pub fn parse_object(&self, object: &Map<String, Value>) -> Result<Tick, ParseError> {
        if let Some(field) = self
            .required
            .iter()
            .find(|field| object.get(*field).is_none_or(Value::is_null))
        {
            return Err(ParseError::MissingField {
                field: field.to_string(),
            });
        }

        let symbol = match &object["symbol"] {
            Value::String(s) => s.trim(),
            other => {
                return Err(ParseError::InvalidField {
                    field: "symbol",
                    reason: format!("expected a string, got {other}"),
                });
            }
        };
        let price = parse_number("price", &object["price"])?;
        let volume = parse_number("volume", &object["volume"])?;
        let timestamp = parse_timestamp(&object["timestamp"])?;

        let tick = Tick::new(symbol, price, volume, timestamp)?;
        match object.get("trade_id").map(parse_trade_id).transpose()? {
            Some(Some(trade_id)) => Ok(tick.with_trade_id(trade_id)),
            _ => Ok(tick),
        }
    }
}

/// Reads a price or volume given as a JSON number or numeric string.
fn parse_number(field: &'static str, value: &Value) -> Result<f64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParseError::InvalidField {
        field,
        reason: format!("expected a number, got {value}"),
    })
}

fn parse_trade_id(value: &Value) -> Result<Option<TradeId>, ParseError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(n.as_u64().map_or_else(
            || TradeId::new(n.to_string()),
            TradeId::from,
        ))),
        Value::String(s) => Ok(Some(TradeId::new(s.as_str()))),
        other => Err(ParseError::InvalidField {
            field: "trade_id",
            reason: format!("expected a number or string, got {other}"),
        }),
    }
}

/// Accepted timestamps as epoch seconds: years 1 through 9999.
///
/// Millisecond or microsecond epochs fall outside this range and are
/// rejected instead of landing millennia in the future.
pub const EPOCH_SECONDS_RANGE: RangeInclusive<i64> = -62_135_596_800..=253_402_300_799;

/// Normalizes an ISO-8601 string or numeric epoch (seconds) to UTC.
///
/// # Errors
///
/// Returns [`ParseError::MalformedTimestamp`] for any other shape, and for
/// instants outside years 1 through 9999.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, ParseError> {
    let parsed = match value {
        Value::String(s) => parse_iso(s.trim()),
        Value::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().and_then(epoch_from_f64),
            |secs| epoch_from_parts(secs, 0),
        ),
        _ => None,
    };
    parsed
        .filter(|dt| EPOCH_SECONDS_RANGE.contains(&dt.timestamp()))
        .ok_or_else(|| ParseError::MalformedTimestamp {
            value: value.to_string(),
        })
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
        .map(|dt| dt.and_utc())
}

fn epoch_from_f64(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let (min, max) = (*EPOCH_SECONDS_RANGE.start(), *EPOCH_SECONDS_RANGE.end());
    if whole < min as f64 || whole > max as f64 {
        return None;
    }
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    epoch_from_parts(whole as i64, nanos)
}

fn epoch_from_parts(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
    if !EPOCH_SECONDS_RANGE.contains(&secs) {
        return None;
    }
    DateTime::from_timestamp(secs, nanos)
}
