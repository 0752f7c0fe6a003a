//! Minute bucketing.

use chrono::{DateTime, TimeDelta, Timelike, Utc};

/// Truncates a timestamp to the start of its minute.
#[must_use]
pub fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt - TimeDelta::seconds(i64::from(dt.second()))
        - TimeDelta::nanoseconds(i64::from(dt.nanosecond()))
}

/// Formats a minute as `YYYYMMDD_HHMM`.
#[must_use]
pub fn minute_key(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%d_%H%M").to_string()
}
