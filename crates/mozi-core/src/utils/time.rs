//! Millisecond timestamps and timezone conversion.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, Result};

/// Timezone used when none is given.
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// Current Unix time in milliseconds.
pub fn get_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a Unix timestamp in milliseconds to a datetime in `timezone`,
/// an IANA name such as `Asia/Tokyo`.
pub fn timestamp_to_datetime(timestamp: i64, timezone: &str) -> Result<DateTime<Tz>> {
    let tz = parse_timezone(timezone)?;
    let utc = Utc
        .timestamp_millis_opt(timestamp)
        .single()
        .ok_or(CoreError::InvalidTimestamp(timestamp))?;
    Ok(utc.with_timezone(&tz))
}

/// Parse an RFC 3339 UTC string (`2024-04-25T06:26:22.901Z`) into a
/// datetime in [`DEFAULT_TIMEZONE`].
pub fn utc2datetime(value: &str) -> Result<DateTime<Tz>> {
    let tz = parse_timezone(DEFAULT_TIMEZONE)?;
    let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|source| {
        CoreError::InvalidDatetime {
            value: value.to_string(),
            source,
        }
    })?;
    Ok(parsed.with_timezone(&tz))
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::UnknownTimezone(name.to_string()))
}
