//! Conversion between ISO-8601 text and millisecond epoch values.
//!
//! Millisecond values are rendered with a fixed number of fractional
//! digits so that tables written by one stage parse back to the same
//! float in the next.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Fractional digits of a persisted millisecond timestamp.
pub const TIMESTAMP_DIGITS: usize = 14;

/// Fractional digits of a persisted match delta.
pub const DELTA_DIGITS: usize = 3;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampCodec {
    tz: Tz,
}

impl TimestampCodec {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parses an ISO-8601 timestamp and returns milliseconds since the
    /// epoch, taken in the codec's time zone.
    ///
    /// A trailing `Z` or an explicit offset is honored. Text without
    /// any offset is read as UTC.
    pub fn parse_iso8601(&self, text: &str) -> Result<f64> {
        let text = text.trim();
        let utc = match DateTime::parse_from_rfc3339(text) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(_) => NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| Error::malformed_timestamp(text))?,
        };
        let local = utc.with_timezone(&self.tz);

        Ok(local.timestamp() as f64 * 1000.0 + local.timestamp_subsec_nanos() as f64 / 1_000_000.0)
    }

    /// Wall-clock time of a millisecond value in the codec's zone.
    pub fn to_local(&self, millis: f64) -> Option<DateTime<Tz>> {
        if !millis.is_finite() {
            return None;
        }
        let utc = Utc.timestamp_millis_opt(millis.floor() as i64).single()?;
        Some(utc.with_timezone(&self.tz))
    }
}

impl Default for TimestampCodec {
    fn default() -> Self {
        Self::new(chrono_tz::Asia::Seoul)
    }
}

/// Renders a millisecond value with [TIMESTAMP_DIGITS] fractional digits.
pub fn format_millis(millis: f64) -> String {
    format!("{millis:.prec$}", prec = TIMESTAMP_DIGITS)
}

/// Renders a time difference with [DELTA_DIGITS] fractional digits.
pub fn format_delta(millis: f64) -> String {
    format!("{millis:.prec$}", prec = DELTA_DIGITS)
}

/// Parses a persisted millisecond value. Empty, non-numeric, infinite,
/// NaN and negative values are rejected.
pub fn parse_millis(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(Error::malformed_timestamp(trimmed)),
    }
}
