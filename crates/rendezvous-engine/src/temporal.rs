//! Time zone conversion and local-time formatting.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{RendezvousError, Result};
use crate::model::TimeOfDay;

/// Parse an IANA time zone identifier.
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| RendezvousError::InvalidTimezone(name.to_string()))
}

/// Weekday and wall-clock time of `instant` as observed in `tz`.
pub fn local_weekday_and_time(instant: DateTime<Utc>, tz: Tz) -> (Weekday, TimeOfDay) {
    let local = instant.with_timezone(&tz);
    // hour() < 24 and minute() < 60, so the narrowing is lossless.
    let time = TimeOfDay::hm(local.hour() as u16, local.minute() as u16);
    (local.weekday(), time)
}

/// `"HH:MM"` in 24-hour local time.
pub fn local_clock(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// Abbreviated local stamp, e.g. `"Mon, Mar 16, 09:00"`.
pub fn local_stamp(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%a, %b %-d, %H:%M")
        .to_string()
}

/// Whole minutes in `delta`, rounded half away from zero.
pub fn round_minutes(delta: Duration) -> i64 {
    (delta.num_seconds() as f64 / 60.0).round() as i64
}
