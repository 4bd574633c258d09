//! Wall-clock `HH:mm` parsing for quiet-hours bounds.

use chrono::NaiveTime;

use crate::error::{Error, Result};

/// Parse a 24-hour `HH:mm` string into a time of day with zero seconds.
///
/// The hour may be one or two digits (`7:00` and `07:00` are equivalent);
/// the minute must be exactly two digits. Whitespace, seconds, and values
/// outside `00:00..=23:59` are rejected.
///
/// # Errors
///
/// Returns [`Error::MalformedTimeString`] if the input is not a valid time.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime> {
    let malformed = || Error::malformed_time(value);

    let (hour, minute) = value.split_once(':').ok_or_else(malformed)?;
    if hour.is_empty()
        || hour.len() > 2
        || minute.len() != 2
        || !hour.bytes().all(|b| b.is_ascii_digit())
        || !minute.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let hour: u32 = hour.parse().map_err(|_| malformed())?;
    let minute: u32 = minute.parse().map_err(|_| malformed())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)
}

/// Format a time of day as `HH:mm`.
#[must_use]
pub fn format_clock_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
