//! Date and time normalization.
//!
//! Every instant the engine handles is anchored to the institution's local
//! zone (a `chrono_tz::Tz`), never to UTC. Collaborators hand us loose
//! strings (`2025/10/23` + `15:00:00`, `2025-12-10T22:30:00Z`, `10:00 AM`);
//! these helpers turn them into `DateTime<Tz>` values.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{NotiflowError, NotiflowResult};

/// Date format used by every collaborator record (`2025/10/23`).
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Canonical time-of-day format for records (`15:00:00`).
pub const TIME_FORMAT: &str = "%H:%M:%S";

const TIME_FORMAT_SHORT: &str = "%H:%M";

const MEETING_TIME_FORMAT: &str = "%I:%M %p";

/// Parse a `YYYY/MM/DD` date.
pub fn parse_date(date_str: &str) -> NotiflowResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT)
        .map_err(|e| NotiflowError::Parse(format!("invalid date '{}': {}", date_str, e)))
}

/// Parse a time of day, with or without seconds.
pub fn parse_time_of_day(time_str: &str) -> NotiflowResult<NaiveTime> {
    let time_str = time_str.trim();
    NaiveTime::parse_from_str(time_str, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(time_str, TIME_FORMAT_SHORT))
        .map_err(|e| NotiflowError::Parse(format!("invalid time '{}': {}", time_str, e)))
}

/// Combine a `YYYY/MM/DD` date and a `HH:MM[:SS]` time into an instant in `tz`.
pub fn parse_local_datetime(date_str: &str, time_str: &str, tz: Tz) -> NotiflowResult<DateTime<Tz>> {
    let date = parse_date(date_str)?;
    let time = parse_time_of_day(time_str)?;
    localize(date.and_time(time), tz)
}

/// Attach `tz` to a wall-clock datetime.
///
/// On a DST fall-back the earlier of the two instants is used. Wall-clock
/// times skipped by a DST jump do not exist and are rejected.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> NotiflowResult<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(NotiflowError::Parse(format!(
            "{} does not exist in {}",
            naive, tz
        ))),
    }
}

/// Convert an ISO 8601 instant (usually UTC with a `Z` suffix) into `tz`.
///
/// Returns `Ok(None)` for an empty string. A value without an offset is read
/// as UTC, which is what the LMS emits.
pub fn parse_iso_instant(iso: &str, tz: Tz) -> NotiflowResult<Option<DateTime<Tz>>> {
    let iso = iso.trim();
    if iso.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Ok(Some(dt.with_timezone(&tz)));
    }

    NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M"))
        .map(|naive| Some(Utc.from_utc_datetime(&naive).with_timezone(&tz)))
        .map_err(|e| NotiflowError::Parse(format!("invalid ISO instant '{}': {}", iso, e)))
}

/// Parse a 12-hour clock time such as `10:00 AM` or `2:30 pm`.
pub fn parse_meeting_time(time_str: &str) -> NotiflowResult<NaiveTime> {
    NaiveTime::parse_from_str(time_str.trim(), MEETING_TIME_FORMAT)
        .map_err(|e| NotiflowError::Parse(format!("invalid meeting time '{}': {}", time_str, e)))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse an IANA zone name (`America/Vancouver`).
pub fn parse_timezone(name: &str) -> NotiflowResult<Tz> {
    name.parse::<Tz>()
        .map_err(|e| NotiflowError::Config(format!("unknown time zone '{}': {}", name, e)))
}
