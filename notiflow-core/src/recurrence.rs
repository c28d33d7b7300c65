//! Weekly recurrence rules for class meetings.
//!
//! Builds [`RecurrenceRule`] values from loose record fields, encodes them as
//! RRULE/EXDATE values, and expands them into concrete occurrences with the
//! `rrule` crate.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::Serialize;

use crate::error::{NotiflowError, NotiflowResult};
use crate::ics::{ICS_LOCAL_FORMAT, ICS_UTC_FORMAT};
use crate::time::{localize, parse_date, parse_local_datetime};

/// Wall-clock time paired with the `until` date (the end of the term's last day
/// is not known, so noon is used).
pub const UNTIL_TIME: &str = "12:00:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    Weekly,
}

impl Frequency {
    pub fn from_ics_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WEEKLY" => Some(Frequency::Weekly),
            _ => None,
        }
    }

    pub fn as_ics_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "WEEKLY",
        }
    }
}

/// RFC 5545 weekday codes, declared in week order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum WeekdayCode {
    MO,
    TU,
    WE,
    TH,
    FR,
    SA,
    SU,
}

impl WeekdayCode {
    pub fn from_ics_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MO" => Some(WeekdayCode::MO),
            "TU" => Some(WeekdayCode::TU),
            "WE" => Some(WeekdayCode::WE),
            "TH" => Some(WeekdayCode::TH),
            "FR" => Some(WeekdayCode::FR),
            "SA" => Some(WeekdayCode::SA),
            "SU" => Some(WeekdayCode::SU),
            _ => None,
        }
    }

    /// Map the extension's day labels (`M`, `Tu`, `W`, `Th`, `F`, `Sa`, `Su`).
    pub fn from_day_label(label: &str) -> Option<Self> {
        match label {
            "M" => Some(WeekdayCode::MO),
            "Tu" => Some(WeekdayCode::TU),
            "W" => Some(WeekdayCode::WE),
            "Th" => Some(WeekdayCode::TH),
            "F" => Some(WeekdayCode::FR),
            "Sa" => Some(WeekdayCode::SA),
            "Su" => Some(WeekdayCode::SU),
            _ => None,
        }
    }

    pub fn as_ics_str(&self) -> &'static str {
        match self {
            WeekdayCode::MO => "MO",
            WeekdayCode::TU => "TU",
            WeekdayCode::WE => "WE",
            WeekdayCode::TH => "TH",
            WeekdayCode::FR => "FR",
            WeekdayCode::SA => "SA",
            WeekdayCode::SU => "SU",
        }
    }
}

impl fmt::Display for WeekdayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ics_str())
    }
}

/// A weekly recurrence with an end boundary and removed occurrences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub by_day: Vec<WeekdayCode>,
    /// Last instant an occurrence may start at, in the event's zone.
    pub until: DateTime<Tz>,
    /// Occurrences removed from the series (EXDATE), at the series' start time.
    pub exceptions: Vec<DateTime<Tz>>,
}

/// Read a recurrence interval. Anything that isn't a positive integer
/// (missing, `"abc"`, `0`, `-2`) falls back to 1.
pub fn parse_interval(raw: Option<&serde_json::Value>) -> u32 {
    let parsed = match raw {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Build a recurrence rule for a series starting at `start`.
///
/// `until` and every exception date are `YYYY/MM/DD` strings in the same zone
/// as `start`. An exception removes the occurrence on that date at the
/// series' own start time; it never names an arbitrary instant.
pub fn build_rule(
    frequency: &str,
    interval: Option<&serde_json::Value>,
    by_day: &[String],
    until: &str,
    exception_dates: &[String],
    start: &DateTime<Tz>,
) -> NotiflowResult<RecurrenceRule> {
    let frequency = Frequency::from_ics_str(frequency).ok_or_else(|| {
        NotiflowError::Parse(format!("unsupported recurrence frequency '{}'", frequency))
    })?;

    if until.trim().is_empty() {
        return Err(NotiflowError::MissingField("until"));
    }

    let tz = start.timezone();
    let until = parse_local_datetime(until, UNTIL_TIME, tz)?;

    let mut days = Vec::with_capacity(by_day.len());
    for code in by_day {
        let day = WeekdayCode::from_ics_str(code)
            .ok_or_else(|| NotiflowError::Parse(format!("invalid weekday code '{}'", code)))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }

    let start_time = start.naive_local().time();
    let exceptions = exception_dates
        .iter()
        .map(|date| localize(parse_date(date)?.and_time(start_time), tz))
        .collect::<NotiflowResult<Vec<_>>>()?;

    Ok(RecurrenceRule {
        frequency,
        interval: parse_interval(interval),
        by_day: days,
        until,
        exceptions,
    })
}

impl RecurrenceRule {
    /// Encode as an RRULE value. `UNTIL` is written in UTC, as RFC 5545
    /// requires when `DTSTART` carries a `TZID`.
    pub fn to_rrule_string(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency.as_ics_str())];

        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }

        if !self.by_day.is_empty() {
            let days: Vec<&str> = self.by_day.iter().map(|d| d.as_ics_str()).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }

        parts.push(format!(
            "UNTIL={}",
            self.until.with_timezone(&Utc).format(ICS_UTC_FORMAT)
        ));

        parts.join(";")
    }

    /// Expand the series starting at `start` into at most `limit` occurrences.
    pub fn occurrences(&self, start: &DateTime<Tz>, limit: u16) -> NotiflowResult<Vec<DateTime<Tz>>> {
        let tz = start.timezone();
        let mut lines = vec![
            format!(
                "DTSTART;TZID={}:{}",
                tz.name(),
                start.naive_local().format(ICS_LOCAL_FORMAT)
            ),
            format!("RRULE:{}", self.to_rrule_string()),
        ];

        for exdate in &self.exceptions {
            lines.push(format!(
                "EXDATE;TZID={}:{}",
                tz.name(),
                exdate.naive_local().format(ICS_LOCAL_FORMAT)
            ));
        }

        let rrule_set: RRuleSet = lines.join("\n").parse().map_err(|e| {
            NotiflowError::Parse(format!("failed to expand recurrence rule: {}", e))
        })?;

        Ok(rrule_set
            .all(limit)
            .dates
            .iter()
            .map(|dt| dt.with_timezone(&tz))
            .collect())
    }
}

/// Decode an RRULE value written by [`RecurrenceRule::to_rrule_string`].
///
/// Exceptions are carried by separate EXDATE properties and are left empty.
pub fn parse_rrule(value: &str, tz: Tz) -> NotiflowResult<RecurrenceRule> {
    let mut frequency = None;
    let mut interval = 1;
    let mut by_day = Vec::new();
    let mut until = None;

    for part in value.split(';').filter(|p| !p.is_empty()) {
        let (key, val) = part
            .split_once('=')
            .ok_or_else(|| NotiflowError::Parse(format!("malformed RRULE part '{}'", part)))?;

        match key.to_ascii_uppercase().as_str() {
            "FREQ" => frequency = Frequency::from_ics_str(val),
            "INTERVAL" => interval = parse_interval(Some(&serde_json::Value::from(val))),
            "BYDAY" => {
                by_day = val
                    .split(',')
                    .filter_map(WeekdayCode::from_ics_str)
                    .collect();
            }
            "UNTIL" => until = Some(parse_ics_instant(val, tz)?),
            _ => {}
        }
    }

    let frequency = frequency
        .ok_or_else(|| NotiflowError::Parse(format!("unsupported RRULE '{}'", value)))?;
    let until = until.ok_or(NotiflowError::MissingField("UNTIL"))?;

    Ok(RecurrenceRule {
        frequency,
        interval,
        by_day,
        until,
        exceptions: Vec::new(),
    })
}

/// Parse an ICS date-time value: UTC (`...Z`) or wall-clock in `tz`.
pub(crate) fn parse_ics_instant(value: &str, tz: Tz) -> NotiflowResult<DateTime<Tz>> {
    let value = value.trim();
    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, ICS_LOCAL_FORMAT)
            .map_err(|e| NotiflowError::Parse(format!("invalid UTC date-time '{}': {}", value, e)))?;
        return Ok(Utc.from_utc_datetime(&naive).with_timezone(&tz));
    }

    let naive = NaiveDateTime::parse_from_str(value, ICS_LOCAL_FORMAT)
        .map_err(|e| NotiflowError::Parse(format!("invalid date-time '{}': {}", value, e)))?;
    localize(naive, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const VANCOUVER: Tz = chrono_tz::America::Vancouver;

    fn start() -> DateTime<Tz> {
        parse_local_datetime("2025/10/06", "10:00:00", VANCOUVER).unwrap()
    }

    fn days(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_build_rule_encodes_weekly_pattern() {
        let interval = serde_json::json!("2");
        let rule = build_rule(
            "WEEKLY",
            Some(&interval),
            &days(&["MO", "WE"]),
            "2025/12/07",
            &[],
            &start(),
        )
        .unwrap();

        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.interval, 2);
        assert_eq!(rule.by_day, vec![WeekdayCode::MO, WeekdayCode::WE]);
        assert_eq!(rule.until.timezone(), VANCOUVER);
        assert_eq!(
            (rule.until.year(), rule.until.month(), rule.until.day()),
            (2025, 12, 7)
        );

        // 2025-12-07 12:00 PST is 20:00 UTC
        assert_eq!(
            rule.to_rrule_string(),
            "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;UNTIL=20251207T200000Z"
        );
    }

    #[test]
    fn test_invalid_interval_defaults_to_one() {
        for raw in [
            None,
            Some(serde_json::json!("abc")),
            Some(serde_json::json!(0)),
            Some(serde_json::json!(-3)),
        ] {
            assert_eq!(parse_interval(raw.as_ref()), 1, "raw: {:?}", raw);
        }
        assert_eq!(parse_interval(Some(&serde_json::json!(3))), 3);
    }

    #[test]
    fn test_interval_of_one_is_omitted() {
        let rule = build_rule("WEEKLY", None, &days(&["FR"]), "2025/12/07", &[], &start()).unwrap();
        assert_eq!(rule.to_rrule_string(), "FREQ=WEEKLY;BYDAY=FR;UNTIL=20251207T200000Z");
    }

    #[test]
    fn test_exceptions_use_series_start_time() {
        let rule = build_rule(
            "WEEKLY",
            None,
            &days(&["MO"]),
            "2025/12/07",
            &days(&["2025/11/10"]),
            &start(),
        )
        .unwrap();

        assert_eq!(rule.exceptions.len(), 1);
        let exdate = rule.exceptions[0];
        assert_eq!((exdate.month(), exdate.day()), (11, 10));
        assert_eq!((exdate.hour(), exdate.minute()), (10, 0));
    }

    #[test]
    fn test_build_rule_rejects_bad_input() {
        assert!(build_rule("DAILY", None, &[], "2025/12/07", &[], &start()).is_err());
        assert!(build_rule("WEEKLY", None, &days(&["XX"]), "2025/12/07", &[], &start()).is_err());
        assert!(matches!(
            build_rule("WEEKLY", None, &[], "", &[], &start()),
            Err(NotiflowError::MissingField("until"))
        ));
    }

    #[test]
    fn test_parse_rrule_inverts_encoding() {
        let interval = serde_json::json!(2);
        let rule = build_rule(
            "WEEKLY",
            Some(&interval),
            &days(&["TU", "TH"]),
            "2025/12/07",
            &[],
            &start(),
        )
        .unwrap();

        let parsed = parse_rrule(&rule.to_rrule_string(), VANCOUVER).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_occurrences_skip_exceptions() {
        // Mondays from 2025-10-06 through 2025-10-27, minus 2025-10-13
        let rule = build_rule(
            "WEEKLY",
            None,
            &days(&["MO"]),
            "2025/10/27",
            &days(&["2025/10/13"]),
            &start(),
        )
        .unwrap();

        let occurrences = rule.occurrences(&start(), 50).unwrap();
        let dates: Vec<u32> = occurrences.iter().map(|dt| dt.day()).collect();
        assert_eq!(dates, vec![6, 20, 27]);
        assert!(occurrences.iter().all(|dt| dt.hour() == 10));
    }
}
