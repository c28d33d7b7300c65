//! ICS file parsing using the icalendar crate's parser.

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component as IcsComponent, Property, read_calendar, unfold},
};

use super::{ICS_UTC_FORMAT, PROP_CATEGORY, PROP_COURSE, PROP_TITLE};
use crate::error::{NotiflowError, NotiflowResult};
use crate::event::{Component, Event, EventCategory, Task};
use crate::recurrence::{parse_ics_instant, parse_rrule};
use crate::time::localize;

/// A top-level component exactly as it was written in the file.
///
/// Components the calendar doesn't model (VTIMEZONE, VJOURNAL, events with
/// rules we can't represent, ...) are carried in this form so they are
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComponent {
    /// Component name, e.g. `VEVENT`.
    pub name: String,
    pub uid: Option<String>,
    /// The component's content lines, folding kept, each ending in CRLF.
    pub text: String,
}

/// One top-level component of a calendar document.
#[derive(Debug, Clone)]
pub struct ParsedComponent {
    pub raw: RawComponent,
    /// Set for a VEVENT or VTODO that could be read.
    pub component: Option<Component>,
}

/// Parse every top-level component of a calendar document.
///
/// Times without a TZID (UTC or floating) are placed in `default_tz`.
/// A document the parser rejects is [`NotiflowError::StorageCorrupt`]; a
/// component that can't be modeled comes back with only its raw text.
pub fn parse_document(content: &str, default_tz: Tz) -> NotiflowResult<Vec<ParsedComponent>> {
    if !content.trim_start().starts_with("BEGIN:VCALENDAR") {
        return Err(NotiflowError::StorageCorrupt("missing BEGIN:VCALENDAR".into()));
    }

    let unfolded = unfold(content);
    read_calendar(&unfolded).map_err(NotiflowError::StorageCorrupt)?;

    Ok(split_components(content)
        .into_iter()
        .map(|(name, text)| read_component(name, text, default_tz))
        .collect())
}

/// Parse the VEVENTs and VTODOs of a calendar document, leaving out
/// anything that can't be modeled.
pub fn parse_components(content: &str, default_tz: Tz) -> NotiflowResult<Vec<Component>> {
    Ok(parse_document(content, default_tz)?
        .into_iter()
        .filter_map(|parsed| parsed.component)
        .collect())
}

/// Cut the raw text of each top-level component out of a document.
///
/// Nesting is tracked on unfolded lines; the text keeps the original folding.
fn split_components(content: &str) -> Vec<(String, String)> {
    let mut lines: Vec<(String, String)> = Vec::new();
    for line in content.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((unfolded, raw)) = lines.last_mut() {
                unfolded.push_str(&line[1..]);
                raw.push_str("\r\n");
                raw.push_str(line);
                continue;
            }
        }
        lines.push((line.to_string(), line.to_string()));
    }

    let mut components = Vec::new();
    let mut depth = 0usize;
    let mut name = String::new();
    let mut text = String::new();

    for (unfolded, raw) in lines {
        if let Some(begin) = unfolded.strip_prefix("BEGIN:") {
            depth += 1;
            if depth == 2 {
                name = begin.trim().to_ascii_uppercase();
            }
        }
        if depth >= 2 {
            text.push_str(&raw);
            text.push_str("\r\n");
        }
        if unfolded.starts_with("END:") {
            if depth == 2 {
                components.push((std::mem::take(&mut name), std::mem::take(&mut text)));
            }
            depth = depth.saturating_sub(1);
        }
    }

    components
}

fn read_component(name: String, text: String, tz: Tz) -> ParsedComponent {
    let wrapped = format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n{}END:VCALENDAR\r\n", text);
    let unfolded = unfold(&wrapped);
    let mut raw = RawComponent {
        name,
        uid: None,
        text,
    };

    let calendar = match read_calendar(&unfolded) {
        Ok(calendar) => calendar,
        Err(e) => {
            tracing::warn!(component = %raw.name, error = %e, "keeping unreadable component as written");
            return ParsedComponent { raw, component: None };
        }
    };
    let Some(ics) = calendar.components.first() else {
        return ParsedComponent { raw, component: None };
    };

    raw.uid = ics
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .filter(|uid| !uid.is_empty());

    // Overrides of a single occurrence share the series UID
    let kind = raw.name.clone();
    let parsed = match kind.as_str() {
        "VEVENT" if ics.find_prop("RECURRENCE-ID").is_none() => parse_event(ics, tz).map(Component::Event),
        "VTODO" => parse_todo(ics, tz).map(Component::Task),
        _ => return ParsedComponent { raw, component: None },
    };

    match parsed {
        Ok(component) => ParsedComponent {
            raw,
            component: Some(component),
        },
        Err(e) => {
            tracing::warn!(
                component = %raw.name,
                uid = raw.uid.as_deref().unwrap_or(""),
                error = %e,
                "keeping unmodeled component as written"
            );
            ParsedComponent { raw, component: None }
        }
    }
}

fn parse_event(vevent: &IcsComponent<'_>, tz: Tz) -> NotiflowResult<Event> {
    let uid = required_text(vevent, "UID")?;
    let summary = optional_text(vevent, "SUMMARY").unwrap_or_else(|| "(No title)".to_string());
    let start = parse_time_prop(vevent, "DTSTART", tz)?;
    let end = match vevent.find_prop("DTEND") {
        Some(_) => parse_time_prop(vevent, "DTEND", tz)?,
        None => start,
    };

    let course = optional_text(vevent, PROP_COURSE).unwrap_or_else(|| summary.clone());
    let category = optional_text(vevent, PROP_CATEGORY)
        .map(|label| EventCategory::from_label(&label))
        .unwrap_or_else(|| EventCategory::Other(String::new()));

    let recurrence = match vevent.find_prop("RRULE") {
        Some(prop) => {
            let rule_tz = start.timezone();
            let mut rule = parse_rrule(prop.val.as_ref(), rule_tz)?;
            rule.exceptions = vevent
                .properties
                .iter()
                .filter(|p| p.name == "EXDATE")
                .map(|p| parse_exdate_property(p, rule_tz))
                .collect::<NotiflowResult<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect();
            Some(rule)
        }
        None => None,
    };

    Ok(Event {
        uid,
        course,
        category,
        summary,
        description: optional_text(vevent, "DESCRIPTION").unwrap_or_default(),
        location: optional_text(vevent, "LOCATION"),
        start,
        end,
        stamp: parse_stamp(vevent),
        recurrence,
    })
}

fn parse_todo(vtodo: &IcsComponent<'_>, tz: Tz) -> NotiflowResult<Task> {
    let uid = required_text(vtodo, "UID")?;
    let summary = optional_text(vtodo, "SUMMARY").unwrap_or_else(|| "(No title)".to_string());
    let due = match vtodo.find_prop("DTSTART") {
        Some(_) => parse_time_prop(vtodo, "DTSTART", tz)?,
        None => parse_time_prop(vtodo, "DUE", tz)?,
    };

    Ok(Task {
        uid,
        course: optional_text(vtodo, PROP_COURSE).unwrap_or_default(),
        title: optional_text(vtodo, PROP_TITLE).unwrap_or_else(|| summary.clone()),
        summary,
        description: optional_text(vtodo, "DESCRIPTION").unwrap_or_default(),
        due,
        stamp: parse_stamp(vtodo),
    })
}

fn required_text(component: &IcsComponent<'_>, name: &'static str) -> NotiflowResult<String> {
    optional_text(component, name)
        .filter(|v| !v.is_empty())
        .ok_or(NotiflowError::MissingField(name))
}

/// Text values come back from the parser already unescaped.
fn optional_text(component: &IcsComponent<'_>, name: &str) -> Option<String> {
    component.find_prop(name).map(|p| p.val.to_string())
}

fn parse_time_prop(component: &IcsComponent<'_>, name: &'static str, tz: Tz) -> NotiflowResult<DateTime<Tz>> {
    let prop = component
        .find_prop(name)
        .ok_or(NotiflowError::MissingField(name))?;
    let dpt = DatePerhapsTime::try_from(prop)
        .map_err(|_| NotiflowError::Parse(format!("invalid {} '{}'", name, prop.val.to_string())))?;
    to_instant(dpt, tz)
}

/// Convert icalendar's DatePerhapsTime to a zoned instant.
fn to_instant(dpt: DatePerhapsTime, default_tz: Tz) -> NotiflowResult<DateTime<Tz>> {
    match dpt {
        DatePerhapsTime::Date(d) => localize(d.and_time(NaiveTime::MIN), default_tz),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => Ok(dt.with_timezone(&default_tz)),
            CalendarDateTime::Floating(naive) => localize(naive, default_tz),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                let tz = tzid.parse::<Tz>().unwrap_or(default_tz);
                localize(date_time, tz)
            }
        },
    }
}

/// Parse an EXDATE property, which may carry several comma-separated values.
fn parse_exdate_property(prop: &Property<'_>, series_tz: Tz) -> NotiflowResult<Vec<DateTime<Tz>>> {
    let tz = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref())
        .and_then(|v| v.to_string().parse::<Tz>().ok())
        .unwrap_or(series_tz);

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_ics_instant(s, tz).map(|dt| dt.with_timezone(&series_tz)))
        .collect()
}

fn parse_stamp(component: &IcsComponent<'_>) -> DateTime<Utc> {
    component
        .find_prop("DTSTAMP")
        .and_then(|p| NaiveDateTime::parse_from_str(p.val.as_ref(), ICS_UTC_FORMAT).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::generate_ics;
    use crate::recurrence::build_rule;
    use crate::store::CalendarMetadata;
    use crate::time::{parse_iso_instant, parse_local_datetime};
    use chrono::{Datelike, Timelike};

    const VANCOUVER: Tz = chrono_tz::America::Vancouver;

    fn metadata() -> CalendarMetadata {
        CalendarMetadata {
            product_id: "TEST".to_string(),
            name: "Test".to_string(),
        }
    }

    #[test]
    fn test_roundtrip_recurring_event() {
        let start = parse_local_datetime("2025/09/02", "10:00:00", VANCOUVER).unwrap();
        let end = parse_local_datetime("2025/09/02", "12:00:00", VANCOUVER).unwrap();
        let rule = build_rule(
            "WEEKLY",
            Some(&serde_json::json!(2)),
            &["MO".to_string(), "WE".to_string()],
            "2025/12/07",
            &["2025/11/10".to_string()],
            &start,
        )
        .unwrap();
        let event = Event::new("CPEN 311", EventCategory::ClassMeeting, "2025/09/02", "10:00:00", start, end)
            .with_location("MCLD 202")
            .with_recurrence(rule);

        let ics = generate_ics(&metadata(), &[event.clone().into()], &[]).unwrap();
        let parsed = parse_components(&ics, VANCOUVER).unwrap();

        assert_eq!(parsed.len(), 1);
        let Component::Event(parsed) = &parsed[0] else {
            panic!("expected an event, got {:?}", parsed[0]);
        };
        assert_eq!(parsed.uid, event.uid);
        assert_eq!(parsed.course, "CPEN 311");
        assert_eq!(parsed.category, EventCategory::ClassMeeting);
        assert_eq!(parsed.summary, event.summary);
        assert_eq!(parsed.location.as_deref(), Some("MCLD 202"));
        assert_eq!(parsed.start, event.start);
        assert_eq!(parsed.end, event.end);
        assert_eq!(parsed.recurrence, event.recurrence);
        assert_eq!(parsed.stamp.timestamp(), event.stamp.timestamp());
    }

    #[test]
    fn test_roundtrip_task() {
        let due = parse_local_datetime("2025/10/20", "17:00:00", VANCOUVER).unwrap();
        let task = Task::new("CPEN 311", "Lab 3", "2025-10-21T00:00:00Z", due);

        let ics = generate_ics(&metadata(), &[task.clone().into()], &[]).unwrap();
        let parsed = parse_components(&ics, VANCOUVER).unwrap();

        let Component::Task(parsed) = &parsed[0] else {
            panic!("expected a task");
        };
        assert_eq!(parsed.uid, task.uid);
        assert_eq!(parsed.title, "Lab 3");
        assert_eq!(parsed.due, task.due);
    }

    #[test]
    fn test_roundtrip_task_due_in_fall_back_hour() {
        // 01:30 Vancouver time happens twice on 2025-11-02; this is the second
        let due = parse_iso_instant("2025-11-02T09:30:00Z", VANCOUVER).unwrap().unwrap();
        let task = Task::new("CPEN 311", "Lab 4", "2025-11-02T09:30:00Z", due);

        let ics = generate_ics(&metadata(), &[task.clone().into()], &[]).unwrap();
        let parsed = parse_components(&ics, VANCOUVER).unwrap();

        let Component::Task(parsed) = &parsed[0] else {
            panic!("expected a task");
        };
        assert_eq!(parsed.due, task.due);
        assert_eq!(parsed.due.with_timezone(&Utc).to_rfc3339(), "2025-11-02T09:30:00+00:00");
    }

    #[test]
    fn test_text_with_escapes_roundtrips_once() {
        let due = parse_local_datetime("2025/10/20", "17:00:00", VANCOUVER).unwrap();
        let mut task = Task::new("CPEN 311", r"Lab b\c, part 1; draft", "2025-10-21T00:00:00Z", due);
        task.description = "first line\nsecond".to_string();

        let ics = generate_ics(&metadata(), &[task.clone().into()], &[]).unwrap();
        let parsed = parse_components(&ics, VANCOUVER).unwrap();

        let Component::Task(parsed) = &parsed[0] else {
            panic!("expected a task");
        };
        assert_eq!(parsed.title, r"Lab b\c, part 1; draft");
        assert_eq!(parsed.summary, task.summary);
        assert_eq!(parsed.description, "first line\nsecond");
    }

    #[test]
    fn test_escaped_backslash_is_read_once() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VTODO\r\n\
UID:task-1\r\n\
SUMMARY:b\\\\c\\, Room 1\\; B\r\n\
DTSTART:20251021T000000Z\r\n\
END:VTODO\r\n\
END:VCALENDAR\r\n";

        let parsed = parse_components(ics, VANCOUVER).unwrap();
        assert_eq!(parsed[0].summary(), r"b\c, Room 1; B");
    }

    #[test]
    fn test_parse_foreign_utc_event_and_keep_other_components_raw() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:OTHER\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:America/Vancouver\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701101T020000\r\n\
TZOFFSETFROM:-0700\r\n\
TZOFFSETTO:-0800\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:external-1\r\n\
SUMMARY:Office hours\r\n\
DTSTART:20251010T170000Z\r\n\
DTEND:20251010T180000Z\r\n\
END:VEVENT\r\n\
BEGIN:VJOURNAL\r\n\
UID:journal-1\r\n\
DESCRIPTION:a long note that was folded by the\r\n\
 writer\r\n\
END:VJOURNAL\r\n\
END:VCALENDAR\r\n";

        let parsed = parse_components(ics, VANCOUVER).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].uid(), "external-1");
        let start = parsed[0].start();
        assert_eq!(start.timezone(), VANCOUVER);
        assert_eq!((start.day(), start.hour()), (10, 10));

        let document = parse_document(ics, VANCOUVER).unwrap();
        let names: Vec<_> = document.iter().map(|p| p.raw.name.as_str()).collect();
        assert_eq!(names, ["VTIMEZONE", "VEVENT", "VJOURNAL"]);

        let timezone = &document[0];
        assert!(timezone.component.is_none());
        assert_eq!(timezone.raw.uid, None);
        assert!(timezone.raw.text.starts_with("BEGIN:VTIMEZONE\r\n"));
        assert!(timezone.raw.text.contains("BEGIN:STANDARD\r\n"));
        assert!(timezone.raw.text.ends_with("END:VTIMEZONE\r\n"));

        let journal = &document[2];
        assert!(journal.component.is_none());
        assert_eq!(journal.raw.uid.as_deref(), Some("journal-1"));
        assert!(journal.raw.text.contains("folded by the\r\n writer\r\n"));
    }

    #[test]
    fn test_unsupported_rule_keeps_raw_text_and_uid() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:daily-1\r\n\
SUMMARY:Standup\r\n\
DTSTART:20251006T160000Z\r\n\
RRULE:FREQ=DAILY;COUNT=5\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:daily-1\r\n\
RECURRENCE-ID:20251008T160000Z\r\n\
SUMMARY:Standup moved\r\n\
DTSTART:20251008T170000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        assert!(parse_components(ics, VANCOUVER).unwrap().is_empty());

        let document = parse_document(ics, VANCOUVER).unwrap();
        assert_eq!(document.len(), 2);
        assert!(document.iter().all(|p| p.component.is_none()));
        assert!(document.iter().all(|p| p.raw.uid.as_deref() == Some("daily-1")));
        assert!(document[0].raw.text.contains("RRULE:FREQ=DAILY;COUNT=5\r\n"));
        assert!(document[1].raw.text.contains("RECURRENCE-ID:20251008T160000Z\r\n"));
    }

    #[test]
    fn test_component_without_uid_is_not_modeled() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:No uid\r\n\
DTSTART:20251010T170000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        assert!(parse_components(ics, VANCOUVER).unwrap().is_empty());

        let document = parse_document(ics, VANCOUVER).unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document[0].raw.uid, None);
        assert!(document[0].raw.text.contains("SUMMARY:No uid\r\n"));
    }

    #[test]
    fn test_non_calendar_content_is_corrupt() {
        assert!(matches!(
            parse_components("hello", VANCOUVER),
            Err(NotiflowError::StorageCorrupt(_))
        ));
    }
}
