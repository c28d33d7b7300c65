//! ICS file generation.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component as _, EventLike, Property};

use super::{ICS_LOCAL_FORMAT, ICS_UTC_FORMAT, PROP_CATEGORY, PROP_COURSE, PROP_TITLE, RawComponent};
use crate::error::NotiflowResult;
use crate::event::{Component, Event, Task};
use crate::store::CalendarMetadata;

/// Generate the .ics content of a whole calendar document.
///
/// `preserved` components are written after the modeled ones, unchanged.
pub fn generate_ics(
    metadata: &CalendarMetadata,
    components: &[Component],
    preserved: &[RawComponent],
) -> NotiflowResult<String> {
    let mut cal = Calendar::new();

    for component in components {
        match component {
            Component::Event(event) => {
                cal.push(build_event(event));
            }
            Component::Task(task) => {
                cal.push(build_todo(task));
            }
        }
    }

    let cal = cal.done();

    Ok(apply_metadata(&cal.to_string(), metadata, preserved))
}

fn build_event(event: &Event) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.uid);
    ics_event.summary(&event.summary);
    ics_event.add_property("DTSTAMP", event.stamp.format(ICS_UTC_FORMAT).to_string());

    add_zoned_property(&mut ics_event, "DTSTART", &event.start);
    add_zoned_property(&mut ics_event, "DTEND", &event.end);

    ics_event.description(&event.description);

    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }

    if let Some(ref rule) = event.recurrence {
        ics_event.add_property("RRULE", rule.to_rrule_string());
        for exdate in &rule.exceptions {
            let mut prop = Property::new("EXDATE", exdate.naive_local().format(ICS_LOCAL_FORMAT).to_string());
            prop.add_parameter("TZID", exdate.timezone().name());
            ics_event.append_multi_property(prop);
        }
    }

    ics_event.add_property(PROP_COURSE, &event.course);
    ics_event.add_property(PROP_CATEGORY, event.category.label());

    ics_event.done()
}

fn build_todo(task: &Task) -> icalendar::Todo {
    let mut todo = icalendar::Todo::new();
    todo.uid(&task.uid);
    todo.summary(&task.summary);
    todo.add_property("DTSTAMP", task.stamp.format(ICS_UTC_FORMAT).to_string());

    // UTC, so a due time in the repeated fall-back hour reads back as written
    todo.add_property("DTSTART", task.due.with_timezone(&Utc).format(ICS_UTC_FORMAT).to_string());

    todo.description(&task.description);
    todo.add_property(PROP_COURSE, &task.course);
    todo.add_property(PROP_TITLE, &task.title);

    todo.done()
}

/// Add a wall-clock datetime with its TZID parameter.
fn add_zoned_property<C: icalendar::Component>(component: &mut C, name: &str, time: &DateTime<Tz>) {
    let mut prop = Property::new(name, time.naive_local().format(ICS_LOCAL_FORMAT).to_string());
    prop.add_parameter("TZID", time.timezone().name());
    component.append_property(prop);
}

/// Post-process the icalendar crate's output:
/// - Replace its PRODID with ours and add the display name after it
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Put the preserved components back before the closing line
fn apply_metadata(ics: &str, metadata: &CalendarMetadata, preserved: &[RawComponent]) -> String {
    let extra: usize = preserved.iter().map(|raw| raw.text.len()).sum();
    let mut result = String::with_capacity(ics.len() + extra + 64);

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str(&format!("PRODID:{}\r\n", metadata.product_id));
            result.push_str(&format!("X-WR-CALNAME:{}\r\n", metadata.name));
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if line == "END:VCALENDAR" {
            for raw in preserved {
                result.push_str(&raw.text);
            }
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventCategory;
    use crate::recurrence::build_rule;
    use crate::time::parse_local_datetime;

    const VANCOUVER: Tz = chrono_tz::America::Vancouver;

    fn metadata() -> CalendarMetadata {
        CalendarMetadata {
            product_id: "-//NotiFlow//Finals Scheduler//EN".to_string(),
            name: "NotiFlow Winter Term 1".to_string(),
        }
    }

    fn make_event() -> Event {
        let start = parse_local_datetime("2025/10/23", "15:00:00", VANCOUVER).unwrap();
        let end = parse_local_datetime("2025/10/23", "16:00:00", VANCOUVER).unwrap();
        Event::new("CPEN 311", EventCategory::Midterm, "2025/10/23", "15:00:00", start, end)
    }

    #[test]
    fn test_generate_ics_has_calendar_metadata() {
        let ics = generate_ics(&metadata(), &[], &[]).unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR"));
        assert!(ics.contains("VERSION:2.0"));
        assert!(ics.contains("PRODID:-//NotiFlow//Finals Scheduler//EN"));
        assert!(ics.contains("X-WR-CALNAME:NotiFlow Winter Term 1"));
        assert!(!ics.contains("CALSCALE"));
        assert_eq!(ics.lines().filter(|l| l.starts_with("PRODID")).count(), 1);
    }

    #[test]
    fn test_generate_event_uses_tzid() {
        let ics = generate_ics(&metadata(), &[make_event().into()], &[]).unwrap();

        assert!(ics.contains("BEGIN:VEVENT"), "ICS:\n{}", ics);
        assert!(
            ics.contains("DTSTART;TZID=America/Vancouver:20251023T150000"),
            "ICS:\n{}",
            ics
        );
        assert!(ics.contains("DTEND;TZID=America/Vancouver:20251023T160000"));
        assert!(ics.contains("UID:CPEN_311-Midterm-20251023-15:00:00@notiflow.local"));
        assert!(ics.contains("SUMMARY:CPEN 311 - Midterm"));
        assert!(!ics.contains("RRULE"));
    }

    #[test]
    fn test_generate_recurring_event_with_exdates() {
        let event = make_event();
        let rule = build_rule(
            "WEEKLY",
            None,
            &["TH".to_string()],
            "2025/12/07",
            &["2025/10/30".to_string(), "2025/11/06".to_string()],
            &event.start,
        )
        .unwrap();
        let event = event.with_recurrence(rule);

        let ics = generate_ics(&metadata(), &[event.into()], &[]).unwrap();

        assert!(ics.contains("RRULE:FREQ=WEEKLY;BYDAY=TH;UNTIL=20251207T200000Z"), "ICS:\n{}", ics);
        let exdates = ics.lines().filter(|l| l.starts_with("EXDATE")).count();
        assert_eq!(exdates, 2, "ICS:\n{}", ics);
        assert!(ics.contains("EXDATE;TZID=America/Vancouver:20251030T150000"));
    }

    #[test]
    fn test_generate_task_as_vtodo() {
        let due = parse_local_datetime("2025/10/20", "17:00:00", VANCOUVER).unwrap();
        let task = Task::new("CPEN 311", "HW1", "2025-10-21T00:00:00Z", due);

        let ics = generate_ics(&metadata(), &[task.into()], &[]).unwrap();

        assert!(ics.contains("BEGIN:VTODO"));
        assert!(ics.contains("DTSTART:20251021T000000Z"), "ICS:\n{}", ics);
        assert!(!ics.contains("DTSTART;TZID"));
        assert!(ics.contains("X-NOTIFLOW-TITLE:HW1"));
        assert!(!ics.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn test_preserved_components_written_unchanged() {
        let journal = RawComponent {
            name: "VJOURNAL".to_string(),
            uid: Some("journal-1".to_string()),
            text: "BEGIN:VJOURNAL\r\nUID:journal-1\r\nDESCRIPTION:kept as\r\n  written\r\nEND:VJOURNAL\r\n".to_string(),
        };

        let ics = generate_ics(&metadata(), &[make_event().into()], &[journal.clone()]).unwrap();

        assert!(ics.contains(&journal.text), "ICS:\n{}", ics);
        assert!(ics.ends_with("END:VJOURNAL\r\nEND:VCALENDAR\r\n"), "ICS:\n{}", ics);
        assert!(ics.find("END:VEVENT").unwrap() < ics.find("BEGIN:VJOURNAL").unwrap());
    }
}
