//! Conversion of raw collaborator records into calendar components.
//!
//! Normalization is a pure function of the record and a [`NormalizeContext`].
//! A record that can't be normalized yields a record-scoped error
//! ([`NotiflowError::MissingField`] or [`NotiflowError::Parse`]); callers skip
//! that record and keep going.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::config::NotiflowConfig;
use crate::error::{NotiflowError, NotiflowResult};
use crate::event::{Component, Event, EventCategory, Task};
use crate::recurrence::{WeekdayCode, build_rule};
use crate::records::{CourseMeetingRecord, RawRecord, TaskRecord, TimedEventRecord};
use crate::time::{
    format_date, format_time, parse_date, parse_iso_instant, parse_local_datetime,
    parse_meeting_time,
};

/// Everything normalization needs from outside the record.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeContext {
    /// Institution time zone every instant is anchored to.
    pub tz: Tz,
    /// Last day of term; recurring class meetings end here.
    pub term_end: NaiveDate,
    /// First date of newly entered class meeting series.
    pub anchor_date: NaiveDate,
}

impl NormalizeContext {
    /// Context anchored on today's date in `tz`.
    pub fn new(tz: Tz, term_end: NaiveDate) -> Self {
        NormalizeContext {
            tz,
            term_end,
            anchor_date: Utc::now().with_timezone(&tz).date_naive(),
        }
    }

    pub fn from_config(config: &NotiflowConfig) -> NotiflowResult<Self> {
        Ok(Self::new(config.tz()?, parse_date(&config.term_end_date)?))
    }

    pub fn with_anchor_date(mut self, anchor_date: NaiveDate) -> Self {
        self.anchor_date = anchor_date;
        self
    }
}

/// Normalize any record shape into a calendar component.
pub fn normalize(raw: &RawRecord, ctx: &NormalizeContext) -> NotiflowResult<Component> {
    match raw {
        RawRecord::Timed(record) => normalize_timed(record, ctx).map(Component::Event),
        RawRecord::Meeting(record) => {
            let timed = meeting_to_timed(record, ctx)?;
            normalize_timed(&timed, ctx).map(Component::Event)
        }
        RawRecord::Task(record) => normalize_task(record, ctx).map(Component::Task),
    }
}

/// Normalize a timed event, including the recurrence fields of an
/// already-normalized class meeting.
pub fn normalize_timed(record: &TimedEventRecord, ctx: &NormalizeContext) -> NotiflowResult<Event> {
    let course = required(&record.course, "course")?;
    let event_type = required(&record.event_type, "event_type")?;
    let date_str = required(&record.date, "date")?;
    let start_str = required(&record.begin_date_time, "begin_date_time")?;
    let end_str = required(&record.end_date_time, "end_date_time")?;

    let start = parse_local_datetime(date_str, start_str, ctx.tz)?;
    let end = parse_local_datetime(date_str, end_str, ctx.tz)?;

    let mut event = Event::new(
        course,
        EventCategory::from_label(event_type),
        date_str,
        start_str,
        start,
        end,
    );

    if let Some(location) = record.location.as_deref() {
        event = event.with_location(location);
    }

    if let Some(frequency) = record.frequency.as_deref().filter(|f| !f.is_empty()) {
        let rule = build_rule(
            frequency,
            record.interval.as_ref(),
            record.by_day.as_deref().unwrap_or_default(),
            record.until.as_deref().unwrap_or_default(),
            record.exception_dates.as_deref().unwrap_or_default(),
            &start,
        )?;
        event = event.with_recurrence(rule);
    }

    Ok(event)
}

/// Rewrite a class meeting into the timed-event shape: a weekly series from
/// the context's anchor date until the end of term.
///
/// The anchor date is part of the event's UID, so the same meeting posted
/// again on a later day (with the default anchor of today) becomes a second
/// series instead of a duplicate.
pub fn meeting_to_timed(
    record: &CourseMeetingRecord,
    ctx: &NormalizeContext,
) -> NotiflowResult<TimedEventRecord> {
    let name = required(&record.class_name, "className")?;
    let start = parse_meeting_time(required(&record.start_time, "startTime")?)?;
    let end = parse_meeting_time(required(&record.end_time, "endTime")?)?;

    let mut days: Vec<WeekdayCode> = record
        .days
        .iter()
        .filter(|(_, selected)| **selected)
        .filter_map(|(label, _)| WeekdayCode::from_day_label(label))
        .collect();
    days.sort();

    if days.is_empty() {
        return Err(NotiflowError::MissingField("days"));
    }

    Ok(TimedEventRecord {
        course: Some(name.to_string()),
        event_type: Some(EventCategory::ClassMeeting.label().to_string()),
        date: Some(format_date(ctx.anchor_date)),
        begin_date_time: Some(format_time(start)),
        end_date_time: Some(format_time(end)),
        location: None,
        frequency: Some("WEEKLY".to_string()),
        interval: None,
        by_day: Some(days.iter().map(|d| d.as_ics_str().to_string()).collect()),
        until: Some(format_date(ctx.term_end)),
        exception_dates: None,
    })
}

/// Normalize an assignment into a task.
pub fn normalize_task(record: &TaskRecord, ctx: &NormalizeContext) -> NotiflowResult<Task> {
    let course = non_empty(&record.course, "course")?;
    let title = non_empty(&record.title, "title")?;
    let due_at = non_empty(&record.due_at, "due_at")?;

    let due = parse_iso_instant(due_at, ctx.tz)?.ok_or(NotiflowError::MissingField("due_at"))?;

    Ok(Task::new(course, title, due_at, due))
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> NotiflowResult<&'a str> {
    match value.as_deref() {
        Some(v) => non_empty(v, field),
        None => Err(NotiflowError::MissingField(field)),
    }
}

fn non_empty<'a>(value: &'a str, field: &'static str) -> NotiflowResult<&'a str> {
    if value.trim().is_empty() {
        Err(NotiflowError::MissingField(field))
    } else {
        Ok(value)
    }
}
