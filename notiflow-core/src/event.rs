//! Canonical calendar components.
//!
//! Every record shape the engine accepts ends up as one of these types, and
//! they are what the calendar document stores, serializes and rehydrates.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::NotiflowResult;
use crate::identity;
use crate::recurrence::RecurrenceRule;

/// What kind of academic event this is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EventCategory {
    Lecture,
    Midterm,
    FinalExam,
    ClassMeeting,
    Other(String),
}

impl EventCategory {
    /// Map a record's `event_type` label. Unknown labels are kept verbatim.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Lecture" => EventCategory::Lecture,
            "Midterm" => EventCategory::Midterm,
            "Final Exam" => EventCategory::FinalExam,
            "Class Meeting" => EventCategory::ClassMeeting,
            other => EventCategory::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EventCategory::Lecture => "Lecture",
            EventCategory::Midterm => "Midterm",
            EventCategory::FinalExam => "Final Exam",
            EventCategory::ClassMeeting => "Class Meeting",
            EventCategory::Other(label) => label,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A timed occurrence (VEVENT), optionally recurring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub uid: String,
    pub course: String,
    pub category: EventCategory,
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// DTSTAMP; set when the component is first created and kept across runs.
    pub stamp: DateTime<Utc>,
    pub recurrence: Option<RecurrenceRule>,
}

impl Event {
    /// Create an event for a course. `date_str` and `start_str` are the raw
    /// record strings the identity is derived from.
    pub fn new(
        course: &str,
        category: EventCategory,
        date_str: &str,
        start_str: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Self {
        let uid = identity::event_id(course, category.label(), date_str, start_str);
        Event {
            uid,
            course: course.to_string(),
            summary: format!("{} - {}", course, category),
            description: format!("Entry for {} {}", course, category),
            category,
            location: None,
            start,
            end,
            stamp: Utc::now(),
            recurrence: None,
        }
    }

    /// Attach a location. It is also appended to the summary so it shows up
    /// in calendar views that hide the location field.
    pub fn with_location(mut self, location: &str) -> Self {
        if !location.is_empty() {
            self.summary = format!("{} - {}", self.summary, location);
            self.location = Some(location.to_string());
        }
        self
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }
}

/// An assignment with a due instant (VTODO).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub uid: String,
    pub course: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub due: DateTime<Tz>,
    pub stamp: DateTime<Utc>,
}

impl Task {
    /// Create a task. `iso_due` is the raw due string the identity is derived from.
    pub fn new(course: &str, title: &str, iso_due: &str, due: DateTime<Tz>) -> Self {
        Task {
            uid: identity::task_id(course, title, iso_due),
            course: course.to_string(),
            title: title.to_string(),
            summary: format!("{} - {}", course, title),
            description: format!("Assignment task for {}: {}", course, title),
            due,
            stamp: Utc::now(),
        }
    }
}

/// Anything the calendar document can hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Component {
    Event(Event),
    Task(Task),
}

impl Component {
    pub fn uid(&self) -> &str {
        match self {
            Component::Event(event) => &event.uid,
            Component::Task(task) => &task.uid,
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            Component::Event(event) => &event.summary,
            Component::Task(task) => &task.summary,
        }
    }

    /// Start instant (due instant for tasks).
    pub fn start(&self) -> DateTime<Tz> {
        match self {
            Component::Event(event) => event.start,
            Component::Task(task) => task.due,
        }
    }

    /// Start times: up to `limit` of a recurring event's series, the single
    /// start (or due time) otherwise.
    pub fn occurrences(&self, limit: u16) -> NotiflowResult<Vec<DateTime<Tz>>> {
        match self {
            Component::Event(Event {
                recurrence: Some(rule),
                start,
                ..
            }) => rule.occurrences(start, limit),
            other => Ok(vec![other.start()]),
        }
    }
}

impl From<Event> for Component {
    fn from(event: Event) -> Self {
        Component::Event(event)
    }
}

impl From<Task> for Component {
    fn from(task: Task) -> Self {
        Component::Task(task)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_local_datetime;

    const VANCOUVER: Tz = chrono_tz::America::Vancouver;

    fn sample_event() -> Event {
        let start = parse_local_datetime("2025/10/10", "10:00:00", VANCOUVER).unwrap();
        let end = parse_local_datetime("2025/10/10", "11:00:00", VANCOUVER).unwrap();
        Event::new("CPEN 311", EventCategory::Lecture, "2025/10/10", "10:00:00", start, end)
    }

    #[test]
    fn test_event_summary_and_description() {
        let event = sample_event();
        assert_eq!(event.summary, "CPEN 311 - Lecture");
        assert_eq!(event.description, "Entry for CPEN 311 Lecture");
        assert_eq!(event.uid, "CPEN_311-Lecture-20251010-10:00:00@notiflow.local");
    }

    #[test]
    fn test_location_is_appended_to_summary() {
        let event = sample_event().with_location("Room 123");
        assert!(event.summary.starts_with("CPEN 311 - Lecture"));
        assert_eq!(event.summary, "CPEN 311 - Lecture - Room 123");
        assert_eq!(event.location.as_deref(), Some("Room 123"));

        let event = sample_event().with_location("");
        assert_eq!(event.location, None);
        assert_eq!(event.summary, "CPEN 311 - Lecture");
    }

    #[test]
    fn test_category_labels_roundtrip() {
        for label in ["Lecture", "Midterm", "Final Exam", "Class Meeting", "Quiz"] {
            assert_eq!(EventCategory::from_label(label).label(), label);
        }
        assert_eq!(EventCategory::from_label("Final Exam"), EventCategory::FinalExam);
    }

    #[test]
    fn test_single_event_occurs_once() {
        let event = sample_event();
        let start = event.start;
        assert_eq!(Component::Event(event).occurrences(5).unwrap(), vec![start]);
    }

    #[test]
    fn test_task_fields() {
        let due = parse_local_datetime("2025/10/20", "17:00:00", VANCOUVER).unwrap();
        let task = Task::new("CPEN311", "HW1", "2025-10-21T00:00:00Z", due);
        assert_eq!(task.summary, "CPEN311 - HW1");
        assert_eq!(task.description, "Assignment task for CPEN311: HW1");
        assert!(task.uid.contains("CPEN311-ASSIGNMENT"));
    }
}
