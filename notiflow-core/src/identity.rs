//! Deterministic identifiers for calendar components.
//!
//! A UID is a pure function of the record's identifying fields, so the same
//! record seen in two separate runs maps onto the same calendar entry.

/// Domain suffix appended to every generated UID.
pub const UID_DOMAIN: &str = "notiflow.local";

const TASK_MARKER: &str = "ASSIGNMENT";

/// UID for a timed event, derived from `(course, category, date, start)`.
pub fn event_id(course: &str, category: &str, date_str: &str, start_str: &str) -> String {
    sanitize(&format!(
        "{}-{}-{}-{}@{}",
        course, category, date_str, start_str, UID_DOMAIN
    ))
}

/// UID for an assignment task, derived from `(course, title, raw due instant)`.
pub fn task_id(course: &str, title: &str, iso_start: &str) -> String {
    sanitize(&format!(
        "{}-{}-{}-{}@{}",
        course, TASK_MARKER, title, iso_start, UID_DOMAIN
    ))
}

/// Make a raw identifier safe to store as a UID and to use as a path segment.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '/' && *c != '\\')
        .map(|c| {
            if c.is_whitespace() || c == ',' || c == ';' {
                '_'
            } else {
                c
            }
        })
        .collect()
}
