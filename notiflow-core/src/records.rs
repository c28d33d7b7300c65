//! Raw record shapes produced by the data-source collaborators.
//!
//! These mirror the JSON the LMS fetcher, the exam scraper and the browser
//! extension exchange with the backend. Every field is optional at this layer;
//! [`crate::normalize`] decides what is required.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A timed event: final exam, midterm, lecture, or a class meeting that has
/// already been rewritten into this shape (then the recurrence fields are set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedEventRecord {
    pub course: Option<String>,
    pub event_type: Option<String>,
    /// `YYYY/MM/DD`
    pub date: Option<String>,
    /// `HH:MM:SS` (seconds optional)
    pub begin_date_time: Option<String>,
    pub end_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    /// Number or numeric string; anything else means "every week".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_day: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_dates: Option<Vec<String>>,
}

/// A weekly class meeting entered in the browser extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseMeetingRecord {
    #[serde(rename = "className")]
    pub class_name: Option<String>,
    /// 12-hour clock, e.g. `10:00 AM`
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    /// Day label (`M`, `Tu`, `W`, `Th`, `F`, `Sa`, `Su`) -> selected.
    #[serde(default)]
    pub days: BTreeMap<String, bool>,
}

/// An assignment due at a fixed instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub title: String,
    /// Raw ISO 8601 due instant, e.g. `2025-11-29T23:59:00Z`.
    #[serde(default)]
    pub due_at: String,
}

/// Any record the normalizer accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawRecord {
    Timed(TimedEventRecord),
    Meeting(CourseMeetingRecord),
    Task(TaskRecord),
}

/// A single record or a list of them, as collaborators send either.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl From<TimedEventRecord> for RawRecord {
    fn from(record: TimedEventRecord) -> Self {
        RawRecord::Timed(record)
    }
}

impl From<CourseMeetingRecord> for RawRecord {
    fn from(record: CourseMeetingRecord) -> Self {
        RawRecord::Meeting(record)
    }
}

impl From<TaskRecord> for RawRecord {
    fn from(record: TaskRecord) -> Self {
        RawRecord::Task(record)
    }
}
